use loopback_schema::ModelFile;
use std::path::{Path, PathBuf};

use super::{discover_files, BootReport};
use crate::{Application, Result};

/// Binds every `models/*.model.json` as `models.<Name>`.
///
/// Relation targets are resolved through the application's model bindings
/// when first used, so files may be booted in any order.
#[derive(Debug, Clone)]
pub struct ModelBooter {
    project_root: PathBuf,
}

impl ModelBooter {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        discover_files(
            &self.project_root,
            &["models".to_string()],
            &[".model.json".to_string()],
            false,
        )
    }

    async fn boot_file(&self, app: &Application, path: &Path) -> Result<String> {
        let text = tokio::fs::read_to_string(path).await?;
        let file: ModelFile = serde_json::from_str(&text)?;
        let definition = file.into_definition(|name| app.model_resolver(name))?;
        let name = definition.name().to_string();
        app.bind_model(definition.build());
        Ok(name)
    }

    pub async fn load(&self, app: &Application) -> Result<BootReport> {
        let mut report = BootReport::default();
        for path in self.discover()? {
            match self.boot_file(app, &path).await {
                Ok(name) => report.loaded.push(format!("models.{}", name)),
                Err(error) => report.fail(&path, error),
            }
        }
        Ok(report)
    }
}
