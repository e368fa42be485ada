use loopback_repository::{DataSource, DataSourceConfig};
use std::path::{Path, PathBuf};

use super::{discover_files, BootReport};
use crate::{Application, Result};

/// Binds every `datasources/*.datasource.json` as `datasources.<name>`.
#[derive(Debug, Clone)]
pub struct DataSourceBooter {
    project_root: PathBuf,
}

impl DataSourceBooter {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        discover_files(
            &self.project_root,
            &["datasources".to_string()],
            &[".datasource.json".to_string()],
            false,
        )
    }

    async fn boot_file(&self, app: &Application, path: &Path) -> Result<String> {
        let text = tokio::fs::read_to_string(path).await?;
        let mut config: DataSourceConfig = serde_json::from_str(&text)?;
        // A relative `file` setting is relative to the project root.
        let file = config.settings.get("file").and_then(|f| f.as_str()).map(PathBuf::from);
        if let Some(file) = file {
            let file = self.project_root.join(file);
            config
                .settings
                .insert("file".into(), file.to_string_lossy().into_owned().into());
        }
        let datasource = DataSource::from_config(&config).await?;
        let name = datasource.name().to_string();
        app.bind_datasource(datasource);
        Ok(name)
    }

    pub async fn load(&self, app: &Application) -> Result<BootReport> {
        let mut report = BootReport::default();
        for path in self.discover()? {
            match self.boot_file(app, &path).await {
                Ok(name) => report.loaded.push(format!("datasources.{}", name)),
                Err(error) => report.fail(&path, error),
            }
        }
        Ok(report)
    }
}
