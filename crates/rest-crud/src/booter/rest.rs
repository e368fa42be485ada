use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{discover_files, BootReport};
use crate::{Application, ModelApiConfig, Result};

fn default_dirs() -> Vec<String> {
    vec!["public-models".to_string()]
}

fn default_extensions() -> Vec<String> {
    vec![".config.json".to_string()]
}

fn default_nested() -> bool {
    true
}

/// Where the rest booter looks for model API configs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestBooterOptions {
    #[serde(default = "default_dirs")]
    pub dirs: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_nested")]
    pub nested: bool,
}

impl Default for RestBooterOptions {
    fn default() -> Self {
        Self {
            dirs: default_dirs(),
            extensions: default_extensions(),
            nested: default_nested(),
        }
    }
}

/// Sets up a model API for every config file found under the configured
/// directories.
#[derive(Debug, Clone)]
pub struct RestBooter {
    project_root: PathBuf,
    options: RestBooterOptions,
}

impl RestBooter {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_options(project_root, RestBooterOptions::default())
    }

    pub fn with_options(project_root: impl Into<PathBuf>, options: RestBooterOptions) -> Self {
        Self {
            project_root: project_root.into(),
            options,
        }
    }

    pub fn options(&self) -> &RestBooterOptions {
        &self.options
    }

    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        discover_files(
            &self.project_root,
            &self.options.dirs,
            &self.options.extensions,
            self.options.nested,
        )
    }

    async fn boot_file(&self, app: &Application, path: &Path) -> Result<String> {
        let text = tokio::fs::read_to_string(path).await?;
        let config: ModelApiConfig = serde_json::from_str(&text)?;
        tracing::debug!(
            model = %config.model,
            pattern = %config.pattern,
            artefact = %path.display(),
            "setting up model API"
        );
        app.setup_model_api(&config).await?;
        Ok(config.model)
    }

    pub async fn load(&self, app: &Application) -> Result<BootReport> {
        let mut report = BootReport::default();
        for path in self.discover()? {
            match self.boot_file(app, &path).await {
                Ok(model) => report.loaded.push(format!("public-models.{}", model)),
                Err(error) => report.fail(&path, error),
            }
        }
        Ok(report)
    }
}
