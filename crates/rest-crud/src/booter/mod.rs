//! Booters discover project artefacts on disk and register them.
//!
//! A project directory looks like:
//!
//! ```text
//! datasources/db.datasource.json
//! models/product.model.json
//! public-models/product.config.json
//! ```
//!
//! Booting is resilient: an artefact that fails is logged and recorded in
//! the [`BootReport`], the remaining artefacts are still registered.

use glob::Pattern;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Application, BootError, Result};

mod datasource;
mod model;
mod rest;

pub use datasource::DataSourceBooter;
pub use model::ModelBooter;
pub use rest::{RestBooter, RestBooterOptions};

/// An artefact that could not be booted.
#[derive(Debug)]
pub struct BootFailure {
    pub artefact: PathBuf,
    pub error: BootError,
}

impl fmt::Display for BootFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.artefact.display(), self.error)
    }
}

/// Outcome of a boot phase.
#[derive(Debug, Default)]
pub struct BootReport {
    /// Names of the artefacts that were registered.
    pub loaded: Vec<String>,
    pub failures: Vec<BootFailure>,
}

impl BootReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: BootReport) {
        self.loaded.extend(other.loaded);
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, artefact: &Path, error: BootError) {
        tracing::warn!(artefact = %artefact.display(), error = %error, "failed to boot artefact");
        self.failures.push(BootFailure {
            artefact: artefact.to_path_buf(),
            error,
        });
    }
}

/// Files under `root/<dir>` ending with one of `extensions`, sorted.
pub fn discover_files(
    root: &Path,
    dirs: &[String],
    extensions: &[String],
    nested: bool,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        let base = root.join(dir);
        let base = Pattern::escape(&base.to_string_lossy());
        for extension in extensions {
            let pattern = if nested {
                format!("{}/**/*{}", base, Pattern::escape(extension))
            } else {
                format!("{}/*{}", base, Pattern::escape(extension))
            };
            for entry in glob::glob(&pattern)? {
                let path = entry?;
                if path.is_file() {
                    files.push(path);
                }
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Boot datasources, then models, then model API configs of the project at
/// `root`.
pub async fn boot_project(app: &Application, root: impl AsRef<Path>) -> Result<BootReport> {
    let root = root.as_ref();
    let mut report = DataSourceBooter::new(root).load(app).await?;
    report.merge(ModelBooter::new(root).load(app).await?);
    report.merge(RestBooter::new(root).load(app).await?);
    tracing::debug!(
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        "project booted"
    );
    Ok(report)
}
