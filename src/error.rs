//! Error taxonomy.
//!
//! Operations return `anyhow::Result`; the variants below are attached as
//! context so callers can tell the failure classes apart with
//! `err.downcast_ref::<Error>()`.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid project configuration. Fatal before any install proceeds.
    #[error("Invalid configuration: {message}")]
    Config { message: String },

    /// Update or uninstall requested for a package the project does not have.
    #[error("Package is not installed: {package}")]
    NotInstalled { package: String },

    /// A filesystem step of an install or uninstall failed. Not retried.
    #[error("Unable to {action}: {}", path.display())]
    Filesystem { action: &'static str, path: PathBuf },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    pub fn not_installed(package: impl std::fmt::Display) -> Self {
        Error::NotInstalled {
            package: package.to_string(),
        }
    }

    pub fn filesystem(action: &'static str, path: impl Into<PathBuf>) -> Self {
        Error::Filesystem {
            action,
            path: path.into(),
        }
    }
}
