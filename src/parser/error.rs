//! Error types for bibliography loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a bibliography file.
#[derive(Debug, Error)]
pub enum BibliographyError {
    /// The file could not be read.
    #[error("cannot read bibliography {path}: {source}\n  Suggestion: check the path and file permissions")]
    Read {
        /// The bibliography path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-8.
    #[error("bibliography {path} is not valid UTF-8\n  Suggestion: re-save the file with UTF-8 encoding")]
    Encoding {
        /// The bibliography path.
        path: PathBuf,
    },
}

impl BibliographyError {
    /// Maps an IO error from reading `path`.
    #[must_use]
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::InvalidData {
            Self::Encoding { path }
        } else {
            Self::Read { path, source }
        }
    }
}
