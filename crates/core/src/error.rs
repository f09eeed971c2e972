use std::path::PathBuf;
use thiserror::Error;

use crate::template::TemplateSyntaxError;

/// The error taxonomy a PhotoCopy run can surface. Template and
/// configuration errors are fatal at startup; the rest are per-file and
/// logged by the caller rather than aborting the whole pipeline.
#[derive(Debug, Error)]
pub enum PhotoCopyError {
    #[error("template syntax error: {0}")]
    TemplateSyntax(#[from] TemplateSyntaxError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read metadata for {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("access error for {path}: {source}")]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("collision error: {destination} already exists and differs from {source}")]
    Collision { source: PathBuf, destination: PathBuf },

    #[error("fatal filesystem error for {path}: {source}")]
    FilesystemFatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PhotoCopyError {
    pub fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }

    pub fn metadata(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        Self::Metadata {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Disk-full and missing/unwritable destination root errors: these
    /// should halt the apply pass rather than be skipped per file.
    pub fn filesystem_fatal(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FilesystemFatal {
            path: path.into(),
            source,
        }
    }

    /// True for errors that should abort the apply pass rather than being
    /// skipped and logged for the current file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FilesystemFatal { .. })
    }
}
