// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Failures resolving the tabular file a searcher is bound to.
///
/// These travel inside `anyhow::Error`; callers that need to tell a missing
/// file apart from an I/O failure use `err.downcast_ref::<SourceError>()`.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{var} is not set")]
    NotConfigured { var: &'static str },

    #[error("claims file not found at {}", path.display())]
    NotFound { path: PathBuf },

    #[error("unsupported claims file format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
}

impl SourceError {
    /// True for the "source not found" condition (unset or nonexistent location).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SourceError::NotConfigured { .. } | SourceError::NotFound { .. }
        )
    }
}

/// Returns the `SourceError` carried by `err`, if any.
pub fn source_error(err: &anyhow::Error) -> Option<&SourceError> {
    err.downcast_ref::<SourceError>()
}
