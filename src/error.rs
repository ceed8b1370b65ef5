//! Error kinds raised by the package subsystem.
//!
//! Parsing APIs return [`PackageError`] directly. Repository and manager
//! operations return `anyhow::Result` and raise these values through
//! `anyhow::Error`; callers recover the kind with
//! `err.downcast_ref::<PackageError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageError {
    #[error("invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("invalid package identifier '{input}': {reason}")]
    InvalidIdentifier { input: String, reason: String },

    #[error("package name is required")]
    MissingName,

    #[error("package {id} not found in installed or available repositories")]
    Unresolved { id: String },

    #[error("conflicting versions of package {name}: {existing} and {requested}")]
    Conflict {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("repository {repository} is read-only")]
    ReadOnly { repository: String },

    #[error("storage error at {path:?}: {reason}")]
    Storage { path: PathBuf, reason: String },
}

impl PackageError {
    pub fn unresolved(id: impl Into<String>) -> Self {
        PackageError::Unresolved { id: id.into() }
    }

    pub fn read_only(repository: impl Into<String>) -> Self {
        PackageError::ReadOnly {
            repository: repository.into(),
        }
    }
}

/// Returns the [`PackageError`] carried by an `anyhow::Error`, if any.
pub fn kind_of(err: &anyhow::Error) -> Option<&PackageError> {
    err.chain().find_map(|e| e.downcast_ref::<PackageError>())
}
