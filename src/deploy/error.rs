// ABOUTME: Error types for deploy pipeline operations.
// ABOUTME: Covers locking, extraction, promotion, and store failures.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::store::StoreError;

/// Failure while unpacking an uploaded archive.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The gzip stream or tar structure could not be read.
    #[error("malformed archive: {0}")]
    Malformed(#[source] std::io::Error),

    /// The archive decoded but contained nothing to unpack.
    #[error("archive contains no entries")]
    Empty,

    /// An entry tried to escape the target directory.
    #[error("archive entry escapes target directory: {}", .0.display())]
    PathTraversal(PathBuf),

    /// An entry type other than file, directory, or symlink.
    #[error("unsupported archive entry {kind} at {}", .path.display())]
    UnsupportedEntry { path: PathBuf, kind: String },

    /// Writing an entry to disk failed.
    #[error("failed to unpack {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while repointing `current`.
#[derive(Debug, thiserror::Error)]
pub enum PromotionError {
    /// The version directory to promote is not on disk.
    #[error("version directory missing: {}", .0.display())]
    MissingTarget(PathBuf),

    /// A symlink or rename call failed.
    #[error("failed to {step}: {source}")]
    Io {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that end a deploy pipeline invocation.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Another deploy holds the processing lock.
    #[error("deploy already in progress (running since {})", .0.started_at.format("%Y-%m-%dT%H:%M:%SZ"))]
    AlreadyInProgress(LockHolderInfo),

    /// The request carried no archive bytes.
    #[error("'archive' file is missing")]
    UploadMissing,

    /// Work root I/O failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Archive could not be extracted.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// `current` could not be repointed.
    #[error("promotion failed: {0}")]
    Promotion(#[from] PromotionError),

    /// A background task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`DeployError`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    LockHeld,
    UploadMissing,
    Store,
    Extraction,
    Promotion,
    Internal,
}

/// Who holds the lock, reported back to a rejected caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHolderInfo {
    pub started_at: DateTime<Utc>,
}

impl DeployError {
    pub fn lock_held(started_at: DateTime<Utc>) -> Self {
        DeployError::AlreadyInProgress(LockHolderInfo { started_at })
    }

    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::AlreadyInProgress(_) => DeployErrorKind::LockHeld,
            DeployError::UploadMissing => DeployErrorKind::UploadMissing,
            DeployError::Store(_) => DeployErrorKind::Store,
            DeployError::Extraction(_) => DeployErrorKind::Extraction,
            DeployError::Promotion(_) => DeployErrorKind::Promotion,
            DeployError::Internal(_) => DeployErrorKind::Internal,
        }
    }

    /// Lock holder details when the lock was already held.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::AlreadyInProgress(info) => Some(info),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for DeployError {
    fn from(err: tokio::task::JoinError) -> Self {
        DeployError::Internal(format!("deploy task failed: {}", err))
    }
}
