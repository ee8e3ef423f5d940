// Snapshot error taxonomy
use std::path::PathBuf;
use std::time::Duration;

/// Why a snapshot cannot be served as-is. `Stale` and `NotFound` are
/// recoverable by fetching; `Corrupt` after a fetch is a hard failure and is
/// reported distinctly from `FetchFailed`.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot not found at {0}")]
    NotFound(PathBuf),

    #[error("snapshot is {age:?} old, past the {max_age:?} limit")]
    Stale { age: Duration, max_age: Duration },

    #[error("snapshot failed integrity check: {0}")]
    Corrupt(String),

    #[error("snapshot download failed")]
    FetchFailed(#[source] anyhow::Error),

    #[error("snapshot query failed: {0}")]
    QueryFailed(String),
}

impl SnapshotError {
    /// True for conditions the refresher resolves by fetching a new copy.
    pub fn is_refetchable(&self) -> bool {
        matches!(
            self,
            SnapshotError::NotFound(_) | SnapshotError::Stale { .. } | SnapshotError::Corrupt(_)
        )
    }
}
