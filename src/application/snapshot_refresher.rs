// Snapshot refresher - Keeps the local SQLite replica fresh enough to query
use crate::error::SnapshotError;
use crate::infrastructure::sqlite_snapshot::verify_integrity;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Source of replacement snapshot files. Implementations must write the
/// payload atomically (temp file + rename) so a concurrent reader never
/// observes a partial snapshot.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch(&self, dest: &Path) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Local file was fresh and valid; no network call happened.
    AlreadyFresh,
    /// A new copy was fetched and passed the integrity check.
    Refreshed,
}

pub struct SnapshotRefresher {
    path: PathBuf,
    table: String,
    max_age: Duration,
    source: Arc<dyn RemoteSource>,
}

impl SnapshotRefresher {
    pub fn new(
        path: impl Into<PathBuf>,
        table: impl Into<String>,
        max_age: Duration,
        source: Arc<dyn RemoteSource>,
    ) -> Self {
        Self {
            path: path.into(),
            table: table.into(),
            max_age,
            source,
        }
    }

    /// Classify the current local file: Ok when it is young enough and passes
    /// the integrity check, otherwise the reason a fetch is required.
    /// Freshness is checked before integrity; a stale-but-valid file still
    /// triggers a fetch.
    fn assess(&self) -> Result<(), SnapshotError> {
        let meta = fs::metadata(&self.path)
            .map_err(|_| SnapshotError::NotFound(self.path.clone()))?;
        let age = meta
            .modified()
            .ok()
            .and_then(|t| t.elapsed().ok())
            .unwrap_or(Duration::MAX);
        if age >= self.max_age {
            return Err(SnapshotError::Stale {
                age,
                max_age: self.max_age,
            });
        }
        verify_integrity(&self.path, &self.table).map(|_| ())
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".download");
        PathBuf::from(staging)
    }

    /// Fetch a new snapshot if the local one is missing, stale, or corrupt.
    /// The download lands in a staging file and must pass the integrity
    /// check before it replaces the snapshot, so neither a network failure
    /// nor a corrupt payload (a Drive error page, say) ever destroys the
    /// last-known-good file.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SnapshotError> {
        match self.assess() {
            Ok(()) => return Ok(RefreshOutcome::AlreadyFresh),
            Err(reason) => {
                tracing::info!(path = %self.path.display(), %reason, "snapshot needs refresh");
            }
        }

        let staging = self.staging_path();
        self.source
            .fetch(&staging)
            .await
            .map_err(SnapshotError::FetchFailed)?;

        let rows = match verify_integrity(&staging, &self.table) {
            Ok(rows) => rows,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }
        };
        fs::rename(&staging, &self.path)
            .map_err(|e| SnapshotError::FetchFailed(anyhow::anyhow!(e)))?;

        tracing::info!(path = %self.path.display(), rows, "snapshot refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// Boolean contract for the serving layer: `false` means "serve with
    /// last-known-good data if any, else show an unavailable state".
    pub async fn ensure_fresh(&self) -> bool {
        match self.refresh().await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "snapshot refresh failed");
                false
            }
        }
    }
}
