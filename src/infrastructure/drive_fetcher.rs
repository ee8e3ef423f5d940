// Google Drive snapshot source
use crate::application::snapshot_refresher::RemoteSource;
use anyhow::Context;
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Anonymous HTTPS download of a Drive file by its opaque identifier. The
/// payload is written to a temp file next to the destination and renamed into
/// place, so readers only ever see complete snapshots.
pub struct DriveSource {
    file_id: String,
    timeout: Duration,
}

impl DriveSource {
    pub fn new(file_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            file_id: file_id.into(),
            timeout,
        }
    }

    fn download_url(&self) -> String {
        format!(
            "https://drive.google.com/uc?export=download&id={}",
            self.file_id
        )
    }
}

#[async_trait]
impl RemoteSource for DriveSource {
    async fn fetch(&self, dest: &Path) -> anyhow::Result<()> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("failed to build download client")?;

        let url = self.download_url();
        tracing::info!(%url, "downloading snapshot");
        let response = client
            .get(&url)
            .send()
            .await
            .context("snapshot download request failed")?
            .error_for_status()
            .context("snapshot host returned an error status")?;
        let body = response
            .bytes()
            .await
            .context("failed to read snapshot payload")?;

        let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir),
            None => tempfile::NamedTempFile::new_in("."),
        }
        .context("failed to create temp file for snapshot")?;
        tmp.write_all(&body)
            .context("failed to write snapshot payload")?;
        tmp.flush()?;
        tmp.persist(dest)
            .context("failed to move snapshot into place")?;

        tracing::info!(bytes = body.len(), path = %dest.display(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_url_embeds_file_id() {
        let source = DriveSource::new("abc123", Duration::from_secs(5));
        assert_eq!(
            source.download_url(),
            "https://drive.google.com/uc?export=download&id=abc123"
        );
    }
}
