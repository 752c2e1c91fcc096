//! Filesystem failure archive.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::ports::FailureArchive;
use crate::infrastructure::logging::SecretScrubber;

/// Writes one `<kind>-<timestamp>-<id>.txt` file per exhausted generation.
/// Credentials echoed back by the oracle are redacted first.
#[derive(Debug, Clone)]
pub struct FileFailureArchive {
    dir: PathBuf,
}

impl FileFailureArchive {
    /// Archive writing into `dir`, created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FailureArchive for FileFailureArchive {
    async fn archive(
        &self,
        kind: &str,
        reason: &str,
        raw_response: &str,
    ) -> DomainResult<Option<PathBuf>> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let now = Utc::now();
        let path = self.dir.join(format!(
            "{kind}-{}-{}.txt",
            now.format("%Y%m%dT%H%M%S"),
            Uuid::new_v4().simple()
        ));
        let body = format!(
            "kind: {kind}\narchived_at: {}\nreason: {reason}\n\n--- raw response ---\n{raw_response}\n",
            now.to_rfc3339(),
            reason = SecretScrubber::scrub(reason),
            raw_response = SecretScrubber::scrub(raw_response),
        );
        tokio::fs::write(&path, body).await?;
        tracing::info!(path = %path.display(), kind, "Archived failed generation");
        Ok(Some(path))
    }
}
