//! Failure archive port - offline record of exhausted generations.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::domain::errors::DomainResult;

/// Destination for generations that ran out of attempts.
#[async_trait]
pub trait FailureArchive: Send + Sync {
    /// Persist the last raw oracle response together with the failure reason.
    ///
    /// Returns where the record was written, if anywhere.
    async fn archive(
        &self,
        kind: &str,
        reason: &str,
        raw_response: &str,
    ) -> DomainResult<Option<PathBuf>>;
}

/// Archive that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFailureArchive;

#[async_trait]
impl FailureArchive for NullFailureArchive {
    async fn archive(
        &self,
        _kind: &str,
        _reason: &str,
        _raw_response: &str,
    ) -> DomainResult<Option<PathBuf>> {
        Ok(None)
    }
}
