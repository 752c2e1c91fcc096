//! Mock oracle for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::ports::{HealthStatus, LlmOracle, OracleError, OracleRequest, OracleResponse};

/// Mock response configuration.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Output text
    pub output: String,
    /// Whether to simulate failure
    pub fail: bool,
    /// Error message if failing
    pub error_message: Option<String>,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            output: "{}".to_string(),
            fail: false,
            error_message: None,
        }
    }
}

impl MockResponse {
    /// Response that returns `output`
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            ..Default::default()
        }
    }

    /// Response that fails with `error`
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            fail: true,
            error_message: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Scripted oracle.
///
/// Queued responses are served in order; once the queue is drained every
/// call gets the default response. Every request is recorded.
pub struct MockOracle {
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
    default_response: MockResponse,
    requests: Arc<Mutex<Vec<OracleRequest>>>,
}

impl MockOracle {
    /// Mock that answers `{}` to every call
    pub fn new() -> Self {
        Self::with_default_response(MockResponse::default())
    }

    /// Mock returning `response` once the queue is empty
    pub fn with_default_response(response: MockResponse) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            default_response: response,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Oracle that answers `outputs` in order, then fails.
    pub fn scripted<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let oracle = Self::with_default_response(MockResponse::failure("mock script exhausted"));
        let queue: VecDeque<MockResponse> = outputs.into_iter().map(MockResponse::success).collect();
        Self {
            queue: Arc::new(Mutex::new(queue)),
            ..oracle
        }
    }

    /// Queue a response for the next call
    pub async fn push_response(&self, response: MockResponse) {
        self.queue.lock().await.push_back(response);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of calls made so far
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmOracle for MockOracle {
    fn oracle_id(&self) -> &'static str {
        "mock"
    }

    fn oracle_name(&self) -> &'static str {
        "Mock Oracle"
    }

    async fn generate(&self, request: OracleRequest) -> Result<OracleResponse, OracleError> {
        self.requests.lock().await.push(request);

        let response = self
            .queue
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone());

        if response.fail {
            return Err(OracleError::ExecutionFailed(
                response
                    .error_message
                    .unwrap_or_else(|| "Mock failure".to_string()),
            ));
        }
        Ok(OracleResponse::text(response.output))
    }

    async fn health_check(&self) -> Result<HealthStatus, OracleError> {
        Ok(HealthStatus::Healthy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_then_failure() {
        let oracle = MockOracle::scripted(["one", "two"]);
        let req = || OracleRequest::new("sys", "user");

        assert_eq!(oracle.generate(req()).await.unwrap().content, "one");
        assert_eq!(oracle.generate(req()).await.unwrap().content, "two");
        assert!(matches!(
            oracle.generate(req()).await,
            Err(OracleError::ExecutionFailed(_))
        ));
        assert_eq!(oracle.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_default_response_repeats() {
        let oracle = MockOracle::with_default_response(MockResponse::success("same"));
        for _ in 0..3 {
            let resp = oracle.generate(OracleRequest::new("s", "u")).await.unwrap();
            assert_eq!(resp.content, "same");
        }
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let oracle = MockOracle::new();
        oracle.push_response(MockResponse::failure("boom")).await;
        let _ = oracle.generate(OracleRequest::new("system", "first")).await;
        let requests = oracle.requests().await;
        assert_eq!(requests[0].system_prompt, "system");
        assert_eq!(requests[0].user_prompt, "first");
    }
}
