//! Transport collaborator used by dashboard code to reach the engine.
//!
//! The dashboard never calls the detectors directly; it holds a
//! [`DashboardClient`] over some [`AnalysisTransport`]. Production code uses
//! [`HttpTransport`] against a running service or [`InProcessTransport`] when
//! embedded; tests substitute their own deterministic transport.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::analysis::AnalysisService;
use crate::model::{AnalysisResult, AnalyzeRequest, Filters, RawEvent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("analysis request carried no events")]
    EmptyBatch,
    #[error("analysis service returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Something that can carry an analyze request to the engine and back.
#[async_trait::async_trait]
pub trait AnalysisTransport: Send + Sync {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ClientError>;
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Posts to `<base_url>/api/v1/analyze`.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/v1/analyze", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for HttpTransport {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ClientError> {
        debug!(endpoint = %self.endpoint, "posting analysis request");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<AnalysisResult>()
                .await
                .map_err(|e| ClientError::Transport(e.to_string()));
        }
        if status == StatusCode::BAD_REQUEST {
            return Err(ClientError::EmptyBatch);
        }

        let message = resp
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

// ---------------------------------------------------------------------------
// In-process
// ---------------------------------------------------------------------------

/// Calls the engine directly, with the same empty-batch rule as the HTTP boundary.
#[derive(Debug, Clone, Default)]
pub struct InProcessTransport {
    service: AnalysisService,
}

impl InProcessTransport {
    pub fn new(service: AnalysisService) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl AnalysisTransport for InProcessTransport {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ClientError> {
        if request.is_empty() {
            return Err(ClientError::EmptyBatch);
        }
        let events = request.events.as_deref().unwrap_or_default();
        let filters = request.filters.clone().unwrap_or_default();
        Ok(self.service.analyze(events, &filters))
    }
}

// ---------------------------------------------------------------------------
// Dashboard-facing client
// ---------------------------------------------------------------------------

pub struct DashboardClient<T> {
    transport: T,
}

impl<T: AnalysisTransport> DashboardClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Fetch findings for a batch. An empty batch never leaves the process.
    pub async fn fetch_analysis(
        &self,
        events: Vec<RawEvent>,
        filters: Filters,
    ) -> Result<AnalysisResult, ClientError> {
        if events.is_empty() {
            return Ok(AnalysisResult::default());
        }
        self.transport
            .analyze(&AnalyzeRequest::new(events, filters))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TrendDirection, TrendFinding};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a canned result and counts calls.
    struct FakeTransport {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AnalysisTransport for FakeTransport {
        async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let driver = request.events.as_ref().unwrap()[0].driver_id.clone().unwrap();
            Ok(AnalysisResult {
                patterns: vec![],
                trends: vec![TrendFinding {
                    driver_id: driver,
                    direction: TrendDirection::Stable,
                    change: 0.0,
                    significance: 0.0,
                }],
            })
        }
    }

    fn one_event() -> RawEvent {
        RawEvent {
            id: Some("e1".into()),
            driver_id: Some("DRV-9".into()),
            depot_id: Some("MUC1".into()),
            timestamp: Some("2024-01-05T10:00:00Z".into()),
            is_concession: serde_json::Value::Bool(true),
            kind: Some("neighbor".into()),
        }
    }

    #[test]
    fn test_empty_batch_short_circuits() {
        let client = DashboardClient::new(FakeTransport {
            calls: AtomicUsize::new(0),
        });
        let result = tokio_test::block_on(client.fetch_analysis(vec![], Filters::default())).unwrap();
        assert!(result.is_empty());
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_delegates_to_transport() {
        let client = DashboardClient::new(FakeTransport {
            calls: AtomicUsize::new(0),
        });
        let result =
            tokio_test::block_on(client.fetch_analysis(vec![one_event()], Filters::default())).unwrap();
        assert_eq!(result.trends[0].driver_id, "DRV-9");
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_process_transport() {
        let transport = InProcessTransport::default();

        let err = transport.analyze(&AnalyzeRequest::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::EmptyBatch));

        let req = AnalyzeRequest::new(vec![one_event()], Filters::default());
        let result = transport.analyze(&req).await.unwrap();
        assert_eq!(result.trends.len(), 1);
        assert_eq!(result.patterns.len(), 2);
    }

    #[test]
    fn test_http_endpoint_normalised() {
        let t = HttpTransport::new("http://localhost:8080/").unwrap();
        assert_eq!(t.endpoint(), "http://localhost:8080/api/v1/analyze");
    }

    #[tokio::test]
    async fn test_http_transport_unreachable() {
        let t = HttpTransport::new("http://127.0.0.1:1").unwrap();
        let req = AnalyzeRequest::new(vec![one_event()], Filters::default());
        let err = t.analyze(&req).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
