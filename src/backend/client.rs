//! `SolveBackend` trait and the reqwest-based `HttpBackend`.
//!
//! `HttpBackend` posts the solve request as JSON to the configured endpoint.
//! All connection details come from [`BackendConfig`]; nothing is hardcoded.
//! The call is made exactly once: retries are the caller's decision, and the
//! pipeline never makes one.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BackendConfig;

use super::wire::{HealthStatus, SolveRequest, SolveResponse};

/// Longest slice of an error body kept in [`BackendError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur while calling the solve backend.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("backend request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("failed to parse backend response: {0}")]
    Parse(String),
}

impl BackendError {
    /// `true` when the backend was never reached or never answered.
    pub fn is_network(&self) -> bool {
        matches!(self, BackendError::Request(_) | BackendError::Timeout)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else if e.is_decode() {
            BackendError::Parse(e.to_string())
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SolveBackend trait
// ---------------------------------------------------------------------------

/// The remote solving service.
///
/// Implementors must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn SolveBackend>` with the spawned pipeline task.
#[async_trait]
pub trait SolveBackend: Send + Sync {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, BackendError>;
}

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// Calls the backend's JSON solve endpoint over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpBackend {
    /// Build an `HttpBackend` from config.
    ///
    /// The client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is used if the builder fails.
    pub fn from_config(config: &BackendConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Query the backend's health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self.client.get(self.config.health_url()).send().await?;
        decode(response).await
    }
}

#[async_trait]
impl SolveBackend for HttpBackend {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, BackendError> {
        let url = self.config.solve_url();
        log::debug!(
            "backend: POST {url} (mode={}, confidence={:.2}, hitl={})",
            request.input_mode,
            request.confidence,
            request.requires_hitl
        );

        let response = self.client.post(&url).json(request).send().await?;
        decode(response).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(BackendError::Status {
            status: status.as_u16(),
            body: body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    serde_json::from_str(&body).map_err(|e| BackendError::Parse(e.to_string()))
}

// ---------------------------------------------------------------------------
// MockBackend  (test-only)
// ---------------------------------------------------------------------------

/// A test double returning a fixed response and counting calls.
///
/// A gated mock waits on its [`Notify`](tokio::sync::Notify) before
/// answering, which keeps a run in flight for as long as a test needs.
#[cfg(test)]
pub struct MockBackend {
    response: Result<SolveResponse, BackendError>,
    gate: Option<std::sync::Arc<tokio::sync::Notify>>,
    calls: std::sync::atomic::AtomicUsize,
    last_request: std::sync::Mutex<Option<SolveRequest>>,
}

#[cfg(test)]
impl MockBackend {
    pub fn ok(response: SolveResponse) -> Self {
        Self::with_response(Ok(response))
    }

    pub fn err(error: BackendError) -> Self {
        Self::with_response(Err(error))
    }

    pub fn gated(response: SolveResponse, gate: std::sync::Arc<tokio::sync::Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::ok(response)
        }
    }

    fn with_response(response: Result<SolveResponse, BackendError>) -> Self {
        Self {
            response,
            gate: None,
            calls: std::sync::atomic::AtomicUsize::new(0),
            last_request: std::sync::Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<SolveRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl SolveBackend for MockBackend {
    async fn solve(&self, request: &SolveRequest) -> Result<SolveResponse, BackendError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.response.clone()
    }
}

/// A canned response with one agent result per stage.
#[cfg(test)]
pub fn sample_response() -> SolveResponse {
    use super::wire::{AgentResultWire, FinalAnswerWire, StepWire, VerificationWire};

    let agent = |name: &str, result: &str| AgentResultWire {
        name: name.into(),
        result: result.into(),
        timestamp: None,
    };

    SolveResponse {
        final_answer: FinalAnswerWire {
            latex: "4".into(),
            confidence: 0.95,
        },
        steps: vec![StepWire {
            step: 1,
            description: Some("Add the two numbers".into()),
            latex: "2 + 2 = 4".into(),
        }],
        verification: Some(VerificationWire {
            status: "verified".into(),
            method: Some("direct computation".into()),
        }),
        agent_trace: vec![
            "parser".into(),
            "router".into(),
            "solver".into(),
            "verifier".into(),
            "explainer".into(),
        ],
        hitl_applied: None,
        agent_results: Some(vec![
            agent("parser", "Parsed arithmetic expression"),
            agent("router", "Routed to arithmetic"),
            agent("solver", "Computed sum"),
            agent("verifier", "Verified with 95% confidence"),
            agent("explainer", "Generated explanation with 1 steps"),
        ]),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputMode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn request() -> SolveRequest {
        SolveRequest {
            text: "2+2".into(),
            input_mode: InputMode::Text,
            confidence: 1.0,
            requires_hitl: false,
        }
    }

    fn config_for(base_url: String) -> BackendConfig {
        BackendConfig {
            base_url,
            timeout_secs: 5,
            ..BackendConfig::default()
        }
    }

    /// Serve exactly one HTTP response on a local port.  Resolves the
    /// returned receiver with the raw request once it has been read.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{addr}"), rx)
    }

    #[tokio::test]
    async fn posts_json_and_parses_success() {
        let body = r#"{"finalAnswer":{"latex":"4","confidence":0.99},"steps":[],"verification":{"status":"verified","method":"arithmetic"},"agentTrace":["parser"],"hitlApplied":false}"#;
        let (base_url, seen) = serve_once("200 OK", body).await;
        let backend = HttpBackend::from_config(&config_for(base_url));

        let response = backend.solve(&request()).await.unwrap();
        assert_eq!(response.final_answer.latex, "4");
        assert_eq!(response.hitl_applied, Some(false));

        let raw = seen.await.unwrap();
        assert!(raw.starts_with("POST /api/solve "));
        assert!(raw.contains(r#""inputMode":"text""#));
        assert!(raw.contains(r#""requiresHITL":false"#));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let (base_url, _seen) =
            serve_once("500 Internal Server Error", r#"{"detail":"solver crashed"}"#).await;
        let backend = HttpBackend::from_config(&config_for(base_url));

        let err = backend.solve(&request()).await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("solver crashed"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_a_parse_error() {
        let (base_url, _seen) = serve_once("200 OK", "<html>oops</html>").await;
        let backend = HttpBackend::from_config(&config_for(base_url));

        let err = backend.solve(&request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::from_config(&config_for(format!("http://{addr}")));
        let err = backend.solve(&request()).await.unwrap_err();
        assert!(err.is_network(), "expected network error, got {err:?}");
    }

    #[tokio::test]
    async fn health_parses_status() {
        let (base_url, seen) =
            serve_once("200 OK", r#"{"status":"healthy","model":"mimo"}"#).await;
        let backend = HttpBackend::from_config(&config_for(base_url));

        let health = backend.health().await.unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.model.as_deref(), Some("mimo"));
        assert!(seen.await.unwrap().starts_with("GET /api/health "));
    }

    #[test]
    fn backend_is_object_safe() {
        let backend: Box<dyn SolveBackend> =
            Box::new(HttpBackend::from_config(&BackendConfig::default()));
        drop(backend);
    }

    #[tokio::test]
    async fn mock_counts_calls_and_records_request() {
        let mock = MockBackend::ok(sample_response());
        mock.solve(&request()).await.unwrap();
        assert_eq!(mock.calls(), 1);
        assert_eq!(mock.last_request(), Some(request()));
    }
}
