//! Exchange client: how the view reaches the endpoint

use crate::api::{AskRequest, AskResponse, ErrorResponse, Message};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Endpoint returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// One request/response cycle with the exchange endpoint
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn exchange(&self, messages: &[Message]) -> Result<String, ExchangeError>;
}

/// Talks to `POST <base_url>/api/ask`
pub struct HttpExchangeClient {
    client: Client,
    endpoint: String,
}

impl HttpExchangeClient {
    pub fn new(base_url: &str) -> Result<Self, ExchangeError> {
        Self::with_timeout(base_url, Duration::from_secs(600))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/ask", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ExchangeClient for HttpExchangeClient {
    async fn exchange(&self, messages: &[Message]) -> Result<String, ExchangeError> {
        let body = AskRequest {
            messages: messages.to_vec(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Transport(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map_or(text, |err| err.error);
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<AskResponse>(&text)
            .map(|resp| resp.result)
            .map_err(|e| ExchangeError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{create_router, AppState};
    use crate::llm::{LlmError, LlmResponse};
    use crate::preamble::PreambleSource;
    use crate::testing::{serve_local, MockLlmService};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::sync::Arc;

    async fn serve_endpoint(mock: &Arc<MockLlmService>) -> String {
        let app = create_router(AppState::new(mock.clone(), PreambleSource::fallback_only()));
        serve_local(app).await
    }

    #[tokio::test]
    async fn test_exchange_round_trip_through_endpoint() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_response(LlmResponse::text("温めてください"));
        let base = serve_endpoint(&mock).await;

        let client = HttpExchangeClient::new(&base).unwrap();
        let reply = client
            .exchange(&[Message::user("冷えがあります")])
            .await
            .unwrap();

        assert_eq!(reply, "温めてください");
        assert_eq!(mock.recorded_requests()[0].messages[1].content, "冷えがあります");
    }

    #[tokio::test]
    async fn test_exchange_surfaces_error_status() {
        let mock = Arc::new(MockLlmService::new("mock"));
        mock.queue_error(LlmError::network("down"));
        let base = serve_endpoint(&mock).await;

        let client = HttpExchangeClient::new(&base).unwrap();
        let err = client.exchange(&[Message::user("q")]).await.unwrap_err();
        match err {
            ExchangeError::Status { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "AI応答に失敗しました。");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exchange_rejects_payload_without_result() {
        let app = Router::new().route(
            "/api/ask",
            post(|| async { (StatusCode::OK, r#"{"answer": "wrong field"}"#) }),
        );
        let base = serve_local(app).await;

        let client = HttpExchangeClient::new(&base).unwrap();
        let err = client.exchange(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_exchange_connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpExchangeClient::new(&format!("http://{addr}")).unwrap();
        let err = client.exchange(&[Message::user("q")]).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Transport(_)));
    }
}
