//! HTTP client for the `/ask_bot` route

use async_trait::async_trait;
use legal_eaze_core::config::TransportConfig;
use legal_eaze_core::session::Message;
use legal_eaze_core::utils::preview;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::base::{AskRequest, AskResponse, ChatTransport, TransportError, TransportResult};

/// Client for the answering service
#[derive(Debug, Clone)]
pub struct AskBotClient {
    client: Client,
    url: String,
    timeout_secs: u64,
}

impl AskBotClient {
    /// Create a client posting to `url`
    ///
    /// A `timeout_secs` of 0 lets a request wait forever.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        let mut builder = Client::builder().http1_only();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }

        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            url: url.into(),
            timeout_secs,
        }
    }

    /// Create a client from the transport section of the config
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(config.url(), config.timeout_secs)
    }

    /// URL questions are posted to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout_secs)
        } else {
            TransportError::Http(err)
        }
    }
}

impl Default for AskBotClient {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

#[async_trait]
impl ChatTransport for AskBotClient {
    async fn ask(&self, history: Vec<Message>, question: String) -> TransportResult<String> {
        let request = AskRequest { history, question };

        debug!(
            "Posting question to {} with {} history messages: {}",
            self.url,
            request.history.len(),
            preview(&request.question, 80)
        );

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Answering service returned HTTP {}", status);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        let parsed: AskResponse = serde_json::from_str(&body).map_err(|e| {
            TransportError::InvalidResponse(format!("{} (body: {})", e, preview(&body, 200)))
        })?;

        debug!("Received reply: {}", preview(&parsed.response, 80));
        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_default_points_at_localhost() {
        let client = AskBotClient::default();
        assert_eq!(client.url(), "http://localhost:8080/ask_bot");
    }

    #[tokio::test]
    async fn test_ask_posts_history_and_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/ask_bot")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "conversationsNew": [{"role": "user", "content": "What is a contract?"}],
                "question": "What is a contract?",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"A contract is..."}"#)
            .create_async()
            .await;

        let client = AskBotClient::new(format!("{}/ask_bot", server.url()), 5);
        let reply = client
            .ask(
                vec![Message::user("What is a contract?")],
                "What is a contract?".to_string(),
            )
            .await
            .unwrap();

        assert_eq!(reply, "A contract is...");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask_bot")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let client = AskBotClient::new(format!("{}/ask_bot", server.url()), 5);
        let err = client
            .ask(Vec::new(), "hello".to_string())
            .await
            .unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask_bot")
            .with_status(200)
            .with_body(r#"{"answer":"wrong field"}"#)
            .create_async()
            .await;

        let client = AskBotClient::new(format!("{}/ask_bot", server.url()), 5);
        let err = client
            .ask(Vec::new(), "hello".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        // Port 9 (discard) is not served in test environments.
        let client = AskBotClient::new("http://127.0.0.1:9/ask_bot", 5);
        let err = client
            .ask(Vec::new(), "hello".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Http(_) | TransportError::Timeout(_)
        ));
    }
}
