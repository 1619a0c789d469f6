//! Base trait for the chat transport

use async_trait::async_trait;
use legal_eaze_core::session::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Request body for the question route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Conversation so far, oldest first
    #[serde(rename = "conversationsNew")]
    pub history: Vec<Message>,
    /// The question being asked
    pub question: String,
}

/// Response body from the question route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

/// Something that can answer a question given the conversation so far
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Ask `question` with `history` as context and wait for the full reply
    async fn ask(&self, history: Vec<Message>, question: String) -> TransportResult<String>;
}
