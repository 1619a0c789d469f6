//! Transport to the remote answering service
//!
//! One request per question, carrying the conversation so far; one reply
//! back. No streaming and no retries.

pub mod ask_bot;
pub mod base;

pub use ask_bot::AskBotClient;
pub use base::{AskRequest, AskResponse, ChatTransport, TransportError, TransportResult};
