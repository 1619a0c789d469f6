//! Chat flow for legal-eaze
//!
//! This crate wires the session store to the transport: it validates a
//! question, records it, asks the remote service and files the reply (or
//! the failure) under the conversation the question came from.

pub mod service;

pub use service::{open_session, ChatService, IgnoreReason, SendOutcome, SharedSession};
