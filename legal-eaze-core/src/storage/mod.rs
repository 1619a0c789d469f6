//! Persistent storage for the conversation list
//!
//! A small key-value abstraction scoped to one origin directory, plus the
//! adapter that keeps the whole conversation list under a single key.

pub mod conversations;
pub mod kv;

pub use conversations::ConversationStorage;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
