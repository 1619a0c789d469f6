//! Session management for conversations
//!
//! The session is the ordered list of conversations plus the selected one.
//! Every mutation is written through to storage and announced to
//! subscribers.

pub mod events;
pub mod store;
pub mod types;

pub use events::SessionEvent;
pub use store::SessionStore;
pub use types::{Conversation, Message, Role};
