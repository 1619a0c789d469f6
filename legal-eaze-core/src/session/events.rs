//! Change notifications published by the session store

use super::types::Message;

/// A change to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A conversation was created (and selected)
    Created { id: String },
    /// A conversation was removed
    Deleted { id: String },
    /// The selection changed
    Selected { id: Option<String> },
    /// A message was appended to a conversation
    MessageAppended { id: String, message: Message },
    /// A send on a conversation failed
    SendFailed { id: String, detail: String },
}

