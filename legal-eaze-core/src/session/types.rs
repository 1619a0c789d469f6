//! Conversation data structures

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role (user, assistant)
    pub role: Role,
    /// Message content
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A named, ordered sequence of messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique identifier
    pub id: String,
    /// Display label
    pub name: String,
    /// Messages in chronological order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message to the end of the conversation
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_shape() {
        let json = serde_json::to_value(Message::user("What is a contract?")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "What is a contract?"})
        );
    }

    #[test]
    fn test_conversation_accepts_missing_messages() {
        let conversation: Conversation =
            serde_json::from_str(r#"{"id":"1700000000000","name":"New Chat 1"}"#).unwrap();
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_rejects_unknown_role() {
        let result = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_push_keeps_order() {
        let mut conversation = Conversation::new("a", "New Chat 1");
        conversation.push(Message::user("q"));
        conversation.push(Message::assistant("a"));
        assert_eq!(conversation.messages[0].role, Role::User);
        assert_eq!(conversation.messages[1].role, Role::Assistant);
    }
}
