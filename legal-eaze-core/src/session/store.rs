//! In-memory session store with write-through persistence

use super::events::SessionEvent;
use super::types::{Conversation, Message};
use crate::storage::ConversationStorage;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

/// Conversations plus the selected one, persisted after every mutation
pub struct SessionStore {
    storage: ConversationStorage,
    conversations: Vec<Conversation>,
    selected: Option<String>,
    /// Last failed send per conversation; never persisted
    send_errors: HashMap<String, String>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// Open the store, loading whatever `storage` currently holds
    pub fn open(storage: ConversationStorage) -> Self {
        let conversations = storage.load();
        info!(
            "Session opened with {} conversations (key: {})",
            conversations.len(),
            storage.key()
        );
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            conversations,
            selected: None,
            send_errors: HashMap::new(),
            events,
        }
    }

    /// Receive every subsequent change to the session
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Create a conversation, select it and return its id
    ///
    /// The label counts from the current list length, so after deletions a
    /// new label can repeat an existing one.
    pub fn create_conversation(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        let name = format!("New Chat {}", self.conversations.len() + 1);
        debug!("Creating conversation {} ({})", id, name);

        self.conversations.push(Conversation::new(id.clone(), name));
        self.selected = Some(id.clone());
        self.persist();

        self.publish(SessionEvent::Created { id: id.clone() });
        self.publish(SessionEvent::Selected {
            id: Some(id.clone()),
        });
        id
    }

    /// Remove a conversation; clears the selection if it was selected
    ///
    /// Returns whether a conversation was removed.
    pub fn delete_conversation(&mut self, id: &str) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id != id);
        let removed = self.conversations.len() != before;

        self.send_errors.remove(id);
        let was_selected = self.selected.as_deref() == Some(id);
        if was_selected {
            self.selected = None;
        }

        if removed {
            debug!("Deleted conversation {}", id);
            self.persist();
            self.publish(SessionEvent::Deleted { id: id.to_string() });
        }
        if was_selected {
            self.publish(SessionEvent::Selected { id: None });
        }
        removed
    }

    /// Set or clear the active conversation
    ///
    /// The id is not checked; an unknown id reads back as no selection.
    pub fn select_conversation(&mut self, id: Option<&str>) {
        self.selected = id.map(ToString::to_string);
        self.publish(SessionEvent::Selected {
            id: self.selected.clone(),
        });
    }

    /// Append a message to a conversation, selected or not
    ///
    /// Returns false if no conversation has that id.
    pub fn append_message(&mut self, conversation_id: &str, message: Message) -> bool {
        let Some(conversation) = self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            warn!(
                "Dropping {} message for missing conversation {}",
                message.role, conversation_id
            );
            return false;
        };

        conversation.push(message.clone());
        self.persist();
        self.publish(SessionEvent::MessageAppended {
            id: conversation_id.to_string(),
            message,
        });
        true
    }

    /// All conversations in insertion order
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Look up a conversation by id
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    /// The selected id as set, whether or not it still exists
    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// The selected conversation, if the selection points at one
    pub fn selected(&self) -> Option<&Conversation> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Remember that the last send on `id` failed
    pub fn record_send_error(&mut self, id: &str, detail: impl Into<String>) {
        let detail = detail.into();
        self.send_errors.insert(id.to_string(), detail.clone());
        self.publish(SessionEvent::SendFailed {
            id: id.to_string(),
            detail,
        });
    }

    /// Detail of the last failed send on `id`
    pub fn send_error(&self, id: &str) -> Option<&str> {
        self.send_errors.get(id).map(String::as_str)
    }

    pub fn clear_send_error(&mut self, id: &str) {
        self.send_errors.remove(id);
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.conversations) {
            warn!("Failed to persist conversations: {}", e);
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("conversations", &self.conversations.len())
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}
