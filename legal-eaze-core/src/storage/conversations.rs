//! Conversation list persistence

use super::kv::KeyValueStore;
use crate::session::Conversation;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default key holding the serialized conversation list
pub const DEFAULT_KEY: &str = "chats";

/// Reads and writes the full conversation list under one key
#[derive(Clone)]
pub struct ConversationStorage {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl ConversationStorage {
    /// Create an adapter over `store` using `key`
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Key the list is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted list
    ///
    /// Absent, unreadable or undecodable data all load as an empty list.
    pub fn load(&self) -> Vec<Conversation> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read stored conversations: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                conversations
            }
            Err(e) => {
                warn!("Stored conversations are not decodable, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Replace the persisted list with `conversations`
    pub fn save(&self, conversations: &[Conversation]) -> crate::Result<()> {
        let raw = serde_json::to_string(conversations)?;
        self.store.set(&self.key, &raw)?;
        debug!("Saved {} conversations", conversations.len());
        Ok(())
    }
}

impl std::fmt::Debug for ConversationStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStorage")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::TempDir;

    fn sample() -> Vec<Conversation> {
        let mut first = Conversation::new("1700000000000", "New Chat 1");
        first.push(Message::user("What is a contract?"));
        first.push(Message::assistant("A contract is..."));
        let second = Conversation::new("1700000000001", "New Chat 2");
        vec![first, second]
    }

    #[test]
    fn test_load_absent_is_empty() {
        let storage = ConversationStorage::new(Arc::new(MemoryStore::new()), DEFAULT_KEY);
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let storage = ConversationStorage::new(Arc::new(FileStore::new(temp_dir.path())), "chats");

        let conversations = sample();
        storage.save(&conversations).unwrap();

        assert_eq!(storage.load(), conversations);
    }

    #[test]
    fn test_load_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let storage = ConversationStorage::new(store, DEFAULT_KEY);
        storage.save(&sample()).unwrap();

        let first = storage.load();
        let second = storage.load();
        assert_eq!(first, second);
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(DEFAULT_KEY, "{not json").unwrap();
        let storage = ConversationStorage::new(store, DEFAULT_KEY);
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_reads_browser_shaped_blob() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                DEFAULT_KEY,
                r#"[{"id":"1717171717171","name":"New Chat 1","messages":[{"role":"user","content":"hi"}]}]"#,
            )
            .unwrap();
        let storage = ConversationStorage::new(store, DEFAULT_KEY);

        let loaded = storage.load();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].messages, vec![Message::user("hi")]);
    }
}
