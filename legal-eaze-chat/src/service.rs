//! Send flow: the one operation that touches both the session and the network

use legal_eaze_core::config::StorageConfig;
use legal_eaze_core::session::{Message, SessionStore};
use legal_eaze_core::storage::{ConversationStorage, FileStore};
use legal_eaze_core::utils::{expand_tilde, preview};
use legal_eaze_transport::ChatTransport;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

/// Session store shared between the view and in-flight sends
pub type SharedSession = Arc<Mutex<SessionStore>>;

/// Open the on-disk session described by the storage config
pub fn open_session(config: &StorageConfig) -> SessionStore {
    let store = FileStore::new(expand_tilde(&config.dir));
    SessionStore::open(ConversationStorage::new(Arc::new(store), config.key.clone()))
}

/// Why a send did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The question was empty after trimming
    EmptyQuestion,
    /// No conversation is selected, or the selected one is gone
    NoSelection,
    /// The target conversation does not exist
    UnknownConversation,
}

/// Result of a send; failures are values, never errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The reply was appended to the conversation
    Replied {
        conversation_id: String,
        reply: String,
    },
    /// The transport failed; only the question was appended
    Failed {
        conversation_id: String,
        detail: String,
    },
    /// The conversation was deleted while the question was in flight
    Dropped { conversation_id: String },
    /// Nothing was sent
    Ignored(IgnoreReason),
}

/// Sends questions for the session over a transport
///
/// The session lock is never held across the network call, so the view can
/// keep creating, deleting and switching conversations while a question is
/// outstanding. Replies are filed by conversation id; two sends in flight
/// on the same conversation may land in either order.
///
/// Dropping a send future before it resolves cancels it. The question it
/// already appended stays.
#[derive(Clone)]
pub struct ChatService {
    session: SharedSession,
    transport: Arc<dyn ChatTransport>,
}

impl ChatService {
    /// Create a new chat service
    pub fn new(session: SharedSession, transport: Arc<dyn ChatTransport>) -> Self {
        Self { session, transport }
    }

    /// The shared session store
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Ask `question` in the selected conversation
    pub async fn send_question(&self, question: &str) -> SendOutcome {
        let target = {
            let session = self.session.lock();
            session.selected().map(|c| c.id.clone())
        };
        if question.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyQuestion);
        }
        match target {
            Some(id) => self.send_to(&id, question).await,
            None => SendOutcome::Ignored(IgnoreReason::NoSelection),
        }
    }

    /// Ask `question` in a specific conversation
    pub async fn send_to(&self, conversation_id: &str, question: &str) -> SendOutcome {
        if question.trim().is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyQuestion);
        }

        // The history sent includes the question just appended.
        let history = {
            let mut session = self.session.lock();
            if !session.append_message(conversation_id, Message::user(question)) {
                return SendOutcome::Ignored(IgnoreReason::UnknownConversation);
            }
            session
                .get(conversation_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default()
        };

        info!("Asking in {}: {}", conversation_id, preview(question, 120));

        let result = self.transport.ask(history, question.to_string()).await;

        let mut session = self.session.lock();
        match result {
            Ok(reply) => {
                if !session.append_message(conversation_id, Message::assistant(reply.clone())) {
                    warn!(
                        "Conversation {} was deleted before its reply arrived",
                        conversation_id
                    );
                    return SendOutcome::Dropped {
                        conversation_id: conversation_id.to_string(),
                    };
                }
                session.clear_send_error(conversation_id);
                info!("Reply in {}: {}", conversation_id, preview(&reply, 120));
                SendOutcome::Replied {
                    conversation_id: conversation_id.to_string(),
                    reply,
                }
            }
            Err(e) => {
                let detail = e.to_string();
                warn!("Send failed in {}: {}", conversation_id, detail);
                if session.get(conversation_id).is_some() {
                    session.record_send_error(conversation_id, detail.clone());
                }
                SendOutcome::Failed {
                    conversation_id: conversation_id.to_string(),
                    detail,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use legal_eaze_core::session::Role;
    use legal_eaze_core::storage::MemoryStore;
    use legal_eaze_transport::{AskBotClient, TransportError, TransportResult};
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    /// Replies from a script and records what it was asked
    struct ScriptedTransport {
        replies: Mutex<VecDeque<TransportResult<String>>>,
        calls: Mutex<Vec<(Vec<Message>, String)>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<TransportResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(replies: Vec<TransportResult<String>>, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(replies)
            }
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn ask(&self, history: Vec<Message>, question: String) -> TransportResult<String> {
            self.calls.lock().push((history, question));
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::InvalidResponse("script empty".into())))
        }
    }

    fn shared_session() -> SharedSession {
        let storage = ConversationStorage::new(Arc::new(MemoryStore::new()), "chats");
        Arc::new(Mutex::new(SessionStore::open(storage)))
    }

    #[tokio::test]
    async fn test_question_and_reply_are_appended_in_order() {
        let session = shared_session();
        let id = session.lock().create_conversation();
        let transport = Arc::new(ScriptedTransport::new(vec![Ok("A contract is...".into())]));
        let service = ChatService::new(session.clone(), transport.clone());

        let outcome = service.send_question("What is a contract?").await;

        assert_eq!(
            outcome,
            SendOutcome::Replied {
                conversation_id: id.clone(),
                reply: "A contract is...".to_string(),
            }
        );
        let session = session.lock();
        let messages = &session.get(&id).unwrap().messages;
        assert_eq!(
            messages,
            &vec![
                Message::user("What is a contract?"),
                Message::assistant("A contract is..."),
            ]
        );

        let calls = transport.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec![Message::user("What is a contract?")]);
        assert_eq!(calls[0].1, "What is a contract?");
    }

    #[tokio::test]
    async fn test_server_error_keeps_only_the_question() {
        let session = shared_session();
        let id = session.lock().create_conversation();
        let transport = Arc::new(ScriptedTransport::new(vec![Err(TransportError::Status {
            status: 500,
            body: "internal error".into(),
        })]));
        let service = ChatService::new(session.clone(), transport);

        let outcome = service.send_question("What is a contract?").await;

        match outcome {
            SendOutcome::Failed {
                conversation_id,
                detail,
            } => {
                assert_eq!(conversation_id, id);
                assert!(detail.contains("500"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let session = session.lock();
        assert_eq!(
            session.get(&id).unwrap().messages,
            vec![Message::user("What is a contract?")]
        );
        assert!(session.send_error(&id).unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let session = shared_session();
        let id = session.lock().create_conversation();
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError::Timeout(5)),
            Ok("Try again later.".into()),
        ]));
        let service = ChatService::new(session.clone(), transport);

        service.send_question("first").await;
        assert!(session.lock().send_error(&id).is_some());

        service.send_question("second").await;
        let session = session.lock();
        assert!(session.send_error(&id).is_none());
        let roles: Vec<Role> = session
            .get(&id)
            .unwrap()
            .messages
            .iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::User, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_no_selection_is_noop() {
        let session = shared_session();
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let service = ChatService::new(session.clone(), transport.clone());

        let outcome = service.send_question("hello").await;

        assert_eq!(outcome, SendOutcome::Ignored(IgnoreReason::NoSelection));
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_is_noop() {
        let session = shared_session();
        let id = session.lock().create_conversation();
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let service = ChatService::new(session.clone(), transport.clone());

        assert_eq!(
            service.send_question("   \n").await,
            SendOutcome::Ignored(IgnoreReason::EmptyQuestion)
        );
        assert!(session.lock().get(&id).unwrap().messages.is_empty());
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_unknown_conversation() {
        let session = shared_session();
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let service = ChatService::new(session, transport);

        assert_eq!(
            service.send_to("missing", "hello").await,
            SendOutcome::Ignored(IgnoreReason::UnknownConversation)
        );
    }

    #[tokio::test]
    async fn test_reply_lands_in_originating_conversation_after_switch() {
        let session = shared_session();
        let first = session.lock().create_conversation();
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            vec![Ok("Negligence is...".into())],
            gate.clone(),
        ));
        let service = ChatService::new(session.clone(), transport);

        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.send_question("What is negligence?").await }
        });
        tokio::task::yield_now().await;

        let second = session.lock().create_conversation();
        gate.notify_one();
        let outcome = pending.await.unwrap();

        assert!(matches!(outcome, SendOutcome::Replied { ref conversation_id, .. } if *conversation_id == first));
        let session = session.lock();
        assert_eq!(session.get(&first).unwrap().messages.len(), 2);
        assert!(session.get(&second).unwrap().messages.is_empty());
        assert_eq!(session.selected_id(), Some(second.as_str()));
    }

    #[tokio::test]
    async fn test_reply_for_deleted_conversation_is_dropped() {
        let session = shared_session();
        let id = session.lock().create_conversation();
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(vec![Ok("late".into())], gate.clone()));
        let service = ChatService::new(session.clone(), transport);

        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.send_question("hello").await }
        });
        tokio::task::yield_now().await;

        session.lock().delete_conversation(&id);
        gate.notify_one();

        assert_eq!(
            pending.await.unwrap(),
            SendOutcome::Dropped {
                conversation_id: id
            }
        );
        assert!(session.lock().is_empty());
    }

    #[tokio::test]
    async fn test_end_to_end_against_http_server() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask_bot")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "question": "How do I file a small claims lawsuit?",
            })))
            .with_status(200)
            .with_body(r#"{"response":"Start at your local court clerk."}"#)
            .create_async()
            .await;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage_config = StorageConfig {
            dir: temp_dir.path().to_string_lossy().to_string(),
            key: "chats".to_string(),
        };
        let session = Arc::new(Mutex::new(open_session(&storage_config)));
        let id = session.lock().create_conversation();
        let transport = Arc::new(AskBotClient::new(format!("{}/ask_bot", server.url()), 5));
        let service = ChatService::new(session.clone(), transport);

        let outcome = service
            .send_question("How do I file a small claims lawsuit?")
            .await;
        assert!(matches!(outcome, SendOutcome::Replied { .. }));

        let reopened = open_session(&storage_config);
        assert_eq!(reopened.get(&id).unwrap().messages.len(), 2);
    }

    #[tokio::test]
    async fn test_http_500_records_error_and_keeps_question() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/ask_bot")
            .with_status(500)
            .with_body("upstream model unavailable")
            .create_async()
            .await;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let storage_config = StorageConfig {
            dir: temp_dir.path().to_string_lossy().to_string(),
            key: "chats".to_string(),
        };
        let session = Arc::new(Mutex::new(open_session(&storage_config)));
        let id = session.lock().create_conversation();
        let transport = Arc::new(AskBotClient::new(format!("{}/ask_bot", server.url()), 5));
        let service = ChatService::new(session.clone(), transport);

        let outcome = service.send_question("Can my landlord keep my deposit?").await;

        match outcome {
            SendOutcome::Failed {
                conversation_id,
                detail,
            } => {
                assert_eq!(conversation_id, id);
                assert!(detail.contains("500"));
            }
            other => panic!("expected a failed send, got {:?}", other),
        }
        {
            let session = session.lock();
            assert_eq!(
                session.get(&id).unwrap().messages,
                vec![Message::user("Can my landlord keep my deposit?")]
            );
            assert!(session.send_error(&id).unwrap().contains("500"));
        }

        let reopened = open_session(&storage_config);
        assert_eq!(reopened.get(&id).unwrap().messages.len(), 1);
        assert_eq!(reopened.send_error(&id), None);
    }
}
