use std::{collections::HashSet, path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::Mutex;
use portico_ai::AnswerService;
use portico_core::{AttachmentRef, ChatMessage, Conversation};
use portico_store::{PorticoStore, user_namespace};
use tracing::{info, warn};
use uuid::Uuid;

use crate::attachments::{AttachOutcome, AttachmentTray};

pub struct ChatServicesBuilder {
    pub db_path: PathBuf,
    pub user_email: Option<String>,
    pub answer: Arc<dyn AnswerService>,
}

impl ChatServicesBuilder {
    pub fn new(db_path: PathBuf, answer: Arc<dyn AnswerService>) -> Self {
        Self {
            db_path,
            user_email: None,
            answer,
        }
    }

    pub fn with_user(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    pub fn build(self) -> Result<ChatServices> {
        let store = PorticoStore::open(&self.db_path)?;
        let namespace = user_namespace(self.user_email.as_deref());
        let conversations_key = format!("conversations:{namespace}");

        let stored: Vec<Conversation> = store.load_or(&conversations_key, Vec::new());
        let mut conversations = IndexMap::with_capacity(stored.len());
        for conversation in stored {
            conversations.insert(conversation.id, conversation);
        }

        // Most-recent-first list order; the head is the selection to restore.
        let active_id = conversations.keys().next().copied();

        let services = ChatServices {
            store: Arc::new(store),
            state: Arc::new(Mutex::new(ChatState {
                conversations,
                active_id,
            })),
            attachments: Arc::new(Mutex::new(AttachmentTray::default())),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            answer: self.answer,
            conversations_key,
        };

        // A user always has at least one conversation once the surface is
        // ready.
        if services.conversations().is_empty() {
            services.create_conversation()?;
        }

        Ok(services)
    }
}

struct ChatState {
    conversations: IndexMap<Uuid, Conversation>,
    active_id: Option<Uuid>,
}

/// Outcome of a send that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Empty draft with nothing staged; dropped without touching any state.
    Ignored,
    /// No conversation was active, so one was created and made active. The
    /// draft is not requeued: the caller resubmits against the new
    /// conversation.
    ConversationCreated(Uuid),
    /// An exchange is already in flight for this conversation.
    Busy,
    /// User and assistant messages both appended.
    Completed {
        user_message_id: Uuid,
        assistant_message_id: Uuid,
    },
}

/// Conversation store and message pipeline for one authenticated user.
///
/// Cheap to clone; clones share state. The persisted conversation list is
/// owned exclusively here: rendering layers read the in-memory mirror and
/// never touch the store directly.
#[derive(Clone)]
pub struct ChatServices {
    store: Arc<PorticoStore>,
    state: Arc<Mutex<ChatState>>,
    attachments: Arc<Mutex<AttachmentTray>>,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
    answer: Arc<dyn AnswerService>,
    conversations_key: String,
}

impl ChatServices {
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.lock().conversations.values().cloned().collect()
    }

    pub fn active_conversation_id(&self) -> Option<Uuid> {
        self.state.lock().active_id
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state.lock();
        state
            .active_id
            .and_then(|id| state.conversations.get(&id).cloned())
    }

    /// Create a conversation with a default title, insert it at the head of
    /// the list, and make it the active selection. Repeated calls create
    /// distinct conversations.
    pub fn create_conversation(&self) -> Result<Conversation> {
        let conversation = {
            let mut state = self.state.lock();
            let title = format!("New Conversation {}", state.conversations.len() + 1);
            let conversation = Conversation::new(title);
            state
                .conversations
                .shift_insert(0, conversation.id, conversation.clone());
            state.active_id = Some(conversation.id);
            conversation
        };

        self.persist()?;
        info!(conversation_id = %conversation.id, "conversation created");
        Ok(conversation)
    }

    pub fn select_conversation(&self, conversation_id: Uuid) -> Result<()> {
        let mut state = self.state.lock();
        if !state.conversations.contains_key(&conversation_id) {
            return Err(anyhow!("conversation not found: {conversation_id}"));
        }
        state.active_id = Some(conversation_id);
        Ok(())
    }

    pub fn attach_document(&self, document: AttachmentRef) -> AttachOutcome {
        self.attachments.lock().attach(document)
    }

    pub fn detach_document(&self, document_id: Uuid) {
        self.attachments.lock().detach(document_id);
    }

    pub fn staged_attachments(&self) -> Vec<AttachmentRef> {
        self.attachments.lock().staged().to_vec()
    }

    /// True while an exchange for `conversation_id` is outstanding. The
    /// presentation layer disables the send control off this flag.
    pub fn is_awaiting_response(&self, conversation_id: Uuid) -> bool {
        self.in_flight.lock().contains(&conversation_id)
    }

    pub fn any_exchange_in_flight(&self) -> bool {
        !self.in_flight.lock().is_empty()
    }

    /// Send against the active conversation. With nothing active, a
    /// conversation is created first and the caller resubmits the draft.
    pub async fn send_to_active(&self, draft: &str) -> Result<SendOutcome> {
        match self.active_conversation_id() {
            Some(conversation_id) => self.send_message(conversation_id, draft).await,
            None => {
                let conversation = self.create_conversation()?;
                Ok(SendOutcome::ConversationCreated(conversation.id))
            }
        }
    }

    /// Run one user/assistant exchange against `conversation_id`.
    ///
    /// The user message (with the attachments staged at call time) is
    /// appended and persisted before the answer service is awaited, so a
    /// failed exchange keeps the user's side of the conversation: the send
    /// is never rolled back, the error is surfaced as retryable.
    pub async fn send_message(&self, conversation_id: Uuid, draft: &str) -> Result<SendOutcome> {
        let staged = self.staged_attachments();
        if draft.trim().is_empty() && staged.is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(conversation_id) {
                return Ok(SendOutcome::Busy);
            }
        }

        let outcome = self.run_exchange(conversation_id, draft, staged).await;
        self.in_flight.lock().remove(&conversation_id);
        outcome
    }

    async fn run_exchange(
        &self,
        conversation_id: Uuid,
        draft: &str,
        staged: Vec<AttachmentRef>,
    ) -> Result<SendOutcome> {
        let user_message = ChatMessage::user(draft, staged.clone());
        let user_message_id = user_message.id;
        self.append_message(conversation_id, user_message)?;

        // The only suspension point: no state lock is held while the answer
        // service runs, and the conversation is re-resolved by id afterwards
        // instead of reusing a pre-await reference.
        match self.answer.ask(draft, &staged, conversation_id).await {
            Ok(assistant_message) => {
                let assistant_message_id = assistant_message.id;
                self.append_message(conversation_id, assistant_message)?;
                self.attachments.lock().clear();
                info!(conversation_id = %conversation_id, "exchange completed");
                Ok(SendOutcome::Completed {
                    user_message_id,
                    assistant_message_id,
                })
            }
            Err(error) => {
                warn!(conversation_id = %conversation_id, %error, "answer service failed");
                Err(error.context("answer service failed"))
            }
        }
    }

    fn append_message(&self, conversation_id: Uuid, message: ChatMessage) -> Result<()> {
        {
            let mut state = self.state.lock();
            let conversation = state
                .conversations
                .get_mut(&conversation_id)
                .ok_or_else(|| anyhow!("conversation not found: {conversation_id}"))?;

            if conversation.messages.is_empty() {
                conversation.title = Conversation::derive_title(&message.content);
            }
            conversation.messages.push(message);
            conversation.updated_at = Utc::now();
        }
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let snapshot = self.conversations();
        self.store
            .save(&self.conversations_key, &snapshot)
            .context("failed to persist conversation list")
    }
}
