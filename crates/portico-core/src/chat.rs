use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest first-message prefix used verbatim as a conversation title.
pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Lightweight pointer to a document owned by the portal. Messages carry
/// these by reference only and never manage document lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentRef {
    pub id: Uuid,
    pub name: String,
}

impl AttachmentRef {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One turn in a conversation. Immutable once appended: no mutating API is
/// exposed and the pipeline never edits a message after the push.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentRef>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            messages: Vec::new(),
            updated_at: Utc::now(),
            participants: None,
        }
    }

    /// Title derived from a conversation's first message: short content is
    /// used verbatim, anything longer is cut to [`TITLE_MAX_CHARS`] chars
    /// plus an ellipsis marker. Never recomputed after the first message.
    pub fn derive_title(content: &str) -> String {
        if content.trim().chars().count() <= TITLE_MAX_CHARS {
            content.to_owned()
        } else {
            let prefix: String = content.chars().take(TITLE_MAX_CHARS).collect();
            format!("{prefix}...")
        }
    }
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, attachments: Vec<AttachmentRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            content: content.into(),
            attachments,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Assistant,
            content: content.into(),
            attachments: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_becomes_title_verbatim() {
        let content = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(Conversation::derive_title(&content), content);
    }

    #[test]
    fn long_content_is_cut_with_ellipsis() {
        let content = "b".repeat(TITLE_MAX_CHARS + 1);
        let title = Conversation::derive_title(&content);
        assert_eq!(title, format!("{}...", "b".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn title_length_is_measured_on_trimmed_content() {
        let content = format!("  {}  ", "c".repeat(TITLE_MAX_CHARS));
        assert_eq!(Conversation::derive_title(&content), content);
    }

    #[test]
    fn user_message_carries_attachments() {
        let doc = AttachmentRef::new(Uuid::new_v4(), "q3-report.pdf");
        let message = ChatMessage::user("summarize this", vec![doc.clone()]);
        assert_eq!(message.role, MessageRole::User);
        assert_eq!(message.attachments, vec![doc]);
    }

    #[test]
    fn assistant_message_has_no_attachments() {
        let message = ChatMessage::assistant("done");
        assert_eq!(message.role, MessageRole::Assistant);
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn conversation_roundtrips_through_json() {
        let mut conversation = Conversation::new("New Conversation 1");
        conversation.participants = Some(vec!["analyst@example.com".to_owned()]);
        conversation
            .messages
            .push(ChatMessage::user("hello", Vec::new()));

        let json = serde_json::to_string(&conversation).expect("serialize conversation");
        let parsed: Conversation = serde_json::from_str(&json).expect("parse conversation");
        assert_eq!(parsed.id, conversation.id);
        assert_eq!(parsed.messages.len(), 1);
        assert_eq!(
            parsed.participants.as_deref(),
            Some(&["analyst@example.com".to_owned()][..])
        );
    }
}
