use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use portico_core::{AttachmentRef, ChatMessage};
use uuid::Uuid;

use crate::answer::AnswerService;

/// Stand-in answer service producing the canned analysis reply the portal
/// shipped before a real backend existed. Deterministic apart from message
/// ids, which makes it the client of choice for tests and offline use.
#[derive(Debug, Clone, Default)]
pub struct MockAnswerClient {
    latency: Duration,
}

impl MockAnswerClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated round-trip delay before the reply lands.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl AnswerService for MockAnswerClient {
    async fn ask(
        &self,
        text: &str,
        attachments: &[AttachmentRef],
        _conversation_id: Uuid,
    ) -> Result<ChatMessage> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let attachment_note = if attachments.is_empty() {
            String::new()
        } else {
            format!(
                "I've reviewed the {} attached document(s).",
                attachments.len()
            )
        };

        let code_block = "```json\n{\n  \"confidence\": 0.92,\n  \"analysis\": \"complete\"\n}\n```";

        Ok(ChatMessage::assistant(format!(
            "Here's my response to your query: \"{text}\"\n\n{attachment_note}\n\n## Key findings\n- Point 1\n- Point 2\n- Point 3\n\n{code_block}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use portico_core::MessageRole;

    use super::*;

    #[test]
    fn mock_reply_mentions_attachments_and_findings() {
        let client = MockAnswerClient::new();
        let attachments = vec![
            AttachmentRef::new(Uuid::new_v4(), "a.pdf"),
            AttachmentRef::new(Uuid::new_v4(), "b.pdf"),
        ];

        let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
        let reply = runtime
            .block_on(client.ask("what changed?", &attachments, Uuid::new_v4()))
            .expect("mock reply");

        assert_eq!(reply.role, MessageRole::Assistant);
        assert!(reply.content.contains("\"what changed?\""));
        assert!(reply.content.contains("2 attached document(s)"));
        assert!(reply.content.contains("## Key findings"));
        assert!(reply.content.contains("```json"));
    }

    #[test]
    fn mock_reply_skips_attachment_note_without_attachments() {
        let client = MockAnswerClient::new();
        let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
        let reply = runtime
            .block_on(client.ask("hello", &[], Uuid::new_v4()))
            .expect("mock reply");
        assert!(!reply.content.contains("attached document"));
    }
}
