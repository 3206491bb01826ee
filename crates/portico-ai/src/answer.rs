use anyhow::Result;
use async_trait::async_trait;
use portico_core::{AttachmentRef, ChatMessage};
use uuid::Uuid;

/// External collaborator that produces an assistant reply for a user query.
///
/// One opaque request per exchange: no streaming, no partial results, no
/// cancellation. A failure is generic and retryable; callers surface it and
/// leave conversation state untouched.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(
        &self,
        text: &str,
        attachments: &[AttachmentRef],
        conversation_id: Uuid,
    ) -> Result<ChatMessage>;
}
