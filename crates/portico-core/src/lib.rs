pub mod chat;
pub mod markup;

pub use chat::{AttachmentRef, ChatMessage, Conversation, MessageRole, TITLE_MAX_CHARS};
pub use markup::render_markup;
