mod attachments;
mod services;

pub use attachments::{AttachOutcome, AttachmentTray};
pub use services::{ChatServices, ChatServicesBuilder, SendOutcome};
