use portico_core::AttachmentRef;
use uuid::Uuid;

/// Whether [`AttachmentTray::attach`] staged the document or found it
/// already present. A duplicate is informational, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Staged,
    AlreadyStaged,
}

/// Documents staged for the next outgoing message.
///
/// Ephemeral: never persisted, cleared after a successful send. Insertion
/// order is preserved so attachment badges render deterministically.
#[derive(Debug, Default)]
pub struct AttachmentTray {
    staged: Vec<AttachmentRef>,
}

impl AttachmentTray {
    pub fn attach(&mut self, document: AttachmentRef) -> AttachOutcome {
        if self.staged.iter().any(|entry| entry.id == document.id) {
            return AttachOutcome::AlreadyStaged;
        }
        self.staged.push(document);
        AttachOutcome::Staged
    }

    /// No-op when the document is not staged.
    pub fn detach(&mut self, document_id: Uuid) {
        self.staged.retain(|entry| entry.id != document_id);
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }

    pub fn staged(&self) -> &[AttachmentRef] {
        &self.staged
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }
}
