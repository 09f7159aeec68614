//! Addressable recipients.

use std::fmt;

use tokio::sync::mpsc;

use comms_core::RecipientId;

/// A recipient: a fresh [`RecipientId`] plus the queue its owner reads.
///
/// The owner keeps the instance; the messenger only holds a lookup entry
/// for it while registered.
pub struct Instance<T> {
    id: RecipientId,
    endpoint: mpsc::Sender<T>,
}

impl<T> Instance<T> {
    /// Mint a new recipient around `endpoint`. Not registered yet.
    pub fn new(endpoint: mpsc::Sender<T>) -> Self {
        Self {
            id: RecipientId::new(),
            endpoint,
        }
    }

    /// The recipient's identifier.
    pub fn id(&self) -> RecipientId {
        self.id
    }

    /// The delivery endpoint.
    pub fn endpoint(&self) -> &mpsc::Sender<T> {
        &self.endpoint
    }

    pub(crate) fn into_endpoint(self) -> mpsc::Sender<T> {
        self.endpoint
    }
}

impl<T> Clone for Instance<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<T> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("closed", &self.endpoint.is_closed())
            .finish()
    }
}
