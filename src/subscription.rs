use crate::entity::EntityChange;
use crate::error::{IntegrationError, Result};
use tokio::sync::mpsc;

/// Receiver for entity attribute changes
///
/// Every change is queued until received; a slow consumer never loses
/// updates. Dropping the receiver unregisters the listener.
pub struct ChangeReceiver {
    rx: mpsc::UnboundedReceiver<EntityChange>,
}

impl ChangeReceiver {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<EntityChange>) -> Self {
        Self { rx }
    }

    /// Receive the next attribute change
    ///
    /// Fails with [`IntegrationError::ConnectionClosed`] once the store is gone.
    pub async fn recv(&mut self) -> Result<EntityChange> {
        self.rx.recv().await.ok_or(IntegrationError::ConnectionClosed)
    }

    /// Try to receive a change without waiting
    pub fn try_recv(&mut self) -> Result<Option<EntityChange>> {
        match self.rx.try_recv() {
            Ok(change) => Ok(Some(change)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(IntegrationError::ConnectionClosed),
        }
    }
}
