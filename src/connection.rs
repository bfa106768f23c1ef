use crate::error::{IntegrationError, Result};
use crate::protocol::{filter_log_msg_data, EventCategory, EventFrame, ResponseFrame, StatusCode};
use crate::types::ClientId;
use futures_util::{Sink, SinkExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Handle to one connected remote client
///
/// Cheap to clone. All frames are queued to the connection's writer task,
/// so sending never waits on the socket.
#[derive(Clone)]
pub struct ClientHandle {
    id: ClientId,
    ws_tx: mpsc::UnboundedSender<Message>,
}

impl ClientHandle {
    pub(crate) fn new(ws_tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id: ClientId::new(),
            ws_tx,
        }
    }

    /// Spawn the writer task forwarding queued frames into the socket sink
    pub(crate) fn spawn_writer<S>(mut write: S) -> (Self, JoinHandle<()>)
    where
        S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin + Send + 'static,
    {
        let (ws_tx, mut ws_rx) = mpsc::unbounded_channel::<Message>();
        let handle = Self::new(ws_tx);
        let id = handle.id;

        let writer = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    tracing::error!(client = %id, "Failed to send message: {}", e);
                    break;
                }
            }
            let _ = write.close().await;
        });

        (handle, writer)
    }

    /// Connection identifier
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// True while the writer task still accepts frames
    pub fn is_connected(&self) -> bool {
        !self.ws_tx.is_closed()
    }

    /// Queue a raw WebSocket message
    pub(crate) fn send(&self, msg: Message) -> Result<()> {
        self.ws_tx
            .send(msg)
            .map_err(|_| IntegrationError::ConnectionClosed)
    }

    /// Serialize and queue a JSON text frame
    pub(crate) fn send_json<T: Serialize>(&self, frame: &T) -> Result<()> {
        let value = serde_json::to_value(frame)?;
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(client = %self.id, "->: {}", filter_log_msg_data(&value));
        }
        self.send(Message::Text(value.to_string()))
    }

    /// Send a correlated response
    pub(crate) fn send_response(
        &self,
        req_id: u32,
        code: StatusCode,
        msg: &str,
        msg_data: Value,
    ) -> Result<()> {
        self.send_json(&ResponseFrame::new(req_id, code, msg, msg_data))
    }

    /// Send an event to this client only
    pub(crate) fn send_event(&self, msg: &str, msg_data: Value, cat: EventCategory) -> Result<()> {
        self.send_json(&EventFrame::new(msg, msg_data, cat))
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClientHandle {}

impl Hash for ClientHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_is_queued_as_text() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ClientHandle::new(tx);
        client
            .send_response(1, StatusCode::Ok, "result", json!({}))
            .unwrap();

        let Ok(Message::Text(text)) = rx.try_recv() else {
            panic!("expected text frame");
        };
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "resp");
        assert_eq!(value["req_id"], 1);
        assert_eq!(value["code"], 200);
    }

    #[test]
    fn send_after_writer_gone_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = ClientHandle::new(tx);
        drop(rx);
        assert!(!client.is_connected());
        assert!(matches!(
            client.send_event("device_state", json!({}), EventCategory::Device),
            Err(IntegrationError::ConnectionClosed)
        ));
    }

    #[test]
    fn handles_compare_by_id() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let a = ClientHandle::new(tx.clone());
        let b = ClientHandle::new(tx);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
