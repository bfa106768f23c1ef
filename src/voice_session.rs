//! A single voice audio stream.
//!
//! Audio chunks are fed from the connection's read loop into a bounded
//! queue and consumed by the voice handler with [`VoiceSession::next_frame`]
//! or [`VoiceSession::frames`]. Feeding never blocks: when the queue is full
//! the newest chunk is dropped.

use crate::assistant::AssistantEvent;
use crate::connection::ClientHandle;
use crate::entities::voice_assistant::AudioConfiguration;
use crate::error::Result;
use crate::protocol::{EventCategory, OutboundMessage};
use crate::types::{ClientId, EntityId, SessionId};
use futures_util::Stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Notify;

/// Default number of queued audio chunks per session
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Error cause shared between the session and its consumer
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Session key: a session id is only unique per client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceSessionKey {
    pub client: ClientId,
    pub session_id: SessionId,
}

/// Why a voice session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEndReason {
    /// Remote sent the end of the stream, or the handler completed
    Normal,
    /// No end of stream within the session timeout
    Timeout,
    /// Remote disconnected
    Remote,
    /// Ended by the driver, e.g. a new session for the same entity
    Local,
    /// The voice handler failed
    Error,
}

/// Abnormal end of a voice session as seen by the frame consumer
#[derive(Debug, Clone, Error)]
pub enum VoiceSessionClosed {
    #[error("Voice session timed out")]
    Timeout,
    #[error("Voice session closed by remote")]
    Remote,
    #[error("Voice session closed locally")]
    Local,
    #[error("Voice session failed: {0}")]
    Error(SharedError),
}

enum QueueItem {
    Data(Vec<u8>),
    End,
}

struct SessionState {
    queue: VecDeque<QueueItem>,
    closed: bool,
    reason: Option<VoiceEndReason>,
    error: Option<SharedError>,
    dropped: u64,
}

/// One voice audio stream of a voice assistant entity
pub struct VoiceSession {
    key: VoiceSessionKey,
    entity_id: EntityId,
    config: AudioConfiguration,
    client: ClientHandle,
    capacity: usize,
    state: Mutex<SessionState>,
    notify: Notify,
}

impl VoiceSession {
    pub(crate) fn new(
        client: ClientHandle,
        session_id: SessionId,
        entity_id: impl Into<EntityId>,
        config: AudioConfiguration,
        capacity: usize,
    ) -> Self {
        let capacity = capacity.max(1);
        Self {
            key: VoiceSessionKey {
                client: client.id(),
                session_id,
            },
            entity_id: entity_id.into(),
            config,
            client,
            capacity,
            state: Mutex::new(SessionState {
                queue: VecDeque::with_capacity(capacity),
                closed: false,
                reason: None,
                error: None,
                dropped: 0,
            }),
            notify: Notify::new(),
        }
    }

    pub fn key(&self) -> VoiceSessionKey {
        self.key
    }

    pub fn session_id(&self) -> SessionId {
        self.key.session_id
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Audio configuration negotiated by the `voice_start` command
    pub fn config(&self) -> AudioConfiguration {
        self.config
    }

    /// Client connection that started the session
    pub fn client(&self) -> &ClientHandle {
        &self.client
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// End reason, once the session is closed
    pub fn end_reason(&self) -> Option<VoiceEndReason> {
        self.lock().reason
    }

    /// Send an assistant event to the client that started the session
    pub fn send_event(&self, event: &AssistantEvent) -> Result<()> {
        self.client.send_event(
            OutboundMessage::AssistantEvent.as_str(),
            serde_json::to_value(event)?,
            EventCategory::Entity,
        )
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an audio chunk. Returns false if the chunk was dropped.
    pub(crate) fn feed(&self, chunk: Vec<u8>) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        if state.queue.len() >= self.capacity {
            state.dropped += 1;
            if state.dropped == 1 || state.dropped % 100 == 0 {
                tracing::debug!(
                    session = self.key.session_id,
                    entity = %self.entity_id,
                    "Voice queue full, dropped {} audio chunks",
                    state.dropped
                );
            }
            return false;
        }
        state.queue.push_back(QueueItem::Data(chunk));
        drop(state);
        self.notify.notify_one();
        true
    }

    /// End the session. Only the first call has an effect.
    ///
    /// The end marker is always queued; if the queue is full the oldest
    /// chunk is discarded to make room.
    pub(crate) fn end(&self, reason: VoiceEndReason, error: Option<SharedError>) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.reason = Some(reason);
        state.error = error;
        if state.queue.len() >= self.capacity {
            state.queue.pop_front();
        }
        state.queue.push_back(QueueItem::End);
        drop(state);
        tracing::debug!(
            session = self.key.session_id,
            entity = %self.entity_id,
            "Voice session ended: {:?}",
            reason
        );
        self.notify.notify_one();
    }

    fn terminal(state: &SessionState) -> std::result::Result<Option<Vec<u8>>, VoiceSessionClosed> {
        match state.reason {
            Some(VoiceEndReason::Timeout) => Err(VoiceSessionClosed::Timeout),
            Some(VoiceEndReason::Remote) => Err(VoiceSessionClosed::Remote),
            Some(VoiceEndReason::Local) => Err(VoiceSessionClosed::Local),
            Some(VoiceEndReason::Error) => Err(match &state.error {
                Some(cause) => VoiceSessionClosed::Error(Arc::clone(cause)),
                None => VoiceSessionClosed::Error(Arc::new(crate::error::IntegrationError::Handler(
                    "voice session failed".into(),
                ))),
            }),
            Some(VoiceEndReason::Normal) | None => Ok(None),
        }
    }

    /// Wait for the next audio chunk.
    ///
    /// Returns `Ok(None)` after a normal end of stream and
    /// [`VoiceSessionClosed`] for any other end reason.
    pub async fn next_frame(&self) -> std::result::Result<Option<Vec<u8>>, VoiceSessionClosed> {
        loop {
            {
                let mut state = self.lock();
                match state.queue.pop_front() {
                    Some(QueueItem::Data(chunk)) => return Ok(Some(chunk)),
                    Some(QueueItem::End) => return Self::terminal(&state),
                    None if state.closed => return Self::terminal(&state),
                    None => {}
                }
            }
            self.notify.notified().await;
        }
    }

    /// Audio chunks as a stream, ending after the end of the session
    pub fn frames(
        self: &Arc<Self>,
    ) -> impl Stream<Item = std::result::Result<Vec<u8>, VoiceSessionClosed>> + Send + 'static {
        futures_util::stream::unfold(Some(Arc::clone(self)), |session| async move {
            let session = session?;
            match session.next_frame().await {
                Ok(Some(chunk)) => Some((Ok(chunk), Some(session))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

impl std::fmt::Debug for VoiceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceSession")
            .field("session_id", &self.key.session_id)
            .field("client", &self.key.client)
            .field("entity_id", &self.entity_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
