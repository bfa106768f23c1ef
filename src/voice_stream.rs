//! Voice session registry and binary frame handling.
//!
//! Sessions are created by the `voice_start` entity command and keyed by
//! (client, session id). At most one session exists per entity. Each session
//! gets a timeout watchdog when it is created; the voice handler runs as its
//! own task once the remote sent a matching begin message.

use crate::connection::ClientHandle;
use crate::entities::voice_assistant::AudioConfiguration;
use crate::error::{BoxError, IntegrationError};
use crate::proto::{self, integration_message};
use crate::types::{ClientId, EntityId, SessionId};
use crate::voice_session::{
    SharedError, VoiceEndReason, VoiceSession, VoiceSessionKey, DEFAULT_QUEUE_CAPACITY,
};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Default lifetime of a voice session
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

type HandlerFn = dyn Fn(Arc<VoiceSession>) -> BoxFuture<'static, std::result::Result<(), BoxError>> + Send + Sync;

/// Driver callback consuming the audio of a voice session
#[derive(Clone)]
pub struct VoiceStreamHandler(Arc<HandlerFn>);

impl VoiceStreamHandler {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<VoiceSession>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |session| Box::pin(handler(session))))
    }
}

impl fmt::Debug for VoiceStreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VoiceStreamHandler")
    }
}

struct SessionEntry {
    session: Arc<VoiceSession>,
    handler: VoiceStreamHandler,
    watchdog: Option<AbortHandle>,
    started: bool,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<VoiceSessionKey, SessionEntry>,
    by_entity: HashMap<EntityId, VoiceSessionKey>,
}

impl Registry {
    /// Remove a session from both indexes
    fn take(&mut self, key: &VoiceSessionKey) -> Option<SessionEntry> {
        let entry = self.sessions.remove(key)?;
        if self.by_entity.get(entry.session.entity_id()) == Some(key) {
            self.by_entity.remove(entry.session.entity_id());
        }
        Some(entry)
    }

    fn is_current(&self, session: &Arc<VoiceSession>) -> bool {
        self.sessions
            .get(&session.key())
            .is_some_and(|entry| Arc::ptr_eq(&entry.session, session))
    }
}

struct Shared {
    registry: Mutex<Registry>,
    handler: Mutex<Option<VoiceStreamHandler>>,
    timeout: Duration,
    capacity: usize,
}

/// Voice session manager of the gateway
#[derive(Clone)]
pub(crate) struct VoiceStreams {
    shared: Arc<Shared>,
}

impl VoiceStreams {
    pub(crate) fn new(timeout: Duration, capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                handler: Mutex::new(None),
                timeout,
                capacity,
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.shared
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_handler(&self, handler: Option<VoiceStreamHandler>) {
        *self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = handler;
    }

    /// Active session of an entity
    pub(crate) fn session_for_entity(&self, entity_id: &str) -> Option<Arc<VoiceSession>> {
        let registry = self.registry();
        let key = registry.by_entity.get(entity_id)?;
        registry.sessions.get(key).map(|e| Arc::clone(&e.session))
    }

    #[cfg(test)]
    pub(crate) fn session_count(&self) -> usize {
        self.registry().sessions.len()
    }

    /// Create a session for a `voice_start` command.
    ///
    /// Returns `None` if no voice handler is registered. An existing session
    /// of the same entity, or with the same key, is ended locally first.
    pub(crate) fn create(
        &self,
        client: &ClientHandle,
        entity_id: &str,
        session_id: SessionId,
        config: AudioConfiguration,
    ) -> Option<Arc<VoiceSession>> {
        let Some(handler) = self
            .shared
            .handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        else {
            tracing::warn!(
                entity = %entity_id,
                "No voice stream handler registered: ignoring voice session {}",
                session_id
            );
            return None;
        };

        let session = Arc::new(VoiceSession::new(
            client.clone(),
            session_id,
            entity_id,
            config,
            self.shared.capacity,
        ));
        let key = session.key();

        let mut preempted = Vec::new();
        {
            let mut registry = self.registry();
            if let Some(old_key) = registry.by_entity.get(entity_id).copied() {
                preempted.extend(registry.take(&old_key));
            }
            preempted.extend(registry.take(&key));

            let watchdog = {
                let streams = self.clone();
                let session = Arc::clone(&session);
                let timeout = self.shared.timeout;
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    streams.on_timeout(&session);
                })
                .abort_handle()
            };
            registry.sessions.insert(
                key,
                SessionEntry {
                    session: Arc::clone(&session),
                    handler,
                    watchdog: Some(watchdog),
                    started: false,
                },
            );
            registry.by_entity.insert(entity_id.to_string(), key);
        }

        for entry in preempted {
            tracing::info!(
                entity = %entry.session.entity_id(),
                "Ending voice session {} for new session {}",
                entry.session.session_id(),
                session_id
            );
            Self::finish(entry, VoiceEndReason::Local, None);
        }

        tracing::info!(
            client = %client.id(),
            entity = %entity_id,
            "Voice session {} created: {:?}",
            session_id,
            config
        );
        Some(session)
    }

    /// Cancel the watchdog and end a session that was already taken out of the registry
    fn finish(entry: SessionEntry, reason: VoiceEndReason, error: Option<SharedError>) {
        if let Some(watchdog) = entry.watchdog {
            watchdog.abort();
        }
        entry.session.end(reason, error);
    }

    /// Discard a session whose `voice_start` command was rejected
    pub(crate) fn discard(&self, session: &Arc<VoiceSession>) {
        let entry = {
            let mut registry = self.registry();
            if !registry.is_current(session) {
                return;
            }
            registry.take(&session.key())
        };
        if let Some(entry) = entry {
            Self::finish(entry, VoiceEndReason::Local, None);
        }
    }

    /// Handle one binary WebSocket message of a client
    pub(crate) fn handle_binary(&self, client: &ClientHandle, data: &[u8]) {
        let message = match proto::decode_frame(data) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(client = %client.id(), "Invalid binary message: {}", e);
                return;
            }
        };
        match message.message {
            Some(integration_message::Message::VoiceBegin(begin)) => self.on_begin(client.id(), begin),
            Some(integration_message::Message::VoiceData(data)) => self.on_data(client.id(), data),
            Some(integration_message::Message::VoiceEnd(end)) => self.on_end(client.id(), end),
            None => {
                tracing::warn!(client = %client.id(), "Binary message without payload");
            }
        }
    }

    fn on_begin(&self, client: ClientId, begin: proto::RemoteVoiceBegin) {
        let key = VoiceSessionKey {
            client,
            session_id: begin.session_id,
        };
        let mut registry = self.registry();
        let Some(entry) = registry.sessions.get_mut(&key) else {
            tracing::warn!(client = %client, "Voice begin for unknown session {}", begin.session_id);
            return;
        };
        if entry.started {
            tracing::debug!(client = %client, "Duplicate voice begin for session {}", begin.session_id);
            return;
        }

        let received = AudioConfiguration::from_proto(&begin.configuration.unwrap_or_default());
        let expected = entry.session.config();
        if received != expected {
            tracing::warn!(
                client = %client,
                "Voice begin of session {} ignored: audio configuration {:?} does not match {:?}",
                begin.session_id,
                received,
                expected
            );
            return;
        }

        entry.started = true;
        self.spawn_handler(entry.handler.clone(), Arc::clone(&entry.session));
    }

    fn on_data(&self, client: ClientId, data: proto::RemoteVoiceData) {
        let key = VoiceSessionKey {
            client,
            session_id: data.session_id,
        };
        let session = self
            .registry()
            .sessions
            .get(&key)
            .map(|entry| Arc::clone(&entry.session));
        match session {
            Some(session) => {
                session.feed(data.samples);
            }
            None => {
                tracing::debug!(client = %client, "Voice data for unknown session {}", data.session_id);
            }
        }
    }

    fn on_end(&self, client: ClientId, end: proto::RemoteVoiceEnd) {
        let key = VoiceSessionKey {
            client,
            session_id: end.session_id,
        };
        let Some(entry) = self.registry().take(&key) else {
            tracing::warn!(client = %client, "Voice end for unknown session {}", end.session_id);
            return;
        };
        if !entry.started {
            self.spawn_handler(entry.handler.clone(), Arc::clone(&entry.session));
        }
        Self::finish(entry, VoiceEndReason::Normal, None);
    }

    fn on_timeout(&self, session: &Arc<VoiceSession>) {
        let entry = {
            let mut registry = self.registry();
            if !registry.is_current(session) {
                return;
            }
            registry.take(&session.key())
        };
        let Some(mut entry) = entry else {
            return;
        };
        tracing::info!(
            entity = %session.entity_id(),
            "Voice session {} timed out",
            session.session_id()
        );
        // this task is the watchdog
        entry.watchdog = None;
        if !entry.started {
            self.spawn_handler(entry.handler.clone(), Arc::clone(&entry.session));
        }
        Self::finish(entry, VoiceEndReason::Timeout, None);
    }

    /// End all sessions of a disconnected client
    pub(crate) fn client_disconnected(&self, client: ClientId) {
        let entries: Vec<SessionEntry> = {
            let mut registry = self.registry();
            let keys: Vec<VoiceSessionKey> = registry
                .sessions
                .keys()
                .filter(|key| key.client == client)
                .copied()
                .collect();
            keys.iter().filter_map(|key| registry.take(key)).collect()
        };
        for entry in entries {
            tracing::debug!(client = %client, "Ending voice session {}", entry.session.session_id());
            Self::finish(entry, VoiceEndReason::Remote, None);
        }
    }

    /// End every session, used when the gateway stops
    pub(crate) fn shutdown(&self) {
        let entries: Vec<SessionEntry> = {
            let mut registry = self.registry();
            registry.by_entity.clear();
            registry.sessions.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            Self::finish(entry, VoiceEndReason::Local, None);
        }
    }

    /// Run the voice handler as its own task and end the session with its outcome
    fn spawn_handler(&self, handler: VoiceStreamHandler, session: Arc<VoiceSession>) {
        let streams = self.clone();
        tokio::spawn(async move {
            let call = {
                let session = Arc::clone(&session);
                async move { (handler.0)(session).await }
            };
            match AssertUnwindSafe(call).catch_unwind().await {
                Ok(Ok(())) => session.end(VoiceEndReason::Normal, None),
                Ok(Err(e)) => {
                    tracing::error!(
                        entity = %session.entity_id(),
                        "Voice handler of session {} failed: {}",
                        session.session_id(),
                        e
                    );
                    session.end(VoiceEndReason::Error, Some(Arc::from(e)));
                }
                Err(panic) => {
                    let e = IntegrationError::from_panic(&*panic);
                    tracing::error!(
                        entity = %session.entity_id(),
                        "Voice handler of session {} panicked: {}",
                        session.session_id(),
                        e
                    );
                    session.end(VoiceEndReason::Error, Some(Arc::new(e)));
                }
            }
            streams.discard_finished(&session);
        });
    }

    /// Clean up after the handler returned, unless the session was replaced or removed already
    fn discard_finished(&self, session: &Arc<VoiceSession>) {
        let entry = {
            let mut registry = self.registry();
            if !registry.is_current(session) {
                return;
            }
            registry.take(&session.key())
        };
        if let Some(entry) = entry {
            Self::finish(entry, VoiceEndReason::Normal, None);
        }
    }
}

impl Default for VoiceStreams {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT, DEFAULT_QUEUE_CAPACITY)
    }
}
