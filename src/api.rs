//! Integration API: the WebSocket server the remote connects to.

use crate::assistant::AssistantEvent;
use crate::config::{ApiConfig, DriverMetadata};
use crate::connection::ClientHandle;
use crate::discovery::{ServiceAdvertisement, ServicePublisher};
use crate::entities::voice_assistant::{self, AudioConfiguration};
use crate::entity::{CommandParams, EntityType};
use crate::error::{IntegrationError, Result};
use crate::protocol::{
    filter_log_msg_data, EventCategory, InboundEvent, InboundFrame, MessageKind, OutboundMessage,
    RequestMessage, StatusCode,
};
use crate::setup::{self, IntegrationSetupError, SetupAction, SetupDriver, SetupHandler};
use crate::store::EntityStore;
use crate::subscription::ChangeReceiver;
use crate::types::{default_language_string, ClientId, DeviceState, EntityId};
use crate::voice_session::VoiceSession;
use crate::voice_stream::{VoiceStreamHandler, VoiceStreams};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Internal driver events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Events {
    /// The remote asks the driver to connect to its devices
    Connect,
    /// The remote asks the driver to disconnect from its devices
    Disconnect,
    EnterStandby,
    ExitStandby,
    SubscribeEntities,
    UnsubscribeEntities,
}

/// Event payload passed to driver listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    /// Requested entity identifiers, including unknown ones
    SubscribeEntities(Vec<EntityId>),
    UnsubscribeEntities(Vec<EntityId>),
}

impl DriverEvent {
    pub fn kind(&self) -> Events {
        match self {
            Self::Connect => Events::Connect,
            Self::Disconnect => Events::Disconnect,
            Self::EnterStandby => Events::EnterStandby,
            Self::ExitStandby => Events::ExitStandby,
            Self::SubscribeEntities(_) => Events::SubscribeEntities,
            Self::UnsubscribeEntities(_) => Events::UnsubscribeEntities,
        }
    }
}

type Listener = Arc<dyn Fn(DriverEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Background tasks of an initialized API
struct Running {
    stop_tx: broadcast::Sender<()>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    config: ApiConfig,
    available: Arc<EntityStore>,
    configured: Arc<EntityStore>,
    clients: Mutex<HashMap<ClientId, ClientHandle>>,
    device_state: Mutex<DeviceState>,
    metadata: RwLock<Option<DriverMetadata>>,
    listeners: Mutex<HashMap<Events, Vec<Listener>>>,
    setup_handler: Mutex<Option<SetupHandler>>,
    publisher: Mutex<Option<Arc<dyn ServicePublisher>>>,
    voice: VoiceStreams,
    running: Mutex<Option<Running>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Integration driver API
///
/// Cheap to clone; all clones share the same server state.
///
/// # Example
///
/// ```no_run
/// use ucapi::{entities::button, ApiConfig, CommandHandler, DriverMetadata, IntegrationApi, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let api = IntegrationApi::new(ApiConfig::from_env()?);
///
///     let push = button::new("button1", "Push the button")
///         .cmd_handler(CommandHandler::new(|entity, cmd_id, _params| async move {
///             println!("{} received {}", entity.id(), cmd_id);
///             StatusCode::Ok
///         }))
///         .build();
///     api.available_entities().add(push);
///
///     let addr = api.init(DriverMetadata::load("driver.json")?).await?;
///     println!("Listening on {}", addr);
///     tokio::signal::ctrl_c().await?;
///     api.stop().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct IntegrationApi {
    inner: Arc<Inner>,
}

impl IntegrationApi {
    pub fn new(config: ApiConfig) -> Self {
        let voice = VoiceStreams::new(config.voice_session_timeout, config.voice_queue_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                available: Arc::new(EntityStore::new("available")),
                configured: Arc::new(EntityStore::new("configured")),
                clients: Mutex::new(HashMap::new()),
                device_state: Mutex::new(DeviceState::default()),
                metadata: RwLock::new(None),
                listeners: Mutex::new(HashMap::new()),
                setup_handler: Mutex::new(None),
                publisher: Mutex::new(None),
                voice,
                running: Mutex::new(None),
            }),
        }
    }

    fn from_weak(inner: &Weak<Inner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Entities the driver can expose
    pub fn available_entities(&self) -> &Arc<EntityStore> {
        &self.inner.available
    }

    /// Entities the remote subscribed to
    pub fn configured_entities(&self) -> &Arc<EntityStore> {
        &self.inner.configured
    }

    /// Driver metadata, once initialized
    pub fn metadata(&self) -> Option<DriverMetadata> {
        self.inner
            .metadata
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_setup_handler(&self, handler: SetupHandler) {
        *lock(&self.inner.setup_handler) = Some(handler);
    }

    pub fn set_voice_stream_handler(&self, handler: VoiceStreamHandler) {
        self.inner.voice.set_handler(Some(handler));
    }

    /// Publisher used to advertise the driver at startup
    pub fn set_service_publisher(&self, publisher: impl ServicePublisher + 'static) {
        *lock(&self.inner.publisher) = Some(Arc::new(publisher));
    }

    /// Register a listener for an internal event. Each call runs in its own task.
    pub fn on<F, Fut>(&self, event: Events, listener: F)
    where
        F: Fn(DriverEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let listener: Listener = Arc::new(move |event| Box::pin(listener(event)));
        lock(&self.inner.listeners)
            .entry(event)
            .or_default()
            .push(listener);
    }

    /// Remove all listeners of an event
    pub fn off(&self, event: Events) {
        lock(&self.inner.listeners).remove(&event);
    }

    fn emit(&self, event: DriverEvent) {
        let listeners = lock(&self.inner.listeners)
            .get(&event.kind())
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            tokio::spawn(listener(event.clone()));
        }
    }

    /// Number of connected clients
    pub fn client_count(&self) -> usize {
        lock(&self.inner.clients).len()
    }

    /// Current voice session of an entity
    pub fn voice_session(&self, entity_id: &str) -> Option<Arc<VoiceSession>> {
        self.inner.voice.session_for_entity(entity_id)
    }

    /// Load the driver metadata file and start the API
    pub async fn init_from_file(&self, path: impl AsRef<Path>) -> Result<SocketAddr> {
        self.init(DriverMetadata::load(path)?).await
    }

    /// Start the API: bind the listener, advertise the driver and accept clients.
    ///
    /// The metadata port overrides the configured port. Returns the bound address.
    pub async fn init(&self, mut metadata: DriverMetadata) -> Result<SocketAddr> {
        self.stop().await;

        let config = &self.inner.config;
        let port = metadata.port.unwrap_or(config.port);
        let listener = TcpListener::bind((config.listen_interface(), port)).await?;
        let addr = listener.local_addr()?;

        metadata.driver_url = config.driver_url(metadata.driver_url.as_deref(), addr.port());

        if config.disable_mdns_publish {
            tracing::debug!("Service publishing disabled");
        } else {
            let publisher = lock(&self.inner.publisher).clone();
            match publisher {
                Some(publisher) => {
                    let address = metadata.driver_url.as_ref().and(config.interface.clone());
                    publisher.publish(&ServiceAdvertisement::new(&metadata, address, addr.port()))?;
                }
                None => tracing::debug!("No service publisher registered"),
            }
        }

        tracing::info!(
            "Driver is up: {}, version: {}, listening on: {}",
            metadata.driver_id,
            metadata.version,
            metadata.driver_url.as_deref().unwrap_or("-")
        );
        *self
            .inner
            .metadata
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(metadata);

        let (stop_tx, _) = broadcast::channel(1);
        // registered before init returns so no update is missed
        let changes = self.inner.configured.subscribe_changes();
        let forwarder = tokio::spawn(forward_entity_changes(
            Arc::downgrade(&self.inner),
            changes,
            stop_tx.subscribe(),
        ));
        let server = tokio::spawn(accept_loop(
            Arc::downgrade(&self.inner),
            listener,
            stop_tx.subscribe(),
        ));
        *lock(&self.inner.running) = Some(Running {
            stop_tx,
            tasks: vec![forwarder, server],
        });

        Ok(addr)
    }

    /// Stop accepting clients, close open connections and end all voice sessions
    pub async fn stop(&self) {
        let Some(running) = lock(&self.inner.running).take() else {
            return;
        };
        let _ = running.stop_tx.send(());
        for task in running.tasks {
            let _ = tokio::time::timeout(Duration::from_millis(500), task).await;
        }

        let clients: Vec<ClientHandle> = lock(&self.inner.clients).values().cloned().collect();
        for client in clients {
            let _ = client.send(Message::Close(None));
        }
        self.inner.voice.shutdown();
        tracing::info!("Integration API stopped");
    }

    pub fn device_state(&self) -> DeviceState {
        *lock(&self.inner.device_state)
    }

    /// Set the device state and notify all clients
    pub fn set_device_state(&self, state: DeviceState) {
        *lock(&self.inner.device_state) = state;
        self.broadcast_event(
            OutboundMessage::DeviceState,
            json!({ "state": state }),
            EventCategory::Device,
        );
    }

    /// Send an assistant event to one client, or to all clients
    pub fn send_assistant_event(&self, client: Option<&ClientHandle>, event: &AssistantEvent) -> Result<()> {
        let data = serde_json::to_value(event)?;
        match client {
            Some(client) => client.send_event(
                OutboundMessage::AssistantEvent.as_str(),
                data,
                EventCategory::Entity,
            ),
            None => {
                self.broadcast_event(OutboundMessage::AssistantEvent, data, EventCategory::Entity);
                Ok(())
            }
        }
    }

    /// Send an event to every client; failing clients are skipped
    pub(crate) fn broadcast_event(&self, msg: OutboundMessage, msg_data: Value, cat: EventCategory) {
        let clients: Vec<ClientHandle> = lock(&self.inner.clients).values().cloned().collect();
        for client in clients {
            if let Err(e) = client.send_event(msg.as_str(), msg_data.clone(), cat) {
                tracing::warn!(client = %client.id(), "Failed to send {} event: {}", msg.as_str(), e);
            }
        }
    }

    async fn handle_connection(self, stream: TcpStream, peer: SocketAddr) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::warn!("WebSocket handshake with {} failed: {}", peer, e);
                return;
            }
        };
        let (write, read) = ws_stream.split();
        let (client, writer) = ClientHandle::spawn_writer(write);
        lock(&self.inner.clients).insert(client.id(), client.clone());
        tracing::info!(client = %client.id(), "WS: Client added: {}", peer);

        // no credentials in this protocol: authentication is a fixed acknowledgment
        if let Err(e) = client.send_response(
            0,
            StatusCode::Ok,
            OutboundMessage::Authentication.as_str(),
            json!({}),
        ) {
            tracing::error!(client = %client.id(), "Failed to send authentication: {}", e);
        }

        if let Err(panic) = AssertUnwindSafe(self.read_loop(&client, read))
            .catch_unwind()
            .await
        {
            tracing::error!(
                client = %client.id(),
                "Connection handler panicked: {}",
                IntegrationError::from_panic(&*panic)
            );
        }

        lock(&self.inner.clients).remove(&client.id());
        tracing::info!(client = %client.id(), "WS: Client removed: {}", peer);
        self.emit(DriverEvent::Disconnect);
        self.inner.voice.client_disconnected(client.id());
        writer.abort();
    }

    async fn read_loop<S>(&self, client: &ClientHandle, mut read: S)
    where
        S: futures_util::Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => self.handle_text(client, &text).await,
                Ok(Message::Binary(data)) => self.inner.voice.handle_binary(client, &data),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(client = %client.id(), "Connection closed: {:?}", frame);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(client = %client.id(), "Connection closed with error: {}", e);
                    break;
                }
            }
        }
    }

    /// Dispatch one JSON text message
    pub(crate) async fn handle_text(&self, client: &ClientHandle, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(client = %client.id(), "Invalid JSON message: {}", e);
                return;
            }
        };
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(client = %client.id(), "<-: {}", filter_log_msg_data(&value));
        }
        let frame: InboundFrame = match serde_json::from_value(value) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(client = %client.id(), "Invalid message: {}", e);
                return;
            }
        };

        match frame.kind {
            MessageKind::Req => {
                let Some(req_id) = frame.id else {
                    tracing::warn!(client = %client.id(), "Ignoring request message with missing 'id': {}", frame.msg);
                    return;
                };
                if let Err(e) = self
                    .handle_request(client, req_id, &frame.msg, frame.msg_data)
                    .await
                {
                    tracing::error!(client = %client.id(), "Failed to answer request {}: {}", frame.msg, e);
                }
            }
            MessageKind::Event => self.handle_event(&frame.msg, frame.msg_data).await,
            MessageKind::Resp | MessageKind::Unknown => {
                tracing::debug!(client = %client.id(), "Ignoring message: {}", frame.msg);
            }
        }
    }

    async fn handle_request(
        &self,
        client: &ClientHandle,
        req_id: u32,
        msg: &str,
        msg_data: Option<Value>,
    ) -> Result<()> {
        let Some(request) = RequestMessage::from_name(msg) else {
            tracing::warn!(client = %client.id(), "Unsupported request: {}", msg);
            return client.send_response(
                req_id,
                StatusCode::NotImplemented,
                OutboundMessage::Result.as_str(),
                json!({}),
            );
        };

        match request {
            RequestMessage::GetDriverVersion => client.send_response(
                req_id,
                StatusCode::Ok,
                OutboundMessage::DriverVersion.as_str(),
                self.driver_version(),
            ),
            RequestMessage::GetDeviceState => client.send_response(
                req_id,
                StatusCode::Ok,
                OutboundMessage::DeviceState.as_str(),
                json!({ "state": self.device_state() }),
            ),
            RequestMessage::GetAvailableEntities => client.send_response(
                req_id,
                StatusCode::Ok,
                OutboundMessage::AvailableEntities.as_str(),
                json!({ "available_entities": self.inner.available.get_all() }),
            ),
            RequestMessage::GetEntityStates => client.send_response(
                req_id,
                StatusCode::Ok,
                OutboundMessage::EntityStates.as_str(),
                serde_json::to_value(self.inner.configured.get_states())?,
            ),
            RequestMessage::EntityCommand => self.entity_command(client, req_id, msg_data).await,
            RequestMessage::SubscribeEvents => {
                self.subscribe_events(entity_ids(msg_data.as_ref()));
                client.send_response(req_id, StatusCode::Ok, OutboundMessage::Result.as_str(), json!({}))
            }
            RequestMessage::UnsubscribeEvents => {
                self.unsubscribe_events(entity_ids(msg_data.as_ref()));
                client.send_response(req_id, StatusCode::Ok, OutboundMessage::Result.as_str(), json!({}))
            }
            RequestMessage::GetDriverMetadata => {
                let metadata = match self.metadata() {
                    Some(metadata) => serde_json::to_value(metadata)?,
                    None => json!({}),
                };
                client.send_response(
                    req_id,
                    StatusCode::Ok,
                    OutboundMessage::DriverMetadata.as_str(),
                    metadata,
                )
            }
            RequestMessage::SetupDriver => {
                let request = SetupDriver::from_setup_driver(msg_data.as_ref());
                self.setup_flow(client, req_id, request).await
            }
            RequestMessage::SetDriverUserData => {
                let request = SetupDriver::from_user_data(msg_data.as_ref());
                self.setup_flow(client, req_id, request).await
            }
        }
    }

    async fn handle_event(&self, msg: &str, msg_data: Option<Value>) {
        match InboundEvent::from_name(msg) {
            Some(InboundEvent::Connect) => self.emit(DriverEvent::Connect),
            Some(InboundEvent::Disconnect) => self.emit(DriverEvent::Disconnect),
            Some(InboundEvent::EnterStandby) => self.emit(DriverEvent::EnterStandby),
            Some(InboundEvent::ExitStandby) => self.emit(DriverEvent::ExitStandby),
            Some(InboundEvent::AbortDriverSetup) => {
                let Some(handler) = lock(&self.inner.setup_handler).clone() else {
                    tracing::warn!("Received abort_driver_setup event, but no setup handler is registered");
                    return;
                };
                let abort = SetupDriver::from_abort(msg_data.as_ref());
                tracing::info!("Driver setup aborted by remote: {:?}", abort);
                if let Err(e) = call_setup_handler(handler, abort).await {
                    tracing::error!("Setup handler failed on abort: {}", e);
                }
            }
            None => tracing::debug!("Unsupported event: {}", msg),
        }
    }

    fn driver_version(&self) -> Value {
        let metadata = self.metadata();
        let name = default_language_string(metadata.as_ref().map(|m| &m.name), "Unknown driver");
        let mut version = serde_json::Map::new();
        if let Some(api) = metadata.as_ref().and_then(|m| m.min_core_api.clone()) {
            version.insert("api".to_string(), Value::String(api));
        }
        if let Some(metadata) = &metadata {
            version.insert("driver".to_string(), Value::String(metadata.version.clone()));
        }
        json!({ "name": name, "version": version })
    }

    /// Copy the requested entities into the configured store. Unknown ids are skipped.
    pub(crate) fn subscribe_events(&self, entity_ids: Vec<EntityId>) {
        for entity_id in &entity_ids {
            match self.inner.available.get(entity_id) {
                Some(entity) => {
                    self.inner.configured.add(entity);
                }
                None => tracing::warn!(
                    "WS: Cannot subscribe entity {}: no available entity with that id",
                    entity_id
                ),
            }
        }
        self.emit(DriverEvent::SubscribeEntities(entity_ids));
    }

    /// Remove entities from the configured store.
    ///
    /// Returns false if any of them was not subscribed.
    pub(crate) fn unsubscribe_events(&self, entity_ids: Vec<EntityId>) -> bool {
        let mut all_removed = true;
        for entity_id in &entity_ids {
            if !self.inner.configured.contains(entity_id) {
                tracing::debug!("WS: Entity {} was not subscribed", entity_id);
                all_removed = false;
            }
            self.inner.configured.remove(entity_id);
        }
        self.emit(DriverEvent::UnsubscribeEntities(entity_ids));
        all_removed
    }

    async fn entity_command(&self, client: &ClientHandle, req_id: u32, msg_data: Option<Value>) -> Result<()> {
        let data = msg_data.unwrap_or(Value::Null);
        let entity_id = data.get("entity_id").and_then(Value::as_str);
        let cmd_id = data.get("cmd_id").and_then(Value::as_str);
        let (Some(entity_id), Some(cmd_id)) = (entity_id, cmd_id) else {
            tracing::warn!(client = %client.id(), "Ignoring entity command: missing entity_id or cmd_id");
            return client.send_response(req_id, StatusCode::BadRequest, OutboundMessage::Result.as_str(), json!({}));
        };
        let Some(entity) = self.inner.configured.get(entity_id) else {
            tracing::warn!(
                client = %client.id(),
                "Cannot execute command '{}' for '{}': no configured entity found",
                cmd_id,
                entity_id
            );
            return client.send_response(req_id, StatusCode::NotFound, OutboundMessage::Result.as_str(), json!({}));
        };
        let params: Option<CommandParams> = data.get("params").and_then(Value::as_object).cloned();

        let mut voice_session = None;
        if entity.entity_type() == EntityType::VoiceAssistant
            && cmd_id == voice_assistant::Commands::VoiceStart.as_str()
        {
            let session_id = params
                .as_ref()
                .and_then(|p| p.get("session_id"))
                .and_then(Value::as_u64)
                .filter(|id| *id > 0)
                .and_then(|id| u32::try_from(id).ok());
            let Some(session_id) = session_id else {
                tracing::warn!(client = %client.id(), entity = %entity_id, "voice_start without a valid session_id");
                return client.send_response(req_id, StatusCode::BadRequest, OutboundMessage::Result.as_str(), json!({}));
            };
            let config = params
                .as_ref()
                .and_then(|p| p.get(voice_assistant::Options::AudioCfg.as_str()))
                .and_then(AudioConfiguration::from_value)
                .or_else(|| voice_assistant::entity_audio_config(&entity))
                .unwrap_or_default();
            voice_session = self.inner.voice.create(client, entity_id, session_id, config);
        }

        let code = entity.command(cmd_id, params, Some(client.clone())).await;
        if let Some(session) = voice_session {
            if !code.is_success() {
                tracing::info!(entity = %entity_id, "voice_start rejected with {}: discarding voice session", code);
                self.inner.voice.discard(&session);
            }
        }
        client.send_response(req_id, code, OutboundMessage::Result.as_str(), json!({}))
    }

    /// Acknowledge a setup request, run the setup handler and report its next step
    async fn setup_flow(&self, client: &ClientHandle, req_id: u32, request: Result<SetupDriver>) -> Result<()> {
        client.send_response(req_id, StatusCode::Ok, OutboundMessage::Result.as_str(), json!({}))?;

        let handler = lock(&self.inner.setup_handler).clone();
        let outcome = match (request, handler) {
            (Ok(request), Some(handler)) => call_setup_handler(handler, request).await,
            (Ok(_), None) => Err(IntegrationError::Handler("no setup handler registered".into())),
            (Err(e), _) => Err(e),
        };

        let event = OutboundMessage::DriverSetupChange.as_str();
        match outcome {
            Ok(action) => {
                if action.has_progress() {
                    client.send_event(event, setup::progress_payload(), EventCategory::Device)?;
                }
                client.send_event(event, action.event_payload(), EventCategory::Device)
            }
            Err(e) => {
                tracing::error!(client = %client.id(), "Driver setup failed: {}", e);
                tokio::time::sleep(self.inner.config.setup_error_delay).await;
                client.send_event(
                    event,
                    setup::error_payload(IntegrationSetupError::Other),
                    EventCategory::Device,
                )
            }
        }
    }
}

/// Run the setup handler, turning errors and panics into [`IntegrationError`]
async fn call_setup_handler(handler: SetupHandler, request: SetupDriver) -> Result<SetupAction> {
    match AssertUnwindSafe(async move { handler.call(request).await })
        .catch_unwind()
        .await
    {
        Ok(Ok(action)) => Ok(action),
        Ok(Err(e)) => Err(IntegrationError::Handler(e)),
        Err(panic) => Err(IntegrationError::from_panic(&*panic)),
    }
}

fn entity_ids(msg_data: Option<&Value>) -> Vec<EntityId> {
    msg_data
        .and_then(|data| data.get("entity_ids"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

async fn accept_loop(inner: Weak<Inner>, listener: TcpListener, mut stop_rx: broadcast::Receiver<()>) {
    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                tracing::debug!("Accept loop stopped");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let Some(api) = IntegrationApi::from_weak(&inner) else {
                        break;
                    };
                    tokio::spawn(api.handle_connection(stream, peer));
                }
                Err(e) => tracing::error!("Failed to accept connection: {}", e),
            }
        }
    }
}

/// Broadcast attribute changes of configured entities to all clients
async fn forward_entity_changes(
    inner: Weak<Inner>,
    mut changes: ChangeReceiver,
    mut stop_rx: broadcast::Receiver<()>,
) {
    loop {
        let change = tokio::select! {
            _ = stop_rx.recv() => break,
            change = changes.recv() => change,
        };
        match change {
            Ok(change) => {
                let Some(api) = IntegrationApi::from_weak(&inner) else {
                    break;
                };
                match serde_json::to_value(&change) {
                    Ok(data) => api.broadcast_event(OutboundMessage::EntityChange, data, EventCategory::Entity),
                    Err(e) => tracing::error!("Failed to serialize entity change: {}", e),
                }
            }
            Err(e) => {
                tracing::debug!("Entity change forwarding stopped: {}", e);
                break;
            }
        }
    }
}
