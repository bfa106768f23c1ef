//! Rust library for building Unfolded Circle Remote integration drivers
//!
//! An integration driver exposes devices ("entities") to the remote over a
//! WebSocket connection. This library provides the driver side of that
//! protocol:
//!
//! - WebSocket server with request dispatch, authentication and event broadcast
//! - Entity model with command handlers and attribute change propagation
//! - Available and configured entity stores with subscription handling
//! - Multi-step driver setup flow
//! - Voice audio streaming with bounded queues, timeouts and cancellation
//! - Entity shapes: button, switch, cover, light, climate, media player,
//!   remote, select, sensor, IR emitter and voice assistant
//!
//! # Quick Start
//!
//! ```no_run
//! use ucapi::entities::switch;
//! use ucapi::{ApiConfig, CommandHandler, DriverMetadata, Events, IntegrationApi, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = IntegrationApi::new(ApiConfig::from_env()?);
//!
//!     let updater = api.clone();
//!     let lamp = switch::new("lamp", "Lamp", [switch::Features::OnOff])
//!         .attribute(switch::Attributes::State, switch::States::Off)
//!         .cmd_handler(CommandHandler::new(move |entity, cmd_id, _params| {
//!             let api = updater.clone();
//!             async move {
//!                 let state = if cmd_id == "on" { switch::States::On } else { switch::States::Off };
//!                 let mut attributes = serde_json::Map::new();
//!                 attributes.insert(switch::Attributes::State.into(), state.into());
//!                 api.configured_entities().update_attributes(entity.id(), attributes);
//!                 StatusCode::Ok
//!             }
//!         }))
//!         .build();
//!     api.available_entities().add(lamp);
//!
//!     api.on(Events::Connect, |_event| async {
//!         println!("Remote connected");
//!     });
//!
//!     api.init(DriverMetadata::load("driver.json")?).await?;
//!     tokio::signal::ctrl_c().await?;
//!     api.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Voice Streaming
//!
//! A voice assistant entity receives `voice_start` as a regular command.
//! The audio then arrives as binary messages and is handed to the voice
//! stream handler:
//!
//! ```no_run
//! use std::sync::Arc;
//! use ucapi::{AssistantEvent, BoxError, IntegrationApi, VoiceSession, VoiceStreamHandler};
//!
//! async fn transcribe(session: Arc<VoiceSession>) -> Result<(), BoxError> {
//!     let mut bytes = 0;
//!     while let Some(frame) = session.next_frame().await? {
//!         bytes += frame.len();
//!     }
//!     println!("received {} bytes", bytes);
//!     session.send_event(&AssistantEvent::finished(session.entity_id(), session.session_id()))?;
//!     Ok(())
//! }
//!
//! fn register(api: &IntegrationApi) {
//!     api.set_voice_stream_handler(VoiceStreamHandler::new(transcribe));
//! }
//! ```
//!
//! # Architecture
//!
//! - **Api**: WebSocket server, request/event dispatch and setup flow
//! - **Store**: Available and configured entity collections
//! - **Entity**: Entity descriptors, command handlers and shapes
//! - **Voice**: Session registry, protobuf frames and audio queues
//! - **Connection**: Per-client writer task and outbound framing
//! - **Protocol**: JSON message vocabulary and status codes

pub mod entities;

mod api;
mod assistant;
mod config;
mod connection;
mod discovery;
mod entity;
mod error;
pub mod proto;
mod protocol;
mod setup;
mod store;
mod subscription;
mod types;
mod voice_session;
mod voice_stream;

// Public exports
pub use api::{DriverEvent, Events, IntegrationApi};
pub use assistant::{AssistantErrorCode, AssistantEvent, AssistantEventData, AssistantEventType};
pub use config::{ApiConfig, Developer, DriverMetadata};
pub use connection::ClientHandle;
pub use discovery::{ServiceAdvertisement, ServicePublisher, SERVICE_TYPE};
pub use entity::{
    CommandHandler, CommandParams, Entity, EntityBuilder, EntityChange, EntityState, EntitySummary,
    EntityType,
};
pub use error::{BoxError, IntegrationError, Result};
pub use protocol::{filter_log_msg_data, EventCategory, StatusCode};
pub use setup::{IntegrationSetupError, SetupAction, SetupDriver, SetupHandler};
pub use store::EntityStore;
pub use subscription::ChangeReceiver;
pub use types::{
    default_language_string, Attributes, ClientId, DeviceState, EntityId, IntoLanguageText,
    LanguageText, SessionId,
};
pub use voice_session::{SharedError, VoiceEndReason, VoiceSession, VoiceSessionClosed, VoiceSessionKey};
pub use voice_stream::VoiceStreamHandler;
