//! Entity descriptors and command handlers.

use crate::connection::ClientHandle;
use crate::protocol::StatusCode;
use crate::types::{Attributes, EntityId, IntoLanguageText, LanguageText};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

/// Entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Button,
    Climate,
    Cover,
    IrEmitter,
    Light,
    MediaPlayer,
    Remote,
    Select,
    Sensor,
    Switch,
    VoiceAssistant,
}

impl EntityType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::Climate => "climate",
            Self::Cover => "cover",
            Self::IrEmitter => "ir_emitter",
            Self::Light => "light",
            Self::MediaPlayer => "media_player",
            Self::Remote => "remote",
            Self::Select => "select",
            Self::Sensor => "sensor",
            Self::Switch => "switch",
            Self::VoiceAssistant => "voice_assistant",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional command parameters
pub type CommandParams = serde_json::Map<String, Value>;

type BasicFn =
    dyn Fn(Arc<Entity>, String, Option<CommandParams>) -> BoxFuture<'static, StatusCode> + Send + Sync;
type WithClientFn = dyn Fn(Arc<Entity>, String, Option<CommandParams>, ClientHandle) -> BoxFuture<'static, StatusCode>
    + Send
    + Sync;

/// Handler invoked for commands sent to an entity
///
/// The variant is fixed at registration: handlers that want to send
/// directed events back to the requesting client use [`CommandHandler::with_client`].
#[derive(Clone)]
pub enum CommandHandler {
    Basic(Arc<BasicFn>),
    WithClient(Arc<WithClientFn>),
}

impl CommandHandler {
    /// Handler receiving entity, command id and parameters
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<Entity>, String, Option<CommandParams>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StatusCode> + Send + 'static,
    {
        Self::Basic(Arc::new(move |entity, cmd_id, params| {
            Box::pin(handler(entity, cmd_id, params))
        }))
    }

    /// Handler additionally receiving the requesting client connection
    pub fn with_client<F, Fut>(handler: F) -> Self
    where
        F: Fn(Arc<Entity>, String, Option<CommandParams>, ClientHandle) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StatusCode> + Send + 'static,
    {
        Self::WithClient(Arc::new(move |entity, cmd_id, params, client| {
            Box::pin(handler(entity, cmd_id, params, client))
        }))
    }

    async fn call(
        &self,
        entity: Arc<Entity>,
        cmd_id: String,
        params: Option<CommandParams>,
        client: Option<ClientHandle>,
    ) -> StatusCode {
        match (self, client) {
            (Self::Basic(f), _) => f(entity, cmd_id, params).await,
            (Self::WithClient(f), Some(client)) => f(entity, cmd_id, params, client).await,
            (Self::WithClient(_), None) => {
                tracing::error!(
                    entity = %entity.id,
                    "Command handler requires a client connection, but none was provided"
                );
                StatusCode::ServerError
            }
        }
    }
}

impl fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("CommandHandler::Basic"),
            Self::WithClient(_) => f.write_str("CommandHandler::WithClient"),
        }
    }
}

/// A controllable device exposed by the driver
///
/// Everything except the attribute map is fixed at construction.
pub struct Entity {
    id: EntityId,
    name: LanguageText,
    entity_type: EntityType,
    device_id: Option<String>,
    features: Vec<String>,
    attributes: RwLock<Attributes>,
    device_class: Option<String>,
    options: Option<serde_json::Map<String, Value>>,
    area: Option<String>,
    cmd_handler: Option<CommandHandler>,
}

impl Entity {
    /// Start building an entity
    pub fn builder(
        id: impl Into<EntityId>,
        name: impl IntoLanguageText,
        entity_type: EntityType,
    ) -> EntityBuilder {
        EntityBuilder {
            id: id.into(),
            name: name.into_language_text(),
            entity_type,
            device_id: None,
            features: Vec::new(),
            attributes: Attributes::new(),
            device_class: None,
            options: None,
            area: None,
            cmd_handler: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &LanguageText {
        &self.name
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn device_class(&self) -> Option<&str> {
        self.device_class.as_deref()
    }

    pub fn options(&self) -> Option<&serde_json::Map<String, Value>> {
        self.options.as_ref()
    }

    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    /// Snapshot of the current attributes
    pub fn attributes(&self) -> Attributes {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current value of one attribute
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Merge attributes; only called by the entity store
    pub(crate) fn merge_attributes(&self, update: &Attributes) {
        let mut attributes = self
            .attributes
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (key, value) in update {
            attributes.insert(key.clone(), value.clone());
        }
    }

    /// Execute an entity command through the registered handler.
    ///
    /// Entities without a handler answer [`StatusCode::NotImplemented`].
    pub async fn command(
        self: &Arc<Self>,
        cmd_id: &str,
        params: Option<CommandParams>,
        client: Option<ClientHandle>,
    ) -> StatusCode {
        let Some(handler) = &self.cmd_handler else {
            tracing::warn!(
                entity = %self.id,
                "No command handler for entity: cannot execute command '{}'",
                cmd_id
            );
            return StatusCode::NotImplemented;
        };
        handler
            .call(Arc::clone(self), cmd_id.to_string(), params, client)
            .await
    }

    pub(crate) fn summary(&self) -> EntitySummary {
        EntitySummary {
            entity_id: self.id.clone(),
            entity_type: self.entity_type,
            device_id: self.device_id.clone(),
            features: self.features.clone(),
            name: self.name.clone(),
            area: self.area.clone(),
            device_class: self.device_class.clone(),
            options: self.options.clone().filter(|o| !o.is_empty()),
        }
    }

    pub(crate) fn state(&self) -> EntityState {
        EntityState {
            entity_id: self.id.clone(),
            entity_type: self.entity_type,
            device_id: self.device_id.clone(),
            attributes: self.attributes(),
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("entity_type", &self.entity_type)
            .field("features", &self.features)
            .field("attributes", &self.attributes())
            .field("cmd_handler", &self.cmd_handler)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Entity`]
#[derive(Debug)]
pub struct EntityBuilder {
    id: EntityId,
    name: LanguageText,
    entity_type: EntityType,
    device_id: Option<String>,
    features: Vec<String>,
    attributes: Attributes,
    device_class: Option<String>,
    options: Option<serde_json::Map<String, Value>>,
    area: Option<String>,
    cmd_handler: Option<CommandHandler>,
}

impl EntityBuilder {
    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn options(mut self, options: serde_json::Map<String, Value>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn cmd_handler(mut self, handler: CommandHandler) -> Self {
        self.cmd_handler = Some(handler);
        self
    }

    pub fn build(self) -> Entity {
        tracing::debug!(entity = %self.id, "{} entity created", self.entity_type);
        Entity {
            id: self.id,
            name: self.name,
            entity_type: self.entity_type,
            device_id: self.device_id,
            features: self.features,
            attributes: RwLock::new(self.attributes),
            device_class: self.device_class,
            options: self.options,
            area: self.area,
            cmd_handler: self.cmd_handler,
        }
    }
}

/// Entity information returned by `get_available_entities` (no attributes)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub device_id: Option<String>,
    pub features: Vec<String>,
    pub name: LanguageText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Map<String, Value>>,
}

/// Entity state returned by `get_entity_states`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    pub device_id: Option<String>,
    pub attributes: Attributes,
}

/// Attribute change emitted by an entity store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChange {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
    /// Only the attributes that were updated
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn command_without_handler_is_not_implemented() {
        let entity = Arc::new(Entity::builder("b1", "Button", EntityType::Button).build());
        assert_eq!(entity.command("push", None, None).await, StatusCode::NotImplemented);
    }

    #[tokio::test]
    async fn basic_handler_receives_command() {
        let entity = Arc::new(
            Entity::builder("b1", "Button", EntityType::Button)
                .cmd_handler(CommandHandler::new(|entity, cmd_id, params| async move {
                    assert_eq!(entity.id(), "b1");
                    assert!(params.is_none());
                    if cmd_id == "push" {
                        StatusCode::Ok
                    } else {
                        StatusCode::BadRequest
                    }
                }))
                .build(),
        );
        assert_eq!(entity.command("push", None, None).await, StatusCode::Ok);
        assert_eq!(entity.command("hold", None, None).await, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn client_handler_without_client_is_server_error() {
        let entity = Arc::new(
            Entity::builder("va", "Voice", EntityType::VoiceAssistant)
                .cmd_handler(CommandHandler::with_client(|_, _, _, _| async { StatusCode::Ok }))
                .build(),
        );
        assert_eq!(entity.command("voice_start", None, None).await, StatusCode::ServerError);
    }

    #[test]
    fn summary_skips_empty_optionals() {
        let entity = Entity::builder("l1", "Lamp", EntityType::Light)
            .features(["on_off"])
            .attribute("state", "ON")
            .build();
        let value = serde_json::to_value(entity.summary()).unwrap();
        assert_eq!(
            value,
            json!({
                "entity_id": "l1",
                "entity_type": "light",
                "device_id": null,
                "features": ["on_off"],
                "name": {"en": "Lamp"}
            })
        );
    }
}
