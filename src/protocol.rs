use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Attribute whose `data:` URLs are masked in log output
const MEDIA_IMAGE_URL: &str = "media_image_url";

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Unauthorized,
    NotFound,
    Timeout,
    Conflict,
    ServerError,
    NotImplemented,
    ServiceUnavailable,
}

impl StatusCode {
    /// Numeric HTTP-like code
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::NotFound => 404,
            Self::Timeout => 408,
            Self::Conflict => 409,
            Self::ServerError => 500,
            Self::NotImplemented => 501,
            Self::ServiceUnavailable => 503,
        }
    }

    /// True for the 2xx family
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Message kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Req,
    Resp,
    Event,
    #[serde(other)]
    Unknown,
}

/// Request messages from the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMessage {
    GetDriverVersion,
    GetDeviceState,
    GetAvailableEntities,
    GetEntityStates,
    EntityCommand,
    SubscribeEvents,
    UnsubscribeEvents,
    GetDriverMetadata,
    SetupDriver,
    SetDriverUserData,
}

impl RequestMessage {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "get_driver_version" => Self::GetDriverVersion,
            "get_device_state" => Self::GetDeviceState,
            "get_available_entities" => Self::GetAvailableEntities,
            "get_entity_states" => Self::GetEntityStates,
            "entity_command" => Self::EntityCommand,
            "subscribe_events" => Self::SubscribeEvents,
            "unsubscribe_events" => Self::UnsubscribeEvents,
            "get_driver_metadata" => Self::GetDriverMetadata,
            "setup_driver" => Self::SetupDriver,
            "set_driver_user_data" => Self::SetDriverUserData,
            _ => return None,
        })
    }

    #[cfg(test)]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetDriverVersion => "get_driver_version",
            Self::GetDeviceState => "get_device_state",
            Self::GetAvailableEntities => "get_available_entities",
            Self::GetEntityStates => "get_entity_states",
            Self::EntityCommand => "entity_command",
            Self::SubscribeEvents => "subscribe_events",
            Self::UnsubscribeEvents => "unsubscribe_events",
            Self::GetDriverMetadata => "get_driver_metadata",
            Self::SetupDriver => "setup_driver",
            Self::SetDriverUserData => "set_driver_user_data",
        }
    }
}

/// Event messages from the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InboundEvent {
    Connect,
    Disconnect,
    EnterStandby,
    ExitStandby,
    AbortDriverSetup,
}

impl InboundEvent {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "enter_standby" => Self::EnterStandby,
            "exit_standby" => Self::ExitStandby,
            "abort_driver_setup" => Self::AbortDriverSetup,
            _ => return None,
        })
    }
}

/// Message names sent to the remote, in responses and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundMessage {
    Authentication,
    Result,
    DriverVersion,
    DeviceState,
    AvailableEntities,
    EntityStates,
    DriverMetadata,
    EntityChange,
    DriverSetupChange,
    AssistantEvent,
}

impl OutboundMessage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Result => "result",
            Self::DriverVersion => "driver_version",
            Self::DeviceState => "device_state",
            Self::AvailableEntities => "available_entities",
            Self::EntityStates => "entity_states",
            Self::DriverMetadata => "driver_metadata",
            Self::EntityChange => "entity_change",
            Self::DriverSetupChange => "driver_setup_change",
            Self::AssistantEvent => "assistant_event",
        }
    }
}

/// Event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventCategory {
    Device,
    Entity,
}

/// Inbound JSON text frame
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub kind: MessageKind,
    #[serde(default)]
    pub id: Option<u32>,
    pub msg: String,
    #[serde(default)]
    pub msg_data: Option<Value>,
}

/// Correlated response frame
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFrame<'a> {
    kind: &'static str,
    pub req_id: u32,
    pub code: StatusCode,
    pub msg: &'a str,
    pub msg_data: Value,
}

impl<'a> ResponseFrame<'a> {
    pub fn new(req_id: u32, code: StatusCode, msg: &'a str, msg_data: Value) -> Self {
        Self {
            kind: "resp",
            req_id,
            code,
            msg,
            msg_data,
        }
    }
}

/// Unsolicited event frame
#[derive(Debug, Clone, Serialize)]
pub struct EventFrame<'a> {
    kind: &'static str,
    pub msg: &'a str,
    pub msg_data: Value,
    pub cat: EventCategory,
}

impl<'a> EventFrame<'a> {
    pub fn new(msg: &'a str, msg_data: Value, cat: EventCategory) -> Self {
        Self {
            kind: "event",
            msg,
            msg_data,
            cat,
        }
    }
}

/// Return a copy of a frame that is safe to log.
///
/// Inline `data:` image URLs can be huge; they are replaced with `data:***`.
pub fn filter_log_msg_data(data: &Value) -> Value {
    let mut filtered = data.clone();
    match filtered.get_mut("msg_data") {
        Some(Value::Object(msg_data)) => mask_image_url(msg_data),
        Some(Value::Array(items)) => {
            for item in items {
                if let Value::Object(item) = item {
                    mask_image_url(item);
                }
            }
        }
        _ => {}
    }
    filtered
}

fn mask_image_url(msg_data: &mut serde_json::Map<String, Value>) {
    let Some(Value::Object(attributes)) = msg_data.get_mut("attributes") else {
        return;
    };
    if let Some(Value::String(url)) = attributes.get_mut(MEDIA_IMAGE_URL) {
        if url.starts_with("data:") {
            *url = "data:***".to_string();
        }
    }
}
