//! Driver setup flow.
//!
//! The remote drives setup with `setup_driver` and `set_driver_user_data`
//! requests. Each request is acknowledged immediately; the driver's
//! [`SetupHandler`] then decides the next step, which is reported with
//! `driver_setup_change` events.

use crate::error::{BoxError, IntegrationError, Result};
use crate::types::{IntoLanguageText, LanguageText};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default delay before a setup error event is sent.
///
/// The remote UI can miss an error event that directly follows the request
/// acknowledgment.
pub const DEFAULT_SETUP_ERROR_DELAY: Duration = Duration::from_millis(500);

/// Setup error codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationSetupError {
    None,
    NotFound,
    ConnectionRefused,
    AuthorizationError,
    Timeout,
    #[default]
    Other,
}

impl IntegrationSetupError {
    /// Parse a wire code; unknown codes map to [`IntegrationSetupError::Other`]
    pub fn from_name(name: &str) -> Self {
        match name {
            "NONE" => Self::None,
            "NOT_FOUND" => Self::NotFound,
            "CONNECTION_REFUSED" => Self::ConnectionRefused,
            "AUTHORIZATION_ERROR" => Self::AuthorizationError,
            "TIMEOUT" => Self::Timeout,
            _ => Self::Other,
        }
    }
}

/// Setup step requested by the remote
#[derive(Debug, Clone, PartialEq)]
pub enum SetupDriver {
    /// Start of the setup flow, with the values of the driver's setup page
    DriverSetupRequest {
        reconfigure: bool,
        setup_data: serde_json::Map<String, Value>,
    },
    /// User input for a previous [`SetupAction::RequestUserInput`]
    UserDataResponse { input_values: serde_json::Map<String, Value> },
    /// Answer to a previous [`SetupAction::RequestUserConfirmation`]
    UserConfirmationResponse { confirm: bool },
    /// The remote aborted the setup flow
    AbortDriverSetup { error: IntegrationSetupError },
}

impl SetupDriver {
    /// Parse the payload of a `setup_driver` request
    pub fn from_setup_driver(msg_data: Option<&Value>) -> Result<Self> {
        let data = msg_data.ok_or(IntegrationError::MissingField("msg_data"))?;
        let setup_data = match data.get("setup_data") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => return Err(IntegrationError::MissingField("setup_data")),
            Some(other) => {
                return Err(IntegrationError::InvalidMessage(format!(
                    "setup_data must be an object, got {}",
                    other
                )))
            }
        };
        Ok(Self::DriverSetupRequest {
            reconfigure: data
                .get("reconfigure")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            setup_data,
        })
    }

    /// Parse the payload of a `set_driver_user_data` request
    pub fn from_user_data(msg_data: Option<&Value>) -> Result<Self> {
        let data = msg_data.ok_or(IntegrationError::MissingField("msg_data"))?;
        if let Some(values) = data.get("input_values") {
            let input_values = values.as_object().cloned().ok_or_else(|| {
                IntegrationError::InvalidMessage("input_values must be an object".to_string())
            })?;
            return Ok(Self::UserDataResponse { input_values });
        }
        match data.get("confirm") {
            Some(confirm) => Ok(Self::UserConfirmationResponse {
                confirm: confirm.as_bool().unwrap_or(false),
            }),
            None => Err(IntegrationError::MissingField("input_values")),
        }
    }

    /// Parse the payload of an `abort_driver_setup` event
    pub fn from_abort(msg_data: Option<&Value>) -> Self {
        let error = msg_data
            .and_then(|data| data.get("error"))
            .and_then(Value::as_str)
            .map(IntegrationSetupError::from_name)
            .unwrap_or_default();
        Self::AbortDriverSetup { error }
    }
}

/// Next setup step chosen by the driver
#[derive(Debug, Clone, PartialEq)]
pub enum SetupAction {
    /// Show a settings page to the user
    RequestUserInput { title: LanguageText, settings: Vec<Value> },
    /// Ask the user to confirm a message
    RequestUserConfirmation {
        title: LanguageText,
        header: Option<LanguageText>,
        image: Option<String>,
        footer: Option<LanguageText>,
    },
    SetupComplete,
    SetupError { error_type: IntegrationSetupError },
}

impl SetupAction {
    pub fn request_user_input(title: impl IntoLanguageText, settings: Vec<Value>) -> Self {
        Self::RequestUserInput {
            title: title.into_language_text(),
            settings,
        }
    }

    pub fn request_user_confirmation(title: impl IntoLanguageText) -> Self {
        Self::RequestUserConfirmation {
            title: title.into_language_text(),
            header: None,
            image: None,
            footer: None,
        }
    }

    pub fn error(error_type: IntegrationSetupError) -> Self {
        Self::SetupError { error_type }
    }

    /// `driver_setup_change` payload announcing this action
    pub(crate) fn event_payload(&self) -> Value {
        match self {
            Self::RequestUserInput { title, settings } => json!({
                "event_type": "SETUP",
                "state": "WAIT_USER_ACTION",
                "require_user_action": {
                    "input": {"title": title, "settings": settings}
                }
            }),
            Self::RequestUserConfirmation {
                title,
                header,
                image,
                footer,
            } => {
                let mut confirmation = serde_json::Map::new();
                confirmation.insert("title".to_string(), json!(title));
                if let Some(header) = header {
                    confirmation.insert("message1".to_string(), json!(header));
                }
                if let Some(image) = image {
                    confirmation.insert("image".to_string(), json!(image));
                }
                if let Some(footer) = footer {
                    confirmation.insert("message2".to_string(), json!(footer));
                }
                json!({
                    "event_type": "SETUP",
                    "state": "WAIT_USER_ACTION",
                    "require_user_action": {"confirmation": confirmation}
                })
            }
            Self::SetupComplete => complete_payload(),
            Self::SetupError { error_type } => error_payload(*error_type),
        }
    }

    /// Whether the remote first gets a SETUP progress event
    pub(crate) fn has_progress(&self) -> bool {
        matches!(
            self,
            Self::RequestUserInput { .. } | Self::RequestUserConfirmation { .. }
        )
    }
}

/// Setup is in progress
pub(crate) fn progress_payload() -> Value {
    json!({"event_type": "SETUP", "state": "SETUP"})
}

pub(crate) fn complete_payload() -> Value {
    json!({"event_type": "STOP", "state": "OK"})
}

pub(crate) fn error_payload(error: IntegrationSetupError) -> Value {
    json!({"event_type": "STOP", "state": "ERROR", "error": error})
}

type HandlerFn = dyn Fn(SetupDriver) -> BoxFuture<'static, std::result::Result<SetupAction, BoxError>> + Send + Sync;

/// Driver callback deciding the setup flow
#[derive(Clone)]
pub struct SetupHandler(Arc<HandlerFn>);

impl SetupHandler {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(SetupDriver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<SetupAction, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |msg| Box::pin(handler(msg))))
    }

    pub(crate) fn call(&self, msg: SetupDriver) -> BoxFuture<'static, std::result::Result<SetupAction, BoxError>> {
        (self.0)(msg)
    }
}

impl fmt::Debug for SetupHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetupHandler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_request_requires_setup_data() {
        assert!(matches!(
            SetupDriver::from_setup_driver(Some(&json!({"reconfigure": true}))),
            Err(IntegrationError::MissingField("setup_data"))
        ));
        assert!(SetupDriver::from_setup_driver(None).is_err());

        let request = SetupDriver::from_setup_driver(Some(&json!({"setup_data": {"address": "10.0.0.2"}}))).unwrap();
        let SetupDriver::DriverSetupRequest { reconfigure, setup_data } = request else {
            panic!("expected setup request");
        };
        assert!(!reconfigure);
        assert_eq!(setup_data["address"], "10.0.0.2");
    }

    #[test]
    fn user_data_variants() {
        assert_eq!(
            SetupDriver::from_user_data(Some(&json!({"confirm": true}))).unwrap(),
            SetupDriver::UserConfirmationResponse { confirm: true }
        );
        assert!(matches!(
            SetupDriver::from_user_data(Some(&json!({"input_values": {"pin": "1234"}}))).unwrap(),
            SetupDriver::UserDataResponse { .. }
        ));
        assert!(SetupDriver::from_user_data(Some(&json!({}))).is_err());
    }

    #[test]
    fn abort_defaults_to_other() {
        assert_eq!(
            SetupDriver::from_abort(Some(&json!({"error": "TIMEOUT"}))),
            SetupDriver::AbortDriverSetup {
                error: IntegrationSetupError::Timeout
            }
        );
        assert_eq!(
            SetupDriver::from_abort(Some(&json!({"error": "USER_CANCELLED"}))),
            SetupDriver::AbortDriverSetup {
                error: IntegrationSetupError::Other
            }
        );
        assert_eq!(
            SetupDriver::from_abort(None),
            SetupDriver::AbortDriverSetup {
                error: IntegrationSetupError::Other
            }
        );
    }

    #[test]
    fn confirmation_payload_skips_missing_parts() {
        let action = SetupAction::RequestUserConfirmation {
            title: [("en", "Press the button")].into_language_text(),
            header: None,
            image: Some("data:image/png;base64,AAAA".to_string()),
            footer: None,
        };
        assert_eq!(
            action.event_payload(),
            json!({
                "event_type": "SETUP",
                "state": "WAIT_USER_ACTION",
                "require_user_action": {"confirmation": {
                    "title": {"en": "Press the button"},
                    "image": "data:image/png;base64,AAAA"
                }}
            })
        );
    }

    #[test]
    fn terminal_payloads() {
        assert_eq!(SetupAction::SetupComplete.event_payload(), json!({"event_type": "STOP", "state": "OK"}));
        assert_eq!(
            SetupAction::error(IntegrationSetupError::AuthorizationError).event_payload(),
            json!({"event_type": "STOP", "state": "ERROR", "error": "AUTHORIZATION_ERROR"})
        );
        assert!(!SetupAction::SetupComplete.has_progress());
    }
}
