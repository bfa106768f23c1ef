//! Assistant events reporting the progress of a voice command.

use crate::types::{EntityId, SessionId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistantEventType {
    /// Driver is ready to receive audio
    Ready,
    SttResponse,
    TextResponse,
    SpeechResponse,
    Error,
    /// Final event of a voice session
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistantErrorCode {
    ServiceUnavailable,
    InvalidAudio,
    NoTextRecognized,
    IntentFailed,
    TtsFailed,
    Timeout,
    UnexpectedError,
}

/// Event specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssistantEventData {
    /// Transcribed voice command
    SttResponse { text: String },
    TextResponse { success: bool, text: String },
    SpeechResponse { url: String, mime_type: String },
    Error { code: AssistantErrorCode, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantEvent {
    #[serde(rename = "type")]
    pub event_type: AssistantEventType,
    pub entity_id: EntityId,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AssistantEventData>,
}

impl AssistantEvent {
    pub fn new(event_type: AssistantEventType, entity_id: impl Into<EntityId>, session_id: SessionId) -> Self {
        Self {
            event_type,
            entity_id: entity_id.into(),
            session_id,
            data: None,
        }
    }

    pub fn with_data(mut self, data: AssistantEventData) -> Self {
        self.data = Some(data);
        self
    }

    pub fn ready(entity_id: impl Into<EntityId>, session_id: SessionId) -> Self {
        Self::new(AssistantEventType::Ready, entity_id, session_id)
    }

    pub fn stt_response(entity_id: impl Into<EntityId>, session_id: SessionId, text: impl Into<String>) -> Self {
        Self::new(AssistantEventType::SttResponse, entity_id, session_id)
            .with_data(AssistantEventData::SttResponse { text: text.into() })
    }

    pub fn text_response(
        entity_id: impl Into<EntityId>,
        session_id: SessionId,
        success: bool,
        text: impl Into<String>,
    ) -> Self {
        Self::new(AssistantEventType::TextResponse, entity_id, session_id).with_data(
            AssistantEventData::TextResponse {
                success,
                text: text.into(),
            },
        )
    }

    pub fn speech_response(
        entity_id: impl Into<EntityId>,
        session_id: SessionId,
        url: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self::new(AssistantEventType::SpeechResponse, entity_id, session_id).with_data(
            AssistantEventData::SpeechResponse {
                url: url.into(),
                mime_type: mime_type.into(),
            },
        )
    }

    pub fn error(
        entity_id: impl Into<EntityId>,
        session_id: SessionId,
        code: AssistantErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self::new(AssistantEventType::Error, entity_id, session_id).with_data(AssistantEventData::Error {
            code,
            message: message.into(),
        })
    }

    pub fn finished(entity_id: impl Into<EntityId>, session_id: SessionId) -> Self {
        Self::new(AssistantEventType::Finished, entity_id, session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ready_has_no_data() {
        let event = AssistantEvent::ready("va", 3);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "READY", "entity_id": "va", "session_id": 3})
        );
    }

    #[test]
    fn error_payload() {
        let event = AssistantEvent::error("va", 3, AssistantErrorCode::NoTextRecognized, "nothing heard");
        assert_eq!(
            serde_json::to_value(&event).unwrap()["data"],
            json!({"code": "NO_TEXT_RECOGNIZED", "message": "nothing heard"})
        );
    }

    #[test]
    fn speech_payload() {
        let event = AssistantEvent::speech_response("va", 1, "http://host/a.wav", "audio/wav");
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "SPEECH_RESPONSE");
        assert_eq!(value["data"]["mime_type"], "audio/wav");
    }
}
