//! Voice assistant entity.
//!
//! The `voice_start` command only initiates a stream; audio arrives as
//! binary protobuf messages handled by the voice stream subsystem.

use crate::entity::{Entity, EntityBuilder, EntityType};
use crate::proto;
use crate::types::IntoLanguageText;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_AUDIO_CHANNELS: u32 = 1;
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;
pub const DEFAULT_SAMPLE_FORMAT: SampleFormat = SampleFormat::I16;

wire_enum! {
    pub enum States {
        Unavailable => "UNAVAILABLE",
        Unknown => "UNKNOWN",
        On => "ON",
        Off => "OFF",
    }
}

wire_enum! {
    pub enum Features {
        /// Voice command is transcribed and sent back in an STT response event
        Transcription => "transcription",
        /// Textual response about the performed action
        ResponseText => "response_text",
        /// Speech response about the performed action
        ResponseSpeech => "response_speech",
    }
}

wire_enum! {
    pub enum Attributes {
        State => "state",
    }
}

wire_enum! {
    pub enum Commands {
        VoiceStart => "voice_start",
    }
}

wire_enum! {
    pub enum Options {
        AudioCfg => "audio_cfg",
        Profiles => "profiles",
        PreferredProfile => "preferred_profile",
    }
}

wire_enum! {
    /// Audio sample format
    pub enum SampleFormat {
        I16 => "I16",
        I32 => "I32",
        U16 => "U16",
        U32 => "U32",
        F32 => "F32",
    }
}

impl SampleFormat {
    /// Map the protobuf enum value; formats without a counterpart give `None`
    pub fn from_proto(value: i32) -> Option<Self> {
        match proto::SampleFormat::try_from(value).ok()? {
            proto::SampleFormat::I16 => Some(Self::I16),
            proto::SampleFormat::I32 => Some(Self::I32),
            proto::SampleFormat::U16 => Some(Self::U16),
            proto::SampleFormat::U32 => Some(Self::U32),
            proto::SampleFormat::F32 => Some(Self::F32),
            proto::SampleFormat::Unknown | proto::SampleFormat::I8 | proto::SampleFormat::U8 => None,
        }
    }

    pub fn to_proto(self) -> proto::SampleFormat {
        match self {
            Self::I16 => proto::SampleFormat::I16,
            Self::I32 => proto::SampleFormat::I32,
            Self::U16 => proto::SampleFormat::U16,
            Self::U32 => proto::SampleFormat::U32,
            Self::F32 => proto::SampleFormat::F32,
        }
    }

    /// Case-insensitive name lookup
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "I16" => Some(Self::I16),
            "I32" => Some(Self::I32),
            "U16" => Some(Self::U16),
            "U32" => Some(Self::U32),
            "F32" => Some(Self::F32),
            _ => None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Self::from_name(name),
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()).and_then(Self::from_proto),
            _ => None,
        }
    }
}

/// Audio stream specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioConfiguration {
    /// Number of audio channels
    pub channels: u32,
    /// Sample rate in Hz, e.g. 8000, 16000, 22050, 44100
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl Default for AudioConfiguration {
    fn default() -> Self {
        Self {
            channels: DEFAULT_AUDIO_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_format: DEFAULT_SAMPLE_FORMAT,
        }
    }
}

/// Lenient number parsing: numbers or numeric strings, zero and garbage give the default
fn lenient_u32(value: Option<&Value>, default: u32) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|n| *n > 0).unwrap_or(default)
}

impl AudioConfiguration {
    /// Parse an option map such as `{"channels": "2", "sample_rate": 16000, "sample_format": "u16"}`.
    ///
    /// Returns `None` if the value is not an object. Missing or invalid
    /// fields fall back to their defaults.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            channels: lenient_u32(map.get("channels"), DEFAULT_AUDIO_CHANNELS),
            sample_rate: lenient_u32(map.get("sample_rate"), DEFAULT_SAMPLE_RATE),
            sample_format: map
                .get("sample_format")
                .and_then(SampleFormat::from_value)
                .unwrap_or(DEFAULT_SAMPLE_FORMAT),
        })
    }

    /// Convert the protobuf configuration; unset fields fall back to defaults
    pub fn from_proto(cfg: &proto::AudioConfiguration) -> Self {
        Self {
            channels: if cfg.channels == 0 { DEFAULT_AUDIO_CHANNELS } else { cfg.channels },
            sample_rate: if cfg.sample_rate == 0 { DEFAULT_SAMPLE_RATE } else { cfg.sample_rate },
            sample_format: SampleFormat::from_proto(cfg.sample_format).unwrap_or(DEFAULT_SAMPLE_FORMAT),
        }
    }

    pub fn to_proto(self) -> proto::AudioConfiguration {
        proto::AudioConfiguration {
            channels: self.channels,
            sample_rate: self.sample_rate,
            sample_format: self.sample_format.to_proto() as i32,
            format: proto::AudioFormat::Pcm as i32,
        }
    }
}

/// One selectable profile, e.g. a language-specific recognition profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceAssistantProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Entity features apply when not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_speech: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceAssistantEntityOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_cfg: Option<AudioConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<VoiceAssistantProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_profile: Option<String>,
}

/// Audio configuration declared in an entity's options
pub fn entity_audio_config(entity: &Entity) -> Option<AudioConfiguration> {
    entity
        .options()
        .and_then(|options| options.get(Options::AudioCfg.as_str()))
        .and_then(AudioConfiguration::from_value)
}

pub fn new<I>(
    id: impl Into<String>,
    name: impl IntoLanguageText,
    features: I,
    options: &VoiceAssistantEntityOptions,
) -> EntityBuilder
where
    I: IntoIterator<Item = Features>,
{
    let builder = Entity::builder(id, name, EntityType::VoiceAssistant).features(features);
    match serde_json::to_value(options) {
        Ok(Value::Object(map)) if !map.is_empty() => builder.options(map),
        _ => builder,
    }
}
