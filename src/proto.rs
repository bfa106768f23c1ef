//! Binary voice stream messages.
//!
//! Every binary WebSocket message carries one length-delimited
//! [`IntegrationMessage`]. The definitions mirror `ucr_integration_voice.proto`:
//!
//! ```text
//! message IntegrationMessage {
//!   oneof message {
//!     RemoteVoiceBegin voice_begin = 1;
//!     RemoteVoiceData  voice_data  = 2;
//!     RemoteVoiceEnd   voice_end   = 3;
//!   }
//! }
//! ```

use crate::error::Result;
use prost::Message;

/// Envelope of a binary voice message
#[derive(Clone, PartialEq, prost::Message)]
pub struct IntegrationMessage {
    #[prost(oneof = "integration_message::Message", tags = "1, 2, 3")]
    pub message: Option<integration_message::Message>,
}

pub mod integration_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "1")]
        VoiceBegin(super::RemoteVoiceBegin),
        #[prost(message, tag = "2")]
        VoiceData(super::RemoteVoiceData),
        #[prost(message, tag = "3")]
        VoiceEnd(super::RemoteVoiceEnd),
    }
}

/// Start of an audio stream with the actual audio format
#[derive(Clone, PartialEq, prost::Message)]
pub struct RemoteVoiceBegin {
    #[prost(uint32, tag = "1")]
    pub session_id: u32,
    #[prost(message, optional, tag = "2")]
    pub configuration: Option<AudioConfiguration>,
}

/// Chunk of raw audio samples
#[derive(Clone, PartialEq, prost::Message)]
pub struct RemoteVoiceData {
    #[prost(uint32, tag = "1")]
    pub session_id: u32,
    #[prost(bytes = "vec", tag = "2")]
    pub samples: Vec<u8>,
}

/// End of an audio stream
#[derive(Clone, PartialEq, prost::Message)]
pub struct RemoteVoiceEnd {
    #[prost(uint32, tag = "1")]
    pub session_id: u32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AudioConfiguration {
    #[prost(uint32, tag = "1")]
    pub channels: u32,
    #[prost(uint32, tag = "2")]
    pub sample_rate: u32,
    #[prost(enumeration = "SampleFormat", tag = "3")]
    pub sample_format: i32,
    #[prost(enumeration = "AudioFormat", tag = "4")]
    pub format: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SampleFormat {
    Unknown = 0,
    I8 = 1,
    I16 = 2,
    I32 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    F32 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AudioFormat {
    Unknown = 0,
    Pcm = 1,
}

/// Decode one length-delimited envelope from a binary frame
pub fn decode_frame(data: &[u8]) -> Result<IntegrationMessage> {
    Ok(IntegrationMessage::decode_length_delimited(data)?)
}

/// Encode an envelope as a length-delimited binary frame
pub fn encode_frame(message: &IntegrationMessage) -> Vec<u8> {
    message.encode_length_delimited_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_frame(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn data_frame_decodes() {
        let msg = IntegrationMessage {
            message: Some(integration_message::Message::VoiceData(RemoteVoiceData {
                session_id: 4,
                samples: vec![1, 2, 3],
            })),
        };
        let decoded = decode_frame(&encode_frame(&msg)).unwrap();
        let Some(integration_message::Message::VoiceData(data)) = decoded.message else {
            panic!("expected voice data");
        };
        assert_eq!(data.session_id, 4);
        assert_eq!(data.samples, vec![1, 2, 3]);
    }
}
