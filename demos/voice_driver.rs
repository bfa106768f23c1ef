//! Demo integration driver with a voice assistant and a button.
//!
//! Run with `cargo run --example voice_driver [driver.json]` and add the
//! driver on the remote. Audio of a voice command is counted and answered
//! with a canned transcription.

use serde_json::json;
use std::sync::Arc;
use ucapi::entities::{button, voice_assistant};
use ucapi::{
    ApiConfig, AssistantEvent, BoxError, CommandHandler, DeviceState, DriverEvent, DriverMetadata, Events,
    IntegrationApi, SetupAction, SetupDriver, SetupHandler, StatusCode, VoiceSession, VoiceSessionClosed,
    VoiceStreamHandler,
};

async fn handle_voice(session: Arc<VoiceSession>) -> Result<(), BoxError> {
    let entity_id = session.entity_id().to_string();
    let session_id = session.session_id();
    session.send_event(&AssistantEvent::ready(entity_id.as_str(), session_id))?;

    let config = session.config();
    let mut bytes = 0usize;
    let mut frames = 0usize;
    loop {
        match session.next_frame().await {
            Ok(Some(frame)) => {
                bytes += frame.len();
                frames += 1;
            }
            Ok(None) => break,
            Err(VoiceSessionClosed::Timeout) => {
                session.send_event(&AssistantEvent::error(
                    entity_id.as_str(),
                    session_id,
                    ucapi::AssistantErrorCode::Timeout,
                    "No audio end received",
                ))?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let bytes_per_sample = match config.sample_format {
        voice_assistant::SampleFormat::I16 | voice_assistant::SampleFormat::U16 => 2,
        _ => 4,
    };
    let samples = bytes / bytes_per_sample / config.channels.max(1) as usize;
    let millis = samples as u64 * 1000 / u64::from(config.sample_rate.max(1));
    tracing::info!(
        "Voice session {} ended: {} frames, {} bytes, {} ms of audio",
        session_id,
        frames,
        bytes,
        millis
    );

    session.send_event(&AssistantEvent::stt_response(
        entity_id.as_str(),
        session_id,
        format!("{} ms of audio", millis),
    ))?;
    session.send_event(&AssistantEvent::finished(entity_id.as_str(), session_id))?;
    Ok(())
}

async fn handle_setup(request: SetupDriver) -> Result<SetupAction, BoxError> {
    match request {
        SetupDriver::DriverSetupRequest { reconfigure, .. } => {
            tracing::info!("Setup started, reconfigure: {}", reconfigure);
            Ok(SetupAction::request_user_input(
                [("en", "Assistant name"), ("de", "Name des Assistenten")],
                vec![json!({
                    "id": "assistant_name",
                    "label": {"en": "Name"},
                    "field": {"text": {"value": "Demo"}}
                })],
            ))
        }
        SetupDriver::UserDataResponse { input_values } => {
            let name = input_values
                .get("assistant_name")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if name.trim().is_empty() {
                return Ok(SetupAction::error(ucapi::IntegrationSetupError::Other));
            }
            tracing::info!("Assistant name: {}", name);
            Ok(SetupAction::SetupComplete)
        }
        SetupDriver::UserConfirmationResponse { confirm } => {
            tracing::info!("User confirmation: {}", confirm);
            Ok(SetupAction::SetupComplete)
        }
        SetupDriver::AbortDriverSetup { error } => {
            tracing::warn!("Setup aborted: {:?}", error);
            Ok(SetupAction::error(error))
        }
    }
}

fn demo_metadata() -> Result<DriverMetadata, serde_json::Error> {
    serde_json::from_value(json!({
        "driver_id": "voice_demo",
        "name": {"en": "Voice demo"},
        "version": "0.1.0",
        "min_core_api": "0.20.0",
        "developer": {"name": "Demo"},
        "setup_data_schema": {"title": {"en": "Voice demo"}, "settings": []}
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let api = IntegrationApi::new(ApiConfig::from_env()?);

    let options = voice_assistant::VoiceAssistantEntityOptions {
        audio_cfg: Some(voice_assistant::AudioConfiguration::default()),
        ..Default::default()
    };
    let assistant = voice_assistant::new(
        "assistant",
        "Demo assistant",
        [voice_assistant::Features::Transcription],
        &options,
    )
    .attribute(voice_assistant::Attributes::State, voice_assistant::States::On)
    .cmd_handler(CommandHandler::with_client(|entity, cmd_id, _params, client| async move {
        tracing::info!(
            "{} received {} from {}",
            entity.id(),
            cmd_id,
            client.id()
        );
        if cmd_id == voice_assistant::Commands::VoiceStart.as_str() {
            StatusCode::Ok
        } else {
            StatusCode::NotImplemented
        }
    }))
    .build();
    api.available_entities().add(assistant);

    let push = button::new("button", "Push the button")
        .cmd_handler(CommandHandler::new(|entity, cmd_id, _params| async move {
            tracing::info!("{} pushed: {}", entity.id(), cmd_id);
            StatusCode::Ok
        }))
        .build();
    api.available_entities().add(push);

    api.set_voice_stream_handler(VoiceStreamHandler::new(handle_voice));
    api.set_setup_handler(SetupHandler::new(handle_setup));

    let state_api = api.clone();
    api.on(Events::Connect, move |_event| {
        let api = state_api.clone();
        async move {
            api.set_device_state(DeviceState::Connected);
        }
    });
    api.on(Events::SubscribeEntities, |event| async move {
        if let DriverEvent::SubscribeEntities(ids) = event {
            tracing::info!("Subscribed entities: {:?}", ids);
        }
    });

    let metadata = match std::env::args().nth(1) {
        Some(path) => DriverMetadata::load(path)?,
        None => demo_metadata()?,
    };
    let addr = api.init(metadata).await?;
    tracing::info!("Voice demo listening on {}", addr);

    tokio::signal::ctrl_c().await?;
    api.stop().await;
    Ok(())
}
