use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use ucapi::entities::button;
use ucapi::entities::voice_assistant::{self, AudioConfiguration};
use ucapi::proto::{self, integration_message};
use ucapi::{
    ApiConfig, AssistantEvent, BoxError, CommandHandler, DriverEvent, DriverMetadata, Entity, EntityType, Events,
    IntegrationApi, SetupAction, SetupDriver, SetupHandler, StatusCode, VoiceSession, VoiceStreamHandler,
};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn metadata() -> DriverMetadata {
    serde_json::from_value(json!({
        "driver_id": "test_driver",
        "name": {"en": "Test driver"},
        "version": "1.2.3",
        "min_core_api": "0.20.0",
        "developer": {"name": "Test"}
    }))
    .unwrap()
}

fn new_api() -> IntegrationApi {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    IntegrationApi::new(
        ApiConfig::default()
            .with_interface("127.0.0.1")
            .with_port(0)
            .with_mdns_publish(false)
            .with_setup_error_delay(Duration::from_millis(10)),
    )
}

/// Start the API and connect a client, consuming the authentication message
async fn start(api: &IntegrationApi) -> (Ws, SocketAddr) {
    let addr = api.init(metadata()).await.unwrap();
    let ws = connect(addr).await;
    (ws, addr)
}

async fn connect(addr: SocketAddr) -> Ws {
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let auth = recv_json(&mut ws).await;
    assert_eq!(auth["kind"], "resp");
    assert_eq!(auth["msg"], "authentication");
    ws
}

async fn recv_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn request(ws: &mut Ws, id: u32, msg: &str, msg_data: Value) {
    let frame = json!({"kind": "req", "id": id, "msg": msg, "msg_data": msg_data});
    ws.send(Message::Text(frame.to_string())).await.unwrap();
}

async fn send_binary(ws: &mut Ws, message: integration_message::Message) {
    let frame = proto::encode_frame(&proto::IntegrationMessage {
        message: Some(message),
    });
    ws.send(Message::Binary(frame)).await.unwrap();
}

#[tokio::test]
async fn authentication_on_connect() {
    let api = new_api();
    let addr = api.init(metadata()).await.unwrap();
    let (mut ws, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    let auth = recv_json(&mut ws).await;
    assert_eq!(
        auth,
        json!({"kind": "resp", "req_id": 0, "code": 200, "msg": "authentication", "msg_data": {}})
    );
    api.stop().await;
}

#[tokio::test]
async fn available_entities_lists_button() {
    let api = new_api();
    api.available_entities().add(button::new("button1", "Push").build());
    let (mut ws, _) = start(&api).await;

    request(&mut ws, 1, "get_available_entities", json!({})).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["kind"], "resp");
    assert_eq!(resp["req_id"], 1);
    assert_eq!(resp["code"], 200);
    assert_eq!(resp["msg"], "available_entities");
    let entities = resp["msg_data"]["available_entities"].as_array().unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0]["entity_id"], "button1");
    assert_eq!(entities[0]["entity_type"], "button");
    assert!(entities[0].get("attributes").is_none());
}

#[tokio::test]
async fn subscribe_unknown_entity_then_command_is_not_found() {
    let api = new_api();
    let (mut ws, _) = start(&api).await;

    request(&mut ws, 1, "subscribe_events", json!({"entity_ids": ["ghost"]})).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["code"], 200);
    assert!(api.configured_entities().is_empty());

    request(
        &mut ws,
        2,
        "entity_command",
        json!({"entity_id": "ghost", "cmd_id": "push"}),
    )
    .await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["req_id"], 2);
    assert_eq!(resp["code"], 404);
}

#[tokio::test]
async fn command_without_cmd_id_is_bad_request() {
    let api = new_api();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    api.available_entities().add(
        button::new("button1", "Push")
            .cmd_handler(CommandHandler::new(move |_, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { StatusCode::Ok }
            }))
            .build(),
    );
    let (mut ws, _) = start(&api).await;

    request(&mut ws, 1, "subscribe_events", json!({"entity_ids": ["button1"]})).await;
    recv_json(&mut ws).await;

    request(&mut ws, 2, "entity_command", json!({"entity_id": "button1"})).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["code"], 400);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    request(
        &mut ws,
        3,
        "entity_command",
        json!({"entity_id": "button1", "cmd_id": "push"}),
    )
    .await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["code"], 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsubscribe_unknown_entity_is_acknowledged() {
    let api = new_api();
    let (mut ws, _) = start(&api).await;
    request(&mut ws, 5, "unsubscribe_events", json!({"entity_ids": ["nope"]})).await;
    let resp = recv_json(&mut ws).await;
    assert_eq!(resp["req_id"], 5);
    assert_eq!(resp["code"], 200);
    assert_eq!(resp["msg"], "result");
}

#[tokio::test]
async fn setup_user_input_flow() {
    let api = new_api();
    api.set_setup_handler(SetupHandler::new(|request| async move {
        match request {
            SetupDriver::DriverSetupRequest { .. } => Ok::<_, BoxError>(SetupAction::request_user_input(
                "Enter PIN",
                vec![json!({"id": "pin", "label": {"en": "PIN"}, "field": {"text": {"value": ""}}})],
            )),
            SetupDriver::UserDataResponse { input_values } if input_values.get("pin") == Some(&json!("1234")) => {
                Ok(SetupAction::SetupComplete)
            }
            _ => Ok(SetupAction::error(ucapi::IntegrationSetupError::AuthorizationError)),
        }
    }));
    let (mut ws, _) = start(&api).await;

    request(&mut ws, 1, "setup_driver", json!({"reconfigure": false, "setup_data": {}})).await;
    let ack = recv_json(&mut ws).await;
    assert_eq!(ack["kind"], "resp");
    assert_eq!(ack["code"], 200);

    let progress = recv_json(&mut ws).await;
    assert_eq!(progress["msg"], "driver_setup_change");
    assert_eq!(progress["cat"], "DEVICE");
    assert_eq!(progress["msg_data"], json!({"event_type": "SETUP", "state": "SETUP"}));

    let input = recv_json(&mut ws).await;
    assert_eq!(input["msg_data"]["state"], "WAIT_USER_ACTION");
    assert_eq!(
        input["msg_data"]["require_user_action"]["input"]["title"],
        json!({"en": "Enter PIN"})
    );
    assert_eq!(
        input["msg_data"]["require_user_action"]["input"]["settings"][0]["id"],
        "pin"
    );

    request(&mut ws, 2, "set_driver_user_data", json!({"input_values": {"pin": "1234"}})).await;
    assert_eq!(recv_json(&mut ws).await["code"], 200);
    let done = recv_json(&mut ws).await;
    assert_eq!(done["msg_data"], json!({"event_type": "STOP", "state": "OK"}));
}

#[tokio::test]
async fn setup_without_setup_data_fails_after_ack() {
    let api = new_api();
    api.set_setup_handler(SetupHandler::new(|_request| async {
        Ok::<_, BoxError>(SetupAction::SetupComplete)
    }));
    let (mut ws, _) = start(&api).await;

    request(&mut ws, 1, "setup_driver", json!({"reconfigure": true})).await;
    assert_eq!(recv_json(&mut ws).await["code"], 200);
    let error = recv_json(&mut ws).await;
    assert_eq!(
        error["msg_data"],
        json!({"event_type": "STOP", "state": "ERROR", "error": "OTHER"})
    );
}

#[tokio::test]
async fn attribute_changes_are_broadcast() {
    let api = new_api();
    api.available_entities().add(
        Entity::builder("light1", "Light", EntityType::Light)
            .attribute("state", "OFF")
            .attribute("brightness", 10)
            .build(),
    );
    let (mut ws, addr) = start(&api).await;
    let mut other = connect(addr).await;

    request(&mut ws, 1, "subscribe_events", json!({"entity_ids": ["light1"]})).await;
    recv_json(&mut ws).await;

    let mut update = serde_json::Map::new();
    update.insert("state".to_string(), json!("ON"));
    assert!(api.configured_entities().update_attributes("light1", update));

    for client in [&mut ws, &mut other] {
        let event = recv_json(client).await;
        assert_eq!(
            event,
            json!({
                "kind": "event",
                "msg": "entity_change",
                "cat": "ENTITY",
                "msg_data": {"entity_id": "light1", "entity_type": "light", "attributes": {"state": "ON"}}
            })
        );
    }

    request(&mut ws, 2, "get_entity_states", json!({})).await;
    let states = recv_json(&mut ws).await;
    assert_eq!(states["msg"], "entity_states");
    assert_eq!(states["msg_data"][0]["attributes"], json!({"state": "ON", "brightness": 10}));
}

#[tokio::test]
async fn driver_version_and_metadata() {
    let api = new_api();
    let (mut ws, addr) = start(&api).await;

    request(&mut ws, 1, "get_driver_version", json!({})).await;
    let version = recv_json(&mut ws).await;
    assert_eq!(
        version["msg_data"],
        json!({"name": "Test driver", "version": {"api": "0.20.0", "driver": "1.2.3"}})
    );

    request(&mut ws, 2, "get_driver_metadata", json!({})).await;
    let meta = recv_json(&mut ws).await;
    assert_eq!(meta["msg"], "driver_metadata");
    assert_eq!(meta["msg_data"]["driver_id"], "test_driver");
    assert_eq!(
        meta["msg_data"]["driver_url"],
        format!("ws://127.0.0.1:{}", addr.port())
    );
}

#[tokio::test]
async fn device_state_and_driver_events() {
    let api = new_api();
    let (tx, mut rx) = mpsc::unbounded_channel();
    for event in [Events::Connect, Events::EnterStandby] {
        let tx = tx.clone();
        api.on(event, move |event| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(event);
            }
        });
    }
    let (mut ws, _) = start(&api).await;

    ws.send(Message::Text(json!({"kind": "event", "msg": "connect"}).to_string()))
        .await
        .unwrap();
    let event = tokio::time::timeout(RECV_TIMEOUT, rx.recv()).await.unwrap();
    assert_eq!(event, Some(DriverEvent::Connect));

    api.set_device_state(ucapi::DeviceState::Connected);
    let state = recv_json(&mut ws).await;
    assert_eq!(state["msg"], "device_state");
    assert_eq!(state["msg_data"]["state"], "CONNECTED");

    request(&mut ws, 1, "get_device_state", json!({})).await;
    assert_eq!(recv_json(&mut ws).await["msg_data"]["state"], "CONNECTED");
}

type VoiceOutcome = Result<Vec<Vec<u8>>, String>;

fn voice_api() -> (IntegrationApi, mpsc::UnboundedReceiver<VoiceOutcome>) {
    let api = new_api();
    let entity = voice_assistant::new(
        "va",
        "Voice",
        [voice_assistant::Features::Transcription],
        &Default::default(),
    )
    .cmd_handler(CommandHandler::with_client(|_, _, _, _| async { StatusCode::Ok }))
    .build();
    api.available_entities().add(entity);

    let (tx, rx) = mpsc::unbounded_channel();
    api.set_voice_stream_handler(VoiceStreamHandler::new(move |session: Arc<VoiceSession>| {
        let tx = tx.clone();
        async move {
            session.send_event(&AssistantEvent::ready(session.entity_id(), session.session_id()))?;
            let mut frames = Vec::new();
            let outcome = loop {
                match session.next_frame().await {
                    Ok(Some(frame)) => frames.push(frame),
                    Ok(None) => break Ok(frames),
                    Err(e) => break Err(e.to_string()),
                }
            };
            let _ = tx.send(outcome);
            Ok::<(), BoxError>(())
        }
    }));
    (api, rx)
}

async fn voice_start(ws: &mut Ws, session_id: u32, audio_cfg: Option<Value>) {
    request(ws, 1, "subscribe_events", json!({"entity_ids": ["va"]})).await;
    recv_json(ws).await;

    let mut params = json!({"session_id": session_id});
    if let Some(cfg) = audio_cfg {
        params["audio_cfg"] = cfg;
    }
    request(
        ws,
        2,
        "entity_command",
        json!({"entity_id": "va", "cmd_id": "voice_start", "params": params}),
    )
    .await;
    let resp = recv_json(ws).await;
    assert_eq!(resp["code"], 200);
}

#[tokio::test]
async fn voice_stream_end_to_end() {
    let (api, mut outcomes) = voice_api();
    let (mut ws, _) = start(&api).await;
    let cfg = AudioConfiguration {
        channels: 1,
        sample_rate: 22050,
        sample_format: voice_assistant::SampleFormat::I16,
    };
    voice_start(
        &mut ws,
        7,
        Some(json!({"channels": 1, "sample_rate": 22050, "sample_format": "I16"})),
    )
    .await;
    assert!(api.voice_session("va").is_some());

    send_binary(
        &mut ws,
        integration_message::Message::VoiceBegin(proto::RemoteVoiceBegin {
            session_id: 7,
            configuration: Some(cfg.to_proto()),
        }),
    )
    .await;
    let ready = recv_json(&mut ws).await;
    assert_eq!(ready["msg"], "assistant_event");
    assert_eq!(ready["cat"], "ENTITY");
    assert_eq!(
        ready["msg_data"],
        json!({"type": "READY", "entity_id": "va", "session_id": 7})
    );

    for chunk in [vec![1u8, 2], vec![3u8, 4]] {
        send_binary(
            &mut ws,
            integration_message::Message::VoiceData(proto::RemoteVoiceData {
                session_id: 7,
                samples: chunk,
            }),
        )
        .await;
    }
    send_binary(
        &mut ws,
        integration_message::Message::VoiceEnd(proto::RemoteVoiceEnd { session_id: 7 }),
    )
    .await;

    let outcome = tokio::time::timeout(RECV_TIMEOUT, outcomes.recv()).await.unwrap();
    assert_eq!(outcome, Some(Ok(vec![vec![1, 2], vec![3, 4]])));
}

#[tokio::test]
async fn disconnect_ends_voice_session_remotely() {
    let (api, mut outcomes) = voice_api();
    let (mut ws, _) = start(&api).await;
    voice_start(&mut ws, 3, None).await;
    let session = api.voice_session("va").unwrap();

    send_binary(
        &mut ws,
        integration_message::Message::VoiceBegin(proto::RemoteVoiceBegin {
            session_id: 3,
            configuration: Some(AudioConfiguration::default().to_proto()),
        }),
    )
    .await;
    recv_json(&mut ws).await;
    ws.close(None).await.unwrap();

    let outcome = tokio::time::timeout(RECV_TIMEOUT, outcomes.recv()).await.unwrap();
    assert_eq!(
        outcome,
        Some(Err(ucapi::VoiceSessionClosed::Remote.to_string()))
    );
    assert_eq!(session.end_reason(), Some(ucapi::VoiceEndReason::Remote));
    assert!(api.voice_session("va").is_none());
}

#[tokio::test]
async fn second_voice_start_preempts_first() {
    let (api, mut outcomes) = voice_api();
    let (mut ws, _) = start(&api).await;
    voice_start(&mut ws, 1, None).await;
    let first = api.voice_session("va").unwrap();
    send_binary(
        &mut ws,
        integration_message::Message::VoiceBegin(proto::RemoteVoiceBegin {
            session_id: 1,
            configuration: Some(AudioConfiguration::default().to_proto()),
        }),
    )
    .await;
    recv_json(&mut ws).await;

    request(
        &mut ws,
        3,
        "entity_command",
        json!({"entity_id": "va", "cmd_id": "voice_start", "params": {"session_id": 2}}),
    )
    .await;
    assert_eq!(recv_json(&mut ws).await["code"], 200);

    let outcome = tokio::time::timeout(RECV_TIMEOUT, outcomes.recv()).await.unwrap();
    assert_eq!(outcome, Some(Err(ucapi::VoiceSessionClosed::Local.to_string())));
    assert_eq!(first.end_reason(), Some(ucapi::VoiceEndReason::Local));
    assert_eq!(api.voice_session("va").unwrap().session_id(), 2);
}
