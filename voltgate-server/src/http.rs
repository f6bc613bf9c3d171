//! HTTP surface: the WebSocket upgrade endpoint and the admin API.
//!
//! `GET /ocpp/{device_id}` upgrades a known device's request to the
//! persistent frame socket. The admin routes depend only on codec encoding
//! and store/registry operations, never on dispatcher internals, and
//! normalize their failures to a small status envelope.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{future, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use voltgate_protocol::Frame;
use voltgate_utils::VoltgateError;

use crate::actions::trigger_message::{TriggerMessageKind, TriggerMessageRequest};
use crate::actions::{self, TRIGGER_MESSAGE};
use crate::auth::Authorizer;
use crate::config::ServerConfig;
use crate::correlation::{CorrelationEntry, CorrelationStore};
use crate::dispatch::{Dispatcher, HandlerRegistry};
use crate::session::{self, Session, SessionContext, SessionRegistry, SessionState};

/// Shared application state passed to the axum handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub registry: Arc<HandlerRegistry>,
    pub sessions: Arc<SessionRegistry>,
    pub authorizer: Arc<dyn Authorizer>,
}

/// Build the axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ocpp/{device_id}", get(ws_handler))
        .route("/api/devices/{device_id}", get(device_status))
        .route(
            "/api/devices/{device_id}/messages/{unique_id}",
            get(message_status),
        )
        .route(
            "/api/devices/{device_id}/trigger/{requested}",
            post(trigger_action),
        )
        .with_state(state)
}

/// Normalized admin response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub reference: String,
    pub description: String,
}

impl ApiResponse {
    pub fn success(reference: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            reference: reference.into(),
            description: String::new(),
        }
    }

    pub fn fail(description: impl Into<String>) -> Self {
        Self {
            status: "fail".into(),
            reference: String::new(),
            description: description.into(),
        }
    }
}

/// Device state reported by the admin API
#[derive(Debug, Serialize)]
struct DeviceStatus {
    device_id: String,
    connected: bool,
    authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_state: Option<SessionState>,
}

/// WebSocket upgrade handler, keyed by device identifier
///
/// Unknown devices and devices that already hold a live session are refused
/// before the upgrade; the registry re-checks after the upgrade so two
/// racing requests cannot both win.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(device_id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(device) = state.config.device(&device_id) else {
        warn!(device_id = %device_id, "upgrade refused: unknown device");
        return (StatusCode::NOT_FOUND, "unknown device identifier").into_response();
    };
    if state.sessions.get(&device_id).is_some() {
        warn!(device_id = %device_id, "upgrade refused: device already connected");
        return (StatusCode::CONFLICT, "device already connected").into_response();
    }

    let heartbeat_interval = device.heartbeat_interval;
    let presented_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    ws.on_upgrade(move |socket| {
        handle_socket(socket, device_id, presented_token, heartbeat_interval, state)
    })
}

/// Run one upgraded connection to completion
async fn handle_socket(
    socket: WebSocket,
    device_id: String,
    presented_token: Option<String>,
    heartbeat_interval: u64,
    state: AppState,
) {
    // Socket upgraded; authenticate, then open regardless of the verdict.
    let authorized = state
        .authorizer
        .authorize(&device_id, presented_token.as_deref());
    let context = Arc::new(SessionContext::new(
        device_id.clone(),
        authorized,
        heartbeat_interval,
    ));
    let store = Arc::new(CorrelationStore::new(state.config.queue_capacity));
    let (outbound_tx, outbound_rx) = mpsc::channel(state.config.outbound_buffer);
    let session = Arc::new(Session::new(
        Arc::clone(&context),
        Arc::clone(&store),
        outbound_tx,
    ));
    session.set_state(SessionState::Authenticating);

    if let Err(e) = state.sessions.register(Arc::clone(&session)) {
        // The existing session stays untouched; this socket just goes away.
        warn!(device_id = %device_id, error = %e, "closing duplicate connection");
        return;
    }
    session.set_state(SessionState::Open);
    info!(device_id = %device_id, authorized, "session open");

    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&state.registry), store, context));

    let (ws_sink, ws_stream) = socket.split();
    let frames = ws_stream.filter_map(|message| {
        future::ready(match message {
            Ok(Message::Text(text)) => Some(Ok(text.to_string())),
            Ok(Message::Close(_)) => Some(Err(VoltgateError::socket("closed by peer"))),
            Ok(_) => None,
            Err(e) => Some(Err(VoltgateError::socket(e.to_string()))),
        })
    });
    let sink =
        ws_sink.with(|text: String| future::ready(Ok::<Message, axum::Error>(Message::Text(text.into()))));

    let inbound = tokio::spawn(session::inbound_flow(
        frames,
        Arc::clone(&session),
        dispatcher,
    ));
    let outbound = tokio::spawn(session::outbound_flow(
        sink,
        outbound_rx,
        Arc::clone(&session),
    ));
    let _ = tokio::join!(inbound, outbound);

    // Both flows have exited.
    session.set_state(SessionState::Closed);
    state.sessions.remove(&device_id, &session);
    info!(device_id = %device_id, "session closed");
}

/// `GET /api/devices/{device_id}`: connection and authorization state
async fn device_status(
    Path(device_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    if state.config.device(&device_id).is_none() {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail("unknown device identifier")),
        )
            .into_response();
    }
    let session = state.sessions.get(&device_id);
    let status = DeviceStatus {
        device_id,
        connected: session.is_some(),
        authorized: session
            .as_ref()
            .map(|s| s.context().authorized)
            .unwrap_or(false),
        session_state: session.map(|s| s.state()),
    };
    (StatusCode::OK, Json(status)).into_response()
}

/// `GET /api/devices/{device_id}/messages/{unique_id}`: correlation entry
async fn message_status(
    Path((device_id, unique_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let Some(session) = state.sessions.get(&device_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail("device has no live session")),
        )
            .into_response();
    };
    match session.store().get(&unique_id) {
        Some(entry) => (StatusCode::OK, Json(entry)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail("message does not exist")),
        )
            .into_response(),
    }
}

/// `POST /api/devices/{device_id}/trigger/{requested}`: locally initiated
/// TriggerMessage call
///
/// Builds the Call via the codec, records it in the session's correlation
/// store, and hands its token to the session's outbound flow. Both bounds
/// surface as immediate failures instead of blocking.
async fn trigger_action(
    Path((device_id, requested)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    if state.config.device(&device_id).is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::fail("unknown device identifier")),
        )
            .into_response();
    }
    let Some(kind) = TriggerMessageKind::from_name(&requested) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::fail("unsupported trigger message type")),
        )
            .into_response();
    };
    let Some(session) = state.sessions.get(&device_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::fail("device has no live session")),
        )
            .into_response();
    };

    let unique_id = Uuid::new_v4().to_string();
    let call = actions::trigger_message::build_call(
        unique_id.clone(),
        TriggerMessageRequest::new(kind, 0),
    );
    let text = match Frame::Call(call).encode() {
        Ok(text) => text,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::fail(e.to_string())),
            )
                .into_response();
        }
    };

    if let Err(e) = session
        .store()
        .put(&unique_id, CorrelationEntry::sent(TRIGGER_MESSAGE, &text))
    {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::fail(e.to_string())),
        )
            .into_response();
    }
    if let Err(e) = session.enqueue(&unique_id) {
        let _ = session.store().remove(&unique_id);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::fail(e.to_string())),
        )
            .into_response();
    }

    info!(device_id = %device_id, unique_id = %unique_id, requested = %requested, "trigger queued");
    (StatusCode::OK, Json(ApiResponse::success(unique_id))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AllowAll;
    use crate::config::DeviceConfig;
    use crate::correlation::EntryStatus;

    fn test_state() -> AppState {
        let mut config = ServerConfig::default();
        config.devices.insert(
            "CP-0001".into(),
            DeviceConfig {
                auth_token: "sesame".into(),
                heartbeat_interval: 300,
            },
        );
        AppState {
            config: Arc::new(config),
            registry: Arc::new(actions::default_registry()),
            sessions: Arc::new(SessionRegistry::new()),
            authorizer: Arc::new(AllowAll),
        }
    }

    async fn serve(state: AppState) -> String {
        let router = build_router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_api_response_envelope_shape() {
        let success = serde_json::to_value(ApiResponse::success("id-1")).unwrap();
        assert_eq!(success["status"], "success");
        assert_eq!(success["reference"], "id-1");
        assert_eq!(success["description"], "");

        let fail = serde_json::to_value(ApiResponse::fail("nope")).unwrap();
        assert_eq!(fail["status"], "fail");
        assert_eq!(fail["reference"], "");
        assert_eq!(fail["description"], "nope");
    }

    #[tokio::test]
    async fn test_device_status_unknown_device() {
        let base = serve(test_state()).await;
        let response = reqwest::get(format!("{}/api/devices/CP-9999", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);

        let envelope: ApiResponse = response.json().await.unwrap();
        assert_eq!(envelope.status, "fail");
    }

    #[tokio::test]
    async fn test_device_status_known_but_disconnected() {
        let base = serve(test_state()).await;
        let response = reqwest::get(format!("{}/api/devices/CP-0001", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["device_id"], "CP-0001");
        assert_eq!(body["connected"], false);
        assert_eq!(body["authorized"], false);
    }

    #[tokio::test]
    async fn test_message_status_without_session() {
        let base = serve(test_state()).await;
        let response = reqwest::get(format!("{}/api/devices/CP-0001/messages/id-1", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_message_status_returns_entry() {
        let state = test_state();
        let (session, _rx) = crate::session::tests::test_session("CP-0001");
        session
            .store()
            .put("id-1", CorrelationEntry::sent(TRIGGER_MESSAGE, "[2,...]"))
            .unwrap();
        state.sessions.register(session).unwrap();

        let base = serve(state).await;
        let response = reqwest::get(format!("{}/api/devices/CP-0001/messages/id-1", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["action"], TRIGGER_MESSAGE);
        assert_eq!(body["status"], "New");
    }

    #[tokio::test]
    async fn test_trigger_rejects_unknown_message_type() {
        let base = serve(test_state()).await;
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/api/devices/CP-0001/trigger/Reset", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_trigger_requires_live_session() {
        let base = serve(test_state()).await;
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/api/devices/CP-0001/trigger/Heartbeat", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_trigger_queues_call_for_connected_device() {
        let state = test_state();
        let (session, mut outbound_rx) = crate::session::tests::test_session("CP-0001");
        state.sessions.register(Arc::clone(&session)).unwrap();

        let base = serve(state).await;
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/api/devices/CP-0001/trigger/Heartbeat", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let envelope: ApiResponse = response.json().await.unwrap();
        assert_eq!(envelope.status, "success");
        assert!(!envelope.reference.is_empty());

        // The call landed in the store and its token reached the outbound flow
        let token = outbound_rx.recv().await.unwrap();
        assert_eq!(token, envelope.reference);
        let entry = session.store().get(&token).unwrap();
        assert_eq!(entry.action, TRIGGER_MESSAGE);
        assert_eq!(entry.status, EntryStatus::New);
        assert!(entry.sent_text.contains("TriggerMessage"));
    }

    // ==================== WebSocket End-to-End Tests ====================

    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite;

    fn ws_url(base: &str, device_id: &str) -> String {
        format!("{}/ocpp/{}", base.replace("http://", "ws://"), device_id)
    }

    fn handshake_status(error: tungstenite::Error) -> Option<u16> {
        match error {
            tungstenite::Error::Http(response) => Some(response.status().as_u16()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_ws_upgrade_refused_for_unknown_device() {
        let base = serve(test_state()).await;
        let error = connect_async(ws_url(&base, "CP-9999")).await.unwrap_err();
        assert_eq!(handshake_status(error), Some(404));
    }

    #[tokio::test]
    async fn test_ws_session_answers_boot_notification() {
        let base = serve(test_state()).await;
        let (mut socket, _) = connect_async(ws_url(&base, "CP-0001")).await.unwrap();

        socket
            .send(tungstenite::Message::Text(
                "[2,\"boot-1\",\"BootNotification\",{\"chargePointVendor\":\"VendorX\"}]".into(),
            ))
            .await
            .unwrap();

        let reply = tokio::time::timeout(std::time::Duration::from_secs(2), socket.next())
            .await
            .expect("no response from session")
            .unwrap()
            .unwrap();
        let frame = Frame::decode(reply.to_text().unwrap()).unwrap();
        assert_eq!(frame.unique_id(), "boot-1");
        let Frame::CallResult(result) = frame else {
            panic!("expected a CallResult");
        };
        assert_eq!(result.payload["status"], "Accepted");
    }

    #[tokio::test]
    async fn test_ws_duplicate_device_is_refused() {
        let base = serve(test_state()).await;
        let (_live, _) = connect_async(ws_url(&base, "CP-0001")).await.unwrap();

        // Give the first session a moment to register.
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let error = connect_async(ws_url(&base, "CP-0001")).await.unwrap_err();
        assert_eq!(handshake_status(error), Some(409));
    }
}
