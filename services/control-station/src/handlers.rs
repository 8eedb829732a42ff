use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use skyfleet_control::{ControlError, ControlPlane};
use skyfleet_domain::NewTask;

const WS_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "control-station",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Map a control plane error to an HTTP response. Validation errors
/// carry their reason; internal failures are logged in full and
/// reported generically.
fn error_response(err: ControlError) -> Response {
    if err.is_validation() {
        return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
    }
    match err {
        ControlError::Delivery(e) => {
            error!("Command delivery failed: {}", e);
            (StatusCode::BAD_GATEWAY, "Command delivery failed").into_response()
        }
        err => {
            error!("Internal failure: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                StatusCode::INTERNAL_SERVER_ERROR
                    .canonical_reason()
                    .unwrap_or("Internal Server Error"),
            )
                .into_response()
        }
    }
}

pub async fn list_missions(State(plane): State<Arc<ControlPlane>>) -> Json<Value> {
    Json(json!(plane.list_missions().await))
}

#[derive(Deserialize)]
pub struct CreateMissionRequest {
    slug: String,
    name: String,
    #[serde(default)]
    allowed_ssh_keys: Vec<String>,
}

pub async fn create_mission(
    State(plane): State<Arc<ControlPlane>>,
    Json(body): Json<CreateMissionRequest>,
) -> Response {
    match plane
        .create_mission(&body.slug, &body.name, &body.allowed_ssh_keys)
        .await
    {
        Ok(endpoint) => Json(json!({
            "slug": body.slug,
            "store_address": endpoint.address,
        }))
        .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_mission(
    State(plane): State<Arc<ControlPlane>>,
    Path(slug): Path<String>,
) -> Response {
    match plane.read_mission(&slug).await {
        Ok(snapshot) => Json(json!(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn delete_mission(
    State(plane): State<Arc<ControlPlane>>,
    Path(slug): Path<String>,
) -> Response {
    match plane.delete_mission(&slug).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
pub struct AssignDroneRequest {
    device_id: String,
}

pub async fn assign_drone(
    State(plane): State<Arc<ControlPlane>>,
    Path(slug): Path<String>,
    Json(body): Json<AssignDroneRequest>,
) -> Response {
    match plane.assign_drone(&slug, &body.device_id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn remove_drone(
    State(plane): State<Arc<ControlPlane>>,
    Path((slug, device_id)): Path<(String, String)>,
) -> Response {
    match plane.remove_drone(&slug, &device_id).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn add_task(
    State(plane): State<Arc<ControlPlane>>,
    Path(slug): Path<String>,
    Json(task): Json<NewTask>,
) -> Response {
    match plane.add_task(&slug, task).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn get_backlog(
    State(plane): State<Arc<ControlPlane>>,
    Path(slug): Path<String>,
) -> Response {
    match plane.get_backlog(&slug).await {
        Ok(backlog) => Json(json!(backlog)).into_response(),
        Err(ControlError::UnknownMission(_)) => {
            (StatusCode::NOT_FOUND, "Mission not found").into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Upgrade to the persistent duplex event feed.
pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(plane): State<Arc<ControlPlane>>,
) -> Response {
    ws.on_upgrade(move |socket| run_subscriber(socket, plane))
}

/// Pump hub events into one websocket connection.
///
/// Ends when the peer closes, when a write fails, or when the hub
/// ejects this subscriber for not keeping up with its mailbox.
async fn run_subscriber(socket: WebSocket, plane: Arc<ControlPlane>) {
    let (mut sink, mut stream) = socket.split();
    let mut subscription = plane.hub().subscribe();

    loop {
        tokio::select! {
            incoming = stream.next() => match incoming {
                None | Some(Ok(Message::Close(_))) => {
                    info!("Websocket subscriber disconnected");
                    break;
                }
                Some(Err(e)) => {
                    info!("Websocket receive failed: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            outgoing = subscription.recv() => match outgoing {
                Some(event) => {
                    let write = tokio::time::timeout(
                        WS_WRITE_TIMEOUT,
                        sink.send(Message::Text(event.to_string())),
                    );
                    match write.await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            info!("Write to websocket failed: {}", e);
                            break;
                        }
                        Err(_) => {
                            info!("Write to websocket timed out");
                            break;
                        }
                    }
                }
                None => {
                    // Ejected by the hub: mailbox overflowed.
                    let _ = sink
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::POLICY,
                            reason: "connection too slow to keep up with messages".into(),
                        })))
                        .await;
                    break;
                }
            },
        }
    }
}
