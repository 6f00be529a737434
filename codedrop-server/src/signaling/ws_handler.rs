use crate::SignalingService;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use codedrop_core::{HandleId, ServerFrame, SignalError, SignalRequest, SignalResponse};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

/// `GET /ws`: every socket becomes one anonymous handle.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let (mut sender, mut receiver) = socket.split();
    let (handle, mut outbox) = service.connect();

    info!("New WebSocket connection: {}", handle);

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize frame for {}: {}", handle, e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        let (id, response) = process_text(&service, handle, &text);
                        service.send_frame(handle, ServerFrame::Reply { id, response });
                    }
                    Message::Close(_) => break,
                    // Ping/Pong are answered by axum, binary carries nothing here
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.disconnect(handle);
    info!("WebSocket disconnected: {}", handle);
}

/// Parse one text frame and run it. Malformed input never closes the socket.
fn process_text(service: &SignalingService, handle: HandleId, text: &str) -> (u64, SignalResponse) {
    let value: serde_json::Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparsable frame from {}: {}", handle, e);
            let err = SignalError::InvalidPayload(format!("malformed JSON: {}", e));
            return (0, SignalResponse::failure(&err));
        }
    };

    let id = value.get("id").and_then(|id| id.as_u64()).unwrap_or(0);

    match serde_json::from_value::<SignalRequest>(value) {
        Ok(request) => {
            debug!("{} #{} from {}", request.action.name(), id, handle);
            (id, service.handle_request(handle, request))
        }
        Err(e) => {
            warn!("Invalid request from {}: {}", handle, e);
            let err = SignalError::InvalidPayload(e.to_string());
            (id, SignalResponse::failure(&err))
        }
    }
}
