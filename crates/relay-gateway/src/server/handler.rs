//! WebSocket handler
//!
//! Authenticates the upgrade request, then runs one reader, one writer and
//! one heartbeat task per connection. The first task to finish triggers the
//! common teardown.

use super::{ApiError, GatewayState};
use crate::connection::{run_heartbeat, Connection, Outbound};
use crate::protocol::CloseCode;
use crate::router::RouterError;
use axum::{
    extract::{
        ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use relay_common::{AppError, Credentials};
use relay_core::PrincipalId;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How long the writer may take to flush a close frame during teardown
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Query parameters of the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    /// Bearer token (JWT mode)
    pub token: Option<String>,
    /// Declared principal (trusted mode)
    pub user_id: Option<String>,
    /// Deliver the offline queue once connected
    #[serde(default)]
    pub resume: bool,
}

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Response {
    let credentials = Credentials {
        token: params.token,
        user_id: params.user_id,
    };

    let principal = match state.authenticator().authenticate(&credentials) {
        Ok(principal) => principal,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected WebSocket upgrade");
            return ApiError::from(AppError::from(e)).into_response();
        }
    };

    let resume = params.resume;
    ws.on_upgrade(move |socket| handle_socket(state, socket, principal, resume))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, principal: PrincipalId, resume: bool) {
    let (tx, rx) = mpsc::channel::<Outbound>(state.relay().outbound_buffer.max(1));
    let connection = Connection::new(principal, tx);
    let session_id = connection.session_id().to_string();

    tracing::info!(
        principal_id = %connection.principal(),
        session_id = %session_id,
        "WebSocket connection established"
    );

    let (ws_sink, mut ws_stream) = socket.split();

    // Writer starts first so a resume drain has somewhere to go
    let mut send_task = tokio::spawn(write_loop(
        ws_sink,
        rx,
        connection.subscribe_close(),
        session_id.clone(),
    ));

    if let Err(e) = state.router().connect(&connection, resume).await {
        let code = match e {
            RouterError::AlreadyConnected(_) => CloseCode::Rejected,
            _ => CloseCode::UnknownError,
        };
        tracing::info!(session_id = %session_id, error = %e, "Connection refused");
        connection.close(code).ok();
        finish_writer(&mut send_task).await;
        connection.mark_closed();
        return;
    }

    let router = state.router().clone();
    let connection_recv = connection.clone();
    let session_id_recv = session_id.clone();

    // Inbound frames are handled in arrival order on this task
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => {
                    if let Err(e) = router.handle_frame(&connection_recv, &text).await {
                        tracing::debug!(
                            session_id = %session_id_recv,
                            error = %e,
                            "Dropped undecodable frame"
                        );
                    }
                }
                Ok(WsMessage::Binary(_)) => {
                    tracing::debug!(session_id = %session_id_recv, "Binary frames not supported");
                    connection_recv.close(CloseCode::PolicyViolation).ok();
                    return;
                }
                Ok(WsMessage::Ping(_)) => {
                    tracing::trace!(session_id = %session_id_recv, "Ping received");
                }
                Ok(WsMessage::Pong(_)) => {
                    connection_recv.record_liveness();
                    tracing::trace!(session_id = %session_id_recv, "Pong received");
                }
                Ok(WsMessage::Close(_)) => {
                    tracing::info!(session_id = %session_id_recv, "Client closed connection");
                    return;
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id_recv, error = %e, "WebSocket error");
                    return;
                }
            }
        }
    });

    let mut heartbeat_task = tokio::spawn(run_heartbeat(connection.clone(), state.heartbeat()));

    tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(session_id = %session_id, "Receive task ended");
        }
        _ = &mut send_task => {
            tracing::debug!(session_id = %session_id, "Send task ended");
        }
        exit = &mut heartbeat_task => {
            tracing::debug!(session_id = %session_id, exit = ?exit.ok(), "Heartbeat task ended");
        }
    }

    recv_task.abort();
    heartbeat_task.abort();
    state.router().disconnect(&connection);

    if connection.close_reason().is_some() {
        finish_writer(&mut send_task).await;
    } else {
        send_task.abort();
    }

    tracing::info!(
        principal_id = %connection.principal(),
        session_id = %session_id,
        close_code = ?connection.close_reason().map(CloseCode::as_u16),
        "Connection cleaned up"
    );
}

/// Give the writer a moment to send its close frame, then stop it
async fn finish_writer(send_task: &mut tokio::task::JoinHandle<()>) {
    if tokio::time::timeout(CLOSE_GRACE, &mut *send_task).await.is_err() {
        send_task.abort();
    }
}

/// Sole owner of the socket sink: writes queued frames and the close frame
async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut rx: mpsc::Receiver<Outbound>,
    mut close_rx: watch::Receiver<Option<CloseCode>>,
    session_id: String,
) {
    loop {
        tokio::select! {
            biased;

            code = next_close(&mut close_rx) => {
                if let Some(code) = code {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    };
                    if sink.send(WsMessage::Close(Some(frame))).await.is_err() {
                        tracing::debug!(session_id = %session_id, "Failed to send close frame");
                    }
                }
                break;
            }

            item = rx.recv() => {
                let frame = match item {
                    Some(Outbound::Text(text)) => WsMessage::Text(text),
                    Some(Outbound::Ping) => WsMessage::Ping(Vec::new()),
                    None => break,
                };
                if sink.send(frame).await.is_err() {
                    tracing::warn!(session_id = %session_id, "Failed to send message to WebSocket");
                    break;
                }
            }
        }
    }

    sink.close().await.ok();
}

/// Resolves with the requested close code, or `None` once the connection is gone
async fn next_close(close_rx: &mut watch::Receiver<Option<CloseCode>>) -> Option<CloseCode> {
    close_rx
        .wait_for(Option::is_some)
        .await
        .ok()
        .and_then(|code| *code)
}
