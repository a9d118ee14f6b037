//! WebSocket upgrade handler for `GET /ws/collaborate/{session_id}`.
//!
//! The socket is always upgraded first; authentication and admission run
//! afterwards so that refusals reach the client as close codes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::Response;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use storyhub_core::error::AppError;
use storyhub_core::types::id::SessionId;
use storyhub_realtime::connection::handle::Frame;
use storyhub_realtime::{CloseReason, ConnectionHandle};

use crate::state::AppState;

/// How long the writer may take to flush and close once the reader is done.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Query parameters accepted on the handshake.
#[derive(Debug, Default, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token, when not sent as a bearer header.
    pub token: Option<String>,
}

/// GET /ws/collaborate/{session_id}?token={jwt}
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<WsQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = query
        .token
        .or_else(|| bearer.map(|TypedHeader(Authorization(b))| b.token().to_string()));
    let session_id = session_id.parse::<SessionId>().ok();
    let max_message = state.engine.config().max_message_bytes;

    ws.max_message_size(max_message.saturating_add(1024))
        .on_upgrade(move |socket| handle_socket(state, session_id, token, socket))
}

async fn handle_socket(
    state: AppState,
    session_id: Option<SessionId>,
    token: Option<String>,
    mut socket: WebSocket,
) {
    let user = match state.authenticator.authenticate(token.as_deref()) {
        Ok(user) => user,
        Err(reason) => {
            refuse(&mut socket, reason).await;
            return;
        }
    };
    let Some(session_id) = session_id else {
        refuse(&mut socket, CloseReason::SessionNotFound).await;
        return;
    };

    let (handle, outbound) = match state.engine.connect(session_id, &user).await {
        Ok(admitted) => admitted,
        Err(reason) => {
            info!(
                session_id = %session_id,
                user_id = %user.user_id,
                code = reason.code(),
                reason = reason.reason(),
                "WebSocket handshake refused"
            );
            refuse(&mut socket, reason).await;
            return;
        }
    };

    let conn_id = handle.id;
    info!(
        conn_id = %conn_id,
        session_id = %session_id,
        user_id = %user.user_id,
        "WebSocket connection established"
    );

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, outbound, Arc::clone(&handle)));
    let shutdown = handle.shutdown_token();

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(Message::Text(text))) => {
                state.engine.handle_inbound(conn_id, text.as_str()).await;
            }
            Some(Ok(Message::Binary(_))) => {
                state.engine.reply_error(
                    conn_id,
                    &AppError::validation("Binary frames are not supported"),
                );
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                debug!(conn_id = %conn_id, error = %e, "WebSocket read error");
                break;
            }
        }
    }

    state.engine.disconnect(conn_id).await;
    shutdown.cancel();
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
        warn!(conn_id = %conn_id, "WebSocket writer did not finish in time");
    }

    info!(
        conn_id = %conn_id,
        session_id = %session_id,
        user_id = %user.user_id,
        reason = handle.close_reason().map(CloseReason::reason).unwrap_or("client_closed"),
        "WebSocket connection closed"
    );
}

/// Drains the outbound queue into the socket until the handle shuts down.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Frame>,
    handle: Arc<ConnectionHandle>,
) {
    let shutdown = handle.shutdown_token();

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if sink.send(Message::Text(frame.as_ref().into())).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
        }
    }

    if let Some(reason) = handle.close_reason() {
        if reason.flushes_queue() {
            while let Ok(frame) = outbound.try_recv() {
                if sink.send(Message::Text(frame.as_ref().into())).await.is_err() {
                    return;
                }
            }
        }
        let _ = sink.send(close_message(reason)).await;
    }
    let _ = sink.close().await;
}

async fn refuse(socket: &mut WebSocket, reason: CloseReason) {
    let _ = socket.send(close_message(reason)).await;
}

fn close_message(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code(),
        reason: reason.reason().into(),
    }))
}
