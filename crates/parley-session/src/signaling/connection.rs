//! Background WebSocket connection loop with bounded auto-reconnect.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parley_common::SignalingError;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handler::HandlerRegistry;
use super::types::{ConnectionStatus, FailureReason, SignalingConfig};
use crate::protocol::InboundEvent;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything the loop shares with the owning channel.
pub(crate) struct LoopContext {
    pub(crate) config: SignalingConfig,
    pub(crate) handlers: Arc<HandlerRegistry>,
    pub(crate) status: Arc<watch::Sender<ConnectionStatus>>,
}

impl LoopContext {
    fn publish(&self, status: ConnectionStatus) {
        debug!(status = %status, "Signaling status changed");
        self.status.send_replace(status);
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

/// Open one authenticated socket, bounded by `connect_timeout`.
pub(crate) async fn open_socket(
    config: &SignalingConfig,
    token: &str,
) -> Result<WsStream, SignalingError> {
    let url = config.ws_url(token);
    info!(url = %config.url, "Connecting to signaling server");

    match time::timeout(config.connect_timeout, tokio_tungstenite::connect_async(url)).await {
        Ok(Ok((ws, _))) => Ok(ws),
        Ok(Err(WsError::Http(response)))
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Err(SignalingError::Auth(format!(
                "server rejected token (HTTP {})",
                response.status().as_u16()
            )))
        }
        Ok(Err(e)) => Err(SignalingError::Connect(e.to_string())),
        Err(_elapsed) => Err(SignalingError::Connect(format!(
            "timed out after {}s",
            config.connect_timeout.as_secs_f32()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

enum SessionEnd {
    Shutdown,
    Dropped,
}

/// Drive an established socket until shutdown, reconnecting after
/// unexpected drops.
pub(crate) async fn connection_loop(
    ctx: LoopContext,
    ws: WsStream,
    mut outbound_rx: mpsc::Receiver<String>,
    shutdown: CancellationToken,
    token: String,
) {
    let mut ws = ws;
    loop {
        if let SessionEnd::Shutdown = run_session(&ctx, ws, &mut outbound_rx, &shutdown).await {
            ctx.publish(ConnectionStatus::Disconnected);
            return;
        }

        match reconnect(&ctx, &shutdown, &token).await {
            Some(next) => {
                info!("Signaling connection restored");
                ctx.publish(ConnectionStatus::Connected);
                ws = next;
            }
            None => return,
        }
    }
}

/// Retry with exponential backoff. Publishes the terminal status itself
/// when it gives up.
async fn reconnect(
    ctx: &LoopContext,
    shutdown: &CancellationToken,
    token: &str,
) -> Option<WsStream> {
    let max_attempts = ctx.config.max_reconnect_attempts;
    let mut delay = ctx.config.reconnect_delay;

    for attempt in 1..=max_attempts {
        ctx.publish(ConnectionStatus::Reconnecting {
            attempt,
            max_attempts,
        });
        info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting to signaling server");

        tokio::select! {
            _ = shutdown.cancelled() => {
                ctx.publish(ConnectionStatus::Disconnected);
                return None;
            }
            _ = time::sleep(delay) => {}
        }
        delay = (delay * 2).min(ctx.config.max_reconnect_delay);

        let result = tokio::select! {
            _ = shutdown.cancelled() => {
                ctx.publish(ConnectionStatus::Disconnected);
                return None;
            }
            result = open_socket(&ctx.config, token) => result,
        };
        match result {
            Ok(ws) => return Some(ws),
            Err(SignalingError::Auth(reason)) => {
                warn!(attempt, reason = %reason, "Token rejected while reconnecting");
                ctx.publish(ConnectionStatus::Failed(FailureReason::AuthFailed));
                return None;
            }
            Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
        }
    }

    warn!(attempts = max_attempts, "Giving up on signaling server");
    ctx.publish(ConnectionStatus::Failed(FailureReason::GaveUp));
    None
}

async fn run_session(
    ctx: &LoopContext,
    ws: WsStream,
    outbound_rx: &mut mpsc::Receiver<String>,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let (mut sink, mut stream) = ws.split();
    let period = ctx.config.heartbeat_interval;
    let mut heartbeat = time::interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.send(WsMessage::Close(None)).await;
                return SessionEnd::Shutdown;
            }

            outbound = outbound_rx.recv() => {
                let Some(frame) = outbound else {
                    return SessionEnd::Shutdown;
                };
                if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                    warn!(error = %e, "Failed to write signaling frame");
                    return SessionEnd::Dropped;
                }
            }

            _ = heartbeat.tick() => {
                if sink.send(WsMessage::Ping(Default::default())).await.is_err() {
                    warn!("Heartbeat failed");
                    return SessionEnd::Dropped;
                }
            }

            frame = stream.next() => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => deliver(ctx, &text),
                    Some(Ok(WsMessage::Close(_))) | None => {
                        info!("Signaling server closed connection");
                        return SessionEnd::Dropped;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}

fn deliver(ctx: &LoopContext, text: &str) {
    match serde_json::from_str::<InboundEvent>(text) {
        Ok(InboundEvent::Unknown) => debug!("Ignoring unknown signaling event"),
        Ok(event) => {
            ctx.handlers.dispatch(&event);
        }
        Err(e) => debug!(error = %e, "Unrecognized signaling frame"),
    }
}
