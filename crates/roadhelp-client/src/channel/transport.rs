//! Outbound side of the realtime channel.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use roadhelp_core::config::RealtimeConfig;
use roadhelp_core::error::{AppError, ErrorKind};
use roadhelp_core::events::{ClientEvent, ServerEvent};
use roadhelp_core::result::AppResult;

use super::handlers::HandlerRegistry;

/// Carries client events to the dispatcher.
#[async_trait]
pub trait ChannelTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Queues one event for delivery.
    async fn send(&self, event: &ClientEvent) -> AppResult<()>;
}

/// WebSocket transport to the dispatcher.
///
/// Owns a writer task fed by a bounded queue and a reader task that
/// decodes server events into the handler registry. Both stop when the
/// transport is dropped.
#[derive(Debug)]
pub struct WsTransport {
    outbound: mpsc::Sender<String>,
    tasks: Vec<JoinHandle<()>>,
}

impl WsTransport {
    /// Connects as the holder of `token` and starts pumping frames.
    pub async fn connect(
        config: &RealtimeConfig,
        token: &str,
        handlers: Arc<HandlerRegistry>,
    ) -> AppResult<Self> {
        let url = format!("{}?token={}", config.url, token);
        let (stream, _) = connect_async(url.as_str()).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Transport,
                format!("Failed to connect to dispatcher at {}", config.url),
                e,
            )
        })?;
        info!(url = %config.url, "Realtime channel connected");

        let (mut ws_tx, mut ws_rx) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(config.channel_buffer_size);

        let writer = tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    warn!(error = %e, "Realtime send failed");
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        let pong_tx = outbound.clone();
        let reader = tokio::spawn(async move {
            while let Some(message) = ws_rx.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "Realtime receive failed");
                        break;
                    }
                };

                let event: ServerEvent = match serde_json::from_str(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        debug!(error = %e, "Ignoring undecodable frame");
                        continue;
                    }
                };

                match &event {
                    ServerEvent::Ping { timestamp } => {
                        let pong = ClientEvent::Pong {
                            timestamp: *timestamp,
                        };
                        if let Ok(frame) = serde_json::to_string(&pong) {
                            let _ = pong_tx.try_send(frame);
                        }
                    }
                    ServerEvent::Error { code, message } => {
                        warn!(code = %code, message = %message, "Dispatcher rejected a frame");
                    }
                    _ => {}
                }

                handlers.dispatch(&event);
            }
            info!("Realtime channel closed");
        });

        Ok(Self {
            outbound,
            tasks: vec![writer, reader],
        })
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn send(&self, event: &ClientEvent) -> AppResult<()> {
        let frame = serde_json::to_string(event)?;
        self.outbound
            .send(frame)
            .await
            .map_err(|_| AppError::transport("Realtime channel is closed"))
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
