//! WebSocket client transport.
//!
//! Connects to an inspector backend over WebSocket and runs the event loop
//! that moves frames between the socket and a [`Connection`].
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - Incoming text frames, pushed to [`Connection::dispatch`]
//! - Outgoing envelopes queued by [`Transport::send_message`]
//! - Shutdown requested by [`Connection::disconnect`]
//!
//! When the loop ends it calls [`Connection::close`] once, with
//! `"websocket_closed"`, `"websocket_error: ..."` or `"disconnected"`.
//!
//! The loop only holds a weak handle. Once every [`Connection`] handle is
//! dropped the transport goes with it, and the loop closes the socket.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Request;
use crate::runtime::{Options, Registry};

use super::Transport;
use super::connection::{Connection, WeakConnection};

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Types
// ============================================================================

/// Internal commands for the event loop.
enum Outgoing {
    /// Write one serialized envelope.
    Text(String),
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// Transport writing envelopes to a WebSocket through its event loop.
///
/// # Example
///
/// ```ignore
/// let connection = WebSocketTransport::connect("ws://127.0.0.1:9222/devtools", &registry, Options::new()).await?;
/// connection.on_disconnect(|reason| eprintln!("closed: {reason}"));
/// ```
#[derive(Debug)]
pub struct WebSocketTransport {
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

impl WebSocketTransport {
    /// Connects to `url` and returns a connection bound to `registry`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `url` is not a `ws` or `wss` URL
    /// - [`Error::Connection`] if the handshake times out
    /// - [`Error::WebSocket`] if the handshake fails
    pub async fn connect(url: &str, registry: &Registry, options: Options) -> Result<Connection> {
        let parsed =
            Url::parse(url).map_err(|e| Error::config(format!("invalid WebSocket URL '{url}': {e}")))?;

        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "unsupported scheme '{}' in '{url}', expected ws or wss",
                parsed.scheme()
            )));
        }

        let (stream, _) = timeout(CONNECT_TIMEOUT, connect_async(parsed.as_str()))
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "handshake with {url} timed out after {}s",
                    CONNECT_TIMEOUT.as_secs()
                ))
            })??;

        debug!(%url, "WebSocket connected");
        Ok(Self::attach(stream, registry, options))
    }

    /// Builds a connection over an established WebSocket stream.
    ///
    /// Spawns the event loop task; must be called within a tokio runtime.
    pub fn attach<S>(stream: WebSocketStream<S>, registry: &Registry, options: Options) -> Connection
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let connection = registry.connect_with_options(Self { outgoing }, options);

        tokio::spawn(run_event_loop(stream, outgoing_rx, connection.downgrade()));

        connection
    }
}

impl Transport for WebSocketTransport {
    fn send_message(&self, request: &Request) {
        let text = match serde_json::to_string(request) {
            Ok(text) => text,
            Err(e) => {
                error!(id = request.id, error = %e, "Failed to serialize request");
                return;
            }
        };

        if self.outgoing.send(Outgoing::Text(text)).is_err() {
            warn!(id = request.id, method = %request.method, "Event loop gone, request dropped");
        }
    }

    fn shutdown(&self) {
        if self.outgoing.send(Outgoing::Shutdown).is_err() {
            debug!("Event loop already stopped, shutdown ignored");
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

async fn run_event_loop<S>(
    stream: WebSocketStream<S>,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
    connection: WeakConnection,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut ws_write, mut ws_read) = stream.split();

    let reason = loop {
        tokio::select! {
            // Incoming frames from the backend
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => match connection.upgrade() {
                        Some(connection) => connection.dispatch(text.as_str()),
                        None => {
                            let _ = ws_write.close().await;
                            break "dropped".to_string();
                        }
                    },

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break "websocket_closed".to_string();
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break format!("websocket_error: {e}");
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break "websocket_closed".to_string();
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Envelopes and shutdown from the connection
            command = outgoing.recv() => {
                match command {
                    Some(Outgoing::Text(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            error!(error = %e, "Failed to write frame");
                            break format!("websocket_error: {e}");
                        }
                        trace!("Frame written");
                    }

                    Some(Outgoing::Shutdown) => {
                        debug!("Shutdown requested");
                        let _ = ws_write.close().await;
                        break "disconnected".to_string();
                    }

                    // Every connection handle is gone
                    None => {
                        debug!("Connection dropped, closing socket");
                        let _ = ws_write.close().await;
                        break "dropped".to_string();
                    }
                }
            }
        }
    };

    if let Some(connection) = connection.upgrade() {
        connection.close(&reason);
    }
    debug!(%reason, "Event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
