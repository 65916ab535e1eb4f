//! Transport traits and the WebSocket implementation.
//!
//! The session logic is written against two small traits:
//!
//! - [`Transport`] - one live duplex text-frame connection
//! - [`Connector`] - dials a fresh [`Transport`] per attempt
//!
//! The connector seam exists because reconnection must be able to re-dial:
//! a closed WebSocket stream cannot be reopened, so every attempt gets a new
//! transport. It also lets tests drive the session with scripted transports
//! instead of a live server.
//!
//! [`WsConnector`] is the production implementation over `tokio-tungstenite`.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// The stream type produced by a client-side WebSocket handshake.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// Transport
// ============================================================================

/// One live duplex connection carrying text frames.
#[async_trait]
pub trait Transport: Send {
    /// Writes one text frame.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Reads the next text frame.
    ///
    /// Returns `None` once the connection has closed; control frames are
    /// consumed internally and never surface here.
    async fn recv(&mut self) -> Option<Result<String>>;

    /// Closes the connection. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// Connector
// ============================================================================

/// Dials a fresh [`Transport`] for each connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the dial or handshake fails.
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// WsConnector
// ============================================================================

/// Production connector over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>> {
        debug!(url, "dialing chat endpoint");

        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| Error::connection(format!("dial {url} failed: {e}")))?;

        debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = stream.split();
        Ok(Box::new(WsTransport { sink, stream }))
    }
}

// ============================================================================
// WsTransport
// ============================================================================

/// A live WebSocket connection split into sink and stream halves.
struct WsTransport {
    /// Outbound half.
    sink: SplitSink<WsStream, Message>,
    /// Inbound half.
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        // Skip control frames; only text frames carry protocol traffic.
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),

                Ok(Message::Close(frame)) => {
                    debug!(?frame, "close frame received");
                    return None;
                }

                // Ping/Pong are handled by the library; binary frames are
                // not part of this protocol.
                Ok(other) => {
                    trace!(kind = ?other, "ignoring non-text frame");
                }

                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,

                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.sink.close().await {
            Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
