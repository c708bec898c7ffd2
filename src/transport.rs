//! Text-frame transport seam.
//!
//! The connection manager talks to a [`Connector`] that yields fresh
//! [`Transport`]s on each attempt. Production uses a WebSocket; tests script
//! their own.

use async_trait::async_trait;
use derive_more::{Display, Error};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, trace};
use url::Url;

/// Transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    /// Could not establish the connection.
    #[display("Connect failed: {_0}")]
    Connect(#[error(not(source))] String),
    /// Sending a frame failed.
    #[display("Send failed: {_0}")]
    Send(#[error(not(source))] String),
    /// Receiving a frame failed.
    #[display("Receive failed: {_0}")]
    Receive(#[error(not(source))] String),
}

/// A connected, bidirectional text channel.
#[async_trait]
pub trait Transport: Send {
    /// Sends one text message.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Receives the next text message. `None` means the peer closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Closes the channel.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new transport.
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError>;
}

/// Connects to a WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
}

impl WebSocketConnector {
    /// Creates a connector for `url` (`ws://` or `wss://`).
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!("WebSocket connected");
        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// WebSocket transport carrying one text message per frame.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_string())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Server closed WebSocket");
                    return None;
                }
                Ok(other) => trace!(?other, "Ignoring control frame"),
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}
