//! The single live connection to the remote endpoint.
//!
//! [`Transport`] is the raw send/receive/close seam. [`Connection`] wraps one
//! and adds the close-once discipline: the first `close` wakes every pending
//! `send` and `receive` with [`TransportError::Closed`], so a receiver blocked
//! on a silent peer is never left hanging.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{SetupError, TransportError};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    async fn receive(&self) -> Result<String, TransportError>;

    /// Start an orderly shutdown of the underlying stream.
    async fn close(&self);
}

pub struct Connection {
    transport: Box<dyn Transport>,
    closed: CancellationToken,
    close_started: AtomicBool,
    close_timeout: Duration,
}

impl Connection {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            closed: CancellationToken::new(),
            close_started: AtomicBool::new(false),
            close_timeout: Config::default().close_timeout,
        }
    }

    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    pub async fn send(&self, text: &str) -> Result<(), TransportError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            result = self.transport.send(text) => result,
        }
    }

    pub async fn receive(&self) -> Result<String, TransportError> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            result = self.transport.receive() => result,
        }
    }

    /// Close the connection. Only the first call does anything; it returns
    /// `true`, every later or concurrent call returns `false`.
    pub async fn close(&self) -> bool {
        if self.close_started.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.closed.cancel();
        if tokio::time::timeout(self.close_timeout, self.transport.close())
            .await
            .is_err()
        {
            warn!(timeout = ?self.close_timeout, "close handshake timed out");
        }
        debug!("connection closed");
        true
    }

    #[cfg(test)]
    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport. Reader and writer halves are locked independently so
/// a pending receive never stalls a send.
pub struct WsTransport {
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WsTransport {
    pub fn new(ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.to_owned()))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn receive(&self) -> Result<String, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return Ok(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(frame))) => return Err(close_error(frame)),
                Some(Ok(_)) => continue,
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed))
                | None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(TransportError::Read(e.to_string())),
            }
        }
    }

    async fn close(&self) {
        let mut sink = self.sink.lock().await;
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            debug!(error = %e, "close frame not sent");
        }
        if let Err(e) = sink.close().await {
            debug!(error = %e, "sink close failed");
        }
    }
}

fn close_error(frame: Option<CloseFrame<'_>>) -> TransportError {
    match frame {
        Some(frame) if frame.code != CloseCode::Normal => TransportError::ClosedWith {
            code: frame.code.into(),
            reason: frame.reason.into_owned(),
        },
        _ => TransportError::Closed,
    }
}

/// Open the WebSocket described by `config`, carrying its headers on the
/// handshake request.
pub async fn dial(config: &Config) -> Result<Connection, SetupError> {
    if config.endpoint.trim().is_empty() {
        return Err(SetupError::EmptyEndpoint);
    }

    let mut request = config.endpoint.as_str().into_client_request().map_err(|source| {
        SetupError::InvalidEndpoint {
            endpoint: config.endpoint.clone(),
            source,
        }
    })?;
    for (name, value) in &config.headers {
        let header = HeaderName::from_bytes(name.as_bytes()).map_err(|e| SetupError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| SetupError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        request.headers_mut().append(header, value);
    }

    let (ws, response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(SetupError::Dial)?;
    info!(endpoint = %config.endpoint, status = %response.status(), "websocket connected");

    Ok(Connection::new(WsTransport::new(ws)).with_close_timeout(config.close_timeout))
}
