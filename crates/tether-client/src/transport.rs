//! Transport seam — the socket contract this client consumes.
//!
//! The protocol cores never touch a concrete WebSocket library; they drive
//! these traits. A connection is handed out as split sink/stream halves so
//! the session task can await the next inbound frame while still writing
//! from other select arms. [`crate::ws::WsConnector`] is the production
//! implementation; tests substitute channel-backed fakes.

use async_trait::async_trait;

use crate::error::TransportError;

/// Write half of a socket.
#[async_trait]
pub trait SocketSink: Send {
    /// Send one UTF-8 text frame.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Close the connection with a normal-closure status code.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a socket.
#[async_trait]
pub trait SocketStream: Send {
    /// The next inbound text frame, in transport order.
    ///
    /// Returns `None` once the connection has ended (remote close or local
    /// close). A read error is surfaced once; the stream ends after it.
    async fn next_text(&mut self) -> Option<Result<String, TransportError>>;
}

/// Opens socket connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `url` and return the split halves.
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError>;
}
