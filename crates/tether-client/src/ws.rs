//! WebSocket transport over `tokio-tungstenite`.
//!
//! Binary frames that hold valid UTF-8 are surfaced as text — some mobile
//! clients of this protocol family send JSON in binary frames, and the
//! provider does the same on the way back. Ping/pong frames are answered by
//! the library and skipped here.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{Connector, SocketSink, SocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        let (tx, rx) = ws.split();
        Ok((Box::new(WsSink { tx }), Box::new(WsRead { rx })))
    }
}

struct WsSink {
    tx: SplitSink<WsStream, Message>,
}

#[async_trait]
impl SocketSink for WsSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx
            .send(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            })))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

struct WsRead {
    rx: SplitStream<WsStream>,
}

#[async_trait]
impl SocketStream for WsRead {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.rx.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                    Ok(s) => return Some(Ok(s.to_owned())),
                    Err(_) => {
                        debug!(len = data.len(), "skipping non-UTF8 binary frame");
                    }
                },
                Ok(Message::Close(_)) => return None,
                Ok(_) => {} // ping/pong/raw frames
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }
}
