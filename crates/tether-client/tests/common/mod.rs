//! Channel-backed fake transport shared by the integration tests.
//!
//! The fake gives each test a server-side view of the socket: everything the
//! client writes (text frames and the close) arrives on `outbound` in order,
//! and frames pushed into `inbound` reach the client's read half. Dropping
//! the `inbound` sender ends the stream, which is how tests simulate the
//! remote closing the connection.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use tether_client::{Connector, SocketSink, SocketStream, TransportError};

/// What the fake server observed from the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    /// A text frame.
    Text(String),
    /// The client closed the socket.
    Close,
}

/// Server-side handle for one fake connection.
pub struct FakeServer {
    /// Frames the client wrote, in order.
    pub outbound: mpsc::UnboundedReceiver<SinkEvent>,
    /// Feed of frames to the client; drop to end the stream.
    pub inbound: Option<mpsc::UnboundedSender<Result<String, TransportError>>>,
}

impl FakeServer {
    /// Next thing the client wrote.
    pub async fn recv(&mut self) -> SinkEvent {
        self.outbound.recv().await.expect("client side gone")
    }

    /// Next text frame the client wrote; panics on a close.
    pub async fn recv_text(&mut self) -> String {
        match self.recv().await {
            SinkEvent::Text(text) => text,
            SinkEvent::Close => panic!("expected a text frame, got close"),
        }
    }

    /// Next text frame, parsed as JSON.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = self.recv_text().await;
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Whatever the client has written so far, without waiting.
    pub fn drain(&mut self) -> Vec<SinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.outbound.try_recv() {
            events.push(event);
        }
        events
    }

    /// Send a frame to the client.
    pub fn push(&self, text: impl Into<String>) {
        self.inbound
            .as_ref()
            .expect("inbound already closed")
            .send(Ok(text.into()))
            .expect("client read half gone");
    }

    /// Surface a read error to the client.
    pub fn push_error(&self, context: &str) {
        self.inbound
            .as_ref()
            .expect("inbound already closed")
            .send(Err(TransportError::Receive(context.into())))
            .expect("client read half gone");
    }

    /// End the inbound stream, as if the remote closed the socket.
    pub fn close_inbound(&mut self) {
        let _ = self.inbound.take();
    }
}

struct FakeSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

#[async_trait]
impl SocketSink for FakeSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.tx
            .send(SinkEvent::Text(text.to_owned()))
            .map_err(|_| TransportError::Send("fake server gone".into()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx
            .send(SinkEvent::Close)
            .map_err(|_| TransportError::Send("fake server gone".into()))
    }
}

struct FakeStream {
    rx: mpsc::UnboundedReceiver<Result<String, TransportError>>,
}

#[async_trait]
impl SocketStream for FakeStream {
    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        self.rx.recv().await
    }
}

/// A connector with a fixed queue of prepared connections.
pub struct FakeConnector {
    prepared: Mutex<VecDeque<(FakeSink, FakeStream)>>,
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FakeConnector {
    /// One prepared connection.
    pub fn single() -> (Arc<Self>, FakeServer) {
        let (connector, mut servers) = Self::with_connections(1);
        (connector, servers.remove(0))
    }

    /// `count` prepared connections, handed out in order.
    pub fn with_connections(count: usize) -> (Arc<Self>, Vec<FakeServer>) {
        let mut prepared = VecDeque::new();
        let mut servers = Vec::new();
        for _ in 0..count {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            prepared.push_back((FakeSink { tx: out_tx }, FakeStream { rx: in_rx }));
            servers.push(FakeServer {
                outbound: out_rx,
                inbound: Some(in_tx),
            });
        }
        let connector = Arc::new(Self {
            prepared: Mutex::new(prepared),
            attempts: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        });
        (connector, servers)
    }

    /// Every connect fails.
    pub fn refusing() -> Arc<Self> {
        let (connector, _servers) = Self::with_connections(0);
        connector
    }

    /// How many times `connect` was called.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// The URL of the most recent connect attempt.
    pub fn last_url(&self) -> Option<String> {
        self.urls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError> {
        let _ = self.attempts.fetch_add(1, Ordering::Relaxed);
        self.urls.lock().unwrap().push(url.to_owned());
        let (sink, stream) = self
            .prepared
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| TransportError::Connect("connection refused".into()))?;
        Ok((Box::new(sink), Box::new(stream)))
    }
}

/// A connector whose `connect` never completes; for timeout tests.
pub struct HangingConnector;

#[async_trait]
impl Connector for HangingConnector {
    async fn connect(
        &self,
        _url: &str,
    ) -> Result<(Box<dyn SocketSink>, Box<dyn SocketStream>), TransportError> {
        futures::future::pending().await
    }
}
