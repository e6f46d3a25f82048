//! Chat session client.
//!
//! One [`ChatClient`] is long-lived and reused across reconnects; each
//! `connect` call tears down the previous session and spawns a fresh session
//! task. The task exclusively owns the socket halves, the pending-message
//! map, and the handshake continuation, and mutates them only from its own
//! select loop — retry timers and the public API reach it through a command
//! channel, which keeps every state transition linearizable from one
//! vantage point.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tether_wire::{
    Attachment, Auth, AuthResult, ClientFrame, DeviceId, ErrorCode, ErrorFrame, MessageId,
    OutboundMessage, ServerFrame, Typing, decode_server_frame, encode_client_frame,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, SessionError};
use crate::pending::PendingMessage;
use crate::state::{ChatEvent, ConnectionState, HandshakeInfo};
use crate::transport::{Connector, SocketSink, SocketStream};
use crate::ws::WsConnector;

/// Commands routed into the session task.
#[derive(Debug)]
pub(crate) enum Command {
    /// Queue a message as pending and transmit it.
    Transmit {
        /// Client message id.
        id: MessageId,
        /// Serialized frame; stored and resent verbatim.
        payload: String,
    },
    /// Retry-timer tick for a pending message.
    Retransmit {
        /// Client message id.
        id: MessageId,
    },
    /// Fire-and-forget frame (typing).
    Fire {
        /// Serialized frame.
        payload: String,
    },
}

/// Handle to a spawned session task.
struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Client for the provider's authenticated chat session.
pub struct ChatClient {
    connector: Arc<dyn Connector>,
    config: ClientConfig,
    base_url: Option<String>,
    device_id: DeviceId,
    state_tx: watch::Sender<ConnectionState>,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
    events_rx: Option<mpsc::UnboundedReceiver<ChatEvent>>,
    session: Option<SessionHandle>,
}

impl ChatClient {
    /// Create a client that connects through `connector`.
    #[must_use]
    pub fn new(
        connector: Arc<dyn Connector>,
        base_url: Option<String>,
        device_id: DeviceId,
        config: ClientConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            config,
            base_url,
            device_id,
            state_tx,
            events_tx,
            events_rx: Some(events_rx),
            session: None,
        }
    }

    /// Create a client over the production WebSocket transport.
    #[must_use]
    pub fn with_websocket(
        base_url: Option<String>,
        device_id: DeviceId,
        config: ClientConfig,
    ) -> Self {
        Self::new(Arc::new(WsConnector), base_url, device_id, config)
    }

    /// Subscribe to connection-state changes.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Take the inbound event stream. Yields `None` after the first call.
    ///
    /// The stream survives reconnects; events from every session of this
    /// client arrive on it in order.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ChatEvent>> {
        self.events_rx.take()
    }

    /// Open a socket, authenticate, and suspend until the handshake
    /// resolves.
    ///
    /// Any previous session is torn down first. On success the state is
    /// `Connected` and the returned [`HandshakeInfo`] carries the server's
    /// replay metadata; on failure the socket is closed and the error names
    /// why. There is deliberately no timeout on the handshake wait — wrap
    /// this call in `tokio::time::timeout` if one is wanted.
    #[instrument(skip_all, fields(device_id = %self.device_id))]
    pub async fn connect(
        &mut self,
        token: &str,
        last_message_id: Option<MessageId>,
    ) -> Result<HandshakeInfo, ClientError> {
        self.teardown_session().await;

        let url = resolve_ws_url(self.base_url.as_deref(), &self.config.ws_endpoint)
            .ok_or(ClientError::MissingBaseUrl)?;

        let (sink, stream) = self
            .connector
            .connect(&url)
            .await
            .map_err(ClientError::Transport)?;
        let _ = self.state_tx.send(ConnectionState::Connecting);
        info!(%url, "chat socket open");

        let auth = Auth::new(token.to_owned(), self.device_id.clone(), last_message_id);
        let auth_json = encode_client_frame(&ClientFrame::Auth(auth))?;

        let (auth_tx, auth_rx) = oneshot::channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = SessionTask {
            sink,
            stream,
            cmd_rx,
            cmd_tx: cmd_tx.clone(),
            cancel: cancel.clone(),
            pending: HashMap::new(),
            auth_slot: Some(auth_tx),
            state: self.state_tx.clone(),
            events: self.events_tx.clone(),
            retry_interval: self.config.retry_interval(),
        };
        let handle = tokio::spawn(task.run(auth_json));
        self.session = Some(SessionHandle {
            cmd_tx,
            cancel,
            task: handle,
        });

        match auth_rx.await {
            Ok(Ok(info)) => {
                info!(user_id = ?info.user_id, replay_count = ?info.replay_count, "session authenticated");
                Ok(info)
            }
            Ok(Err(e)) => Err(e),
            // The task never drops the slot unresolved, but a caller must
            // not be left waiting if it somehow dies.
            Err(_) => Err(ClientError::NotConnected),
        }
    }

    /// Queue a message for delivery and transmit it.
    ///
    /// `id` must carry the client `c_` prefix; anything else is rejected
    /// before any transport I/O. The payload is serialized exactly once here
    /// and retransmitted verbatim until the server acks it or fails it.
    /// Returns as soon as the message is queued — acknowledgment is not
    /// awaited.
    pub fn send(
        &self,
        id: MessageId,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> Result<(), ClientError> {
        if !id.has_client_prefix() {
            return Err(SessionError::InvalidMessageId(id.into_inner()).into());
        }
        let session = self.active_session()?;

        let frame = ClientFrame::Message(OutboundMessage {
            id: id.clone(),
            content: content.into(),
            attachments: if attachments.is_empty() {
                None
            } else {
                Some(attachments)
            },
        });
        let payload = encode_client_frame(&frame)?;

        session
            .cmd_tx
            .send(Command::Transmit { id, payload })
            .map_err(|_| ClientError::NotConnected)?;
        Ok(())
    }

    /// Send a typing indicator. Fire-and-forget; never retried.
    pub fn send_typing(&self, active: bool) -> Result<(), ClientError> {
        let session = self.active_session()?;
        let frame = ClientFrame::Typing(Typing { active, role: None });
        let payload = encode_client_frame(&frame)?;
        session
            .cmd_tx
            .send(Command::Fire { payload })
            .map_err(|_| ClientError::NotConnected)?;
        Ok(())
    }

    /// Tear down the active session, if any.
    ///
    /// Closes the socket with a normal-closure code, cancels every retry
    /// timer, clears the pending map, and publishes `Disconnected`.
    /// Idempotent — calling with nothing active is a no-op, and teardown
    /// happens inside the session task itself, so triggering it from code
    /// reacting to a dispatched event cannot deadlock.
    pub async fn disconnect(&mut self) {
        self.teardown_session().await;
    }

    async fn teardown_session(&mut self) {
        if let Some(handle) = self.session.take() {
            handle.cancel.cancel();
            let _ = handle.task.await;
        }
    }

    fn active_session(&self) -> Result<&SessionHandle, ClientError> {
        match &self.session {
            Some(handle) if !handle.cmd_tx.is_closed() => Ok(handle),
            _ => Err(ClientError::NotConnected),
        }
    }
}

/// Turn the configured provider base URL into the chat WebSocket URL.
///
/// `http`/`https` switch to `ws`/`wss`, explicit `ws`/`wss` pass through,
/// and the endpoint path is appended unless already present.
fn resolve_ws_url(base_url: Option<&str>, endpoint: &str) -> Option<String> {
    let base = base_url?.trim();
    if base.is_empty() {
        return None;
    }

    let switched = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_owned()
    } else {
        return None;
    };

    let trimmed = switched.trim_end_matches('/');
    if trimmed.ends_with(endpoint) {
        Some(trimmed.to_owned())
    } else {
        Some(format!("{trimmed}{endpoint}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session task
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the dispatch loop keeps running after a frame.
enum Flow {
    Continue,
    Stop,
}

/// The task that owns one socket's lifetime.
struct SessionTask {
    sink: Box<dyn SocketSink>,
    stream: Box<dyn SocketStream>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    pending: HashMap<MessageId, PendingMessage>,
    auth_slot: Option<oneshot::Sender<Result<HandshakeInfo, ClientError>>>,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<ChatEvent>,
    retry_interval: Duration,
}

impl SessionTask {
    #[instrument(skip_all)]
    async fn run(mut self, auth_json: String) {
        if let Err(e) = self.sink.send_text(&auth_json).await {
            warn!(error = %e, "auth send failed");
            self.resolve_auth(Err(ClientError::Transport(e)));
            self.shutdown(true).await;
            return;
        }

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    debug!("session cancelled");
                    self.resolve_auth(Err(ClientError::NotConnected));
                    self.shutdown(true).await;
                    break;
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => {
                        // Client handle dropped; same as an explicit
                        // disconnect.
                        self.resolve_auth(Err(ClientError::NotConnected));
                        self.shutdown(true).await;
                        break;
                    }
                },
                frame = self.stream.next_text() => match frame {
                    Some(Ok(text)) => {
                        if matches!(self.dispatch(&text).await, Flow::Stop) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "socket read failed");
                        self.resolve_auth(Err(ClientError::NotConnected));
                        self.shutdown(false).await;
                        break;
                    }
                    None => {
                        info!("socket closed by remote");
                        self.resolve_auth(Err(ClientError::NotConnected));
                        self.shutdown(false).await;
                        break;
                    }
                }
            }
        }
    }

    /// Release everything this session holds and publish `Disconnected`.
    ///
    /// Unacknowledged messages are dropped with their timers: the server
    /// does not replay unacked sends, so the caller resends after
    /// reconnecting.
    async fn shutdown(&mut self, close_socket: bool) {
        if close_socket {
            if let Err(e) = self.sink.close().await {
                debug!(error = %e, "socket close failed");
            }
        }
        for (_, pending) in self.pending.drain() {
            pending.abort_retry();
        }
        let _ = self.state.send(ConnectionState::Disconnected);
    }

    /// Resolve the handshake continuation. At most one resolution ever
    /// happens — `Option::take` turns later attempts into no-ops.
    fn resolve_auth(&mut self, result: Result<HandshakeInfo, ClientError>) {
        if let Some(slot) = self.auth_slot.take() {
            let _ = slot.send(result);
        }
    }

    /// Fatal session error: resolve any outstanding handshake, publish
    /// `Failed`, then tear down exactly once.
    async fn fail(&mut self, error: SessionError) {
        warn!(error = %error, "session failed");
        self.resolve_auth(Err(ClientError::Session(error.clone())));
        let _ = self.state.send(ConnectionState::Failed(error));
        self.shutdown(true).await;
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Transmit { id, payload } => {
                let entry = PendingMessage::new(
                    id.clone(),
                    payload,
                    self.retry_interval,
                    self.cmd_tx.clone(),
                );
                if let Some(previous) = self.pending.insert(id.clone(), entry) {
                    // Same id queued again: the old timer must not outlive
                    // its entry.
                    previous.abort_retry();
                }
                debug!(%id, "transmitting message");
                // A send failure leaves the entry pending; the retry timer
                // or closure cleanup deals with it.
                if let Some(pending) = self.pending.get(&id) {
                    if let Err(e) = self.sink.send_text(&pending.payload).await {
                        warn!(%id, error = %e, "transmit failed");
                    }
                }
            }
            Command::Retransmit { id } => {
                // A tick for an id that is no longer pending is stale.
                let Some(pending) = self.pending.get(&id) else {
                    return;
                };
                debug!(%id, "retransmitting unacknowledged message");
                if let Err(e) = self.sink.send_text(&pending.payload).await {
                    warn!(%id, error = %e, "retransmit failed");
                }
            }
            Command::Fire { payload } => {
                if let Err(e) = self.sink.send_text(&payload).await {
                    warn!(error = %e, "send failed");
                }
            }
        }
    }

    async fn dispatch(&mut self, text: &str) -> Flow {
        let frame = match decode_server_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "undecodable frame");
                return Flow::Continue;
            }
        };

        match frame {
            ServerFrame::AuthResult(result) => self.on_auth_result(result).await,
            ServerFrame::Message(message) => {
                // Transparent relay: arrival order, no buffering, no
                // replay/live boundary.
                let _ = self.events.send(ChatEvent::Message(message));
                Flow::Continue
            }
            ServerFrame::Ack(ack) => {
                self.on_ack(&ack.id);
                Flow::Continue
            }
            ServerFrame::Typing(typing) => {
                let _ = self.events.send(ChatEvent::Typing {
                    active: typing.active,
                    role: typing.role,
                });
                Flow::Continue
            }
            ServerFrame::Error(error) => self.on_error(error).await,
            ServerFrame::PairResult(_) | ServerFrame::Unknown(_) => Flow::Continue,
        }
    }

    async fn on_auth_result(&mut self, result: AuthResult) -> Flow {
        if result.success {
            let info = HandshakeInfo::from(result);
            debug!(replay_count = ?info.replay_count, "auth accepted");
            self.resolve_auth(Ok(info));
            let _ = self.state.send(ConnectionState::Connected);
            Flow::Continue
        } else {
            let reason = result
                .reason
                .unwrap_or_else(|| "authentication rejected".to_owned());
            self.fail(SessionError::AuthFailed { reason }).await;
            Flow::Stop
        }
    }

    fn on_ack(&mut self, id: &MessageId) {
        // An ack for an id we no longer track is not an error.
        if let Some(pending) = self.pending.remove(id) {
            pending.abort_retry();
            debug!(%id, "message acknowledged");
        }
    }

    async fn on_error(&mut self, error: ErrorFrame) -> Flow {
        if let Some(message_id) = error.message_id {
            // Message-scoped: drop the pending entry, never the session.
            if let Some(pending) = self.pending.remove(&message_id) {
                pending.abort_retry();
            }
            warn!(%message_id, code = %error.code, "message failed");
            let _ = self.events.send(ChatEvent::MessageError {
                message_id,
                code: error.code,
                message: error.message,
            });
            return Flow::Continue;
        }

        match error.code {
            ErrorCode::AuthFailed => {
                let reason = error
                    .message
                    .unwrap_or_else(|| "authentication failed".to_owned());
                self.fail(SessionError::AuthFailed { reason }).await;
                Flow::Stop
            }
            ErrorCode::TokenRevoked => {
                let reason = error.message.unwrap_or_else(|| "token revoked".to_owned());
                self.fail(SessionError::TokenRevoked { reason }).await;
                Flow::Stop
            }
            ErrorCode::SessionReplaced => {
                // The server closes the socket as well; this local teardown
                // asserts the same outcome once.
                self.fail(SessionError::SessionReplaced).await;
                Flow::Stop
            }
            code => {
                // Non-fatal: surface it and keep the socket open. Recovery
                // is the caller's.
                warn!(%code, "server error");
                let _ = self
                    .state
                    .send(ConnectionState::Failed(SessionError::ServerError {
                        code,
                        message: error.message,
                    }));
                Flow::Continue
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_becomes_ws_with_endpoint() {
        assert_eq!(
            resolve_ws_url(Some("http://provider.local:8080"), "/ws").as_deref(),
            Some("ws://provider.local:8080/ws")
        );
    }

    #[test]
    fn https_becomes_wss() {
        assert_eq!(
            resolve_ws_url(Some("https://provider.example"), "/ws").as_deref(),
            Some("wss://provider.example/ws")
        );
    }

    #[test]
    fn ws_scheme_passes_through() {
        assert_eq!(
            resolve_ws_url(Some("wss://provider.example"), "/ws").as_deref(),
            Some("wss://provider.example/ws")
        );
    }

    #[test]
    fn endpoint_not_duplicated() {
        assert_eq!(
            resolve_ws_url(Some("wss://provider.example/ws"), "/ws").as_deref(),
            Some("wss://provider.example/ws")
        );
    }

    #[test]
    fn trailing_slash_trimmed() {
        assert_eq!(
            resolve_ws_url(Some("https://provider.example/"), "/ws").as_deref(),
            Some("wss://provider.example/ws")
        );
    }

    #[test]
    fn missing_or_empty_base_rejected() {
        assert_eq!(resolve_ws_url(None, "/ws"), None);
        assert_eq!(resolve_ws_url(Some(""), "/ws"), None);
        assert_eq!(resolve_ws_url(Some("   "), "/ws"), None);
    }

    #[test]
    fn unknown_scheme_rejected() {
        assert_eq!(resolve_ws_url(Some("ftp://host"), "/ws"), None);
        assert_eq!(resolve_ws_url(Some("provider.example"), "/ws"), None);
    }
}
