//! Observable session state and out-of-band events.

use tether_wire::{AuthResult, ErrorCode, InboundMessage, MessageId};

use crate::error::SessionError;

/// Connection lifecycle of a chat session.
///
/// Owned exclusively by the session; observers read the published sequence
/// through a `watch` receiver and never mutate it. `Failed` is not always
/// terminal — non-fatal server errors publish it while the socket stays
/// open, and only a subsequent `Disconnected` marks the session gone.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session is active.
    #[default]
    Disconnected,
    /// The socket is open and the auth handshake is in flight.
    Connecting,
    /// Authenticated; `send` is meaningful.
    Connected,
    /// A session-level error was reported.
    Failed(SessionError),
}

/// Out-of-band event from an active session.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// A chat message, replayed or live, in arrival order.
    Message(InboundMessage),
    /// A message-scoped failure; never terminates the session.
    MessageError {
        /// The client message that failed.
        message_id: MessageId,
        /// Machine-readable code.
        code: ErrorCode,
        /// Human-readable description, when provided.
        message: Option<String>,
    },
    /// Typing indicator from another participant.
    Typing {
        /// Whether composition is in progress.
        active: bool,
        /// Originating role, when relayed.
        role: Option<String>,
    },
}

/// Outcome of a successful auth handshake.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HandshakeInfo {
    /// Authenticated account.
    pub user_id: Option<String>,
    /// Server-assigned session id.
    pub session_id: Option<String>,
    /// Number of historical messages the server is about to replay. Replayed
    /// frames are not otherwise marked; callers that care count them.
    pub replay_count: Option<u32>,
    /// Whether replay was cut short by the server-side cap.
    pub replay_truncated: Option<bool>,
    /// Whether the server discarded history the device expected.
    pub history_reset: Option<bool>,
}

impl From<AuthResult> for HandshakeInfo {
    fn from(r: AuthResult) -> Self {
        Self {
            user_id: r.user_id,
            session_id: r.session_id,
            replay_count: r.replay_count,
            replay_truncated: r.replay_truncated,
            history_reset: r.history_reset,
        }
    }
}
