//! Error types for the pairing and session clients.
//!
//! Two taxonomies, kept separate on purpose: transport/setup failures
//! ([`PairingError`], [`TransportError`], the setup variants of
//! [`ClientError`]) are raised synchronously to the caller, while protocol
//! failures ([`SessionError`]) may surface either as the resolution of
//! `connect()` or asynchronously through the connection state and event
//! channels — so [`SessionError`] is `Clone`.

use thiserror::Error;

use tether_wire::{ErrorCode, WireError};

/// Errors from the one-shot pairing exchange.
#[derive(Debug, Error)]
pub enum PairingError {
    /// No terminal `pair_result` arrived within the allotted time.
    #[error("pairing timed out")]
    Timeout,

    /// The socket closed before a terminal `pair_result` arrived.
    #[error("socket closed before a pairing result arrived")]
    SocketClosed,

    /// A frame arrived that could not be decoded.
    #[error("invalid pairing response: {0}")]
    InvalidResponse(String),

    /// The server URL does not use a WebSocket scheme.
    #[error("unsupported server url: {0}")]
    UnsupportedUrl(String),
}

/// Errors from the underlying socket transport.
///
/// The transport is an external collaborator; its concrete error types stay
/// behind this boundary as context strings.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Sending a frame failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading a frame failed.
    #[error("receive failed: {0}")]
    Receive(String),
}

/// Protocol-level session failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The server rejected the auth token.
    #[error("authentication failed: {reason}")]
    AuthFailed {
        /// Server-supplied reason.
        reason: String,
    },

    /// The token was valid once but has been revoked.
    #[error("token revoked: {reason}")]
    TokenRevoked {
        /// Server-supplied reason.
        reason: String,
    },

    /// A newer connection for this device took over the session.
    #[error("session replaced by a newer connection")]
    SessionReplaced,

    /// A message id without the client `c_` prefix was offered for sending.
    #[error("invalid message id: {0}")]
    InvalidMessageId(String),

    /// A session-level server error that does not terminate the connection.
    #[error("server error: {code}")]
    ServerError {
        /// Machine-readable code.
        code: ErrorCode,
        /// Human-readable description, when provided.
        message: Option<String>,
    },
}

/// Errors returned by [`crate::ChatClient`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No provider base URL is configured, or it cannot be turned into a
    /// WebSocket URL.
    #[error("missing or unusable provider base url")]
    MissingBaseUrl,

    /// The operation requires an active session.
    #[error("not connected")]
    NotConnected,

    /// Frame encoding failed.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session failed at the protocol level.
    #[error(transparent)]
    Session(#[from] SessionError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
