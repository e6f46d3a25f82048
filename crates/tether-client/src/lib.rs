//! # tether-client
//!
//! Pairing and chat session client for the provider protocol.
//!
//! The provider speaks JSON envelopes over a single WebSocket. This crate
//! turns that transport into two operations:
//!
//! 1. [`request_pairing`] — a one-shot exchange on a transient socket that
//!    trades a device id for a signed token, once an administrator approves.
//! 2. [`ChatClient`] — a long-lived authenticated session: auth handshake,
//!    ordered inbound dispatch, and an outbound queue that retransmits each
//!    message byte-identically until the server acknowledges it.
//!
//! Reconnection policy stays with the caller: the client reports connection
//! loss through its state channel and is reconnected by calling
//! [`ChatClient::connect`] again.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pairing;
pub mod session;
pub mod state;
pub mod transport;
pub mod ws;

mod pending;

pub use config::ClientConfig;
pub use error::{ClientError, PairingError, SessionError, TransportError};
pub use pairing::{PairingOutcome, request_pairing};
pub use session::ChatClient;
pub use state::{ChatEvent, ConnectionState, HandshakeInfo};
pub use transport::{Connector, SocketSink, SocketStream};
pub use ws::WsConnector;
