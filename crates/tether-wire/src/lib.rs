//! # tether-wire
//!
//! Wire envelopes and codec for the provider chat protocol.
//!
//! Every frame on the socket is a JSON object with a `type` discriminator
//! and camelCase fields. This crate owns the typed payloads, the
//! peek-the-tag-then-decode inbound codec, the error-code vocabulary, and
//! the branded id newtypes. It performs no I/O; `tether-client` drives it.

#![deny(unsafe_code)]

pub mod attachment;
pub mod codes;
pub mod envelope;
pub mod error;
pub mod ids;

pub use attachment::Attachment;
pub use codes::ErrorCode;
pub use envelope::{
    Ack, Auth, AuthResult, ClientFrame, DeviceInfo, ErrorFrame, InboundMessage, OutboundMessage,
    PAIR_PENDING_REASON, PairRequest, PairResult, ServerFrame, Typing, decode_server_frame,
    encode_client_frame,
};
pub use error::WireError;
pub use ids::{CLIENT_ID_PREFIX, DeviceId, MessageId, SERVER_ID_PREFIX};

/// Version sent in `pair_request` and `auth` frames.
pub const PROTOCOL_VERSION: u32 = 1;

/// Path the provider serves the chat WebSocket on.
pub const WS_ENDPOINT: &str = "/ws";
