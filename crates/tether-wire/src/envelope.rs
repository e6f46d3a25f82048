//! Wire envelopes for the provider chat protocol.
//!
//! Every frame is a JSON object with a `type` discriminator and camelCase
//! fields. Outbound frames serialize through [`ClientFrame`]; inbound text is
//! decoded in two steps — peek the `type` tag from a minimal shape, then
//! decode the concrete payload for that tag. Tags this client does not know
//! decode to [`ServerFrame::Unknown`] so newer servers never break older
//! clients.

use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::codes::ErrorCode;
use crate::error::WireError;
use crate::ids::{DeviceId, MessageId};
use crate::PROTOCOL_VERSION;

/// `pair_result.reason` value that marks a keep-alive, not a decision.
pub const PAIR_PENDING_REASON: &str = "pair_pending";

// ─────────────────────────────────────────────────────────────────────────────
// Client → server
// ─────────────────────────────────────────────────────────────────────────────

/// Frames this client sends. Serializes with an inline `type` tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// One-shot pairing request.
    PairRequest(PairRequest),
    /// Session authentication.
    Auth(Auth),
    /// Chat message.
    Message(OutboundMessage),
    /// Typing indicator.
    Typing(Typing),
}

/// Serialize a client frame to its wire text.
pub fn encode_client_frame(frame: &ClientFrame) -> Result<String, WireError> {
    Ok(serde_json::to_string(frame)?)
}

/// Body of a `pair_request` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    /// Always [`PROTOCOL_VERSION`].
    pub protocol_version: u32,
    /// Requesting device.
    pub device_id: DeviceId,
    /// Display name proposed by the user, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_name: Option<String>,
    /// Platform/model details shown to the approving administrator.
    pub device_info: DeviceInfo,
}

impl PairRequest {
    /// Build a pairing request at the current protocol version.
    #[must_use]
    pub fn new(device_id: DeviceId, claimed_name: Option<String>, device_info: DeviceInfo) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            device_id,
            claimed_name,
            device_info,
        }
    }
}

/// Device details attached to a pairing request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Operating system family, e.g. `linux`.
    pub platform: String,
    /// Hardware model or architecture.
    pub model: String,
    /// OS version string, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// App version string, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl DeviceInfo {
    /// Populate platform/model from the running environment.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            platform: std::env::consts::OS.to_owned(),
            model: std::env::consts::ARCH.to_owned(),
            os_version: None,
            app_version: None,
        }
    }
}

/// Body of an `auth` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auth {
    /// Always [`PROTOCOL_VERSION`].
    pub protocol_version: u32,
    /// Signed token obtained from pairing.
    pub token: String,
    /// Device this token was issued to.
    pub device_id: DeviceId,
    /// Last server message id this device has seen; the server replays
    /// everything after it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<MessageId>,
}

impl Auth {
    /// Build an auth frame at the current protocol version.
    #[must_use]
    pub fn new(token: String, device_id: DeviceId, last_message_id: Option<MessageId>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            token,
            device_id,
            last_message_id,
        }
    }
}

/// Body of a client `message` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// Client-generated id (`"c_"` prefix).
    pub id: MessageId,
    /// UTF-8 message text.
    pub content: String,
    /// Attached media, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
}

/// Body of a client `typing` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typing {
    /// Whether composition is in progress.
    pub active: bool,
    /// Originating role, when relayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Server → client
// ─────────────────────────────────────────────────────────────────────────────

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerFrame {
    /// Outcome of a pairing request (terminal or keep-alive).
    PairResult(PairResult),
    /// Outcome of an auth handshake.
    AuthResult(AuthResult),
    /// A chat message (replayed or live).
    Message(InboundMessage),
    /// Durable acceptance of a client message.
    Ack(Ack),
    /// Typing indicator from another participant.
    Typing(Typing),
    /// Structured error, session- or message-scoped.
    Error(ErrorFrame),
    /// A `type` tag this client does not recognize; callers skip it.
    Unknown(String),
}

/// Minimal shape used to peek the discriminator before a full decode.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
}

/// Decode an inbound text frame.
///
/// Unrecognized `type` tags yield [`ServerFrame::Unknown`]; malformed JSON,
/// or a known tag whose body does not match its schema, is an error.
pub fn decode_server_frame(text: &str) -> Result<ServerFrame, WireError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    let frame = match raw.kind.as_str() {
        "pair_result" => ServerFrame::PairResult(serde_json::from_str(text)?),
        "auth_result" => ServerFrame::AuthResult(serde_json::from_str(text)?),
        "message" => ServerFrame::Message(serde_json::from_str(text)?),
        "ack" => ServerFrame::Ack(serde_json::from_str(text)?),
        "typing" => ServerFrame::Typing(serde_json::from_str(text)?),
        "error" => ServerFrame::Error(serde_json::from_str(text)?),
        _ => ServerFrame::Unknown(raw.kind),
    };
    Ok(frame)
}

/// Body of a `pair_result` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairResult {
    /// Whether pairing was approved.
    pub success: bool,
    /// Signed session token (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Account the device was paired to (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Denial reason, or [`PAIR_PENDING_REASON`] for keep-alives.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PairResult {
    /// Whether this result is a keep-alive rather than a decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.reason.as_deref() == Some(PAIR_PENDING_REASON)
    }
}

/// Body of an `auth_result` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    /// Whether authentication succeeded.
    pub success: bool,
    /// Authenticated account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Server-assigned session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Number of historical messages about to be replayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_count: Option<u32>,
    /// Whether replay was cut short by the server-side cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay_truncated: Option<bool>,
    /// Whether the server discarded history the device expected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_reset: Option<bool>,
    /// Failure reason when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of a server `message` frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    /// Server-assigned id (`"s_"` prefix).
    pub id: MessageId,
    /// Author role, e.g. `user` or `assistant`.
    pub role: String,
    /// Message text.
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Whether more chunks of this message follow.
    #[serde(default)]
    pub streaming: bool,
    /// Attached media, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Device that authored the message, when it was another device on the
    /// same account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
}

/// Body of an `ack` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// The client message id being acknowledged.
    pub id: MessageId,
}

/// Body of an `error` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorFrame {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When present, the error is scoped to this client message and never
    /// terminates the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn auth_frame_exact_wire_shape() {
        let frame = ClientFrame::Auth(Auth::new(
            "t1".into(),
            DeviceId::from("dev-1"),
            Some(MessageId::from("s_5")),
        ));
        let val: serde_json::Value =
            serde_json::from_str(&encode_client_frame(&frame).unwrap()).unwrap();
        assert_eq!(val["type"], "auth");
        assert_eq!(val["protocolVersion"], 1);
        assert_eq!(val["token"], "t1");
        assert_eq!(val["deviceId"], "dev-1");
        assert_eq!(val["lastMessageId"], "s_5");
    }

    #[test]
    fn auth_frame_omits_absent_last_message_id() {
        let frame = ClientFrame::Auth(Auth::new("t1".into(), DeviceId::from("dev-1"), None));
        let json = encode_client_frame(&frame).unwrap();
        assert!(!json.contains("lastMessageId"));
    }

    #[test]
    fn pair_request_wire_shape() {
        let frame = ClientFrame::PairRequest(PairRequest::new(
            DeviceId::from("dev-1"),
            Some("Kitchen iPad".into()),
            DeviceInfo {
                platform: "ios".into(),
                model: "iPad13,1".into(),
                os_version: Some("17.4".into()),
                app_version: None,
            },
        ));
        let val: serde_json::Value =
            serde_json::from_str(&encode_client_frame(&frame).unwrap()).unwrap();
        assert_eq!(val["type"], "pair_request");
        assert_eq!(val["protocolVersion"], 1);
        assert_eq!(val["deviceId"], "dev-1");
        assert_eq!(val["claimedName"], "Kitchen iPad");
        assert_eq!(val["deviceInfo"]["platform"], "ios");
        assert_eq!(val["deviceInfo"]["model"], "iPad13,1");
        assert_eq!(val["deviceInfo"]["osVersion"], "17.4");
        assert!(val["deviceInfo"].get("appVersion").is_none());
    }

    #[test]
    fn message_frame_wire_shape() {
        let frame = ClientFrame::Message(OutboundMessage {
            id: MessageId::from("c_1"),
            content: "hi".into(),
            attachments: None,
        });
        let val: serde_json::Value =
            serde_json::from_str(&encode_client_frame(&frame).unwrap()).unwrap();
        assert_eq!(val["type"], "message");
        assert_eq!(val["id"], "c_1");
        assert_eq!(val["content"], "hi");
        assert!(val.get("attachments").is_none());
    }

    #[test]
    fn typing_frame_wire_shape() {
        let frame = ClientFrame::Typing(Typing {
            active: true,
            role: None,
        });
        let val: serde_json::Value =
            serde_json::from_str(&encode_client_frame(&frame).unwrap()).unwrap();
        assert_eq!(val["type"], "typing");
        assert_eq!(val["active"], true);
        assert!(val.get("role").is_none());
    }

    #[test]
    fn decodes_auth_result() {
        let frame = decode_server_frame(
            r#"{"type":"auth_result","success":true,"userId":"u1","sessionId":"sess_1","replayCount":3}"#,
        )
        .unwrap();
        assert_matches!(frame, ServerFrame::AuthResult(r) => {
            assert!(r.success);
            assert_eq!(r.user_id.as_deref(), Some("u1"));
            assert_eq!(r.session_id.as_deref(), Some("sess_1"));
            assert_eq!(r.replay_count, Some(3));
            assert_eq!(r.replay_truncated, None);
        });
    }

    #[test]
    fn decodes_inbound_message() {
        let frame = decode_server_frame(
            r#"{"type":"message","id":"s_1","role":"assistant","content":"hello","timestamp":1700000000000,"streaming":false}"#,
        )
        .unwrap();
        assert_matches!(frame, ServerFrame::Message(m) => {
            assert_eq!(m.id.as_str(), "s_1");
            assert_eq!(m.role, "assistant");
            assert_eq!(m.timestamp, 1_700_000_000_000);
            assert!(!m.streaming);
        });
    }

    #[test]
    fn message_streaming_defaults_false() {
        let frame = decode_server_frame(
            r#"{"type":"message","id":"s_2","role":"user","content":"x","timestamp":0}"#,
        )
        .unwrap();
        assert_matches!(frame, ServerFrame::Message(m) => assert!(!m.streaming));
    }

    #[test]
    fn decodes_ack_and_error() {
        let ack = decode_server_frame(r#"{"type":"ack","id":"c_1"}"#).unwrap();
        assert_matches!(ack, ServerFrame::Ack(a) => assert_eq!(a.id.as_str(), "c_1"));

        let err = decode_server_frame(
            r#"{"type":"error","code":"rate_limited","message":"slow down","messageId":"c_2"}"#,
        )
        .unwrap();
        assert_matches!(err, ServerFrame::Error(e) => {
            assert_eq!(e.code, ErrorCode::RateLimited);
            assert_eq!(e.message.as_deref(), Some("slow down"));
            assert_eq!(e.message_id.as_ref().map(MessageId::as_str), Some("c_2"));
        });
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let frame = decode_server_frame(r#"{"type":"presence","users":3}"#).unwrap();
        assert_matches!(frame, ServerFrame::Unknown(kind) => assert_eq!(kind, "presence"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(decode_server_frame("not json").is_err());
    }

    #[test]
    fn known_tag_with_bad_body_is_an_error() {
        // `ack` requires an id.
        assert!(decode_server_frame(r#"{"type":"ack"}"#).is_err());
    }

    #[test]
    fn pair_result_pending_detection() {
        let pending: PairResult =
            serde_json::from_str(r#"{"type":"pair_result","success":false,"reason":"pair_pending"}"#)
                .unwrap();
        assert!(pending.is_pending());

        let denied: PairResult =
            serde_json::from_str(r#"{"type":"pair_result","success":false,"reason":"rejected"}"#)
                .unwrap();
        assert!(!denied.is_pending());
    }

    #[test]
    fn device_info_detect_populates_platform() {
        let info = DeviceInfo::detect();
        assert!(!info.platform.is_empty());
        assert!(!info.model.is_empty());
    }
}
