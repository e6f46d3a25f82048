//! Server error codes carried in `error` frames.
//!
//! The string values match the provider's wire format exactly — clients
//! branch on them, so they are pinned by tests. Codes this client does not
//! recognize map to [`ErrorCode::Other`] instead of failing to decode.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable error code from the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Token missing, malformed, or rejected.
    AuthFailed,
    /// Token was valid once but has been revoked.
    TokenRevoked,
    /// Message payload failed validation.
    InvalidMessage,
    /// Message exceeded the provider's size limit.
    PayloadTooLarge,
    /// Referenced asset does not exist.
    AssetNotFound,
    /// Too many requests; retry later.
    RateLimited,
    /// A newer connection for this device authenticated.
    SessionReplaced,
    /// Upload failed but may be retried.
    UploadFailedRetryable,
    /// Unspecified server-side failure.
    ServerError,
    /// Code not known to this client version.
    Other(String),
}

impl ErrorCode {
    /// Wire string for this code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthFailed => "auth_failed",
            Self::TokenRevoked => "token_revoked",
            Self::InvalidMessage => "invalid_message",
            Self::PayloadTooLarge => "payload_too_large",
            Self::AssetNotFound => "asset_not_found",
            Self::RateLimited => "rate_limited",
            Self::SessionReplaced => "session_replaced",
            Self::UploadFailedRetryable => "upload_failed_retryable",
            Self::ServerError => "server_error",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        match s {
            "auth_failed" => Self::AuthFailed,
            "token_revoked" => Self::TokenRevoked,
            "invalid_message" => Self::InvalidMessage,
            "payload_too_large" => Self::PayloadTooLarge,
            "asset_not_found" => Self::AssetNotFound,
            "rate_limited" => Self::RateLimited,
            "session_replaced" => Self::SessionReplaced,
            "upload_failed_retryable" => Self::UploadFailedRetryable,
            "server_error" => Self::ServerError,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
