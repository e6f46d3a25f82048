//! Message attachments.
//!
//! An attachment is either an inline base64 image or a reference to an asset
//! stored with the provider. Asset bytes move over the separate HTTP
//! upload/download channel, never over the chat socket.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

/// A single message attachment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Attachment {
    /// Inline image, base64-encoded in the frame itself.
    #[serde(rename_all = "camelCase")]
    Image {
        /// MIME type, e.g. `image/jpeg`.
        mime_type: String,
        /// Base64-encoded image bytes.
        data: String,
    },
    /// Reference to an asset uploaded out of band.
    #[serde(rename_all = "camelCase")]
    Asset {
        /// Provider-assigned asset identifier.
        asset_id: String,
    },
}

impl Attachment {
    /// Build an inline image attachment from raw bytes.
    #[must_use]
    pub fn inline_image(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::Image {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Decoded bytes of an inline image; `None` for asset references.
    pub fn inline_bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        match self {
            Self::Image { data, .. } => Some(BASE64.decode(data)),
            Self::Asset { .. } => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
