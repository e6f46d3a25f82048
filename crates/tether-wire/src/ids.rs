//! Branded ID newtypes for the wire protocol.
//!
//! Message and device identifiers are strings on the wire, but carrying them
//! as distinct newtypes prevents a device id from ending up in a `message.id`
//! field. Client-generated message ids are `"c_"` + UUID v7 (time-ordered);
//! server-generated ids use the `"s_"` prefix and are never minted locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix of client-generated message ids.
pub const CLIENT_ID_PREFIX: &str = "c_";

/// Prefix of server-generated message ids.
pub const SERVER_ID_PREFIX: &str = "s_";

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from an existing string value.
            #[must_use]
            pub fn from_string(s: String) -> Self {
                Self(s)
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Unique identifier for a chat message.
    MessageId
}

branded_id! {
    /// Stable identifier for this device, generated once and persisted by
    /// the caller.
    DeviceId
}

impl MessageId {
    /// Mint a new client-side message id (`"c_"` + UUID v7, time-ordered).
    #[must_use]
    pub fn client() -> Self {
        Self(format!("{CLIENT_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Whether this id carries the client-generated `"c_"` prefix.
    #[must_use]
    pub fn has_client_prefix(&self) -> bool {
        self.0.starts_with(CLIENT_ID_PREFIX)
    }

    /// Whether this id carries the server-generated `"s_"` prefix.
    #[must_use]
    pub fn has_server_prefix(&self) -> bool {
        self.0.starts_with(SERVER_ID_PREFIX)
    }
}

impl DeviceId {
    /// Generate a fresh device id (UUID v7, time-ordered).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
