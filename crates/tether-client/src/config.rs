//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the pairing and session clients.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Timeout for opening the socket and for individual sends during
    /// pairing, in seconds.
    pub connect_timeout_secs: u64,
    /// Overall wait for a terminal `pair_result`, in seconds. Matches the
    /// server's 5-minute pairing TTL.
    pub pairing_timeout_secs: u64,
    /// Interval between retransmissions of an unacknowledged message, in
    /// seconds.
    pub retry_interval_secs: u64,
    /// Path the provider serves the chat WebSocket on.
    pub ws_endpoint: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 20,
            pairing_timeout_secs: 300,
            retry_interval_secs: 5,
            ws_endpoint: tether_wire::WS_ENDPOINT.into(),
        }
    }
}

impl ClientConfig {
    /// Connect/send timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Pairing-result wait as a [`Duration`].
    #[must_use]
    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }

    /// Retransmission interval as a [`Duration`].
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}
