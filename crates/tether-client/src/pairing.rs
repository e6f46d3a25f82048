//! One-shot device pairing.
//!
//! Opens a transient socket, sends a single `pair_request`, then waits for
//! the administrator's decision. The wait is long (the server holds pairing
//! requests for five minutes) and punctuated by `pair_pending` keep-alives;
//! everything else on the socket is ignored. The socket is closed on every
//! exit path.

use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, instrument, warn};

use tether_wire::{
    ClientFrame, DeviceId, DeviceInfo, PairRequest, PairResult as PairResultFrame, ServerFrame,
    decode_server_frame, encode_client_frame,
};

use crate::config::ClientConfig;
use crate::error::PairingError;
use crate::transport::{Connector, SocketSink, SocketStream};

/// Display names are capped at 64 UTF-16 code units by the provider.
const MAX_CLAIMED_NAME_UTF16: usize = 64;

/// Default reason when the server denies without explanation.
const DEFAULT_DENIAL_REASON: &str = "Pairing request denied";

/// Outcome of a pairing exchange. Produced exactly once per call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PairingOutcome {
    /// The administrator approved the device.
    Success {
        /// Signed session token.
        token: String,
        /// Account the device was paired to.
        user_id: String,
    },
    /// The administrator denied the device (or the request expired
    /// server-side).
    Denied {
        /// Server-supplied reason, defaulted when absent.
        reason: String,
    },
}

/// Run the pair-request/pair-result exchange against `server_url`.
///
/// The connect and send steps each race the configured connect timeout; the
/// result wait races the longer pairing timeout. `tokio::time::timeout` is
/// the first-of-two race here — dropping the losing future cancels it, so
/// no timer or I/O task leaks.
#[instrument(skip_all, fields(device_id = %device_id))]
pub async fn request_pairing(
    connector: &dyn Connector,
    server_url: &str,
    claimed_name: Option<&str>,
    device_id: &DeviceId,
    device_info: DeviceInfo,
    config: &ClientConfig,
) -> Result<PairingOutcome, PairingError> {
    if !is_websocket_url(server_url) {
        return Err(PairingError::UnsupportedUrl(server_url.to_owned()));
    }

    let request = PairRequest::new(
        device_id.clone(),
        claimed_name.map(|name| truncate_utf16(name, MAX_CLAIMED_NAME_UTF16)),
        device_info,
    );
    let request_json = encode_client_frame(&ClientFrame::PairRequest(request))
        .map_err(|e| PairingError::InvalidResponse(e.to_string()))?;

    let (mut sink, mut stream) = timeout(config.connect_timeout(), connector.connect(server_url))
        .await
        .map_err(|_| PairingError::Timeout)?
        .map_err(|_| PairingError::SocketClosed)?;

    debug!(server_url, "pairing socket open");

    let result = exchange(sink.as_mut(), stream.as_mut(), &request_json, config).await;

    // Every exit path releases the socket.
    if let Err(e) = sink.close().await {
        debug!(error = %e, "pairing socket close failed");
    }

    result
}

/// Send the request and wait for a terminal `pair_result`.
async fn exchange(
    sink: &mut dyn SocketSink,
    stream: &mut dyn SocketStream,
    request_json: &str,
    config: &ClientConfig,
) -> Result<PairingOutcome, PairingError> {
    timeout(config.connect_timeout(), sink.send_text(request_json))
        .await
        .map_err(|_| PairingError::Timeout)?
        .map_err(|_| PairingError::SocketClosed)?;

    let deadline = Instant::now() + config.pairing_timeout();

    loop {
        let frame = timeout_at(deadline, stream.next_text())
            .await
            .map_err(|_| PairingError::Timeout)?;

        let text = match frame {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                warn!(error = %e, "pairing socket read failed");
                return Err(PairingError::SocketClosed);
            }
            None => return Err(PairingError::SocketClosed),
        };

        match decode_server_frame(&text) {
            Ok(ServerFrame::PairResult(result)) => {
                if result.is_pending() {
                    debug!("pairing still pending");
                    continue;
                }
                return Ok(resolve(result));
            }
            // Anything else on a pairing socket is a newer server talking;
            // keep waiting.
            Ok(_) => continue,
            Err(e) => return Err(PairingError::InvalidResponse(e.to_string())),
        }
    }
}

/// Map a terminal `pair_result` to an outcome.
fn resolve(result: PairResultFrame) -> PairingOutcome {
    match (result.success, result.token, result.user_id) {
        (true, Some(token), Some(user_id)) => PairingOutcome::Success { token, user_id },
        (_, _, _) => PairingOutcome::Denied {
            reason: result
                .reason
                .unwrap_or_else(|| DEFAULT_DENIAL_REASON.to_owned()),
        },
    }
}

fn is_websocket_url(url: &str) -> bool {
    url.starts_with("ws://") || url.starts_with("wss://")
}

/// Truncate to at most `max_units` UTF-16 code units, on a char boundary.
fn truncate_utf16(s: &str, max_units: usize) -> String {
    let mut units = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let n = ch.len_utf16();
        if units + n > max_units {
            break;
        }
        units += n;
        out.push(ch);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
