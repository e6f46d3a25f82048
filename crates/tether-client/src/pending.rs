//! Pending outbound messages and their retry timers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use tether_wire::MessageId;

use crate::session::Command;

/// An outbound message awaiting its `ack`.
///
/// Holds the wire payload exactly as first serialized — retransmission must
/// be byte-identical so the server's content-hash dedup treats retries as
/// the same logical message.
pub(crate) struct PendingMessage {
    /// Serialized frame, sent verbatim on every retry.
    pub payload: String,
    /// The message's repeating retry timer.
    retry: JoinHandle<()>,
}

impl PendingMessage {
    /// Store a payload and start its retry timer.
    pub fn new(
        id: MessageId,
        payload: String,
        interval: Duration,
        cmd_tx: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            payload,
            retry: spawn_retry_timer(id, interval, cmd_tx),
        }
    }

    /// Stop the retry timer. Called on ack, message-scoped error, id reuse,
    /// and teardown.
    pub fn abort_retry(&self) {
        self.retry.abort();
    }
}

/// One independent repeating timer per pending message.
///
/// The timer never touches the pending map itself — each tick routes a
/// retransmit command through the session task, which owns the map. The
/// first tick fires after one full interval.
fn spawn_retry_timer(
    id: MessageId,
    interval: Duration,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;

        loop {
            let _ = ticker.tick().await;
            if cmd_tx.send(Command::Retransmit { id: id.clone() }).is_err() {
                // Session task is gone; nothing left to retry against.
                break;
            }
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
