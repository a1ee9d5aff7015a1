//! The streaming engine: receive loop, confirmed-position tracking, and the
//! standby status cadence.

use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{PgError, PgResult};
use crate::lsn::Lsn;
use crate::protocol::{parse_wal_message, StandbyStatus, WalMessage};

/// How often the engine reports its confirmed position to the server.
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// The replication receive/dispatch loop.
///
/// Owns the confirmed WAL position for the lifetime of the stream. The loop is
/// strictly sequential: a position update from one frame is always visible to
/// any status report built on a later iteration, and no report can name a
/// position past data not yet written downstream.
pub struct WalReceiver {
    last_lsn: Lsn,
    next_status: Instant,
    status_interval: Duration,
}

impl WalReceiver {
    pub fn new(start: Lsn, status_interval: Duration) -> Self {
        Self {
            last_lsn: start,
            next_status: Instant::now() + status_interval,
            status_interval,
        }
    }

    /// The position immediately after the last fully received change data.
    pub fn confirmed_lsn(&self) -> Lsn {
        self.last_lsn
    }

    /// Run the loop until the transport fails.
    ///
    /// Never returns `Ok`: the only exits are a failed receive, a closed
    /// stream, or a downstream write failure, all fatal. Recovery is an
    /// external restart, and cancellation is the caller's concern (select over
    /// this future and a shutdown signal).
    pub async fn run<T, E, W>(&mut self, transport: &mut T, out: &mut W) -> PgResult<()>
    where
        T: Stream<Item = Result<Bytes, E>> + Sink<Bytes> + Unpin,
        E: std::error::Error,
        <T as Sink<Bytes>>::Error: std::error::Error,
        W: AsyncWrite + Unpin,
    {
        loop {
            // The cadence is anchored to this check, not to a successful
            // send: a failing connection retries every interval until the
            // blocking receive fails for good.
            if Instant::now() >= self.next_status {
                let report = StandbyStatus::caught_up(self.last_lsn);
                if let Err(e) = transport.send(report.encode()).await {
                    warn!(error = %e, "standby status update failed");
                }
                self.next_status = Instant::now() + self.status_interval;
            }

            let mut frame = match transport.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(PgError::Stream(e.to_string())),
                None => return Err(PgError::Stream("replication stream closed".into())),
            };

            match parse_wal_message(&mut frame) {
                Ok(WalMessage::XLogData { wal_start, payload }) => {
                    self.last_lsn = wal_start + payload.len() as u64;
                    self.emit(out, &payload).await?;
                }
                Ok(WalMessage::Keepalive {
                    reply_requested: true,
                    ..
                }) => {
                    // Out-of-band reply: write position only, cadence timer
                    // untouched, send result discarded.
                    let reply = StandbyStatus::write_only(self.last_lsn);
                    let _ = transport.send(reply.encode()).await;
                }
                Ok(WalMessage::Keepalive { .. }) => {}
                Ok(WalMessage::Other(tag)) => {
                    debug!(tag, "ignoring replication message");
                }
                Err(e) => warn!(error = %e, "skipping malformed replication frame"),
            }
        }
    }

    /// Forward one decoded payload, newline-terminated, exactly once.
    async fn emit<W>(&self, out: &mut W, payload: &[u8]) -> PgResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        out.write_all(payload)
            .await
            .map_err(|e| PgError::Output(e.to_string()))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| PgError::Output(e.to_string()))?;
        out.flush().await.map_err(|e| PgError::Output(e.to_string()))
    }
}
