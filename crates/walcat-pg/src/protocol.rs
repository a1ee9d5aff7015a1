//! Replication frames exchanged over the CopyBoth channel.
//!
//! Layouts follow the streaming replication protocol:
//! <https://www.postgresql.org/docs/current/protocol-replication.html>

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::Utc;

use crate::error::{PgError, PgResult};
use crate::lsn::Lsn;

/// Seconds between the Unix epoch and the PostgreSQL epoch (2000-01-01).
const PG_EPOCH_OFFSET: i64 = 946_684_800;

const XLOG_DATA_TAG: u8 = b'w';
const KEEPALIVE_TAG: u8 = b'k';
const STANDBY_STATUS_TAG: u8 = b'r';

/// A decoded server-to-client replication frame.
#[derive(Debug)]
pub enum WalMessage {
    /// Decoded change data beginning at `wal_start`. The payload is opaque to
    /// the engine and forwarded unmodified.
    XLogData { wal_start: Lsn, payload: Bytes },
    /// Liveness probe; `reply_requested` asks for an immediate status update.
    Keepalive { wal_end: Lsn, reply_requested: bool },
    /// Anything else on the channel; ignored by the engine.
    Other(u8),
}

/// Parse one CopyData frame, consuming from `buf`.
pub fn parse_wal_message(buf: &mut Bytes) -> PgResult<WalMessage> {
    if buf.is_empty() {
        return Err(PgError::Frame("empty frame".into()));
    }

    let tag = buf.get_u8();
    match tag {
        XLOG_DATA_TAG => {
            // wal_start, wal_end, server time; the rest is the payload.
            if buf.len() < 24 {
                return Err(PgError::Frame(format!(
                    "XLogData header truncated ({} bytes)",
                    buf.len()
                )));
            }
            let wal_start = Lsn::from(buf.get_u64());
            let _wal_end = buf.get_u64();
            let _server_time = buf.get_i64();

            Ok(WalMessage::XLogData {
                wal_start,
                payload: buf.slice(..),
            })
        }
        KEEPALIVE_TAG => {
            if buf.len() < 17 {
                return Err(PgError::Frame(format!(
                    "keepalive truncated ({} bytes)",
                    buf.len()
                )));
            }
            let wal_end = Lsn::from(buf.get_u64());
            let _server_time = buf.get_i64();
            let reply_requested = buf.get_u8() != 0;

            Ok(WalMessage::Keepalive {
                wal_end,
                reply_requested,
            })
        }
        other => Ok(WalMessage::Other(other)),
    }
}

/// A standby status update reporting consumed WAL positions to the server.
///
/// Built fresh for every send; the client time is captured at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandbyStatus {
    pub write_lsn: Lsn,
    pub flush_lsn: Lsn,
    pub apply_lsn: Lsn,
}

impl StandbyStatus {
    /// Report `lsn` for write, flush, and apply alike. The client performs no
    /// durable flush of its own, so the three positions never diverge on the
    /// cadence path.
    pub fn caught_up(lsn: Lsn) -> Self {
        Self {
            write_lsn: lsn,
            flush_lsn: lsn,
            apply_lsn: lsn,
        }
    }

    /// Report only the write position, leaving flush/apply unset. Used for
    /// keepalive replies.
    pub fn write_only(lsn: Lsn) -> Self {
        Self {
            write_lsn: lsn,
            flush_lsn: Lsn::UNSET,
            apply_lsn: Lsn::UNSET,
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(34);
        buf.put_u8(STANDBY_STATUS_TAG);
        buf.put_u64(self.write_lsn.as_u64());
        buf.put_u64(self.flush_lsn.as_u64());
        buf.put_u64(self.apply_lsn.as_u64());
        buf.put_i64(pg_timestamp_micros());
        buf.put_u8(0); // no reply requested
        buf.freeze()
    }
}

/// Current time in microseconds since the PostgreSQL epoch.
fn pg_timestamp_micros() -> i64 {
    Utc::now().timestamp_micros() - PG_EPOCH_OFFSET * 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xlog_frame(start: u64, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(b'w');
        buf.put_u64(start);
        buf.put_u64(start + payload.len() as u64);
        buf.put_i64(0);
        buf.put_slice(payload);
        buf.freeze()
    }

    fn keepalive_frame(wal_end: u64, reply: bool) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(b'k');
        buf.put_u64(wal_end);
        buf.put_i64(0);
        buf.put_u8(reply as u8);
        buf.freeze()
    }

    #[test]
    fn test_parse_xlog_data() {
        let mut frame = xlog_frame(100, b"abc");
        match parse_wal_message(&mut frame).unwrap() {
            WalMessage::XLogData { wal_start, payload } => {
                assert_eq!(wal_start, Lsn::from(100));
                assert_eq!(&payload[..], b"abc");
            }
            other => panic!("expected XLogData, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_keepalive() {
        let mut frame = keepalive_frame(103, true);
        match parse_wal_message(&mut frame).unwrap() {
            WalMessage::Keepalive {
                wal_end,
                reply_requested,
            } => {
                assert_eq!(wal_end, Lsn::from(103));
                assert!(reply_requested);
            }
            other => panic!("expected Keepalive, got {:?}", other),
        }

        let mut frame = keepalive_frame(103, false);
        assert!(matches!(
            parse_wal_message(&mut frame).unwrap(),
            WalMessage::Keepalive {
                reply_requested: false,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_tag_is_other() {
        let mut frame = Bytes::from_static(b"Zwhatever");
        assert!(matches!(
            parse_wal_message(&mut frame).unwrap(),
            WalMessage::Other(b'Z')
        ));
    }

    #[test]
    fn test_truncated_frames_error() {
        let mut empty = Bytes::new();
        assert!(matches!(
            parse_wal_message(&mut empty),
            Err(PgError::Frame(_))
        ));

        let mut short_xlog = Bytes::from_static(b"w\x00\x00");
        assert!(matches!(
            parse_wal_message(&mut short_xlog),
            Err(PgError::Frame(_))
        ));

        let mut short_keepalive = Bytes::from_static(b"k\x00");
        assert!(matches!(
            parse_wal_message(&mut short_keepalive),
            Err(PgError::Frame(_))
        ));
    }

    #[test]
    fn test_encode_standby_status_layout() {
        let mut encoded = StandbyStatus::caught_up(Lsn::from(103)).encode();
        assert_eq!(encoded.len(), 34);
        assert_eq!(encoded.get_u8(), b'r');
        assert_eq!(encoded.get_u64(), 103);
        assert_eq!(encoded.get_u64(), 103);
        assert_eq!(encoded.get_u64(), 103);
        assert!(encoded.get_i64() > 0, "client time should be after 2000-01-01");
        assert_eq!(encoded.get_u8(), 0);
        assert!(!encoded.has_remaining());
    }

    #[test]
    fn test_write_only_leaves_flush_and_apply_unset() {
        let status = StandbyStatus::write_only(Lsn::from(103));
        assert_eq!(status.write_lsn, Lsn::from(103));
        assert_eq!(status.flush_lsn, Lsn::UNSET);
        assert_eq!(status.apply_lsn, Lsn::UNSET);

        let mut encoded = status.encode();
        encoded.advance(1);
        assert_eq!(encoded.get_u64(), 103);
        assert_eq!(encoded.get_u64(), 0);
        assert_eq!(encoded.get_u64(), 0);
    }
}
