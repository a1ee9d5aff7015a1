//! PostgreSQL logical replication driver and streaming engine for walcat.
//!
//! A replication-mode connection is opened once, the slot is ensured, and the
//! [`WalReceiver`] loop then alternates between standby status reporting and
//! receiving frames until the connection dies. There is no reconnect logic;
//! restart-on-crash belongs to an external supervisor.

mod connect;
mod error;
mod lsn;
mod protocol;
mod slot;
mod stream;

pub use connect::ReplicationClient;
pub use error::{PgError, PgResult};
pub use lsn::Lsn;
pub use protocol::{parse_wal_message, StandbyStatus, WalMessage};
pub use slot::ensure_slot;
pub use stream::{WalReceiver, DEFAULT_STATUS_INTERVAL};
