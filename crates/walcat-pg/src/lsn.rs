//! LSN (Log Sequence Number) utilities for PostgreSQL replication.

use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::error::{PgError, PgResult};

/// A position in the server's write-ahead log.
///
/// Opaque and totally ordered. The zero value is PostgreSQL's invalid/unset
/// position; it is what an unpopulated field of a standby status update
/// carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(u64);

impl Lsn {
    /// The invalid/unset position (`0/0`).
    pub const UNSET: Lsn = Lsn(0);

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Lsn {
    fn from(value: u64) -> Self {
        Lsn(value)
    }
}

impl Add<u64> for Lsn {
    type Output = Lsn;

    /// The position immediately after `len` bytes starting at `self`.
    fn add(self, len: u64) -> Lsn {
        Lsn(self.0 + len)
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

impl FromStr for Lsn {
    type Err = PgError;

    /// Parse the `X/Y` form used by the server (e.g. `0/16B3748`).
    fn from_str(s: &str) -> PgResult<Self> {
        let (high, low) = s
            .split_once('/')
            .ok_or_else(|| PgError::InvalidLsn(s.to_string()))?;

        let high =
            u64::from_str_radix(high, 16).map_err(|_| PgError::InvalidLsn(s.to_string()))?;
        let low = u64::from_str_radix(low, 16).map_err(|_| PgError::InvalidLsn(s.to_string()))?;

        Ok(Lsn((high << 32) | low))
    }
}
