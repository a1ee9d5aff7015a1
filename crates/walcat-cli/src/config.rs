//! Environment-resolved session configuration.

use std::env;

use anyhow::{Context, Result};

/// Decoding plugin bound to the replication slot.
pub const OUTPUT_PLUGIN: &str = "wal2json";

/// Options passed to wal2json, in order: include transaction ids, write in
/// chunks, and use output format version 2.
pub const PLUGIN_ARGS: &[(&str, &str)] = &[
    ("include-xids", "1"),
    ("write-in-chunks", "1"),
    ("format-version", "2"),
];

/// Resolved once at startup; immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    pub dsn: String,
    pub slot: String,
    /// Parent process to watch; absent or unparsable disables the watchdog.
    pub master_pid: Option<i32>,
    /// Display name for the process; absent leaves the title alone.
    pub process_name: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            dsn: env::var("PG_DSN").context("PG_DSN must be set")?,
            slot: env::var("PG_SLOT").context("PG_SLOT must be set")?,
            master_pid: env::var("PG_MASTER_PID").ok().and_then(|v| v.parse().ok()),
            process_name: env::var("PG_PROCESS_NAME").ok().filter(|v| !v.is_empty()),
        })
    }
}
