use anyhow::{Context, Result};
use futures::future::{self, BoxFuture, FutureExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use walcat_pg::{ensure_slot, ReplicationClient, WalReceiver, DEFAULT_STATUS_INTERVAL};

mod config;
mod watchdog;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Stdout is the data channel; diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;

    if let Some(name) = &config.process_name {
        watchdog::set_process_title(name);
    }

    // Fires if the orchestrating parent goes away; pends forever otherwise.
    let parent_gone: BoxFuture<'static, ()> = match config.master_pid {
        Some(pid) => watchdog::spawn_parent_watch(pid).map(|_| ()).boxed(),
        None => future::pending().boxed(),
    };

    tokio::select! {
        res = stream(&config) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
            Ok(())
        }
        _ = parent_gone => {
            info!("parent process exited, shutting down");
            Ok(())
        }
    }
}

/// Connect, make sure the slot exists, and run the receive loop. Only returns
/// on a fatal error.
async fn stream(config: &Config) -> Result<()> {
    let client = ReplicationClient::connect(&config.dsn)
        .await
        .context("failed to open replication connection")?;

    let start = client
        .identify_system()
        .await
        .context("IDENTIFY_SYSTEM failed")?;
    info!(%start, "identified system");

    ensure_slot(&client, &config.slot, config::OUTPUT_PLUGIN).await;

    let transport = client
        .start_replication(&config.slot, start, config::PLUGIN_ARGS)
        .await
        .context("START_REPLICATION failed")?;
    tokio::pin!(transport);
    info!(slot = %config.slot, %start, "streaming started");

    let mut receiver = WalReceiver::new(start, DEFAULT_STATUS_INTERVAL);
    let mut stdout = tokio::io::stdout();
    receiver
        .run(&mut transport, &mut stdout)
        .await
        .context("replication stream failed")?;

    Ok(())
}
