//! Server bootstrap, accept loop, and shutdown ordering.
//!
//! Startup: build the store, start the sweeper, replay the append log
//! (gate closed) and start its writer, then bind the listener. Replay
//! finishes before the listening socket exists, so clients never
//! observe a half-reconstructed keyspace. A bind failure is fatal and
//! propagates to `main`.
//!
//! Shutdown on ctrl-c: stop accepting, join the sweeper, then stop the
//! log writer so it drains and flushes the remaining queue.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use forge_core::{ShardedStore, Sweeper};
use forge_persistence::{replay, AofWriter};

use crate::config::ServerConfig;
use crate::connection;
use crate::dispatcher::Dispatcher;

/// Runs the server until ctrl-c.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ShardedStore::new(config.max_keys));

    let log = if config.aof_enabled {
        let writer = Arc::new(AofWriter::new(
            &config.aof_path,
            forge_persistence::aof::DEFAULT_FLUSH_INTERVAL,
        ));
        let stats = replay(&config.aof_path, &store, &writer);
        if stats.commands_replayed > 0 || stats.lines_skipped > 0 || stats.errors > 0 {
            info!(
                replayed = stats.commands_replayed,
                skipped = stats.lines_skipped,
                errors = stats.errors,
                "append log replayed"
            );
        }
        writer.start()?;
        Some(writer)
    } else {
        None
    };

    let mut sweeper = Sweeper::start(Arc::clone(&store));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&store), log.clone()));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr} with {} worker threads", config.threads);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("accept failed: {e}");
                        continue;
                    }
                };
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    if let Err(e) = connection::handle(stream, dispatcher).await {
                        debug!("connection error from {peer}: {e}");
                    }
                });
            }
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!("failed to listen for shutdown signal: {e}");
                }
                break;
            }
        }
    }

    info!("shutting down");
    sweeper.stop();
    if let Some(log) = log {
        log.stop();
    }
    Ok(())
}
