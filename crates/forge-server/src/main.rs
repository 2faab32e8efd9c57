//! forge-server: entry point.
//!
//! Parses the CLI surface, initializes tracing, builds a runtime sized
//! by `--threads`, and runs the server. Exits 0 on a clean shutdown and
//! 1 on any startup failure.

mod config;
mod connection;
mod dispatcher;
mod server;
mod stats;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use crate::config::{resolve_threads, ServerConfig};

/// In-memory cache server speaking a line-oriented text protocol.
#[derive(Parser)]
#[command(name = "forge-server", version, about)]
struct Args {
    /// Port to listen on.
    #[arg(short, long, default_value_t = config::DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = config::DEFAULT_HOST)]
    host: String,

    /// Worker threads (0 or unset = one per hardware thread).
    #[arg(short, long)]
    threads: Option<usize>,

    /// Total key capacity, split evenly across shards.
    #[arg(long, default_value_t = forge_core::DEFAULT_MAX_KEYS)]
    max_keys: usize,

    /// Whether mutations are persisted to the append-only log.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    aof_enabled: bool,

    /// Path of the append-only log file.
    #[arg(long, default_value = config::DEFAULT_AOF_PATH)]
    aof_path: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        threads: resolve_threads(args.threads),
        max_keys: args.max_keys,
        aof_enabled: args.aof_enabled,
        aof_path: args.aof_path,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.threads)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to build runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = runtime.block_on(server::run(config)) {
        error!("server failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
