//! forge-cli: command-line client for CacheForge.
//!
//! Three modes: an interactive REPL (the default), one-shot execution
//! of a single command given as trailing arguments, and a built-in
//! benchmark subcommand.

mod benchmark;
mod connection;
mod format;
mod repl;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::format::format_reply;

/// Command-line client for CacheForge.
#[derive(Parser)]
#[command(name = "forge-cli", version, about)]
struct Args {
    /// Server hostname.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 6380)]
    port: u16,

    #[command(subcommand)]
    mode: Option<Mode>,
}

/// How to run the CLI.
#[derive(Subcommand)]
enum Mode {
    /// Run a built-in benchmark against the server.
    Bench(benchmark::BenchmarkArgs),

    /// One-shot mode: pass a raw command (e.g. `forge-cli SET key value`).
    #[command(external_subcommand)]
    Raw(Vec<OsString>),
}

fn main() -> ExitCode {
    let args = Args::parse();

    match args.mode {
        None => {
            repl::run_repl(&args.host, args.port);
            ExitCode::SUCCESS
        }
        Some(Mode::Bench(bench_args)) => benchmark::run_benchmark(&bench_args, &args.host, args.port),
        Some(Mode::Raw(raw)) => {
            let tokens: Vec<String> = raw
                .into_iter()
                .map(|s| s.to_string_lossy().into_owned())
                .collect();
            run_oneshot(&args.host, args.port, &tokens)
        }
    }
}

/// Sends a single command and prints the reply.
fn run_oneshot(host: &str, port: u16, tokens: &[String]) -> ExitCode {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", format!("failed to create runtime: {e}").red());
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async {
        let mut conn = match connection::Connection::connect(host, port).await {
            Ok(conn) => conn,
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("could not connect to {host}:{port}: {e}").red()
                );
                return ExitCode::FAILURE;
            }
        };
        match conn.send_tokens(tokens).await {
            Ok(reply) => {
                println!("{}", format_reply(&reply));
                if reply.starts_with('-') {
                    ExitCode::FAILURE
                } else {
                    ExitCode::SUCCESS
                }
            }
            Err(e) => {
                eprintln!("{}", format!("{e}").red());
                ExitCode::FAILURE
            }
        }
    })
}
