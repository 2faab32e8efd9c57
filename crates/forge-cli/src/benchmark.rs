//! Built-in benchmark.
//!
//! Spawns concurrent client tasks, each with its own connection,
//! issuing a mixed SET/GET workload over a bounded keyspace, and
//! reports throughput and latency percentiles.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Barrier;

use crate::connection::Connection;

/// Arguments for the built-in benchmark.
#[derive(Debug, Args)]
pub struct BenchmarkArgs {
    /// Total number of requests to send.
    #[arg(short = 'n', long, default_value_t = 100_000)]
    pub requests: u64,

    /// Number of concurrent client connections.
    #[arg(short = 'c', long, default_value_t = 8)]
    pub clients: u32,

    /// Number of distinct keys to spread requests over.
    #[arg(long, default_value_t = 10_000)]
    pub keyspace: u64,

    /// Fraction of requests that are GETs; the rest are SETs.
    #[arg(long, default_value_t = 0.8)]
    pub read_ratio: f64,

    /// Size of the value payload in bytes.
    #[arg(short = 'd', long = "data-size", default_value_t = 64)]
    pub data_size: usize,
}

/// Per-task measurements, merged after the run.
#[derive(Default)]
struct TaskResult {
    latencies_us: Vec<u64>,
    errors: u64,
}

/// Runs the benchmark. Blocks on a private runtime.
pub fn run_benchmark(args: &BenchmarkArgs, host: &str, port: u16) -> ExitCode {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", format!("failed to create runtime: {e}").red());
            return ExitCode::FAILURE;
        }
    };
    rt.block_on(run_async(args, host, port))
}

async fn run_async(args: &BenchmarkArgs, host: &str, port: u16) -> ExitCode {
    println!();
    println!("{}", "=== cacheforge benchmark ===".bold());
    println!("server:     {}:{}", host.cyan(), port.to_string().cyan());
    println!("requests:   {}", args.requests);
    println!("clients:    {}", args.clients);
    println!("keyspace:   {}", args.keyspace);
    println!("read ratio: {}", args.read_ratio);
    println!("data size:  {} bytes", args.data_size);
    println!();

    let clients = args.clients.max(1) as u64;
    let per_client = args.requests / clients;
    let barrier = Arc::new(Barrier::new(clients as usize));

    let mut tasks = Vec::with_capacity(clients as usize);
    for id in 0..clients {
        let host = host.to_string();
        let barrier = Arc::clone(&barrier);
        let keyspace = args.keyspace.max(1);
        let read_ratio = args.read_ratio;
        let value = make_value(args.data_size, id);

        tasks.push(tokio::spawn(async move {
            let mut conn = Connection::connect(&host, port).await?;
            let mut rng = StdRng::seed_from_u64(0xF0_7E_5E_ED ^ id);
            let mut result = TaskResult::default();

            barrier.wait().await;
            for _ in 0..per_client {
                let key = format!("bench:{}", rng.random_range(0..keyspace));
                let line = if rng.random::<f64>() < read_ratio {
                    format!("GET {key}")
                } else {
                    format!("SET {key} {value}")
                };

                let started = Instant::now();
                match conn.send_line(&line).await {
                    Ok(reply) => {
                        if reply.starts_with('-') {
                            result.errors += 1;
                        }
                        result.latencies_us.push(started.elapsed().as_micros() as u64);
                    }
                    Err(_) => result.errors += 1,
                }
            }
            Ok::<TaskResult, crate::connection::ClientError>(result)
        }));
    }

    let started = Instant::now();
    let mut latencies = Vec::new();
    let mut errors = 0u64;
    for task in tasks {
        match task.await {
            Ok(Ok(result)) => {
                latencies.extend(result.latencies_us);
                errors += result.errors;
            }
            Ok(Err(e)) => {
                eprintln!("{}", format!("client failed: {e}").red());
                return ExitCode::FAILURE;
            }
            Err(e) => {
                eprintln!("{}", format!("client task panicked: {e}").red());
                return ExitCode::FAILURE;
            }
        }
    }
    let elapsed = started.elapsed();

    print_summary(&mut latencies, errors, elapsed);
    ExitCode::SUCCESS
}

fn print_summary(latencies: &mut [u64], errors: u64, elapsed: Duration) {
    if latencies.is_empty() {
        println!("{}", "no successful requests".red());
        return;
    }
    latencies.sort_unstable();

    let completed = latencies.len() as f64;
    let throughput = completed / elapsed.as_secs_f64();

    println!("{}", "--- results ---".bold());
    println!("completed:  {}", latencies.len());
    println!("errors:     {errors}");
    println!("elapsed:    {:.2}s", elapsed.as_secs_f64());
    println!(
        "throughput: {}",
        format!("{throughput:.0} req/s").green().bold()
    );
    println!("latency p50:  {}", format_us(percentile(latencies, 0.50)));
    println!("latency p95:  {}", format_us(percentile(latencies, 0.95)));
    println!("latency p99:  {}", format_us(percentile(latencies, 0.99)));
    println!("latency max:  {}", format_us(latencies[latencies.len() - 1]));
}

/// Nearest-rank percentile over sorted data.
fn percentile(sorted: &[u64], p: f64) -> u64 {
    let rank = ((sorted.len() as f64) * p).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn format_us(us: u64) -> String {
    if us >= 1000 {
        format!("{:.2}ms", us as f64 / 1000.0)
    } else {
        format!("{us}µs")
    }
}

/// Deterministic printable payload of the requested size.
fn make_value(size: usize, seed: u64) -> String {
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = StdRng::seed_from_u64(seed);
    (0..size.max(1))
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}
