//! Server configuration.

use std::path::PathBuf;

use forge_core::DEFAULT_MAX_KEYS;

pub const DEFAULT_PORT: u16 = 6380;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_AOF_PATH: &str = "./cache.aof";

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Worker threads for the runtime.
    pub threads: usize,
    /// Total key capacity, split evenly across shards.
    pub max_keys: usize,
    pub aof_enabled: bool,
    pub aof_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            threads: resolve_threads(None),
            max_keys: DEFAULT_MAX_KEYS,
            aof_enabled: true,
            aof_path: DEFAULT_AOF_PATH.into(),
        }
    }
}

/// Resolves the worker thread count: the explicit value when positive,
/// otherwise one per hardware thread, never less than one.
pub fn resolve_threads(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
    }
}
