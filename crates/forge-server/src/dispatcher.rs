//! Command dispatch: parsed command in, reply out.
//!
//! The dispatcher is the only place that touches store, append log, and
//! counters together. It is stateful only in the counters: every
//! dispatched line bumps `total_requests` (malformed and unknown ones
//! included), verb-specific counters fire for well-formed commands, and
//! log records are emitted for mutations that actually applied.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use forge_core::ShardedStore;
use forge_persistence::AofWriter;
use forge_protocol::{Command, CommandError, Reply};

use crate::stats::Counters;

pub struct Dispatcher {
    store: Arc<ShardedStore>,
    /// Absent when the server runs with persistence disabled.
    log: Option<Arc<AofWriter>>,
    counters: Counters,
    started: Instant,
}

impl Dispatcher {
    pub fn new(store: Arc<ShardedStore>, log: Option<Arc<AofWriter>>) -> Self {
        Self {
            store,
            log,
            counters: Counters::default(),
            started: Instant::now(),
        }
    }

    /// Executes one parsed line and returns the reply to send.
    pub fn dispatch(&self, parsed: Result<Command, CommandError>) -> Reply {
        self.counters.total_requests.fetch_add(1, Ordering::Relaxed);

        let command = match parsed {
            Ok(command) => command,
            Err(e) => return Reply::Error(e.to_string()),
        };

        match command {
            Command::Ping => Reply::Pong,

            Command::Set { key, value } => {
                self.counters.total_writes.fetch_add(1, Ordering::Relaxed);
                self.store.set(&key, Bytes::from(value.clone()));
                if let Some(log) = &self.log {
                    log.log_set(&key, &value);
                }
                Reply::Ok
            }

            Command::Get { key } => {
                self.counters.total_reads.fetch_add(1, Ordering::Relaxed);
                match self.store.get(&key) {
                    Some(value) => {
                        self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                        Reply::Value(value)
                    }
                    None => {
                        self.counters.cache_misses.fetch_add(1, Ordering::Relaxed);
                        Reply::Nil
                    }
                }
            }

            Command::Del { key } => {
                self.counters.total_writes.fetch_add(1, Ordering::Relaxed);
                let removed = self.store.delete(&key);
                if removed {
                    if let Some(log) = &self.log {
                        log.log_del(&key);
                    }
                }
                Reply::Integer(removed as i64)
            }

            Command::Expire { key, seconds } => {
                self.counters.total_writes.fetch_add(1, Ordering::Relaxed);
                // non-positive TTLs are refused by the store; nothing
                // is applied, so nothing is logged
                let applied = self.store.expire(&key, seconds);
                if applied {
                    if let Some(log) = &self.log {
                        log.log_expire(&key, seconds);
                    }
                }
                Reply::Integer(applied as i64)
            }

            Command::Ttl { key } => Reply::Integer(self.store.ttl(&key)),

            Command::Stats => {
                let payload = self.counters.render(&self.store, self.started);
                Reply::Value(Bytes::from(payload))
            }

            Command::Unknown(_) => Reply::Error("unknown command".into()),
        }
    }
}
