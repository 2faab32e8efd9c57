//! Startup reconstruction from the append log.
//!
//! The log holds one encoded command per line in the wire grammar, so
//! replay runs each line through the regular command parser and applies
//! the mutating ones to the store. Anything else (read commands,
//! unknown verbs, blank lines) is skipped; malformed lines are counted
//! and skipped, never fatal. A missing file is a fresh start.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use bytes::Bytes;
use tracing::warn;

use forge_core::ShardedStore;
use forge_protocol::Command;

use crate::aof::AofWriter;

/// Counters describing one replay pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplayStats {
    /// Mutations applied to the store.
    pub commands_replayed: usize,
    /// Blank lines and non-mutating or unknown commands.
    pub lines_skipped: usize,
    /// Malformed lines: bad arity, bad integers, non-positive TTLs.
    pub errors: usize,
}

/// Replays the log at `path` into `store`, silencing `log` for the
/// duration so the records being read back are not appended again.
pub fn replay(path: &Path, store: &ShardedStore, log: &AofWriter) -> ReplayStats {
    log.set_enabled(false);
    let stats = replay_into(path, store);
    log.set_enabled(true);
    stats
}

/// Replays the log at `path` into `store` without touching any writer.
pub fn replay_into(path: &Path, store: &ShardedStore) -> ReplayStats {
    let mut stats = ReplayStats::default();

    let file = match File::open(path) {
        Ok(file) => file,
        // no log yet, fresh start
        Err(_) => return stats,
    };

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line_number = index + 1;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                stats.errors += 1;
                warn!(line = line_number, "unreadable log line skipped: {e}");
                continue;
            }
        };
        if line.is_empty() {
            stats.lines_skipped += 1;
            continue;
        }

        match Command::parse(&line) {
            Ok(Command::Set { key, value }) => {
                store.set(&key, Bytes::from(value));
                stats.commands_replayed += 1;
            }
            Ok(Command::Del { key }) => {
                store.delete(&key);
                stats.commands_replayed += 1;
            }
            Ok(Command::Expire { key, seconds }) => {
                if seconds <= 0 {
                    stats.errors += 1;
                    warn!(line = line_number, "non-positive TTL in log skipped");
                    continue;
                }
                store.expire(&key, seconds);
                stats.commands_replayed += 1;
            }
            // read commands and unknown verbs never mutate state
            Ok(_) => stats.lines_skipped += 1,
            Err(e) => {
                stats.errors += 1;
                warn!(line = line_number, "malformed log line skipped: {e}");
            }
        }
    }

    stats
}
