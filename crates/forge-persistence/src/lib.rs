//! forge-persistence: append-only durability for the keyspace.
//!
//! Mutating commands are re-encoded as protocol lines, queued, and
//! appended to a log file by a background writer. At startup the log is
//! replayed through the same parser to reconstruct the store.

pub mod aof;
pub mod replay;

pub use aof::AofWriter;
pub use replay::{replay, ReplayStats};
