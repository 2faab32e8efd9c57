//! forge-protocol: the line-oriented wire protocol.
//!
//! One command per newline-delimited line in, one reply line out. The
//! same token grammar is used by the append-only log, so persisted
//! records replay through the identical parser.
//!
//! # quick start
//!
//! ```
//! use bytes::BytesMut;
//! use forge_protocol::{Command, Reply};
//!
//! let cmd = Command::parse("SET greeting \"hello world\"").unwrap();
//! assert_eq!(
//!     cmd,
//!     Command::Set {
//!         key: "greeting".into(),
//!         value: "hello world".into(),
//!     }
//! );
//!
//! let mut buf = BytesMut::new();
//! Reply::Ok.serialize(&mut buf);
//! assert_eq!(&buf[..], b"+OK\n");
//! ```

pub mod command;
pub mod reply;

pub use command::{quote, Command, CommandError};
pub use reply::Reply;
