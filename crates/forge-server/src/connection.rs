//! Per-connection handler.
//!
//! Reads newline-delimited commands from a TCP stream and dispatches
//! them strictly in arrival order, which is what guarantees that the
//! reply stream matches the command stream for this connection. Replies
//! for a burst of pipelined commands are batched into a single write.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use forge_protocol::{Command, Reply};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::dispatcher::Dispatcher;

/// Initial buffer capacity. 4KB covers typical commands comfortably.
const BUF_CAPACITY: usize = 4096;

/// Maximum read buffer size before we disconnect the client. Prevents
/// a client that never sends a newline from consuming unbounded memory.
const MAX_BUF_SIZE: usize = 64 * 1024 * 1024; // 64 MB

/// How long a connection can be idle before it is closed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(300); // 5 minutes

/// Drives a single client connection to completion.
///
/// The loop exits when the client disconnects, goes idle past the
/// timeout, or an I/O error occurs.
pub async fn handle(mut stream: TcpStream, dispatcher: Arc<Dispatcher>) -> std::io::Result<()> {
    let mut buf = BytesMut::with_capacity(BUF_CAPACITY);
    let mut out = BytesMut::with_capacity(BUF_CAPACITY);

    loop {
        if buf.len() > MAX_BUF_SIZE {
            out.clear();
            Reply::Error("max buffer size exceeded, closing connection".into())
                .serialize(&mut out);
            let _ = stream.write_all(&out).await;
            return Ok(());
        }

        match tokio::time::timeout(IDLE_TIMEOUT, stream.read_buf(&mut buf)).await {
            Ok(Ok(0)) => return Ok(()), // clean disconnect
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Ok(()), // idle timeout, close silently
        }

        // process every complete line in the buffer; a trailing partial
        // command stays buffered for the next read
        out.clear();
        while let Some(newline) = memchr::memchr(b'\n', &buf) {
            let chunk = buf.split_to(newline + 1);
            let mut line = &chunk[..newline];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            if line.is_empty() {
                continue;
            }
            let text = String::from_utf8_lossy(line);
            let reply = dispatcher.dispatch(Command::parse(&text));
            reply.serialize(&mut out);
        }

        if !out.is_empty() {
            stream.write_all(&out).await?;
        }
    }
}
