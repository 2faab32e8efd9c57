//! Async TCP connection to a CacheForge server.
//!
//! Sends one command line, reads one reply line. Tokens containing
//! whitespace or quotes are re-encoded with the protocol's quoting
//! rules before they hit the wire.

use forge_protocol::quote;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Errors that can occur while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("server disconnected")]
    Disconnected,
}

/// A line-protocol connection with buffered reads.
pub struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Connection {
    /// Connects to the server at the given host and port.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port)).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Sends a raw command line and returns the reply line without its
    /// trailing newline.
    pub async fn send_line(&mut self, line: &str) -> Result<String, ClientError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;

        let mut reply = String::new();
        let n = self.reader.read_line(&mut reply).await?;
        if n == 0 {
            return Err(ClientError::Disconnected);
        }
        while reply.ends_with('\n') || reply.ends_with('\r') {
            reply.pop();
        }
        Ok(reply)
    }

    /// Sends a command given as separate tokens, quoting any that need
    /// it so they survive the server's tokenizer.
    pub async fn send_tokens(&mut self, tokens: &[String]) -> Result<String, ClientError> {
        let line = tokens
            .iter()
            .map(|t| quote(t))
            .collect::<Vec<_>>()
            .join(" ");
        self.send_line(&line).await
    }
}
