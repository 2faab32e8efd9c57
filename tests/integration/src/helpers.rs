//! Test helpers for spawning a forge-server and talking the wire
//! protocol over a real TCP connection.

#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A forge-server subprocess managed by the test harness.
pub struct TestServer {
    child: Child,
    pub port: u16,
    _data_dir: Option<tempfile::TempDir>,
}

/// Options for starting a test server.
#[derive(Default)]
pub struct ServerOptions {
    /// Total key capacity (`--max-keys`).
    pub max_keys: Option<usize>,
    /// Enable the append-only log in a fresh temp directory.
    pub aof: bool,
    /// Use an existing log path without taking ownership of the
    /// directory. Implies `aof`; wins over the fresh temp dir.
    pub aof_path: Option<PathBuf>,
}

impl TestServer {
    /// Starts a server on a random port with the append log disabled.
    pub fn start() -> Self {
        Self::start_with(ServerOptions::default())
    }

    /// Starts a server with custom options and blocks until it is
    /// accepting connections (up to 5 seconds).
    pub fn start_with(opts: ServerOptions) -> Self {
        let binary = server_binary();
        let port = find_free_port();

        let mut cmd = Command::new(&binary);
        cmd.arg("--port").arg(port.to_string());
        cmd.arg("--host").arg("127.0.0.1");
        // suppress tracing output in tests
        cmd.env("RUST_LOG", "error");

        if let Some(max_keys) = opts.max_keys {
            cmd.arg("--max-keys").arg(max_keys.to_string());
        }

        let data_dir = if let Some(ref path) = opts.aof_path {
            cmd.arg("--aof-enabled").arg("true");
            cmd.arg("--aof-path").arg(path);
            None // caller manages the directory lifetime
        } else if opts.aof {
            let dir = tempfile::tempdir().expect("create temp dir");
            cmd.arg("--aof-enabled").arg("true");
            cmd.arg("--aof-path").arg(dir.path().join("cache.aof"));
            Some(dir)
        } else {
            cmd.arg("--aof-enabled").arg("false");
            None
        };

        let child = cmd
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap_or_else(|e| {
                panic!("failed to spawn forge-server at {}: {e}", binary.display())
            });

        // wait for the server to be ready
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            if std::net::TcpStream::connect(("127.0.0.1", port)).is_ok() {
                break;
            }
            if std::time::Instant::now() > deadline {
                panic!("forge-server did not start listening on port {port}");
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        Self {
            child,
            port,
            _data_dir: data_dir,
        }
    }

    /// Opens a client connection to this server.
    pub async fn connect(&self) -> Client {
        let stream = TcpStream::connect(("127.0.0.1", self.port))
            .await
            .expect("connect to test server");
        let (read_half, write_half) = stream.into_split();
        Client {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A line-protocol client over a test connection.
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Sends one command line and returns the reply line, without the
    /// trailing newline.
    pub async fn cmd(&mut self, line: &str) -> String {
        self.send_raw(line.as_bytes()).await;
        self.send_raw(b"\n").await;
        self.read_reply().await
    }

    /// Writes raw bytes without waiting for a reply. Used to pipeline
    /// several commands into one burst.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write to server");
    }

    /// Reads one reply line.
    pub async fn read_reply(&mut self) -> String {
        let mut reply = String::new();
        let n = self
            .reader
            .read_line(&mut reply)
            .await
            .expect("read from server");
        assert!(n > 0, "server closed the connection");
        reply.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Runs STATS and parses the payload into name → number pairs.
    pub async fn stats(&mut self) -> std::collections::HashMap<String, i64> {
        let reply = self.cmd("STATS").await;
        let payload = reply.strip_prefix('$').expect("STATS reply payload");
        payload
            .split(',')
            .map(|pair| {
                let (name, number) = pair.split_once(':').expect("name:number pair");
                (name.to_string(), number.parse().expect("numeric stat"))
            })
            .collect()
    }
}

/// Path of the compiled forge-server binary, which lands in the shared
/// workspace target directory next to this test executable.
fn server_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("current_exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("forge-server");
    path
}

/// Asks the OS for a free port by binding to port 0 and dropping the
/// listener. Racy in principle, fine for tests.
fn find_free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    listener.local_addr().expect("probe addr").port()
}
