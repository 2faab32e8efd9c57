//! End-to-end tests for append-log persistence and recovery.

use std::time::Duration;

use crate::helpers::{ServerOptions, TestServer};

/// The writer flushes every 100ms; give it comfortable margin before
/// killing the server.
async fn let_log_flush() {
    tokio::time::sleep(Duration::from_millis(400)).await;
}

#[tokio::test]
async fn restart_replays_the_log() {
    let data_dir = tempfile::tempdir().unwrap();
    let path = data_dir.path().join("cache.aof");

    {
        let server = TestServer::start_with(ServerOptions {
            aof_path: Some(path.clone()),
            ..Default::default()
        });
        let mut c = server.connect().await;

        assert_eq!(c.cmd("SET a 1").await, "+OK");
        assert_eq!(c.cmd("SET b 2").await, "+OK");
        assert_eq!(c.cmd("DEL b").await, ":1");
        let_log_flush().await;
    }
    // server killed on drop; data_dir still alive

    let server = TestServer::start_with(ServerOptions {
        aof_path: Some(path),
        ..Default::default()
    });
    let mut c = server.connect().await;

    assert_eq!(c.cmd("GET a").await, "$1");
    assert_eq!(c.cmd("GET b").await, "$nil");

    drop(data_dir);
}

#[tokio::test]
async fn quoted_values_survive_restart() {
    let data_dir = tempfile::tempdir().unwrap();
    let path = data_dir.path().join("cache.aof");

    {
        let server = TestServer::start_with(ServerOptions {
            aof_path: Some(path.clone()),
            ..Default::default()
        });
        let mut c = server.connect().await;
        assert_eq!(c.cmd(r#"SET greeting "hello world""#).await, "+OK");
        assert_eq!(c.cmd(r#"SET q "say \"hi\"""#).await, "+OK");
        let_log_flush().await;
    }

    let server = TestServer::start_with(ServerOptions {
        aof_path: Some(path),
        ..Default::default()
    });
    let mut c = server.connect().await;

    assert_eq!(c.cmd("GET greeting").await, "$hello world");
    assert_eq!(c.cmd("GET q").await, r#"$say "hi""#);

    drop(data_dir);
}

#[tokio::test]
async fn ttls_survive_restart() {
    let data_dir = tempfile::tempdir().unwrap();
    let path = data_dir.path().join("cache.aof");

    {
        let server = TestServer::start_with(ServerOptions {
            aof_path: Some(path.clone()),
            ..Default::default()
        });
        let mut c = server.connect().await;
        assert_eq!(c.cmd("SET k v").await, "+OK");
        assert_eq!(c.cmd("EXPIRE k 300").await, ":1");
        let_log_flush().await;
    }

    let server = TestServer::start_with(ServerOptions {
        aof_path: Some(path),
        ..Default::default()
    });
    let mut c = server.connect().await;

    assert_eq!(c.cmd("GET k").await, "$v");
    let ttl_reply = c.cmd("TTL k").await;
    let ttl: i64 = ttl_reply.strip_prefix(':').unwrap().parse().unwrap();
    assert!(
        (1..=300).contains(&ttl),
        "expected a live TTL, got {ttl_reply}"
    );

    drop(data_dir);
}

#[tokio::test]
async fn corrupt_lines_do_not_prevent_startup() {
    let data_dir = tempfile::tempdir().unwrap();
    let path = data_dir.path().join("cache.aof");
    std::fs::write(&path, "SET a 1\nINVALID\nSET b 2\nSET_MISSING_VALUE\nSET c 3\n").unwrap();

    let server = TestServer::start_with(ServerOptions {
        aof_path: Some(path),
        ..Default::default()
    });
    let mut c = server.connect().await;

    assert_eq!(c.cmd("GET a").await, "$1");
    assert_eq!(c.cmd("GET b").await, "$2");
    assert_eq!(c.cmd("GET c").await, "$3");

    drop(data_dir);
}

#[tokio::test]
async fn replayed_commands_are_not_relogged() {
    let data_dir = tempfile::tempdir().unwrap();
    let path = data_dir.path().join("cache.aof");
    std::fs::write(&path, "SET a 1\n").unwrap();

    {
        let server = TestServer::start_with(ServerOptions {
            aof_path: Some(path.clone()),
            ..Default::default()
        });
        let mut c = server.connect().await;
        assert_eq!(c.cmd("GET a").await, "$1");
        let_log_flush().await;
    }

    // replay must not have appended a duplicate of its own input
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "SET a 1\n");

    drop(data_dir);
}

#[tokio::test]
async fn disabled_log_still_serves_commands() {
    let server = TestServer::start(); // aof disabled
    let mut c = server.connect().await;

    assert_eq!(c.cmd("SET k v").await, "+OK");
    assert_eq!(c.cmd("GET k").await, "$v");
}
