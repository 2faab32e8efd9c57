//! End-to-end tests for the wire protocol commands.

use std::time::Duration;

use crate::helpers::{ServerOptions, TestServer};

#[tokio::test]
async fn ping_pong() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(c.cmd("PING").await, "+PONG");
}

#[tokio::test]
async fn set_get_roundtrip() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(c.cmd("SET foo bar").await, "+OK");
    assert_eq!(c.cmd("GET foo").await, "$bar");
    assert_eq!(c.cmd("GET missing").await, "$nil");
}

#[tokio::test]
async fn del_reports_removal() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    c.cmd("SET k v").await;
    assert_eq!(c.cmd("DEL k").await, ":1");
    assert_eq!(c.cmd("DEL k").await, ":0");
    assert_eq!(c.cmd("GET k").await, "$nil");
}

#[tokio::test]
async fn ttl_lifecycle() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    c.cmd("SET k v").await;
    assert_eq!(c.cmd("TTL k").await, ":-1");
    assert_eq!(c.cmd("EXPIRE k 1").await, ":1");

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(c.cmd("GET k").await, "$nil");
    assert_eq!(c.cmd("TTL k").await, ":-2");
}

#[tokio::test]
async fn expire_missing_key() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(c.cmd("EXPIRE ghost 10").await, ":0");
    assert_eq!(c.cmd("TTL ghost").await, ":-2");
}

#[tokio::test]
async fn quoted_values_over_the_wire() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(c.cmd(r#"SET greeting "hello world""#).await, "+OK");
    assert_eq!(c.cmd("GET greeting").await, "$hello world");

    assert_eq!(c.cmd(r#"SET q "say \"hi\"""#).await, "+OK");
    assert_eq!(c.cmd("GET q").await, r#"$say "hi""#);
}

#[tokio::test]
async fn commands_are_case_insensitive() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(c.cmd("set k v").await, "+OK");
    assert_eq!(c.cmd("get k").await, "$v");
    assert_eq!(c.cmd("ping").await, "+PONG");
}

#[tokio::test]
async fn carriage_returns_are_tolerated() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    c.send_raw(b"PING\r\n").await;
    assert_eq!(c.read_reply().await, "+PONG");
}

#[tokio::test]
async fn errors_for_bad_input() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    assert_eq!(
        c.cmd("SET onlykey").await,
        "-ERR wrong number of arguments for 'set' command"
    );
    assert_eq!(
        c.cmd("EXPIRE k soon").await,
        "-ERR value is not an integer or out of range"
    );
    assert_eq!(c.cmd("FLUSHALL").await, "-ERR unknown command");
}

#[tokio::test]
async fn pipelined_replies_arrive_in_order() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    c.send_raw(b"SET a 1\nGET a\nPING\nGET missing\nTTL a\n")
        .await;
    assert_eq!(c.read_reply().await, "+OK");
    assert_eq!(c.read_reply().await, "$1");
    assert_eq!(c.read_reply().await, "+PONG");
    assert_eq!(c.read_reply().await, "$nil");
    assert_eq!(c.read_reply().await, ":-1");
}

#[tokio::test]
async fn stats_arithmetic_over_the_wire() {
    let server = TestServer::start();
    let mut c = server.connect().await;

    c.cmd("SET key1 val1").await;
    c.cmd("SET key2 val2").await;
    c.cmd("SET key3 val3").await;
    c.cmd("GET key1").await;
    c.cmd("GET key2").await;
    c.cmd("GET nonexistent").await;
    c.cmd("DEL key3").await;

    // STATS itself is request #8
    let stats = c.stats().await;
    assert_eq!(stats["total_requests"], 8);
    assert_eq!(stats["total_reads"], 3);
    assert_eq!(stats["total_writes"], 4);
    assert_eq!(stats["cache_hits"], 2);
    assert_eq!(stats["cache_misses"], 1);
    assert_eq!(stats["current_keys"], 2);
}

#[tokio::test]
async fn capacity_pressure_evicts() {
    // max_keys 16 leaves room for one entry per shard
    let server = TestServer::start_with(ServerOptions {
        max_keys: Some(16),
        ..Default::default()
    });
    let mut c = server.connect().await;

    for i in 0..32 {
        assert_eq!(c.cmd(&format!("SET key:{i} v")).await, "+OK");
    }

    let stats = c.stats().await;
    assert!(stats["current_keys"] <= 16, "stats: {stats:?}");
    assert!(stats["evicted_keys"] >= 16, "stats: {stats:?}");
}

#[tokio::test]
async fn concurrent_connections_are_isolated() {
    let server = TestServer::start();
    let mut first = server.connect().await;
    let mut second = server.connect().await;

    assert_eq!(first.cmd("SET shared 1").await, "+OK");
    assert_eq!(second.cmd("GET shared").await, "$1");

    // interleaved commands on both connections keep their own order
    first.send_raw(b"SET a 1\nGET a\n").await;
    second.send_raw(b"SET b 2\nGET b\n").await;
    assert_eq!(first.read_reply().await, "+OK");
    assert_eq!(second.read_reply().await, "+OK");
    assert_eq!(first.read_reply().await, "$1");
    assert_eq!(second.read_reply().await, "$2");
}
