//! The `Client`-level end-to-end scenarios from spec.md §8, driven against
//! `netfuse-testserver` over a real loopback socket. These exercise
//! exactly the guards the FUSE operation layer (`netfuse::fs`) delegates
//! to — e.g. `fs::rename::rename`'s `ENOENT` branch is literally `if
//! !client.has(old).await? { ... }`, which is what the rename-missing test
//! below asserts directly, since `fuser::Request` has no public
//! test-friendly constructor to drive the `Filesystem` trait methods
//! themselves outside of a real kernel mount (see `mount_roundtrip.rs` for
//! that level).

use bytes::Bytes;
use netfuse::client::Client;
use netfuse_protocol::{action, controller};
use netfuse_testserver::TestServer;

/// Scenario 1: ping.
#[tokio::test]
async fn ping_round_trips() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();
    client.ping().await.unwrap();
}

/// Scenario 2: list root.
#[tokio::test]
async fn write_populates_readdir_and_getid() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    client.write("/a.txt", Bytes::from_static(b"hi!")).await.unwrap();

    let names = client.readdir("/").await.unwrap();
    assert_eq!(names, vec!["a.txt".to_string()]);

    let inode = client.stat("/a.txt").await.unwrap();
    assert!(inode.id > 0);
    assert_eq!(inode.size, Some(3));
}

/// Scenario 3: write-then-read.
#[tokio::test]
async fn write_then_read_returns_the_written_bytes() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    client.write("/a.txt", Bytes::from_static(b"hi!")).await.unwrap();
    let content = client.read("/a.txt").await.unwrap();
    assert_eq!(content.as_ref(), b"hi!");
}

/// Scenario 4: reconnect on disconnect. Cache disabled so `readdir` always
/// hits the wire rather than serving the freshness marker `connect`
/// already populated for root.
#[tokio::test]
async fn readdir_reconnects_after_a_mid_request_disconnect() {
    let server = TestServer::spawn("s3cr3t").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "s3cr3t", false).await.unwrap();

    server.disconnect_next(controller::DIR, action::LIST);
    let err = client.readdir("/").await.unwrap_err();
    assert!(err.is_disconnect());

    client.reconnect().await.unwrap();
    let names = client.readdir("/").await.unwrap();
    assert!(names.is_empty());
}

/// Scenario 6: rename of a path that doesn't exist. `fs::rename::rename`
/// checks `client.has(old)` before issuing the move; this is that guard.
#[tokio::test]
async fn has_is_false_for_a_path_that_was_never_created() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    assert!(!client.has("/does-not-exist").await.unwrap());
}

#[tokio::test]
async fn mkdir_rmdir_round_trip() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    client.mkdir("/", "sub").await.unwrap();
    assert!(client.has("/sub").await.unwrap());
    assert!(client.isdir("/sub"));

    client.rmdir("/sub").await.unwrap();
    assert!(!client.readdir("/").await.unwrap().contains(&"sub".to_string()));
}

#[tokio::test]
async fn rm_reports_false_for_an_unknown_file_and_true_on_success() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    assert!(!client.rm("/missing.txt").await.unwrap());

    client.write("/a.txt", Bytes::from_static(b"x")).await.unwrap();
    assert!(client.rm("/a.txt").await.unwrap());
    assert!(!client.readdir("/").await.unwrap().contains(&"a.txt".to_string()));
}

#[tokio::test]
async fn mv_renames_a_file_into_a_new_directory() {
    let server = TestServer::spawn("").await.unwrap();
    let mut client = Client::connect(&server.host(), server.port(), "", true).await.unwrap();

    client.write("/a.txt", Bytes::from_static(b"x")).await.unwrap();
    client.mkdir("/", "sub").await.unwrap();
    client.mv("/a.txt", "/sub/b.txt").await.unwrap();

    assert!(!client.readdir("/").await.unwrap().contains(&"a.txt".to_string()));
    assert!(client.readdir("/sub").await.unwrap().contains(&"b.txt".to_string()));
    assert_eq!(client.read("/sub/b.txt").await.unwrap().as_ref(), b"x");
}
