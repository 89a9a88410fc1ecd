//! End-to-end tests against `TestServer` over a real loopback socket,
//! speaking the wire protocol directly (no `netfuse::Client` involved —
//! those scenarios live in `netfuse`'s own integration tests and exercise
//! this server as a dependency).

use bytes::Bytes;
use netfuse_protocol::{action, controller, hash_psk, PacketDecoder, RESULT_OK};
use netfuse_protocol::Packet;
use netfuse_testserver::TestServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn roundtrip(stream: &mut TcpStream, decoder: &mut PacketDecoder, req: &Packet) -> Packet {
    stream.write_all(&req.encode()).await.unwrap();
    loop {
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "server closed the connection unexpectedly");
        let packets = decoder.feed(&buf[..n]).unwrap();
        if let Some(p) = packets.into_iter().next() {
            return p;
        }
    }
}

#[tokio::test]
async fn login_echo_and_dir_list_over_real_socket() {
    let server = TestServer::spawn("hunter2").await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    let mut decoder = PacketDecoder::new();

    let login = Packet::new()
        .with_header("controller", controller::AUTH)
        .with_header("action", action::LOGIN)
        .with_header("psk", hash_psk("hunter2"));
    let reply = roundtrip(&mut stream, &mut decoder, &login).await;
    assert_eq!(reply.body().as_ref(), RESULT_OK.as_bytes());

    let echo = Packet::with_body(netfuse_protocol::PING_BODY)
        .with_header("controller", controller::ECHO)
        .with_header("action", action::ECHO);
    let reply = roundtrip(&mut stream, &mut decoder, &echo).await;
    assert_eq!(reply.body().as_ref(), netfuse_protocol::PING_BODY);

    let list = Packet::new().with_header("controller", controller::DIR).with_header("action", action::LIST);
    let reply = roundtrip(&mut stream, &mut decoder, &list).await;
    let listing: netfuse_protocol::DirListing = serde_json::from_slice(reply.body()).unwrap();
    assert_eq!(listing["."].id, 1);

    server.shutdown();
}

#[tokio::test]
async fn wrong_psk_is_rejected() {
    let server = TestServer::spawn("hunter2").await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    let mut decoder = PacketDecoder::new();

    let login = Packet::new()
        .with_header("controller", controller::AUTH)
        .with_header("action", action::LOGIN)
        .with_header("psk", hash_psk("wrong"));
    let reply = roundtrip(&mut stream, &mut decoder, &login).await;
    assert_ne!(reply.body().as_ref(), RESULT_OK.as_bytes());

    server.shutdown();
}

#[tokio::test]
async fn disconnect_next_drops_the_connection_instead_of_replying() {
    let server = TestServer::spawn("").await.unwrap();
    server.disconnect_next(controller::DIR, action::LIST);

    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    let list = Packet::new().with_header("controller", controller::DIR).with_header("action", action::LIST);
    stream.write_all(&list.encode()).await.unwrap();

    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "expected EOF, server should have dropped the connection");

    // A fresh connection is unaffected — the rule was one-shot.
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    let mut decoder = PacketDecoder::new();
    let list = Packet::new().with_header("controller", controller::DIR).with_header("action", action::LIST);
    let reply = roundtrip(&mut stream, &mut decoder, &list).await;
    let listing: netfuse_protocol::DirListing = serde_json::from_slice(reply.body()).unwrap();
    assert_eq!(listing["."].id, 1);

    server.shutdown();
}

#[tokio::test]
async fn file_put_is_visible_through_root_child_count() {
    let server = TestServer::spawn("").await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();
    let mut decoder = PacketDecoder::new();

    let mut put = Packet::new()
        .with_header("controller", controller::FILE)
        .with_header("action", action::PUT)
        .with_header("id", "1")
        .with_header("name", "a.txt");
    put.set_body(Bytes::from_static(b"hi!"));
    let reply = roundtrip(&mut stream, &mut decoder, &put).await;
    assert_eq!(reply.body().as_ref(), RESULT_OK.as_bytes());

    assert_eq!(server.root_child_count().await, 1);
    server.shutdown();
}
