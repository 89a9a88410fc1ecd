//! Per-connection read/dispatch/write loop — the server-side mirror of the
//! client's `Transport` (spec.md §4.2): reads are chunked at a fixed buffer
//! size and fed to a `PacketDecoder` until a complete frame is available.

use std::collections::VecDeque;
use std::sync::Arc;

use netfuse_protocol::PacketDecoder;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::dispatch;
use crate::rules::Rules;
use crate::tree::Tree;

const READ_CHUNK: usize = 4096;

pub async fn handle(mut stream: TcpStream, tree: Arc<Mutex<Tree>>, psk_hash: Arc<str>, rules: Arc<Rules>) {
    let mut decoder = PacketDecoder::new();
    let mut buf = [0u8; READ_CHUNK];
    let mut queued = VecDeque::new();

    loop {
        let packet = loop {
            if let Some(p) = queued.pop_front() {
                break p;
            }
            let n = match stream.read(&mut buf).await {
                Ok(0) => {
                    debug!("connection closed by peer");
                    return;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(%e, "read failed");
                    return;
                }
            };
            match decoder.feed(&buf[..n]) {
                Ok(packets) => queued.extend(packets),
                Err(e) => {
                    warn!(%e, "malformed frame, dropping connection");
                    return;
                }
            }
        };

        let controller = packet.header("controller").unwrap_or_default().to_string();
        let action = packet.header("action").unwrap_or_default().to_string();
        if rules.take_disconnect(&controller, &action) {
            debug!(controller, action, "simulating mid-request disconnect");
            return;
        }

        let reply = {
            let mut tree = tree.lock().await;
            dispatch::handle(&packet, &mut tree, &psk_hash)
        };

        if let Err(e) = stream.write_all(&reply.encode()).await {
            warn!(%e, "write failed");
            return;
        }
    }
}
