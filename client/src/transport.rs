//! The single long-lived TCP connection (spec §4.2).
//!
//! `send`/`receive` are `async fn`s driven from the synchronous FUSE layer
//! via `Runtime::block_on`, mirroring how the teacher repo bridges an async
//! `reqwest` client into `fuser`'s blocking callback API.

use std::collections::VecDeque;
use std::time::Duration;

use netfuse_protocol::{Packet, PacketDecoder};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{CoreError, CoreResult};

/// Reads are chunked at 4096 bytes, per spec §4.2.
const READ_CHUNK: usize = 4096;

/// Socket reads that exceed this are reported as `CoreError::Timeout`.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Transport {
    stream: Option<TcpStream>,
    decoder: PacketDecoder,
    /// Packets already reassembled but not yet handed to a caller — a
    /// single `read()` can surface more than one complete frame (e.g. the
    /// tail of one response packed with the start of the next), and the
    /// FIFO contract (spec §4.2) means they must be returned in order on
    /// later `receive()` calls rather than dropped.
    queued: VecDeque<Packet>,
    host: String,
    port: u16,
}

impl Transport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            stream: None,
            decoder: PacketDecoder::new(),
            queued: VecDeque::new(),
            host: host.into(),
            port,
        }
    }

    /// Establish the connection. Per spec §4.2 a failure here is fatal and
    /// distinguishable from a later transient disconnect — callers at
    /// startup treat `Err` as fatal; `Client::reconnect` treats it as
    /// something to keep retrying from the FUSE layer's retry loop.
    pub async fn connect(&mut self) -> CoreResult<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| CoreError::Disconnect(format!("connect to {addr} failed: {e}")))?;
        self.stream = Some(stream);
        self.decoder = PacketDecoder::new();
        self.queued.clear();
        Ok(())
    }

    pub fn close(&mut self) {
        self.stream = None;
    }

    /// Serialize and write a packet in full. No chunking concerns for the
    /// caller — this loops internally until every byte is written.
    pub async fn send(&mut self, packet: &Packet) -> CoreResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CoreError::Disconnect("not connected".into()))?;
        let bytes = packet.encode();
        stream
            .write_all(&bytes)
            .await
            .map_err(|e| CoreError::Disconnect(format!("write failed: {e}")))
    }

    /// Return the next complete packet. Requests and responses are strictly
    /// FIFO on this connection — the caller never has more than one frame
    /// in flight, so the decoder will generally hand back exactly one
    /// packet per call, but any packets already buffered from a previous
    /// over-read are drained first.
    pub async fn receive(&mut self) -> CoreResult<Packet> {
        if let Some(pkt) = self.queued.pop_front() {
            return Ok(pkt);
        }

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| CoreError::Disconnect("not connected".into()))?;

        loop {
            let mut buf = [0u8; READ_CHUNK];
            let n = match tokio::time::timeout(READ_TIMEOUT, stream.read(&mut buf)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(CoreError::Disconnect(format!("read failed: {e}"))),
                Err(_) => return Err(CoreError::Timeout),
            };
            if n == 0 {
                self.stream = None;
                return Err(CoreError::Disconnect("peer closed connection".into()));
            }
            self.queued.extend(self.decoder.feed(&buf[..n])?);
            if let Some(pkt) = self.queued.pop_front() {
                return Ok(pkt);
            }
        }
    }
}
