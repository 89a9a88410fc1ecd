//! The handle integration tests and manual runs hold: binds a loopback
//! listener, accepts connections in the background, and can be told to
//! simulate a disconnect or be shut down.

use std::net::SocketAddr;
use std::sync::Arc;

use netfuse_protocol::hash_psk;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::connection;
use crate::rules::Rules;
use crate::tree::Tree;

pub struct TestServer {
    addr: SocketAddr,
    rules: Arc<Rules>,
    tree: Arc<Mutex<Tree>>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    /// Bind to an OS-assigned loopback port and start accepting
    /// connections in the background. `raw_psk` is the plaintext secret —
    /// it is hashed the same way `Client::connect` hashes it before
    /// comparison, so tests pass the same string to both sides.
    pub async fn spawn(raw_psk: &str) -> std::io::Result<Self> {
        Self::bind(("127.0.0.1", 0), raw_psk).await
    }

    /// Like `spawn`, but bound to a caller-chosen address — used by the
    /// standalone `netfuse-testserver` binary, which needs a fixed,
    /// advertised port rather than an OS-assigned one.
    pub async fn bind(addr: impl ToSocketAddrs, raw_psk: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let tree = Arc::new(Mutex::new(Tree::new()));
        let rules = Arc::new(Rules::new());
        let psk_hash: Arc<str> = Arc::from(hash_psk(raw_psk));

        let accept_tree = tree.clone();
        let accept_rules = rules.clone();
        let accept_task = tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(%e, "accept failed");
                        continue;
                    }
                };
                info!(%peer, "accepted connection");
                let tree = accept_tree.clone();
                let rules = accept_rules.clone();
                let psk_hash = psk_hash.clone();
                tokio::spawn(connection::handle(stream, tree, psk_hash, rules));
            }
        });

        Ok(Self { addr, rules, tree, accept_task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The next request matching `controller#action` gets the connection
    /// dropped instead of a reply (spec.md §8 scenario 4).
    pub fn disconnect_next(&self, controller: &str, action: &str) {
        self.rules.disconnect_next(controller, action);
    }

    /// Snapshot the tree's root listing size — mostly useful for tests
    /// that want to assert server-side state without a second client.
    pub async fn root_child_count(&self) -> usize {
        self.tree.lock().await.listing(crate::tree::ROOT_ID).map(|l| l.len() - 2).unwrap_or(0)
    }

    pub fn shutdown(self) {
        self.accept_task.abort();
    }
}
