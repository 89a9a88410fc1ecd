//! Request orchestration: authentication, typed operations, MemoryFS
//! maintenance, readdir caching (spec §4.4).

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use netfuse_protocol::{action, controller, hash_psk, DirListing, Packet, RESULT_OK};
use tracing::{debug, info, warn};

use crate::error::{CoreError, CoreResult};
use crate::memoryfs::{join_path, split_path, MemoryFS, ROOT_ID, ROOT_PATH};
use crate::transport::Transport;

pub struct Client {
    transport: Transport,
    psk: String,
    cache_enabled: bool,
    fs: MemoryFS,
    /// Paths with a current readdir listing; invalidated on any mutation
    /// under that path (spec §4.4 — a presence set, not a TTL store).
    fresh: HashSet<String>,
}

impl Client {
    /// Connect, reset MemoryFS, authenticate and load the root (spec
    /// §4.4's connection lifecycle). `raw_psk` is hashed here.
    pub async fn connect(host: &str, port: u16, raw_psk: &str, cache_enabled: bool) -> CoreResult<Self> {
        let mut client = Self {
            transport: Transport::new(host, port),
            psk: hash_psk(raw_psk),
            cache_enabled,
            fs: MemoryFS::new(),
            fresh: HashSet::new(),
        };
        client.init().await?;
        Ok(client)
    }

    async fn init(&mut self) -> CoreResult<()> {
        self.transport.connect().await?;
        self.fs.reset();
        self.fresh.clear();
        self.login().await?;
        self.init_root().await?;
        Ok(())
    }

    /// Tear down and rebuild the connection end to end (spec §5's
    /// reconnect sequence): drop socket, reconnect, reset MemoryFS,
    /// re-authenticate, re-read root.
    pub async fn reconnect(&mut self) -> CoreResult<()> {
        warn!("reconnecting after disconnect");
        self.transport.close();
        self.init().await
    }

    async fn login(&mut self) -> CoreResult<()> {
        info!("authenticating");
        let mut headers = BTreeMap::new();
        headers.insert("psk".to_string(), self.psk.clone());
        let (_, body) = self.request(controller::AUTH, action::LOGIN, headers, Bytes::new()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Auth("login rejected".into()));
        }
        Ok(())
    }

    async fn init_root(&mut self) -> CoreResult<()> {
        let listing = self.fetch_listing(None).await?;
        self.fs.adddir(ROOT_PATH, listing)?;
        self.fresh.insert(ROOT_PATH.to_string());
        Ok(())
    }

    pub async fn ping(&mut self) -> CoreResult<()> {
        let (_, body) = self
            .request(controller::ECHO, action::ECHO, BTreeMap::new(), Bytes::from_static(netfuse_protocol::PING_BODY))
            .await?;
        if body.as_ref() != netfuse_protocol::PING_BODY {
            return Err(CoreError::Server("ping: unexpected response".into()));
        }
        Ok(())
    }

    /// Build, send and await exactly one request/response round trip.
    async fn request(
        &mut self,
        controller: &str,
        action: &str,
        headers: BTreeMap<String, String>,
        body: Bytes,
    ) -> CoreResult<(Packet, Bytes)> {
        let mut pkt = Packet::new()
            .with_header("controller", controller)
            .with_header("action", action);
        for (k, v) in headers {
            pkt.set_header(k, v);
        }
        pkt.set_body(body);
        debug!(controller, action, "sending request");
        self.transport.send(&pkt).await?;
        let reply = self.transport.receive().await?;
        let body = reply.body().clone();
        Ok((reply, body))
    }

    async fn fetch_listing(&mut self, id: Option<u64>) -> CoreResult<DirListing> {
        let mut headers = BTreeMap::new();
        if let Some(id) = id {
            headers.insert("id".to_string(), id.to_string());
        }
        let (_, body) = self.request(controller::DIR, action::LIST, headers, Bytes::new()).await?;
        serde_json::from_slice(&body).map_err(|e| CoreError::Internal(format!("malformed dir#list body: {e}")))
    }

    /// Path resolution (spec §4.4): walk from root, lazily populating
    /// MemoryFS one `dir#list` per not-yet-known ancestor.
    pub async fn has(&mut self, path: &str) -> CoreResult<bool> {
        if path == ROOT_PATH {
            return Ok(self.fs.has(ROOT_PATH));
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let mut cur = ROOT_PATH.to_string();
        for seg in segments {
            let next = join_path(&cur, seg);
            if !self.fs.has(&next) {
                if self.fs.isdir(&cur) {
                    // Matches the original's lazy-populate behavior of
                    // going through the cached `readdir`, not a forced
                    // refresh: a concurrent readdir of the same ancestor
                    // need not be repeated here.
                    self.readdir(&cur).await?;
                } else {
                    break;
                }
            }
            cur = next;
        }
        Ok(self.fs.has(path))
    }

    async fn refresh_dir(&mut self, path: &str) -> CoreResult<()> {
        let id = self.fs.getid(path)?;
        let listing = self.fetch_listing(Some(id)).await?;
        self.fs.adddir(path, listing)?;
        self.fresh.insert(path.to_string());
        Ok(())
    }

    fn invalidate(&mut self, path: &str) {
        self.fresh.remove(path);
    }

    pub async fn stat(&mut self, path: &str) -> CoreResult<crate::memoryfs::Inode> {
        if !self.fs.has(path) {
            self.has(path).await?;
        }
        self.fs.getmeta(path).cloned().map_err(|_| CoreError::NotFound(path.to_string()))
    }

    /// Cached readdir (spec §4.4): serves from MemoryFS if a freshness
    /// marker exists and caching is enabled, otherwise refreshes first.
    pub async fn readdir(&mut self, path: &str) -> CoreResult<Vec<String>> {
        if self.cache_enabled && self.fresh.contains(path) {
            return self.fs.readdir(path);
        }
        self.refresh_dir(path).await?;
        self.fs.readdir(path)
    }

    pub async fn read(&mut self, path: &str) -> CoreResult<Bytes> {
        if !self.fs.isfile(path) {
            return Err(CoreError::NotFound(path.to_string()));
        }
        let id = self.fs.getid(path)?;
        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), id.to_string());
        let (reply, body) = self.request(controller::FILE, action::GET, headers, Bytes::new()).await?;
        if reply.header("result") != Some(RESULT_OK) {
            return Err(CoreError::Server("file#get failed".into()));
        }
        self.fs.loadfile(path, body.clone())?;
        Ok(body)
    }

    pub async fn write(&mut self, path: &str, content: Bytes) -> CoreResult<()> {
        let (parent, name) = split_path(path);
        if !self.fs.isdir(parent) {
            return Err(CoreError::Internal(format!("{parent} is not a directory")));
        }
        let parent_id = self.fs.getid(parent)?;
        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), parent_id.to_string());
        headers.insert("name".to_string(), name.to_string());
        let (_, body) = self.request(controller::FILE, action::PUT, headers, content.clone()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Server("file#put failed".into()));
        }
        self.invalidate(parent);
        self.refresh_dir(parent).await?;
        self.fs.loadfile(path, content)?;
        Ok(())
    }

    /// `false` if `path` is not a known file; `true` on success.
    pub async fn rm(&mut self, path: &str) -> CoreResult<bool> {
        if !self.fs.isfile(path) {
            return Ok(false);
        }
        let (parent, _) = split_path(path);
        let id = self.fs.getid(path)?;
        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), id.to_string());
        let (_, body) = self.request(controller::FILE, action::RM, headers, Bytes::new()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Server("file#rm failed".into()));
        }
        self.invalidate(parent);
        self.refresh_dir(parent).await?;
        Ok(true)
    }

    pub async fn mkdir(&mut self, parent: &str, name: &str) -> CoreResult<()> {
        let parent_id = self.fs.getid(parent)?;
        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), parent_id.to_string());
        headers.insert("name".to_string(), name.to_string());
        let (_, body) = self.request(controller::DIR, action::ADD, headers, Bytes::new()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Server("dir#add failed".into()));
        }
        self.invalidate(parent);
        self.refresh_dir(parent).await?;
        Ok(())
    }

    /// Delegates to `dir#rm`; rejects a non-empty directory server-side
    /// (the client never guesses emptiness locally).
    pub async fn rmdir(&mut self, path: &str) -> CoreResult<()> {
        let (parent, _) = split_path(path);
        let id = self.fs.getid(path)?;
        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), id.to_string());
        let (_, body) = self.request(controller::DIR, action::RM, headers, Bytes::new()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Server("dir#rm failed".into()));
        }
        self.invalidate(parent);
        self.refresh_dir(parent).await?;
        Ok(())
    }

    pub async fn mv(&mut self, old: &str, new: &str) -> CoreResult<()> {
        if !self.fs.has(old) {
            return Err(CoreError::NotFound(old.to_string()));
        }
        let id = self.fs.getid(old)?;
        let is_dir = self.fs.isdir(old);
        let (old_parent, _) = split_path(old);
        let (new_parent, new_name) = split_path(new);
        if !self.fs.has(new_parent) {
            return Err(CoreError::NotFound(new_parent.to_string()));
        }
        let parent_id = self.fs.getid(new_parent)?;

        let mut headers = BTreeMap::new();
        headers.insert("id".to_string(), id.to_string());
        headers.insert("pdid".to_string(), parent_id.to_string());
        headers.insert("name".to_string(), new_name.to_string());
        let (controller, action) = if is_dir {
            (controller::DIR, action::MVDIR)
        } else {
            (controller::FILE, action::MVFILE)
        };
        let (_, body) = self.request(controller, action, headers, Bytes::new()).await?;
        if body.as_ref() != RESULT_OK.as_bytes() {
            return Err(CoreError::Server("move failed".into()));
        }
        self.invalidate(old_parent);
        self.invalidate(new_parent);
        self.refresh_dir(old_parent).await?;
        if new_parent != old_parent {
            self.refresh_dir(new_parent).await?;
        }
        Ok(())
    }

    pub fn close(&mut self) {
        self.transport.close();
    }

    pub fn root_id(&self) -> u64 {
        ROOT_ID
    }

    /// Translate a kernel inode number (the server's own stable id) back to
    /// the path it was last seen at.
    pub fn path_for_id(&self, id: u64) -> Option<&str> {
        self.fs.path_for_id(id)
    }

    pub fn isdir(&self, path: &str) -> bool {
        self.fs.isdir(path)
    }

    pub fn isfile(&self, path: &str) -> bool {
        self.fs.isfile(path)
    }
}
