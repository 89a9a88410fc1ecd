//! Controller/action vocabulary and the JSON shapes carried in packet bodies.
//!
//! See spec §4.4's action table and §6's directory-listing JSON.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Controller names (the `controller` header).
pub mod controller {
    pub const AUTH: &str = "auth";
    pub const ECHO: &str = "echo";
    pub const DIR: &str = "dir";
    pub const FILE: &str = "file";
}

/// Action names (the `action` header).
pub mod action {
    pub const LOGIN: &str = "login";
    pub const ECHO: &str = "echo";
    pub const LIST: &str = "list";
    pub const ADD: &str = "add";
    pub const RM: &str = "rm";
    pub const MVDIR: &str = "mvdir";
    pub const PUT: &str = "put";
    pub const GET: &str = "get";
    pub const MVFILE: &str = "mvfile";
}

pub const RESULT_OK: &str = "OK";
pub const PING_BODY: &[u8] = b"ping";

/// The type tag on an inode metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

/// One entry of a `dir#list` response body, keyed by name (spec §3/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub ctime: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// The full body of a `dir#list` response: name (including `.` and `..`) to
/// metadata. Deserialize/serialize straight from/to the UTF-8 JSON body.
pub type DirListing = HashMap<String, RemoteEntry>;

/// Hash a raw pre-shared key the way `auth#login` expects it: lowercase hex
/// MD5 of the UTF-8 secret (spec §6).
pub fn hash_psk(raw: &str) -> String {
    format!("{:x}", md5::compute(raw.as_bytes()))
}
