//! The in-memory mirror of the remote tree (spec §4.3).
//!
//! Does not carry its own mutex: it lives behind the same
//! `Arc<Mutex<..>>` the FUSE dispatcher already locks for the duration of
//! every kernel callback, so all of these methods take `&mut self`.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use netfuse_protocol::{DirListing, EntryKind};

use crate::error::{CoreError, CoreResult};

pub const ROOT_ID: u64 = 1;
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone)]
pub struct Inode {
    pub id: u64,
    pub kind: EntryKind,
    pub ctime: String,
    pub size: Option<u64>,
    pub children: HashSet<String>,
}

impl Inode {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

#[derive(Debug, Default)]
pub struct MemoryFS {
    meta: HashMap<String, Inode>,
    paths: HashMap<String, Inode>,
    bodies: HashMap<String, Bytes>,
    /// Reverse of `meta`'s id, so the FUSE layer can turn a kernel inode
    /// number (which we hand out as the server's own stable id, spec §3)
    /// back into a path without a second counter.
    id_to_path: HashMap<u64, String>,
}

impl MemoryFS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.meta.clear();
        self.paths.clear();
        self.bodies.clear();
        self.id_to_path.clear();
    }

    pub fn has(&self, path: &str) -> bool {
        self.meta.contains_key(path)
    }

    pub fn isdir(&self, path: &str) -> bool {
        self.meta.get(path).is_some_and(Inode::is_dir)
    }

    pub fn isfile(&self, path: &str) -> bool {
        self.meta.get(path).is_some_and(Inode::is_file)
    }

    pub fn getid(&self, path: &str) -> CoreResult<u64> {
        self.meta
            .get(path)
            .map(|i| i.id)
            .ok_or_else(|| CoreError::NotFound(path.to_string()))
    }

    pub fn getmeta(&self, path: &str) -> CoreResult<&Inode> {
        self.meta
            .get(path)
            .ok_or_else(|| CoreError::NotFound(path.to_string()))
    }

    /// Install a `dir#list` listing at `path`: `.` becomes `path`'s own
    /// metadata, `..` is dropped, and every other entry becomes both a
    /// child name and its own path's metadata (spec §4.3).
    pub fn adddir(&mut self, path: &str, listing: DirListing) -> CoreResult<()> {
        let mut listing = listing;
        let dot = listing
            .remove(".")
            .ok_or_else(|| CoreError::Internal(format!("dir#list at {path} missing '.'")))?;
        if path == ROOT_PATH && dot.id != ROOT_ID {
            return Err(CoreError::Internal("root id is not 1".into()));
        }
        listing.remove("..");

        let mut children = HashSet::new();
        for (name, entry) in listing {
            let child_path = join_path(path, &name);
            let inode = Inode {
                id: entry.id,
                kind: entry.kind,
                ctime: entry.ctime,
                size: entry.size,
                children: HashSet::new(),
            };
            self.paths.insert(child_path.clone(), inode.clone());
            self.id_to_path.insert(inode.id, child_path.clone());
            self.meta.insert(child_path, inode);
            children.insert(name);
        }

        self.id_to_path.insert(dot.id, path.to_string());
        self.meta.insert(
            path.to_string(),
            Inode {
                id: dot.id,
                kind: dot.kind,
                ctime: dot.ctime,
                size: dot.size,
                children,
            },
        );
        Ok(())
    }

    pub fn path_for_id(&self, id: u64) -> Option<&str> {
        self.id_to_path.get(&id).map(String::as_str)
    }

    pub fn loadfile(&mut self, path: &str, body: Bytes) -> CoreResult<()> {
        if !self.isfile(path) {
            return Err(CoreError::Internal(format!("{path} is not a file")));
        }
        self.bodies.insert(path.to_string(), body);
        Ok(())
    }

    pub fn getcontent(&self, path: &str) -> CoreResult<&Bytes> {
        if !self.isfile(path) {
            return Err(CoreError::Internal(format!("{path} is not a file")));
        }
        self.bodies
            .get(path)
            .ok_or_else(|| CoreError::Internal(format!("{path} content not loaded")))
    }

    pub fn readdir(&self, path: &str) -> CoreResult<Vec<String>> {
        self.meta
            .get(path)
            .map(|i| i.children.iter().cloned().collect())
            .ok_or_else(|| CoreError::NotFound(path.to_string()))
    }
}

/// Join a directory path and a child name into an absolute, `/`-rooted
/// path, mirroring `os.path.join` for the `/`-root special case.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir == ROOT_PATH {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Split `/a/b/c` into (`/a/b`, `c`); root splits into (`/`, `""`).
pub fn split_path(path: &str) -> (&str, &str) {
    if path == ROOT_PATH {
        return (ROOT_PATH, "");
    }
    match path.rsplit_once('/') {
        Some(("", name)) => (ROOT_PATH, name),
        Some((dir, name)) => (dir, name),
        None => (ROOT_PATH, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netfuse_protocol::RemoteEntry;

    fn listing(entries: &[(&str, u64, EntryKind, Option<u64>)]) -> DirListing {
        entries
            .iter()
            .map(|(name, id, kind, size)| {
                (
                    name.to_string(),
                    RemoteEntry {
                        id: *id,
                        kind: *kind,
                        ctime: "2020-01-01T00:00:00Z".into(),
                        size: *size,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn root_id_is_one_after_adddir() {
        let mut fs = MemoryFS::new();
        let listing = listing(&[
            (".", 1, EntryKind::Dir, None),
            ("a.txt", 7, EntryKind::File, Some(3)),
        ]);
        fs.adddir("/", listing).unwrap();
        assert_eq!(fs.getid("/").unwrap(), ROOT_ID);
        assert_eq!(fs.readdir("/").unwrap(), vec!["a.txt".to_string()]);
        assert_eq!(fs.getid("/a.txt").unwrap(), 7);
        assert!(fs.isdir("/"));
        assert!(fs.isfile("/a.txt"));
    }

    #[test]
    fn every_non_root_path_parent_is_a_dir() {
        let mut fs = MemoryFS::new();
        fs.adddir(
            "/",
            listing(&[(".", 1, EntryKind::Dir, None), ("sub", 2, EntryKind::Dir, None)]),
        )
        .unwrap();
        fs.adddir(
            "/sub",
            listing(&[(".", 2, EntryKind::Dir, None), ("leaf.txt", 9, EntryKind::File, Some(0))]),
        )
        .unwrap();

        for path in ["/sub", "/sub/leaf.txt"] {
            let (parent, _) = split_path(path);
            assert!(fs.isdir(parent), "{path}'s parent {parent} should be a dir");
        }
    }

    #[test]
    fn loadfile_requires_isfile() {
        let mut fs = MemoryFS::new();
        fs.adddir("/", listing(&[(".", 1, EntryKind::Dir, None)])).unwrap();
        assert!(fs.loadfile("/missing.txt", Bytes::from_static(b"x")).is_err());
    }

    #[test]
    fn split_path_handles_root_children() {
        assert_eq!(split_path("/a.txt"), ("/", "a.txt"));
        assert_eq!(split_path("/sub/leaf.txt"), ("/sub", "leaf.txt"));
        assert_eq!(split_path("/"), ("/", ""));
    }
}
