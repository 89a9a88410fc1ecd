//! The in-memory directory tree the test double serves (spec.md §3, §6).
//!
//! This is deliberately the simplest structure that can answer every
//! action in the wire protocol's action table: one flat map of id → node,
//! each directory node holding a name→id map of its children. There is no
//! persistence and no on-disk backing — the whole tree is dropped when the
//! `TestServer` is.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use netfuse_protocol::{DirListing, EntryKind, RemoteEntry};
use thiserror::Error;

pub const ROOT_ID: u64 = 1;

#[derive(Debug, Clone)]
struct Node {
    id: u64,
    parent: u64,
    name: String,
    kind: EntryKind,
    ctime: String,
    content: Bytes,
    children: BTreeMap<String, u64>,
}

impl Node {
    fn meta(&self) -> RemoteEntry {
        RemoteEntry {
            id: self.id,
            kind: self.kind,
            ctime: self.ctime.clone(),
            size: matches!(self.kind, EntryKind::File).then_some(self.content.len() as u64),
        }
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("no such id")]
    NotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("not a file")]
    NotAFile,
    #[error("name already exists")]
    AlreadyExists,
    #[error("directory not empty")]
    NotEmpty,
    #[error("cannot remove or move the root")]
    RootImmutable,
}

/// The server's mutable filesystem state. Not `Send`-unsafe-free on its
/// own — callers wrap it in a `tokio::sync::Mutex` (see `connection.rs`).
#[derive(Debug)]
pub struct Tree {
    nodes: BTreeMap<u64, Node>,
    next_id: u64,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let root = Node {
            id: ROOT_ID,
            parent: ROOT_ID,
            name: String::new(),
            kind: EntryKind::Dir,
            ctime: now_rfc3339(),
            content: Bytes::new(),
            children: BTreeMap::new(),
        };
        let mut nodes = BTreeMap::new();
        nodes.insert(ROOT_ID, root);
        Self { nodes, next_id: ROOT_ID + 1 }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&self, id: u64) -> Result<&Node, TreeError> {
        self.nodes.get(&id).ok_or(TreeError::NotFound)
    }

    /// `dir#list`'s body: `.` is the directory's own metadata, `..` is its
    /// parent's, and every child name maps to its own metadata (spec §6).
    pub fn listing(&self, id: u64) -> Result<DirListing, TreeError> {
        let node = self.get(id)?;
        if node.kind != EntryKind::Dir {
            return Err(TreeError::NotADirectory);
        }
        let parent = self.get(node.parent)?;

        let mut listing = DirListing::new();
        listing.insert(".".to_string(), node.meta());
        listing.insert("..".to_string(), parent.meta());
        for (name, child_id) in &node.children {
            let child = self.get(*child_id)?;
            listing.insert(name.clone(), child.meta());
        }
        Ok(listing)
    }

    /// `dir#add`: create an empty subdirectory named `name` under `parent`.
    pub fn add_dir(&mut self, parent: u64, name: &str) -> Result<u64, TreeError> {
        let parent_node = self.get(parent)?;
        if parent_node.kind != EntryKind::Dir {
            return Err(TreeError::NotADirectory);
        }
        if parent_node.children.contains_key(name) {
            return Err(TreeError::AlreadyExists);
        }
        let id = self.alloc_id();
        let node = Node {
            id,
            parent,
            name: name.to_string(),
            kind: EntryKind::Dir,
            ctime: now_rfc3339(),
            content: Bytes::new(),
            children: BTreeMap::new(),
        };
        self.nodes.insert(id, node);
        self.nodes.get_mut(&parent).expect("checked above").children.insert(name.to_string(), id);
        Ok(id)
    }

    /// `dir#rm`: only an empty, non-root directory can be removed — the
    /// server is the sole authority on emptiness (spec.md §4.4, §9).
    pub fn rm_dir(&mut self, id: u64) -> Result<(), TreeError> {
        if id == ROOT_ID {
            return Err(TreeError::RootImmutable);
        }
        let node = self.get(id)?;
        if node.kind != EntryKind::Dir {
            return Err(TreeError::NotADirectory);
        }
        if !node.children.is_empty() {
            return Err(TreeError::NotEmpty);
        }
        let parent = node.parent;
        let name = node.name.clone();
        self.nodes.remove(&id);
        self.nodes.get_mut(&parent).expect("parent must exist").children.remove(&name);
        Ok(())
    }

    /// `file#put`: create the file under `parent` named `name` if absent,
    /// otherwise overwrite its content in place (full overwrite, spec §4.4).
    pub fn put_file(&mut self, parent: u64, name: &str, content: Bytes) -> Result<u64, TreeError> {
        let parent_node = self.get(parent)?;
        if parent_node.kind != EntryKind::Dir {
            return Err(TreeError::NotADirectory);
        }
        if let Some(&existing) = parent_node.children.get(name) {
            let node = self.nodes.get_mut(&existing).expect("listed child must exist");
            if node.kind != EntryKind::File {
                return Err(TreeError::AlreadyExists);
            }
            node.content = content;
            return Ok(existing);
        }
        let id = self.alloc_id();
        let node = Node {
            id,
            parent,
            name: name.to_string(),
            kind: EntryKind::File,
            ctime: now_rfc3339(),
            content,
            children: BTreeMap::new(),
        };
        self.nodes.insert(id, node);
        self.nodes.get_mut(&parent).expect("checked above").children.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn get_file(&self, id: u64) -> Result<Bytes, TreeError> {
        let node = self.get(id)?;
        if node.kind != EntryKind::File {
            return Err(TreeError::NotAFile);
        }
        Ok(node.content.clone())
    }

    pub fn rm_file(&mut self, id: u64) -> Result<(), TreeError> {
        let node = self.get(id)?;
        if node.kind != EntryKind::File {
            return Err(TreeError::NotAFile);
        }
        let parent = node.parent;
        let name = node.name.clone();
        self.nodes.remove(&id);
        self.nodes.get_mut(&parent).expect("parent must exist").children.remove(&name);
        Ok(())
    }

    /// Shared by `dir#mvdir` and `file#mvfile`: re-parent and/or rename
    /// `id` to `(new_parent, new_name)`, enforcing the expected kind.
    pub fn mv(&mut self, id: u64, new_parent: u64, new_name: &str, expect: EntryKind) -> Result<(), TreeError> {
        if id == ROOT_ID {
            return Err(TreeError::RootImmutable);
        }
        let kind = self.get(id)?.kind;
        if kind != expect {
            return Err(if expect == EntryKind::Dir { TreeError::NotADirectory } else { TreeError::NotAFile });
        }
        let dest = self.get(new_parent)?;
        if dest.kind != EntryKind::Dir {
            return Err(TreeError::NotADirectory);
        }
        if dest.children.contains_key(new_name) {
            return Err(TreeError::AlreadyExists);
        }

        let (old_parent, old_name) = {
            let node = self.get(id)?;
            (node.parent, node.name.clone())
        };
        self.nodes.get_mut(&old_parent).expect("old parent must exist").children.remove(&old_name);
        self.nodes.get_mut(&new_parent).expect("checked above").children.insert(new_name.to_string(), id);
        let node = self.nodes.get_mut(&id).expect("checked above");
        node.parent = new_parent;
        node.name = new_name.to_string();
        Ok(())
    }
}

fn now_rfc3339() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    chrono::DateTime::from_timestamp(secs as i64, 0).unwrap_or_default().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tree_lists_only_dot_and_dotdot_at_root() {
        let tree = Tree::new();
        let listing = tree.listing(ROOT_ID).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing["."].id, ROOT_ID);
        assert_eq!(listing[".."].id, ROOT_ID);
    }

    #[test]
    fn add_dir_then_rm_dir_round_trips() {
        let mut tree = Tree::new();
        let id = tree.add_dir(ROOT_ID, "sub").unwrap();
        assert_eq!(tree.listing(ROOT_ID).unwrap().len(), 3);
        tree.rm_dir(id).unwrap();
        assert_eq!(tree.listing(ROOT_ID).unwrap().len(), 2);
    }

    #[test]
    fn rm_dir_refuses_nonempty_directory() {
        let mut tree = Tree::new();
        let id = tree.add_dir(ROOT_ID, "sub").unwrap();
        tree.put_file(id, "a.txt", Bytes::from_static(b"x")).unwrap();
        assert!(matches!(tree.rm_dir(id), Err(TreeError::NotEmpty)));
    }

    #[test]
    fn put_file_then_get_file_round_trips() {
        let mut tree = Tree::new();
        let id = tree.put_file(ROOT_ID, "a.txt", Bytes::from_static(b"hi!")).unwrap();
        assert_eq!(tree.get_file(id).unwrap().as_ref(), b"hi!");
    }

    #[test]
    fn put_file_twice_overwrites_in_place() {
        let mut tree = Tree::new();
        let first = tree.put_file(ROOT_ID, "a.txt", Bytes::from_static(b"one")).unwrap();
        let second = tree.put_file(ROOT_ID, "a.txt", Bytes::from_static(b"two")).unwrap();
        assert_eq!(first, second);
        assert_eq!(tree.get_file(first).unwrap().as_ref(), b"two");
    }

    #[test]
    fn mv_file_updates_parent_and_name() {
        let mut tree = Tree::new();
        let sub = tree.add_dir(ROOT_ID, "sub").unwrap();
        let file = tree.put_file(ROOT_ID, "a.txt", Bytes::from_static(b"x")).unwrap();
        tree.mv(file, sub, "b.txt", EntryKind::File).unwrap();
        assert!(!tree.listing(ROOT_ID).unwrap().contains_key("a.txt"));
        assert!(tree.listing(sub).unwrap().contains_key("b.txt"));
    }

    #[test]
    fn mv_refuses_to_clobber_an_existing_name() {
        let mut tree = Tree::new();
        tree.put_file(ROOT_ID, "a.txt", Bytes::from_static(b"x")).unwrap();
        let b = tree.put_file(ROOT_ID, "b.txt", Bytes::from_static(b"y")).unwrap();
        assert!(matches!(tree.mv(b, ROOT_ID, "a.txt", EntryKind::File), Err(TreeError::AlreadyExists)));
    }

    #[test]
    fn root_cannot_be_removed_or_moved() {
        let mut tree = Tree::new();
        assert!(matches!(tree.rm_dir(ROOT_ID), Err(TreeError::RootImmutable)));
        assert!(matches!(tree.mv(ROOT_ID, ROOT_ID, "x", EntryKind::Dir), Err(TreeError::RootImmutable)));
    }
}
