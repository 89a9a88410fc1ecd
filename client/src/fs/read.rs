use super::prelude::*;

/// `lookup`: the kernel calls this before it has any other way to learn a
/// child's inode number, so it must exist even though spec §4.5's table
/// only lists the operations that follow it.
pub fn lookup(fs: &mut RemoteFS, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
    let parent_path = match fs.path_of(parent) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };
    let name = match name.to_str() {
        Some(n) => n.to_string(),
        None => {
            reply.error(EFAULT);
            return;
        }
    };
    let child_path = join_path(&parent_path, &name);
    let entry_timeout = fs.entry_timeout();
    match retry::retryable(fs, |client| {
        let child_path = child_path.clone();
        async move {
            if !client.has(&child_path).await? {
                return Err(crate::error::CoreError::NotFound(child_path));
            }
            client.stat(&child_path).await
        }
    }) {
        Ok(inode) => reply.entry(&entry_timeout, &fs.attr_for(inode.id, &inode), 0),
        Err(errno) => reply.error(errno),
    }
}

/// `readdir`: `.` and `..` first, then the cached listing (spec §4.4).
/// Per-child attributes come from the same `dir#list` call that populated
/// the listing, so resolving them here costs no extra round trip.
pub fn readdir(fs: &mut RemoteFS, _req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
    let path = match fs.path_of(ino) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    let names = match retry::retryable(fs, |client| {
        let path = path.clone();
        async move { client.readdir(&path).await }
    }) {
        Ok(n) => n,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    let parent_ino = parent_inode(fs, ino, &path);

    let mut entries: Vec<(u64, FileType, String)> = Vec::with_capacity(names.len() + 2);
    entries.push((ino, FileType::Directory, ".".to_string()));
    entries.push((parent_ino, FileType::Directory, "..".to_string()));

    for name in names {
        let child_path = join_path(&path, &name);
        if let Ok(inode) = retry::retryable(fs, |client| {
            let child_path = child_path.clone();
            async move { client.stat(&child_path).await }
        }) {
            let kind = if inode.is_dir() { FileType::Directory } else { FileType::RegularFile };
            entries.push((inode.id, kind, name));
        }
    }

    for (i, (ino, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
        if reply.add(ino, (i + 1) as i64, kind, &name) {
            break;
        }
    }
    reply.ok();
}

/// Resolve the inode `..` should report. Root is its own parent; any other
/// directory's parent is either root or a directory already known to
/// MemoryFS by the time its own contents are being listed.
fn parent_inode(fs: &mut RemoteFS, ino: u64, path: &str) -> u64 {
    if ino == fuser::FUSE_ROOT_ID {
        return fuser::FUSE_ROOT_ID;
    }
    let (parent_path, _) = split_path(path);
    if parent_path == "/" {
        return fuser::FUSE_ROOT_ID;
    }
    retry::retryable(fs, |client| {
        let parent_path = parent_path.to_string();
        async move { client.stat(&parent_path).await }
    })
    .map(|inode| inode.id)
    .unwrap_or(fuser::FUSE_ROOT_ID)
}

/// `read`: serves straight out of the handle's buffer, filled once at
/// `open` time (spec §4.5, §9 — no per-read network traffic).
#[allow(clippy::too_many_arguments)]
pub fn read(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    offset: i64,
    size: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyData,
) {
    let handle = match fs.fhs.get(fh as usize) {
        Some(h) => h,
        None => {
            reply.error(EIO);
            return;
        }
    };
    let start = offset.max(0) as usize;
    if start >= handle.buffer.len() {
        reply.data(&[]);
        return;
    }
    let end = std::cmp::min(start + size as usize, handle.buffer.len());
    reply.data(&handle.buffer[start..end]);
}

/// `open`: validates the access mode against `has(path)`, truncates via a
/// `file#put` of an empty body for a writable open without `O_APPEND`
/// (spec §4.5's truncate-on-open semantics), then fetches the whole body
/// into a fresh handle. Flag checks use `O_ACCMODE` to extract the access
/// mode rather than testing the raw flags word directly, since `O_RDONLY`
/// is `0` and a bitwise `&` against it is always false.
pub fn open(fs: &mut RemoteFS, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
    let path = match fs.path_of(ino) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    let accmode = flags & libc::O_ACCMODE;
    let creat = flags & libc::O_CREAT != 0;
    let excl = flags & libc::O_EXCL != 0;
    let append = flags & libc::O_APPEND != 0;

    let exists = match retry::nonretryable(fs, |client| {
        let path = path.clone();
        async move { client.has(&path).await }
    }) {
        Ok(e) => e,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    if accmode == libc::O_RDONLY && !exists {
        reply.error(ENOENT);
        return;
    }
    if creat && excl && exists {
        reply.error(EEXIST);
        return;
    }

    if accmode != libc::O_RDONLY && !append {
        if let Err(errno) = retry::nonretryable(fs, |client| {
            let path = path.clone();
            async move { client.write(&path, bytes::Bytes::new()).await }
        }) {
            reply.error(errno);
            return;
        }
    }

    let buffer = match retry::nonretryable(fs, |client| {
        let path = path.clone();
        async move { client.read(&path).await }
    }) {
        Ok(content) => content.to_vec(),
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    fs.fhs.push(OpenFileHandle { path, buffer, dirty: false });
    let fh = (fs.fhs.len() - 1) as u64;
    reply.opened(fh, 0);
}

pub fn access(fs: &mut RemoteFS, _req: &Request, ino: u64, _mask: i32, reply: ReplyEmpty) {
    let path = match fs.path_of(ino) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };
    match retry::retryable(fs, |client| {
        let path = path.clone();
        async move { client.has(&path).await }
    }) {
        Ok(true) => reply.ok(),
        Ok(false) => reply.error(ENOENT),
        Err(errno) => reply.error(errno),
    }
}

/// This filesystem has no symlinks (spec §4.5's Non-goals); any
/// `readlink` call means the kernel was confused about an inode's type.
pub fn readlink(_fs: &mut RemoteFS, _req: &Request, _ino: u64, reply: ReplyData) {
    reply.error(ENOENT);
}
