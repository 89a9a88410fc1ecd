use super::prelude::*;

/// `getattr` (spec §4.5): root gets a static directory record; everything
/// else requires `has(p)` first, then a `stat` fetch.
pub fn getattr(fs: &mut RemoteFS, _req: &Request, ino: u64, reply: ReplyAttr) {
    let path = match fs.path_of(ino) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    if path == "/" {
        reply.attr(&fs.attr_timeout(), &root_attr(fs));
        return;
    }

    let timeout = fs.attr_timeout();
    match retry::retryable(fs, |client| {
        let path = path.clone();
        async move {
            if !client.has(&path).await? {
                return Err(crate::error::CoreError::NotFound(path));
            }
            client.stat(&path).await
        }
    }) {
        Ok(inode) => reply.attr(&timeout, &fs.attr_for(ino, &inode)),
        Err(errno) => reply.error(errno),
    }
}

fn root_attr(fs: &RemoteFS) -> FileAttr {
    use std::time::UNIX_EPOCH;
    FileAttr {
        ino: fuser::FUSE_ROOT_ID,
        size: 0,
        blocks: 0,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::Directory,
        perm: 0o755,
        nlink: 2,
        uid: fs.config.uid,
        gid: fs.config.gid,
        rdev: 0,
        flags: 0,
        blksize: 512,
    }
}

/// `setattr`: chmod/chown/timestamp changes are not supported by the wire
/// protocol and are silently accepted as no-ops (spec §4.5); a `size`
/// change is the one mutation honored, via a read-modify-write `truncate`.
#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    ino: u64,
    _mode: Option<u32>,
    _uid: Option<u32>,
    _gid: Option<u32>,
    size: Option<u64>,
    _atime: Option<TimeOrNow>,
    _mtime: Option<TimeOrNow>,
    _ctime: Option<std::time::SystemTime>,
    _fh: Option<u64>,
    _crtime: Option<std::time::SystemTime>,
    _chgtime: Option<std::time::SystemTime>,
    _bkuptime: Option<std::time::SystemTime>,
    _flags: Option<u32>,
    reply: ReplyAttr,
) {
    let path = match fs.path_of(ino) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };

    if let Some(new_size) = size {
        let result = retry::retryable(fs, |client| {
            let path = path.clone();
            async move {
                let content = client.read(&path).await?;
                // Pure shrink-or-noop, matching spec.md's truncate contract
                // (`content[0:len]`): slicing past the end leaves the
                // content unchanged rather than zero-extending it.
                if new_size >= content.len() as u64 {
                    return Ok(());
                }
                let mut bytes = content.to_vec();
                bytes.truncate(new_size as usize);
                client.write(&path, bytes::Bytes::from(bytes)).await
            }
        });
        if let Err(errno) = result {
            reply.error(errno);
            return;
        }
    }

    let timeout = fs.attr_timeout();
    match retry::retryable(fs, |client| {
        let path = path.clone();
        async move { client.stat(&path).await }
    }) {
        Ok(inode) => reply.attr(&timeout, &fs.attr_for(ino, &inode)),
        Err(errno) => reply.error(errno),
    }
}
