use super::prelude::*;

/// `unlink`: `file#rm`. `Client::rm` itself reports `false` for a path
/// that isn't a known file (including one that's actually a directory).
pub fn unlink(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    let path = join_path(&parent_path, &name);

    match retry::retryable(fs, |client| {
        let path = path.clone();
        async move { client.rm(&path).await }
    }) {
        Ok(true) => reply.ok(),
        Ok(false) => reply.error(ENOENT),
        Err(errno) => reply.error(errno),
    }
}

/// `rmdir`: delegates to `dir#rm`; the server is the sole authority on
/// whether a directory is empty (spec §4.4, §9 — no local guess here).
pub fn rmdir(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    let path = join_path(&parent_path, &name);

    match retry::retryable(fs, |client| {
        let path = path.clone();
        async move { client.rmdir(&path).await }
    }) {
        Ok(()) => reply.ok(),
        Err(errno) => reply.error(errno),
    }
}
