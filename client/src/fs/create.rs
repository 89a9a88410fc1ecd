use super::prelude::*;

/// `create`: writes an empty file to the server, then opens it with a
/// fresh, empty handle so subsequent `write` calls have somewhere to land.
#[allow(clippy::too_many_arguments)]
pub fn create(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    _mode: u32,
    _umask: u32,
    _flags: i32,
    reply: ReplyCreate,
) {
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
    let entry_timeout = fs.entry_timeout();

    let result = retry::retryable(fs, |client| {
        let path = path.clone();
        async move {
            if client.has(&path).await? {
                return Err(crate::error::CoreError::AlreadyExists(path));
            }
            client.write(&path, bytes::Bytes::new()).await?;
            client.stat(&path).await
        }
    });

    match result {
        Ok(inode) => {
            let attr = fs.attr_for(inode.id, &inode);
            fs.fhs.push(OpenFileHandle { path, buffer: Vec::new(), dirty: false });
            let fh = (fs.fhs.len() - 1) as u64;
            reply.created(&entry_timeout, &attr, 0, fh, 0);
        }
        Err(errno) => reply.error(errno),
    }
}

/// `mkdir`: `EEXIST` if the name is already taken, otherwise a `dir#add`.
pub fn mkdir(fs: &mut RemoteFS, _req: &Request<'_>, parent: u64, name: &OsStr, _mode: u32, _umask: u32, reply: ReplyEntry) {
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
    let entry_timeout = fs.entry_timeout();

    let result = retry::retryable(fs, |client| {
        let parent_path = parent_path.clone();
        let name = name.clone();
        let path = path.clone();
        async move {
            if client.has(&path).await? {
                return Err(crate::error::CoreError::AlreadyExists(path));
            }
            client.mkdir(&parent_path, &name).await?;
            client.stat(&path).await
        }
    });

    match result {
        Ok(inode) => reply.entry(&entry_timeout, &fs.attr_for(inode.id, &inode), 0),
        Err(errno) => reply.error(errno),
    }
}
