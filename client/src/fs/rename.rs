use super::prelude::*;

/// `rename`: the server's `dir#mvdir`/`file#mvfile` performs the move in
/// one call (spec §4.4's `Client::mv`); no client-side recursive
/// copy-then-delete is needed.
#[allow(clippy::too_many_arguments)]
pub fn rename(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    newparent: u64,
    newname: &OsStr,
    _flags: u32,
    reply: ReplyEmpty,
) {
    let parent_path = match fs.path_of(parent) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };
    let newparent_path = match fs.path_of(newparent) {
        Ok(p) => p,
        Err(errno) => {
            reply.error(errno);
            return;
        }
    };
    let (name, newname) = match (name.to_str(), newname.to_str()) {
        (Some(n), Some(nn)) => (n.to_string(), nn.to_string()),
        _ => {
            reply.error(EFAULT);
            return;
        }
    };
    let old_path = join_path(&parent_path, &name);
    let new_path = join_path(&newparent_path, &newname);

    match retry::retryable(fs, |client| {
        let old_path = old_path.clone();
        let new_path = new_path.clone();
        async move {
            if !client.has(&old_path).await? {
                return Err(crate::error::CoreError::NotFound(old_path));
            }
            if client.has(&new_path).await? {
                return Err(crate::error::CoreError::AlreadyExists(new_path));
            }
            client.mv(&old_path, &new_path).await
        }
    }) {
        Ok(()) => reply.ok(),
        Err(errno) => reply.error(errno),
    }
}
