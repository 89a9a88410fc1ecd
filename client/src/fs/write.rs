use super::prelude::*;

/// `write`: appends into the handle's in-memory buffer at `offset` and
/// marks it dirty; nothing reaches the server until `release` (spec §4.5,
/// §9 — one `file#put` per close, not one per write).
#[allow(clippy::too_many_arguments)]
pub fn write(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    offset: i64,
    data: &[u8],
    _write_flags: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyWrite,
) {
    let handle = match fs.fhs.get_mut(fh as usize) {
        Some(h) => h,
        None => {
            reply.error(EIO);
            return;
        }
    };
    let start = offset.max(0) as usize;
    let end = start + data.len();
    if end > handle.buffer.len() {
        handle.buffer.resize(end, 0);
    }
    handle.buffer[start..end].copy_from_slice(data);
    handle.dirty = true;
    reply.written(data.len() as u32);
}

/// `release`: writes the whole buffer back in one `file#put` if it was
/// ever written to, then drops the handle. Non-retryable per spec §4.5's
/// table: a disconnect here reconnects for later calls but still surfaces
/// `EIO` to this one rather than retrying the flush itself.
pub fn release(
    fs: &mut RemoteFS,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    _flags: i32,
    _lock_owner: Option<u64>,
    _flush: bool,
    reply: ReplyEmpty,
) {
    let idx = fh as usize;
    if idx >= fs.fhs.len() {
        reply.ok();
        return;
    }
    if !fs.fhs[idx].dirty {
        reply.ok();
        return;
    }

    let path = fs.fhs[idx].path.clone();
    let content = bytes::Bytes::from(fs.fhs[idx].buffer.clone());
    match retry::nonretryable(fs, |client| {
        let path = path.clone();
        let content = content.clone();
        async move { client.write(&path, content).await }
    }) {
        Ok(()) => {
            fs.fhs[idx].dirty = false;
            reply.ok();
        }
        Err(errno) => reply.error(errno),
    }
}

/// Write-back happens on `release`; `flush`/`fsync` have nothing left to do.
pub fn flush(_fs: &mut RemoteFS, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
    reply.ok();
}

pub fn fsync(_fs: &mut RemoteFS, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
    reply.ok();
}
