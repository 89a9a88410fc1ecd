//! Replaces the original's `@retryable`/`@nonretryable` decorators (spec
//! §4.5/§9) with two explicit helpers, called at the top of every FUSE
//! callback that talks to `Client`.

use std::future::Future;

use tracing::warn;

use crate::client::Client;
use crate::fs::RemoteFS;

/// Retryable ops (spec §4.5): on disconnect, reconnect and retry the same
/// operation, up to 2 retries (3 attempts total). On exhaustion, `EIO`.
pub fn retryable<T, F, Fut>(fs: &mut RemoteFS, mut op: F) -> Result<T, libc::c_int>
where
    F: FnMut(&mut Client) -> Fut,
    Fut: Future<Output = crate::error::CoreResult<T>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fs.runtime.block_on(op(&mut fs.client)) {
            Ok(v) => return Ok(v),
            Err(e) if e.is_disconnect() && attempt < MAX_ATTEMPTS => {
                warn!(attempt, "disconnected, reconnecting and retrying");
                if fs.runtime.block_on(fs.client.reconnect()).is_err() {
                    return Err(libc::EIO);
                }
            }
            Err(e) => {
                if e.is_disconnect() {
                    warn!("too many retries, giving up");
                }
                return Err(e.errno());
            }
        }
    }
}

/// Non-retryable ops (`open`, `release`): on disconnect, reconnect once so
/// later ops see a working connection, but still surface `EIO` for this call.
pub fn nonretryable<T, F, Fut>(fs: &mut RemoteFS, op: F) -> Result<T, libc::c_int>
where
    F: FnOnce(&mut Client) -> Fut,
    Fut: Future<Output = crate::error::CoreResult<T>>,
{
    match fs.runtime.block_on(op(&mut fs.client)) {
        Ok(v) => Ok(v),
        Err(e) if e.is_disconnect() => {
            warn!("disconnected, reconnecting (not retrying this call)");
            let _ = fs.runtime.block_on(fs.client.reconnect());
            Err(libc::EIO)
        }
        Err(e) => Err(e.errno()),
    }
}
