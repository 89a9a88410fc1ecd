//! Root of the FUSE operation layer (spec §4.5).
//!
//! `RemoteFS` holds everything a kernel callback needs; `FsWrapper` is the
//! thin `Filesystem` dispatcher that locks it once per call and forwards to
//! the sub-module that owns that operation's logic.

use std::sync::{Arc, Mutex};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::client::Client;
use crate::config::Config;
use crate::retry;

pub mod prelude;
mod attr;
mod create;
mod delete;
mod read;
mod rename;
mod write;
mod xattr;

/// An open file's write-back buffer (spec §3). The handle table is an
/// append-only vector; indices returned to the kernel are never reused
/// during a mount session (spec §5).
pub struct OpenFileHandle {
    pub path: String,
    pub buffer: Vec<u8>,
    pub dirty: bool,
}

pub struct RemoteFS {
    pub(crate) client: Client,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) config: Config,
    pub(crate) fhs: Vec<OpenFileHandle>,
}

impl RemoteFS {
    pub fn new(client: Client, runtime: tokio::runtime::Runtime, config: Config) -> Self {
        Self { client, runtime, config, fhs: Vec::new() }
    }

    /// Translate a kernel inode number to the path it names, or `ENOENT`
    /// if the FUSE layer never learned it (a `lookup`/`readdir` always
    /// precedes any other call referencing an inode, so absence here means
    /// the inode was never valid).
    fn path_of(&self, ino: u64) -> Result<String, libc::c_int> {
        if ino == fuser::FUSE_ROOT_ID {
            return Ok("/".to_string());
        }
        self.client.path_for_id(ino).map(str::to_string).ok_or(libc::ENOENT)
    }

    fn attr_timeout(&self) -> Duration {
        Duration::from_secs(self.config.kernel_attr_timeout_seconds)
    }

    fn entry_timeout(&self) -> Duration {
        Duration::from_secs(self.config.kernel_entry_timeout_seconds)
    }

    /// Build a `FileAttr` from an `Inode` (spec §4.5's `getattr` contract).
    fn attr_for(&self, ino: u64, inode: &crate::memoryfs::Inode) -> FileAttr {
        let time = parse_ctime(&inode.ctime);
        let kind = if inode.is_dir() { FileType::Directory } else { FileType::RegularFile };
        let mode = 0o750 | if inode.is_dir() { libc::S_IFDIR } else { libc::S_IFREG } as u16;
        let size = inode.size.unwrap_or(1);
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: time,
            mtime: time,
            ctime: time,
            crtime: time,
            kind,
            perm: mode,
            nlink: 2,
            uid: self.config.uid,
            gid: self.config.gid,
            rdev: 0,
            flags: 0,
            blksize: 512,
        }
    }
}

/// Parse an ISO-8601 ctime into a `SystemTime`; any parse failure falls
/// back to the epoch rather than failing the whole callback (attributes
/// are still useful with a wrong timestamp, the inverse is not true).
fn parse_ctime(ctime: &str) -> SystemTime {
    chrono::DateTime::parse_from_rfc3339(ctime)
        .map(|dt| UNIX_EPOCH + Duration::from_secs(dt.timestamp().max(0) as u64))
        .unwrap_or(UNIX_EPOCH)
}

#[derive(Clone)]
pub struct FsWrapper(pub Arc<Mutex<RemoteFS>>);

impl Filesystem for FsWrapper {
    fn getattr(&mut self, req: &Request, ino: u64, reply: ReplyAttr) {
        let mut fs = self.0.lock().unwrap();
        attr::getattr(&mut fs, req, ino, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        ctime: Option<SystemTime>,
        fh: Option<u64>,
        crtime: Option<SystemTime>,
        chgtime: Option<SystemTime>,
        bkuptime: Option<SystemTime>,
        flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let mut fs = self.0.lock().unwrap();
        attr::setattr(
            &mut fs, req, ino, mode, uid, gid, size, atime, mtime, ctime, fh, crtime, chgtime, bkuptime, flags, reply,
        );
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        read::lookup(&mut fs, req, parent, name, reply);
    }

    fn readdir(&mut self, req: &Request, ino: u64, fh: u64, offset: i64, reply: ReplyDirectory) {
        let mut fs = self.0.lock().unwrap();
        read::readdir(&mut fs, req, ino, fh, offset, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn read(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let mut fs = self.0.lock().unwrap();
        read::read(&mut fs, req, ino, fh, offset, size, flags, lock_owner, reply);
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let mut fs = self.0.lock().unwrap();
        read::open(&mut fs, req, ino, flags, reply);
    }

    fn access(&mut self, req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        read::access(&mut fs, req, ino, mask, reply);
    }

    fn readlink(&mut self, req: &Request, ino: u64, reply: ReplyData) {
        let mut fs = self.0.lock().unwrap();
        read::readlink(&mut fs, req, ino, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::write(&mut fs, req, ino, fh, offset, data, write_flags, flags, lock_owner, reply);
    }

    fn release(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        write::release(&mut fs, req, ino, fh, flags, lock_owner, flush, reply);
    }

    fn flush(&mut self, req: &Request<'_>, ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        write::flush(&mut fs, req, ino, fh, lock_owner, reply);
    }

    fn fsync(&mut self, req: &Request<'_>, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        write::fsync(&mut fs, req, ino, fh, datasync, reply);
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        let mut fs = self.0.lock().unwrap();
        create::create(&mut fs, req, parent, name, mode, umask, flags, reply);
    }

    fn mkdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, mode: u32, umask: u32, reply: ReplyEntry) {
        let mut fs = self.0.lock().unwrap();
        create::mkdir(&mut fs, req, parent, name, mode, umask, reply);
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::unlink(&mut fs, req, parent, name, reply);
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let mut fs = self.0.lock().unwrap();
        delete::rmdir(&mut fs, req, parent, name, reply);
    }

    #[allow(clippy::too_many_arguments)]
    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let mut fs = self.0.lock().unwrap();
        rename::rename(&mut fs, req, parent, name, newparent, newname, flags, reply);
    }

    fn symlink(&mut self, _req: &Request, _parent: u64, _link_name: &OsStr, _target: &std::path::Path, reply: ReplyEntry) {
        reply.error(libc::EROFS);
    }

    fn link(&mut self, _req: &Request, _ino: u64, _newparent: u64, _newname: &OsStr, reply: ReplyEntry) {
        reply.error(libc::EROFS);
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        // Static figures per spec §4.5; this filesystem has no real block
        // accounting to report.
        reply.statfs(4096, 2048, 2048, 0, 0, 512, 255, 512);
    }

    fn getxattr(&mut self, req: &Request, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::getxattr(&mut fs, req, ino, name, size, reply);
    }

    fn listxattr(&mut self, req: &Request, ino: u64, size: u32, reply: ReplyXattr) {
        let mut fs = self.0.lock().unwrap();
        xattr::listxattr(&mut fs, req, ino, size, reply);
    }

    fn destroy(&mut self) {
        let mut fs = self.0.lock().unwrap();
        // FUSE guarantees `release` precedes `destroy` on a normal unmount;
        // this only matters if the mount tears down abnormally with open
        // dirty handles still pending. Flush each one before closing, the
        // same write `fs::write::release` would have issued.
        let dirty: Vec<(usize, String, bytes::Bytes)> = fs
            .fhs
            .iter()
            .enumerate()
            .filter(|(_, h)| h.dirty)
            .map(|(idx, h)| (idx, h.path.clone(), bytes::Bytes::from(h.buffer.clone())))
            .collect();

        for (idx, path, content) in dirty {
            let result = retry::retryable(&mut fs, |client| {
                let path = path.clone();
                let content = content.clone();
                async move { client.write(&path, content).await }
            });
            match result {
                Ok(()) => fs.fhs[idx].dirty = false,
                Err(errno) => {
                    tracing::warn!(handle = idx, path = %path, errno, "failed to flush dirty handle at unmount");
                }
            }
        }

        fs.client.close();
    }
}
