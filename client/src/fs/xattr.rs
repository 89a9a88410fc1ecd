use super::prelude::*;

/// No extended attribute is ever set on this filesystem (spec §4.5).
pub fn getxattr(_fs: &mut RemoteFS, _req: &Request, _ino: u64, _name: &OsStr, _size: u32, reply: ReplyXattr) {
    #[cfg(target_os = "macos")]
    reply.error(libc::ENOATTR);

    #[cfg(not(target_os = "macos"))]
    reply.error(libc::ENODATA);
}

pub fn listxattr(_fs: &mut RemoteFS, _req: &Request, _ino: u64, size: u32, reply: ReplyXattr) {
    if size == 0 {
        reply.size(0);
    } else {
        reply.data(&[]);
    }
}