//! Shared imports for the FUSE operation sub-modules.

pub use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
    ReplyOpen, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};

pub use libc::{EEXIST, EFAULT, EIO, ENOENT, EROFS};

pub use std::ffi::OsStr;

pub use super::{OpenFileHandle, RemoteFS};
pub use crate::memoryfs::{join_path, split_path};
pub use crate::retry;
