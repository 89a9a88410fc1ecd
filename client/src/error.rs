//! The error taxonomy from spec §7, as one flat enum.
//!
//! The source's class hierarchy (`DFSError` with five subclasses) has no
//! equivalent in Rust worth reproducing — there's no code anywhere that
//! catches "any `DFSError`" without also handling its specific variants, so
//! a single `thiserror`-derived enum matched exhaustively at the FUSE
//! boundary (`fs::retry::map_errno`) is the idiomatic replacement.

use netfuse_protocol::PacketError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `auth#login` was rejected. Fatal — the caller should not retry.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The peer closed the connection, or a 0-byte read was observed.
    /// Framing corruption (missing/invalid `content-length`, malformed
    /// header) is folded in here too: spec §7 treats a protocol-format
    /// error as "the connection is no longer trustworthy", i.e. equivalent
    /// to a disconnect.
    #[error("disconnected: {0}")]
    Disconnect(String),

    /// A socket read exceeded the configured read timeout.
    #[error("timed out waiting for response")]
    Timeout,

    /// The remote server replied with a body other than `"OK"` to an
    /// action that expects it.
    #[error("server error: {0}")]
    Server(String),

    /// A local invariant was violated (missing metadata, type confusion
    /// between a file and a directory, a bad file handle, ...).
    #[error("internal error: {0}")]
    Internal(String),

    /// The requested path does not exist in MemoryFS or on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

impl From<PacketError> for CoreError {
    fn from(err: PacketError) -> Self {
        // A malformed frame means the stream can no longer be trusted to be
        // aligned on a frame boundary — spec §7 treats this as equivalent
        // to a disconnect, not a retryable-in-place error.
        CoreError::Disconnect(format!("protocol framing error: {err}"))
    }
}

impl CoreError {
    /// Maps a `CoreError` to the POSIX errno the FUSE layer should report,
    /// per spec §4.5's error-mapping table.
    pub fn errno(&self) -> libc::c_int {
        match self {
            CoreError::Disconnect(_) => libc::EIO,
            CoreError::Timeout => libc::EIO,
            CoreError::Server(_) => libc::EIO,
            CoreError::Internal(_) => libc::EFAULT,
            CoreError::NotFound(_) => libc::ENOENT,
            CoreError::AlreadyExists(_) => libc::EEXIST,
            // Auth failures are fatal at startup, not something a kernel
            // callback translates mid-session; EIO is the closest analogue
            // if one somehow surfaces there (e.g. a reconnect re-auth fails).
            CoreError::Auth(_) => libc::EIO,
        }
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, CoreError::Disconnect(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
