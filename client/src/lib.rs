//! `netfuse`: a FUSE client that mounts a remote directory tree served
//! over a length-framed TCP protocol (spec.md §1).
//!
//! The binary (`main.rs`) is a thin wrapper around this library so that
//! integration tests can drive `Client` and the FUSE operation layer
//! directly against `netfuse-testserver` without going through an actual
//! kernel mount.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fs;
pub mod logging;
pub mod memoryfs;
pub mod retry;
pub mod transport;

pub use client::Client;
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use fs::{FsWrapper, RemoteFS};
