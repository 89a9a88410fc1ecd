//! `netfuse-testserver`: an in-memory implementation of the wire protocol's
//! server side (spec.md §4.4's action table), used by `netfuse`'s
//! integration tests and as a standalone binary for manual runs against a
//! real mount. Not a production server: no persistence, no concurrency
//! model beyond "one task per connection", no auth backend beyond
//! comparing the PSK hash.

mod connection;
mod dispatch;
mod rules;
mod testserver;
mod tree;

pub use testserver::TestServer;
pub use tree::{Tree, TreeError};
