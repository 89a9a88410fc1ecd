//! Shared wire types for netfuse: the packet codec and the controller/
//! action/JSON vocabulary spoken on the single long-lived TCP connection
//! between the client and the remote server.

mod packet;
mod wire;

pub use packet::{Packet, PacketDecoder, PacketError, CONTENT_LENGTH};
pub use wire::{action, controller, hash_psk, DirListing, EntryKind, RemoteEntry, PING_BODY, RESULT_OK};
