//! The packet-streaming wire protocol: a server that encodes a
//! signal's packets into dedup'd, batched buffers, and a client that
//! decodes them back into packets delivered to local signal mirrors.

pub mod client;
pub mod header;
pub mod server;

pub use client::PacketStreamingClient;
pub use header::{GenericHeader, OffsetType, PacketType, GENERIC_HEADER_SIZE, PACKET_FLAG_CAN_RELEASE, SIGNAL_ID_NONE};
pub use server::{PacketBuffer, PacketStreamingServer};
