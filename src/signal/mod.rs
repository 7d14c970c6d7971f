//! The signal-path data engine: signals, connections and input
//! ports implementing per-signal packet fan-out with domain-packet
//! sharing, lifecycle-driven release notifications, and a last-value
//! cache.

pub mod connection;
pub mod descriptor;
pub mod input_port;
pub mod packet;
#[allow(clippy::module_inception)]
pub mod signal;

pub use connection::Connection;
pub use descriptor::{DataDescriptor, DataRule, Range, SampleType, StructField};
pub use input_port::{InputPort, ReadStatus};
pub use packet::{next_packet_id, DataPacket, EventPacket, Packet, PacketOffset};
pub use signal::{LastValue, Signal};
