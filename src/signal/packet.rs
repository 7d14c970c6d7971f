//! Packets: the unit of transfer between a signal and the
//! input ports subscribed to it, and the unit the streaming protocol
//! serializes across the wire.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde_json::Value as Json;

use crate::signal::descriptor::DataDescriptor;

/// Packet IDs are unique within one streaming session, allocated
/// monotonically per process. Sessions that need independently-numbered
/// IDs (multiple concurrent server links) should wrap allocation in their
/// own counter rather than sharing this one - see `streaming::server`.
static NEXT_PACKET_ID: AtomicI64 = AtomicI64::new(0);

pub fn next_packet_id() -> i64 {
    NEXT_PACKET_ID.fetch_add(1, Ordering::Relaxed)
}

/// An event packet: a typed, JSON-serializable control message whose wire
/// payload is a NUL-terminated JSON UTF-8 string.
#[derive(Clone, Debug)]
pub struct EventPacket {
    pub id: String,
    pub parameters: Json,
}

impl EventPacket {
    pub fn new(id: impl Into<String>, parameters: Json) -> Self {
        Self { id: id.into(), parameters }
    }

    pub fn data_descriptor_changed(value_descriptor: Option<&DataDescriptor>, domain_descriptor: Option<&DataDescriptor>) -> Self {
        Self::new(
            "DataDescriptorChanged",
            serde_json::json!({
                "valueDescriptor": value_descriptor.map(descriptor_to_json),
                "domainDescriptor": domain_descriptor.map(descriptor_to_json),
            }),
        )
    }

    pub fn to_json(&self) -> Json {
        serde_json::json!({ "id": self.id, "parameters": self.parameters })
    }
}

fn descriptor_to_json(d: &DataDescriptor) -> Json {
    serde_json::json!({
        "name": d.name,
        "sampleType": format!("{:?}", d.sample_type),
        "dimensions": d.dimensions,
        "unit": d.unit,
    })
}

/// A data packet: samples produced by a signal, with an optional
/// cross-reference to the domain packet that indexes them. `domain_packet_id`
/// is the wire-level reference; `domain_packet` is that reference resolved
/// to the actual packet object, attached once the receiver can look it up
/// (see `streaming::client::PacketStreamingClient::on_data`).
#[derive(Clone, Debug)]
pub struct DataPacket {
    pub id: i64,
    pub descriptor: Arc<DataDescriptor>,
    pub sample_count: usize,
    pub payload: Vec<u8>,
    pub offset: Option<PacketOffset>,
    pub domain_packet_id: Option<i64>,
    pub domain_packet: Option<Arc<DataPacket>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PacketOffset {
    Int(i64),
    Float(f64),
}

impl DataPacket {
    /// Builds an explicit-rule data packet from raw sample bytes.
    pub fn new(descriptor: Arc<DataDescriptor>, sample_count: usize, payload: Vec<u8>) -> Self {
        Self {
            id: next_packet_id(),
            descriptor,
            sample_count,
            payload,
            offset: None,
            domain_packet_id: None,
            domain_packet: None,
        }
    }

    pub fn with_domain_packet_id(mut self, id: i64) -> Self {
        self.domain_packet_id = Some(id);
        self
    }

    pub fn with_domain_packet(mut self, packet: Arc<DataPacket>) -> Self {
        self.domain_packet_id = Some(packet.id);
        self.domain_packet = Some(packet);
        self
    }

    pub fn with_offset(mut self, offset: PacketOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Renders the "last value" as a sequence of raw bytes according to
    /// the descriptor's rule: `Explicit` returns the tail sample of the
    /// payload; `Constant` synthesizes it from the stored scalar.
    pub fn last_sample_bytes(&self) -> Option<Vec<u8>> {
        match &self.descriptor.rule {
            crate::signal::descriptor::DataRule::Constant { value_bytes } => Some(value_bytes.clone()),
            _ => {
                let sample_size = self.descriptor.sample_byte_size()?;
                if self.payload.len() < sample_size || sample_size == 0 {
                    return None;
                }
                let start = self.payload.len() - sample_size;
                Some(self.payload[start..].to_vec())
            }
        }
    }
}

/// Either an event or a data packet.
#[derive(Clone, Debug)]
pub enum Packet {
    Event(EventPacket),
    Data(DataPacket),
}

impl Packet {
    pub fn data_packet_id(&self) -> Option<i64> {
        match self {
            Packet::Data(d) => Some(d.id),
            Packet::Event(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::descriptor::SampleType;

    #[test]
    fn packet_ids_are_unique() {
        let a = next_packet_id();
        let b = next_packet_id();
        assert_ne!(a, b);
    }

    #[test]
    fn explicit_rule_last_sample_is_the_payload_tail() {
        let descriptor = Arc::new(DataDescriptor::new("v", SampleType::Float64));
        let mut payload = Vec::new();
        for sample in [1.0f64, 2.0, 3.0] {
            payload.extend_from_slice(&sample.to_le_bytes());
        }
        let packet = DataPacket::new(descriptor, 3, payload);
        let last = packet.last_sample_bytes().unwrap();
        assert_eq!(f64::from_le_bytes(last.try_into().unwrap()), 3.0);
    }
}
