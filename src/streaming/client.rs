//! The packet-streaming client: decodes wire buffers back into
//! packets and delivers them to the local signal mirrors that subscribe to
//! them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::signal::{DataDescriptor, DataPacket, EventPacket, Packet, PacketOffset, Signal};
use crate::streaming::header::{AlreadySentHeaderExt, DataHeaderExt, GenericHeader, PacketType, DATA_HEADER_EXTRA_SIZE, GENERIC_HEADER_SIZE};

struct ClientState {
    descriptors: HashMap<u32, Arc<DataDescriptor>>,
    retained: HashMap<i64, Arc<DataPacket>>,
    signals: HashMap<u32, Arc<Signal>>,
}

/// Decodes buffers produced by [`crate::streaming::server::PacketStreamingServer`]
/// and delivers them to registered local signal mirrors.
pub struct PacketStreamingClient {
    state: Mutex<ClientState>,
}

impl PacketStreamingClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClientState {
                descriptors: HashMap::new(),
                retained: HashMap::new(),
                signals: HashMap::new(),
            }),
        }
    }

    /// Associates a numeric wire signal ID with the local signal mirror it
    /// should deliver decoded packets to.
    pub fn register_signal(&self, signal_id: u32, signal: Arc<Signal>) {
        self.state.lock().unwrap().signals.insert(signal_id, signal);
    }

    /// Decodes one `(header, payload)` buffer and dispatches it.
    pub fn on_buffer(&self, buffer: &[u8]) -> DaqResult<()> {
        let header = GenericHeader::decode(buffer)?;
        let payload = &buffer[GENERIC_HEADER_SIZE..];
        match header.packet_type {
            PacketType::Event => self.on_event(&header, payload),
            PacketType::Data => self.on_data(&header, payload),
            PacketType::AlreadySent => self.on_already_sent(&header, payload),
            PacketType::Release => self.on_release(payload),
        }
    }

    fn on_event(&self, header: &GenericHeader, payload: &[u8]) -> DaqResult<()> {
        let text = std::str::from_utf8(payload.split(|&b| b == 0).next().unwrap_or(payload))
            .map_err(|e| DaqError::new(ErrorKind::PacketStreaming, e.to_string()))?;
        let json: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DaqError::new(ErrorKind::PacketStreaming, e.to_string()))?;
        let id = json.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        let parameters = json.get("parameters").cloned().unwrap_or(serde_json::Value::Null);

        if id == "DataDescriptorChanged" {
            if let Some(value_descriptor) = parameters.get("valueDescriptor") {
                if let Some(descriptor) = DataDescriptor::from_wire_json(value_descriptor) {
                    self.state.lock().unwrap().descriptors.insert(header.signal_id, Arc::new(descriptor));
                }
            }
        }

        let packet = Packet::Event(EventPacket::new(id, parameters));
        self.deliver(header.signal_id, packet);
        Ok(())
    }

    fn on_data(&self, header: &GenericHeader, payload: &[u8]) -> DaqResult<()> {
        let ext = DataHeaderExt::decode(payload, header.offset_type())?;
        let raw_payload = payload[DATA_HEADER_EXTRA_SIZE..].to_vec();

        let descriptor = {
            let state = self.state.lock().unwrap();
            state
                .descriptors
                .get(&header.signal_id)
                .cloned()
                .ok_or_else(|| DaqError::new(ErrorKind::PacketStreaming, "no descriptor known for signal"))?
        };

        let offset = match header.offset_type() {
            crate::streaming::header::OffsetType::None => None,
            crate::streaming::header::OffsetType::Int => Some(PacketOffset::Int(ext.offset_int)),
            crate::streaming::header::OffsetType::Float => Some(PacketOffset::Float(ext.offset_float)),
        };

        let domain_packet_id = if ext.domain_packet_id >= 0 { Some(ext.domain_packet_id) } else { None };
        let domain_packet = match domain_packet_id {
            Some(id) => self.state.lock().unwrap().retained.get(&id).cloned(),
            None => None,
        };

        let packet = DataPacket {
            id: ext.packet_id,
            descriptor,
            sample_count: ext.sample_count as usize,
            payload: raw_payload,
            offset,
            domain_packet_id,
            domain_packet,
        };

        if !header.can_release() {
            // The server may resend this ID as an `AlreadySent` frame later;
            // keep a copy around until it tells us to release it.
            self.state.lock().unwrap().retained.insert(packet.id, Arc::new(packet.clone()));
        }
        self.deliver(header.signal_id, Packet::Data(packet));
        Ok(())
    }

    fn on_already_sent(&self, header: &GenericHeader, payload: &[u8]) -> DaqResult<()> {
        let ext = AlreadySentHeaderExt::decode(payload)?;
        let packet = {
            let state = self.state.lock().unwrap();
            state.retained.get(&ext.packet_id).cloned()
        };
        let Some(packet) = packet else {
            return Err(DaqError::new(
                ErrorKind::PacketStreaming,
                format!("alreadySent references unknown packet id {}", ext.packet_id),
            ));
        };
        if header.can_release() {
            self.state.lock().unwrap().retained.remove(&ext.packet_id);
        }
        self.deliver(header.signal_id, Packet::Data((*packet).clone()));
        Ok(())
    }

    fn on_release(&self, payload: &[u8]) -> DaqResult<()> {
        let mut state = self.state.lock().unwrap();
        for chunk in payload.chunks_exact(8) {
            let id = i64::from_le_bytes(chunk.try_into().unwrap());
            state.retained.remove(&id);
        }
        Ok(())
    }

    fn deliver(&self, signal_id: u32, packet: Packet) {
        let signal = self.state.lock().unwrap().signals.get(&signal_id).cloned();
        if let Some(signal) = signal {
            signal.deliver(packet);
        }
    }
}

impl Default for PacketStreamingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::server::PacketStreamingServer;

    #[test]
    fn round_trips_a_data_packet_through_server_and_client() {
        let server = PacketStreamingServer::new(4096, 10);
        let client = PacketStreamingClient::new();

        let signal = Signal::new("v", None).unwrap();
        client.register_signal(1, signal.clone());

        let descriptor_event = EventPacket::new(
            "DataDescriptorChanged",
            serde_json::json!({"valueDescriptor": {"name": "v", "sampleType": "Float64"}}),
        );
        server.add_daq_packet(1, Packet::Event(descriptor_event), false).unwrap();
        let event_buffer = server.get_next_packet_buffer().unwrap().unwrap();
        let mut bytes = event_buffer.header.clone();
        bytes.extend_from_slice(&event_buffer.payload);
        client.on_buffer(&bytes).unwrap();

        let descriptor = Arc::new(DataDescriptor::new("v", crate::signal::SampleType::Float64));
        let mut data_packet = DataPacket::new(descriptor, 1, 3.0f64.to_le_bytes().to_vec());
        data_packet.id = 7;
        server.add_daq_packet(1, Packet::Data(data_packet), true).unwrap();
        let data_buffer = server.get_next_packet_buffer().unwrap().unwrap();
        let mut bytes = data_buffer.header.clone();
        bytes.extend_from_slice(&data_buffer.payload);
        client.on_buffer(&bytes).unwrap();

        match signal.last_value() {
            Some(crate::signal::LastValue::Float(v)) => assert_eq!(v, 3.0),
            other => panic!("expected float last value, got {other:?}"),
        }
    }
}
