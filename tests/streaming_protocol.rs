//! Packet-streaming wire protocol properties: dedup, release batching
//! and a full server-to-client round trip, driven entirely through the
//! public API (no access to the server's private bookkeeping).

use std::sync::Arc;

use opendaq_core::prelude::*;
use opendaq_core::signal::{DataPacket, EventPacket, LastValue, Packet, SampleType};
use opendaq_core::streaming::{GenericHeader, PacketStreamingClient, PacketStreamingServer, PacketType};

fn register_descriptor(server: &PacketStreamingServer, signal_id: u32) {
    let descriptor = DataDescriptor::new("v", SampleType::Float64);
    let event = EventPacket::data_descriptor_changed(Some(&descriptor), None);
    server.add_daq_packet(signal_id, Packet::Event(event), false).unwrap();
}

#[test]
fn retransmitting_the_same_packet_id_emits_an_already_sent_frame() {
    let server = PacketStreamingServer::new(1024, 10);
    register_descriptor(&server, 1);

    let descriptor = Arc::new(DataDescriptor::new("v", SampleType::Float64));
    let mut packet = DataPacket::new(descriptor, 1, vec![0; 8]);
    packet.id = 42;
    server.add_daq_packet(1, Packet::Data(packet.clone()), false).unwrap();
    server.add_daq_packet(1, Packet::Data(packet), false).unwrap();

    let first = server.get_next_packet_buffer().unwrap().unwrap();
    let second = server.get_next_packet_buffer().unwrap().unwrap();
    assert_eq!(GenericHeader::decode(&first.header).unwrap().packet_type, PacketType::Data);
    assert_eq!(GenericHeader::decode(&second.header).unwrap().packet_type, PacketType::AlreadySent);
}

#[test]
fn steal_ref_sets_the_can_release_flag_on_the_first_frame() {
    let server = PacketStreamingServer::new(1024, 10);
    register_descriptor(&server, 1);
    let descriptor = Arc::new(DataDescriptor::new("v", SampleType::Float64));
    let mut packet = DataPacket::new(descriptor, 1, vec![0; 8]);
    packet.id = 7;
    server.add_daq_packet(1, Packet::Data(packet), true).unwrap();

    let frame = server.get_next_packet_buffer().unwrap().unwrap();
    assert!(GenericHeader::decode(&frame.header).unwrap().can_release());
}

#[test]
fn release_frame_batches_at_the_configured_threshold() {
    let server = PacketStreamingServer::new(1024, 3);
    register_descriptor(&server, 1);
    let descriptor = Arc::new(DataDescriptor::new("v", SampleType::Float64));

    for id in 0..3 {
        let mut packet = DataPacket::new(descriptor.clone(), 1, vec![0; 8]);
        packet.id = id;
        server.add_daq_packet(1, Packet::Data(packet), false).unwrap();
        server.notify_packet_dropped(id);
    }

    for _ in 0..3 {
        let frame = server.get_next_packet_buffer().unwrap().unwrap();
        assert_eq!(GenericHeader::decode(&frame.header).unwrap().packet_type, PacketType::Data);
    }
    let release = server.get_next_packet_buffer().unwrap().unwrap();
    let header = GenericHeader::decode(&release.header).unwrap();
    assert_eq!(header.packet_type, PacketType::Release);
    assert_eq!(release.payload.len(), 24);
    assert!(server.get_next_packet_buffer().unwrap().is_none());
}

#[test]
fn client_attaches_the_resolved_domain_packet_to_a_value_packet() {
    let domain_signal = Signal::new("time", None).unwrap();
    let value_signal = Signal::new("v0", None).unwrap();
    let input_port = InputPort::new("ip0", None).unwrap();
    input_port.connect(&value_signal).unwrap();

    let client = PacketStreamingClient::new();
    client.register_signal(1, domain_signal.clone());
    client.register_signal(2, value_signal.clone());

    let server = PacketStreamingServer::new(1024, 10);
    register_descriptor(&server, 1);
    register_descriptor(&server, 2);

    let domain_descriptor = Arc::new(DataDescriptor::new("time", SampleType::Int64));
    let mut domain_packet = DataPacket::new(domain_descriptor, 1, 5i64.to_le_bytes().to_vec());
    domain_packet.id = 100;
    // steal_ref = false: the server keeps it flagged "not yet releasable", so
    // the client retains a copy the value packet below can resolve against.
    server.add_daq_packet(1, Packet::Data(domain_packet), false).unwrap();

    let value_descriptor = Arc::new(DataDescriptor::new("v0", SampleType::Float64));
    let mut value_packet = DataPacket::new(value_descriptor, 1, 3.0f64.to_le_bytes().to_vec()).with_domain_packet_id(100);
    value_packet.id = 200;
    server.add_daq_packet(2, Packet::Data(value_packet), false).unwrap();

    while let Some(buffer) = server.get_next_packet_buffer().unwrap() {
        let mut bytes = buffer.header.clone();
        bytes.extend_from_slice(&buffer.payload);
        client.on_buffer(&bytes).unwrap();
    }

    // Drain the connect-time descriptor event and the wire-level
    // DataDescriptorChanged event for signal 2 before the data packet.
    let _ = input_port.try_read();
    let _ = input_port.try_read();
    let delivered = input_port.try_read().expect("value packet should have been delivered");
    match delivered {
        Packet::Data(data) => {
            let domain = data.domain_packet.expect("domain packet should have resolved");
            assert_eq!(domain.id, 100);
            assert_eq!(domain.payload, 5i64.to_le_bytes().to_vec());
        }
        Packet::Event(_) => panic!("expected a data packet"),
    }
}

#[test]
fn client_round_trips_a_data_packet_through_the_wire_format() {
    let signal = Signal::new("v0", None).unwrap();
    let client = PacketStreamingClient::new();
    client.register_signal(1, signal.clone());

    let server = PacketStreamingServer::new(1024, 10);
    register_descriptor(&server, 1);
    let descriptor = Arc::new(DataDescriptor::new("v0", SampleType::Float64));
    let mut packet = DataPacket::new(descriptor, 1, 3.0f64.to_le_bytes().to_vec());
    packet.id = 1;
    server.add_daq_packet(1, Packet::Data(packet), true).unwrap();

    while let Some(buffer) = server.get_next_packet_buffer().unwrap() {
        let mut bytes = buffer.header.clone();
        bytes.extend_from_slice(&buffer.payload);
        client.on_buffer(&bytes).unwrap();
    }

    assert_eq!(signal.last_value(), Some(LastValue::Float(3.0)));
}
