//! Signal last-value caching and domain-descriptor fan-out.

use std::sync::Arc;
use std::time::Duration;

use opendaq_core::prelude::*;
use opendaq_core::signal::{DataPacket, LastValue, Packet, ReadStatus, SampleType};

#[test]
fn last_value_reflects_the_most_recent_sample() {
    let signal = Signal::new("v0", None).unwrap();
    signal.set_descriptor(DataDescriptor::new("v0", SampleType::Float64)).unwrap();

    for sample in [1.0f64, 2.0, 3.0] {
        let descriptor = Arc::new(DataDescriptor::new("v0", SampleType::Float64));
        let packet = DataPacket::new(descriptor, 1, sample.to_le_bytes().to_vec());
        signal.send_packet(Packet::Data(packet)).unwrap();
    }

    assert_eq!(signal.last_value(), Some(LastValue::Float(3.0)));
}

#[test]
fn set_descriptor_rejects_null_sample_type() {
    let signal = Signal::new("v0", None).unwrap();
    let err = signal.set_descriptor(DataDescriptor::new("v0", SampleType::Null)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
}

#[test]
fn send_packet_without_a_descriptor_fails() {
    let signal = Signal::new("v0", None).unwrap();
    let descriptor = Arc::new(DataDescriptor::new("v0", SampleType::Float64));
    let packet = DataPacket::new(descriptor, 1, 3.0f64.to_le_bytes().to_vec());
    let err = signal.send_packet(Packet::Data(packet)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PacketStreaming);
}

#[test]
fn removing_a_signal_silently_disconnects_every_subscribed_port() {
    let signal = Signal::new("v0", None).unwrap();
    let port = InputPort::new("ip0", None).unwrap();
    port.connect(&signal).unwrap();
    assert!(port.connection().is_some());

    signal.remove();

    assert!(port.connection().is_none(), "port must drop its connection when the signal is removed");
    assert!(signal.connections().is_empty());
}

#[test]
fn domain_descriptor_change_fans_out_to_every_dependant() {
    let domain = Signal::new("time", None).unwrap();
    let v1 = Signal::new("v1", None).unwrap();
    let v2 = Signal::new("v2", None).unwrap();
    v1.set_domain_signal(Some(domain.clone()));
    v2.set_domain_signal(Some(domain.clone()));

    let v1_dyn: Arc<dyn Component> = v1.clone();
    let v2_dyn: Arc<dyn Component> = v2.clone();
    let ip1 = InputPort::new("ip1", Some(&v1_dyn)).unwrap();
    let ip2 = InputPort::new("ip2", Some(&v2_dyn)).unwrap();
    ip1.connect(&v1).unwrap();
    ip2.connect(&v2).unwrap();

    // Draining the initial connect-time event so only the fan-out event remains.
    let _ = ip1.read(Duration::from_millis(50));
    let _ = ip2.read(Duration::from_millis(50));

    domain.set_descriptor(DataDescriptor::new("time", SampleType::Int64)).unwrap();

    for port in [&ip1, &ip2] {
        let (status, packet) = port.read(Duration::from_millis(50));
        assert_eq!(status, ReadStatus::Event);
        match packet.unwrap() {
            Packet::Event(event) => {
                assert_eq!(event.id, "DataDescriptorChanged");
                assert!(event.parameters["valueDescriptor"].is_null());
                assert!(!event.parameters["domainDescriptor"].is_null());
            }
            Packet::Data(_) => panic!("expected an event packet"),
        }
    }
}
