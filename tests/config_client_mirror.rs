#![cfg(feature = "config-client")]
//! Configuration-protocol client mirror properties: remote attribute
//! echoes apply locally under the remote-updating guard without
//! forwarding a second RPC call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opendaq_core::prelude::*;
use opendaq_core::event::CoreEventArgs;

struct FakeComm {
    outbound_calls: AtomicUsize,
}

impl FakeComm {
    fn new() -> Arc<Self> {
        Arc::new(Self { outbound_calls: AtomicUsize::new(0) })
    }
}

impl ConfigProtocolClientComm for FakeComm {
    fn get_property_value(&self, _remote_global_id: &str, _property_name: &str) -> DaqResult<PropertyValue> {
        unimplemented!()
    }

    fn set_property_value(&self, _remote_global_id: &str, _property_name: &str, _value: PropertyValue) -> DaqResult<()> {
        self.outbound_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_protected_property_value(&self, _remote_global_id: &str, _property_name: &str, _value: PropertyValue) -> DaqResult<()> {
        self.outbound_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn clear_property_value(&self, _remote_global_id: &str, _property_name: &str) -> DaqResult<()> {
        self.outbound_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin_update(&self, _remote_global_id: &str, _path: &str) -> DaqResult<()> {
        unimplemented!()
    }

    fn end_update(&self, _remote_global_id: &str, _path: &str, _extended_values: Option<&serde_json::Value>) -> DaqResult<()> {
        unimplemented!()
    }

    fn update(&self, _remote_global_id: &str, _serialized: &serde_json::Value, _path: &str) -> DaqResult<()> {
        unimplemented!()
    }

    fn set_attribute_value(&self, _remote_global_id: &str, _attribute: &str, _value: serde_json::Value) -> DaqResult<()> {
        unimplemented!()
    }

    fn call_function(&self, _remote_global_id: &str, _name: &str, _args: &serde_json::Value) -> DaqResult<serde_json::Value> {
        unimplemented!()
    }

    fn connect_port(&self, _input_port_remote_global_id: &str, _signal_remote_global_id: &str) -> DaqResult<()> {
        unimplemented!()
    }

    fn disconnect_port(&self, _input_port_remote_global_id: &str) -> DaqResult<()> {
        unimplemented!()
    }

    fn add_function_block(&self, _remote_global_id: &str, _type_id: &str, _config: Option<&serde_json::Value>) -> DaqResult<String> {
        unimplemented!()
    }

    fn remove_function_block(&self, _remote_global_id: &str, _fb_remote_global_id: &str) -> DaqResult<()> {
        unimplemented!()
    }

    fn add_device(&self, _remote_global_id: &str, _connection_string: &str, _config: Option<&serde_json::Value>) -> DaqResult<String> {
        unimplemented!()
    }

    fn remove_device(&self, _remote_global_id: &str, _device_remote_global_id: &str) -> DaqResult<()> {
        unimplemented!()
    }
}

#[test]
fn remote_property_value_changed_applies_locally_without_an_outbound_call() {
    let comm = FakeComm::new();
    let proxy = ConfigClientComponent::new("amp0", None, comm.clone(), "/dev/amp0", "Amplifier").unwrap();
    proxy
        .properties()
        .add_property(PropertyMetadata::new("Gain", ValueType::Int).with_default(PropertyValue::Int(1)))
        .unwrap();

    let args = CoreEventArgs::new(CoreEventId::PropertyValueChanged)
        .with_param("Name", "Gain")
        .with_param("Value", 9i64);
    proxy.handle_remote_core_event(&args);

    assert_eq!(proxy.get_property_value("Gain").unwrap(), PropertyValue::Int(9));
    assert!(!proxy.is_remote_updating());
    assert_eq!(comm.outbound_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn remote_attribute_changed_applies_locally_without_an_outbound_call() {
    let comm = FakeComm::new();
    let proxy = ConfigClientComponent::new("amp0", None, comm.clone(), "/dev/amp0", "Amplifier").unwrap();

    let args = CoreEventArgs::new(CoreEventId::AttributeChanged)
        .with_param("AttributeName", "Name")
        .with_param("Name", "x");
    proxy.handle_remote_core_event(&args);

    assert_eq!(proxy.name(), "x");
    assert!(!proxy.is_remote_updating());
    assert_eq!(comm.outbound_calls.load(Ordering::SeqCst), 0, "setName must not be reinvoked over RPC");
}

#[test]
fn remote_property_added_and_removed_mirror_idempotently() {
    let comm = FakeComm::new();
    let proxy = ConfigClientComponent::new("amp0", None, comm.clone(), "/dev/amp0", "Amplifier").unwrap();

    let added = CoreEventArgs::new(CoreEventId::PropertyAdded)
        .with_param("Name", "Gain")
        .with_param("ValueType", "Int")
        .with_param("DefaultValue", 3i64);
    proxy.handle_remote_core_event(&added);
    proxy.handle_remote_core_event(&added);

    assert_eq!(proxy.get_property_value("Gain").unwrap(), PropertyValue::Int(3));
    assert_eq!(comm.outbound_calls.load(Ordering::SeqCst), 0);

    let removed = CoreEventArgs::new(CoreEventId::PropertyRemoved).with_param("Name", "Gain");
    proxy.handle_remote_core_event(&removed);
    proxy.handle_remote_core_event(&removed);

    assert!(proxy.get_property_value("Gain").is_err());
}

#[test]
fn local_set_property_value_always_forwards_over_rpc_and_never_writes_locally() {
    let comm = FakeComm::new();
    let proxy = ConfigClientComponent::new("amp0", None, comm.clone(), "/dev/amp0", "Amplifier").unwrap();
    proxy
        .properties()
        .add_property(PropertyMetadata::new("Gain", ValueType::Int).with_default(PropertyValue::Int(1)))
        .unwrap();

    proxy.set_property_value("Gain", 42i64).unwrap();

    assert_eq!(comm.outbound_calls.load(Ordering::SeqCst), 1);
    assert_eq!(proxy.get_property_value("Gain").unwrap(), PropertyValue::Int(1), "local cache must not change until the server echoes back");
}
