//! Component-tree invariants and idempotence properties.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opendaq_core::prelude::*;

#[test]
fn global_id_is_parent_global_id_plus_local_id() {
    let signal: Arc<dyn Component> = Signal::new("v0", None).unwrap();
    let port: Arc<dyn Component> = InputPort::new("ip0", Some(&signal)).unwrap();
    assert_eq!(signal.global_id(), "/v0");
    assert_eq!(port.global_id(), format!("{}/ip0", signal.global_id()));
}

#[test]
fn setting_active_twice_fires_exactly_one_attribute_changed() {
    let signal = Signal::new("v0", None).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let count2 = count.clone();
    let component: Arc<dyn Component> = signal.clone();
    component.base().event_bus().subscribe(Arc::new(move |_owner, args| {
        if args.id() == CoreEventId::AttributeChanged {
            count2.fetch_add(1, Ordering::SeqCst);
        }
    }));

    opendaq_core::component::set_active(&component, false).unwrap();
    opendaq_core::component::set_active(&component, false).unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn duplicate_add_property_fails_already_exists() {
    let obj = PropertyObject::new("Amplifier");
    obj.add_property(PropertyMetadata::new("Gain", ValueType::Int).with_default(PropertyValue::Int(1)))
        .unwrap();
    let err = obj
        .add_property(PropertyMetadata::new("Gain", ValueType::Int).with_default(PropertyValue::Int(2)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn locking_attributes_twice_leaves_the_locked_set_unchanged() {
    let signal: Arc<dyn Component> = Signal::new("v0", None).unwrap();
    signal.lock_attributes(&["Name", "Description"]);
    let first = signal.locked_attributes();
    signal.lock_attributes(&["Name", "Description"]);
    let second = signal.locked_attributes();
    assert_eq!(first, second);
}

#[test]
fn folder_find_component_resolves_nested_paths() {
    let folder: Arc<Folder<dyn Component>> = Folder::new("FB", None).unwrap();
    let child: Arc<dyn Component> = Signal::new("v0", Some(&(folder.clone() as Arc<dyn Component>))).unwrap();
    folder.add_item(child.clone()).unwrap();

    let root: Arc<dyn Component> = folder.clone();
    let found = root.find_component("v0").unwrap();
    assert_eq!(found.global_id(), child.global_id());
    assert!(root.find_component("missing").is_none());
}
