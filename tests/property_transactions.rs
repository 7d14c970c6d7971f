//! Property-object transaction and coercion/validation properties.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opendaq_core::prelude::*;
use opendaq_core::property::PropertyEvent;

#[test]
fn update_transaction_fires_one_update_end_and_zero_value_changed() {
    let obj = PropertyObject::new("Amplifier");
    obj.add_property(PropertyMetadata::new("string", ValueType::String).with_default(PropertyValue::String("foo".into())))
        .unwrap();
    obj.add_property(PropertyMetadata::new("int", ValueType::Int).with_default(PropertyValue::Int(0)))
        .unwrap();

    let value_changed = Arc::new(AtomicUsize::new(0));
    let update_end = Arc::new(AtomicUsize::new(0));
    let (vc, ue) = (value_changed.clone(), update_end.clone());
    obj.subscribe(Arc::new(move |event| match event {
        PropertyEvent::ValueChanged { .. } => {
            vc.fetch_add(1, Ordering::SeqCst);
        }
        PropertyEvent::UpdateEnd { updated } => {
            ue.fetch_add(1, Ordering::SeqCst);
            assert_eq!(updated.get("string"), Some(&PropertyValue::String("bar".into())));
            assert_eq!(updated.get("int"), Some(&PropertyValue::Int(1)));
        }
        _ => {}
    }));

    obj.begin_update();
    obj.set_property_value("string", "bar").unwrap();
    obj.set_property_value("int", 1i64).unwrap();
    obj.end_update().unwrap();

    assert_eq!(value_changed.load(Ordering::SeqCst), 0);
    assert_eq!(update_end.load(Ordering::SeqCst), 1);
    assert_eq!(obj.get_property_value("string").unwrap(), PropertyValue::String("bar".into()));
    assert_eq!(obj.get_property_value("int").unwrap(), PropertyValue::Int(1));
}

#[test]
fn nested_transactions_only_commit_on_outermost_end_update() {
    let obj = PropertyObject::new("Amplifier");
    obj.add_property(PropertyMetadata::new("gain", ValueType::Int).with_default(PropertyValue::Int(0)))
        .unwrap();

    let update_end = Arc::new(AtomicUsize::new(0));
    let ue = update_end.clone();
    obj.subscribe(Arc::new(move |event| {
        if let PropertyEvent::UpdateEnd { .. } = event {
            ue.fetch_add(1, Ordering::SeqCst);
        }
    }));

    obj.begin_update();
    obj.begin_update();
    obj.set_property_value("gain", 5i64).unwrap();
    obj.end_update().unwrap();
    assert_eq!(update_end.load(Ordering::SeqCst), 0, "inner end_update must not commit");
    obj.end_update().unwrap();
    assert_eq!(update_end.load(Ordering::SeqCst), 1);
}

#[test]
fn begin_update_forwards_into_object_typed_children() {
    let child = PropertyObject::new("Input");
    child
        .add_property(PropertyMetadata::new("range", ValueType::Int).with_default(PropertyValue::Int(0)))
        .unwrap();

    let parent = PropertyObject::new("Amplifier");
    parent
        .add_property(PropertyMetadata::new("gain", ValueType::Int).with_default(PropertyValue::Int(0)))
        .unwrap();
    parent
        .add_property(PropertyMetadata::new("input", ValueType::Object).with_default(PropertyValue::Object(child.clone())))
        .unwrap();

    let parent_update_end = Arc::new(AtomicUsize::new(0));
    let child_update_end = Arc::new(AtomicUsize::new(0));
    let (pue, cue) = (parent_update_end.clone(), child_update_end.clone());
    parent.subscribe(Arc::new(move |event| {
        if let PropertyEvent::UpdateEnd { .. } = event {
            pue.fetch_add(1, Ordering::SeqCst);
        }
    }));
    child.subscribe(Arc::new(move |event| {
        if let PropertyEvent::UpdateEnd { updated } = event {
            cue.fetch_add(1, Ordering::SeqCst);
            assert_eq!(updated.get("range"), Some(&PropertyValue::Int(7)));
        }
    }));

    parent.begin_update();
    parent.set_property_value("gain", 5i64).unwrap();
    child.set_property_value("range", 7i64).unwrap();
    assert_eq!(child_update_end.load(Ordering::SeqCst), 0, "child must still be inside its forwarded transaction");
    parent.end_update().unwrap();

    assert_eq!(parent_update_end.load(Ordering::SeqCst), 1);
    assert_eq!(child_update_end.load(Ordering::SeqCst), 1);
    assert_eq!(child.get_property_value("range").unwrap(), PropertyValue::Int(7));
}

#[test]
fn coercer_and_validator_run_in_order_on_write() {
    let obj = PropertyObject::new("Amplifier");
    let coercer: opendaq_core::property::CoercerFn = Arc::new(|candidate, _owner| {
        Ok(match candidate {
            PropertyValue::Int(v) if *v < 0 => PropertyValue::Int(0),
            other => other.clone(),
        })
    });
    let validator: opendaq_core::property::ValidatorFn = Arc::new(|candidate, _owner| match candidate {
        PropertyValue::Int(v) => *v <= 100,
        _ => false,
    });
    obj.add_property(
        PropertyMetadata::new("gain", ValueType::Int)
            .with_default(PropertyValue::Int(1))
            .with_coercer(coercer)
            .with_validator(validator),
    )
    .unwrap();

    // Coercion clamps a negative write to 0 before validation sees it.
    obj.set_property_value("gain", -5i64).unwrap();
    assert_eq!(obj.get_property_value("gain").unwrap(), PropertyValue::Int(0));

    // A value the validator rejects leaves the stored value unchanged.
    let err = obj.set_property_value("gain", 200i64).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    assert_eq!(obj.get_property_value("gain").unwrap(), PropertyValue::Int(0));
}

#[test]
fn serialize_then_update_round_trips_explicit_values() {
    let obj = PropertyObject::new("Amplifier");
    obj.add_property(PropertyMetadata::new("gain", ValueType::Int).with_default(PropertyValue::Int(1)))
        .unwrap();
    obj.add_property(PropertyMetadata::new("label", ValueType::String).with_default(PropertyValue::String("x".into())))
        .unwrap();

    obj.set_property_value("gain", 9i64).unwrap();
    obj.set_property_value("label", "y").unwrap();
    let serialized = obj.serialize();

    let restored = PropertyObject::new("Amplifier");
    restored
        .add_property(PropertyMetadata::new("gain", ValueType::Int).with_default(PropertyValue::Int(1)))
        .unwrap();
    restored
        .add_property(PropertyMetadata::new("label", ValueType::String).with_default(PropertyValue::String("x".into())))
        .unwrap();
    restored.update(&serialized).unwrap();

    assert_eq!(restored.get_property_value("gain").unwrap(), PropertyValue::Int(9));
    assert_eq!(restored.get_property_value("label").unwrap(), PropertyValue::String("y".into()));
}
