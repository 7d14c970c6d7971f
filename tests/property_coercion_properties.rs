//! Property-value coercion/validation hold for arbitrary inputs, not just
//! the handful of fixed cases in `property_transactions.rs`.

use opendaq_core::prelude::*;
use proptest::prelude::*;

fn clamping_gain_property() -> std::sync::Arc<PropertyObject> {
    let obj = PropertyObject::new("Amplifier");
    let coercer: opendaq_core::property::CoercerFn = std::sync::Arc::new(|candidate, _owner| {
        Ok(match candidate {
            PropertyValue::Int(v) => PropertyValue::Int((*v).clamp(0, 100)),
            other => other.clone(),
        })
    });
    let validator: opendaq_core::property::ValidatorFn = std::sync::Arc::new(|candidate, _owner| match candidate {
        PropertyValue::Int(v) => (0..=100).contains(v),
        _ => false,
    });
    obj.add_property(
        PropertyMetadata::new("gain", ValueType::Int)
            .with_default(PropertyValue::Int(0))
            .with_coercer(coercer)
            .with_validator(validator),
    )
    .unwrap();
    obj
}

proptest! {
    /// Whatever raw value is written, the coercer clamps it into range
    /// before the validator ever sees it - so the write always succeeds and
    /// the stored value always lands in `[0, 100]`.
    #[test]
    fn any_int_write_lands_in_the_coerced_range(raw in -100_000i64..100_000) {
        let obj = clamping_gain_property();
        obj.set_property_value("gain", raw).unwrap();
        let PropertyValue::Int(stored) = obj.get_property_value("gain").unwrap() else {
            panic!("gain must remain Int-typed");
        };
        prop_assert!((0..=100).contains(&stored));
        prop_assert_eq!(stored, raw.clamp(0, 100));
    }

    /// Writing the already-in-range result of a prior write is idempotent:
    /// coercion is a projection, so applying it twice equals applying it once.
    #[test]
    fn coercion_is_idempotent(raw in -100_000i64..100_000) {
        let obj = clamping_gain_property();
        obj.set_property_value("gain", raw).unwrap();
        let once = obj.get_property_value("gain").unwrap();
        obj.set_property_value("gain", once.clone()).unwrap();
        let twice = obj.get_property_value("gain").unwrap();
        prop_assert_eq!(once, twice);
    }
}
