//! Device info: a lazily built property object describing a device, with
//! a nested server-capabilities list. The fixed string/int property set
//! below (name, manufacturer, model, ... serialNumber) matches the usual
//! device-identity fields a DAQ device publishes.

use std::sync::{Arc, Weak};

use crate::component::Component;
use crate::error::DaqResult;
use crate::property::{PropertyMetadata, PropertyObject, PropertyValue, ValueType};

fn string_prop(name: &str) -> PropertyMetadata {
    PropertyMetadata::new(name, ValueType::String).with_default(PropertyValue::String(String::new()))
}

fn int_prop(name: &str) -> PropertyMetadata {
    PropertyMetadata::new(name, ValueType::Int).with_default(PropertyValue::Int(0))
}

/// Builds a device-info property object for `owner`. The `name` property
/// is read-only and its read path is wired to the owning component's live
/// `name()` rather than to a stored value, so `get_info().get_property_value("name")`
/// always reflects the component's current name. No other field has this
/// write-through behavior - callers should not assume derived fields stay
/// in sync with the owner beyond `name`.
pub fn build_device_info(owner: &Arc<dyn Component>, connection_string: &str) -> DaqResult<Arc<PropertyObject>> {
    let info = PropertyObject::new("DeviceInfo");

    info.add_property(string_prop("name").read_only())?;
    info.add_property(string_prop("connectionString").with_default_str(connection_string).read_only())?;
    info.add_property(string_prop("manufacturer"))?;
    info.add_property(string_prop("manufacturerUri"))?;
    info.add_property(string_prop("model"))?;
    info.add_property(string_prop("productCode"))?;
    info.add_property(string_prop("deviceRevision"))?;
    info.add_property(string_prop("hardwareRevision"))?;
    info.add_property(string_prop("softwareRevision"))?;
    info.add_property(string_prop("deviceManual"))?;
    info.add_property(string_prop("deviceClass"))?;
    info.add_property(string_prop("serialNumber"))?;
    info.add_property(string_prop("productInstanceUri"))?;
    info.add_property(int_prop("revisionCounter"))?;
    info.add_property(string_prop("assetId"))?;
    info.add_property(string_prop("macAddress"))?;
    info.add_property(string_prop("parentMacAddress"))?;
    info.add_property(string_prop("platform"))?;
    info.add_property(int_prop("position"))?;
    info.add_property(string_prop("systemType"))?;
    info.add_property(string_prop("systemUuid"))?;
    info.add_property(string_prop("sdkVersion"))?;
    info.add_property(string_prop("location"))?;

    let server_capabilities = PropertyObject::new("ServerCapabilities");
    info.add_property(
        PropertyMetadata::new("serverCapabilities", ValueType::Object)
            .with_default(PropertyValue::Object(server_capabilities))
            .read_only(),
    )?;

    let weak_owner: Weak<dyn Component> = Arc::downgrade(owner);
    info.on_property_value_read(
        "name",
        Arc::new(move |_stored| {
            let name = weak_owner.upgrade().map(|o| o.name()).unwrap_or_default();
            PropertyValue::String(name)
        }),
    );

    info.freeze();
    Ok(info)
}

trait StrDefault {
    fn with_default_str(self, value: &str) -> Self;
}

impl StrDefault for PropertyMetadata {
    fn with_default_str(self, value: &str) -> Self {
        self.with_default(PropertyValue::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentBase;
    use std::any::Any;

    #[derive(Debug)]
    struct Leaf {
        base: ComponentBase,
    }

    impl Component for Leaf {
        fn base(&self) -> &ComponentBase {
            &self.base
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn name_property_mirrors_the_live_component_name() {
        let leaf: Arc<dyn Component> = Arc::new(Leaf { base: ComponentBase::new("dev0", None).unwrap() });
        let info = build_device_info(&leaf, "daq.nd://127.0.0.1").unwrap();
        assert_eq!(info.get_property_value("name").unwrap(), PropertyValue::String("dev0".to_string()));
        leaf.base().set_name("renamed").unwrap();
        assert_eq!(info.get_property_value("name").unwrap(), PropertyValue::String("renamed".to_string()));
    }

    #[test]
    fn info_object_is_frozen() {
        let leaf: Arc<dyn Component> = Arc::new(Leaf { base: ComponentBase::new("dev0", None).unwrap() });
        let info = build_device_info(&leaf, "daq.nd://127.0.0.1").unwrap();
        assert!(info.set_property_value("model", "X").is_err());
    }
}
