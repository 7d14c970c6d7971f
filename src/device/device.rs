//! Device: a signal container that additionally owns sub-devices,
//! an I/O folder, servers, a synchronization component and a device
//! domain, and that mediates child creation through a [`ModuleManager`].
//!
//! The folder layout (`Dev`, `IO`, `Sig`, `FB`, `Srv`, `Synchronization`),
//! the `add_device`/`add_function_block`/`add_server` delegation to a
//! module collaborator, and the root-device gate on server management
//! are all part of that contract.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::component::{Component, ComponentBase};
use crate::device::domain::DeviceDomain;
use crate::device::info::build_device_info;
use crate::device::module_manager::ModuleManager;
use crate::error::{invalid_operation, DaqResult};
use crate::event::{CoreEventArgs, CoreEventId};
use crate::folder::{Folder, SearchFilter};
use crate::property::{PropertyMetadata, PropertyObject, PropertyValue, ValueType};
use crate::signal::Signal;

struct DeviceState {
    domain: DeviceDomain,
    is_root: bool,
    /// Local IDs of function blocks created through the module manager;
    /// `removeFunctionBlock` rejects anything else.
    module_provided_fbs: HashSet<String>,
}

pub struct Device {
    base: ComponentBase,
    connection_string: String,
    module_manager: Arc<ModuleManager>,
    properties: Arc<PropertyObject>,
    info: OnceCell<Arc<PropertyObject>>,
    state: RwLock<DeviceState>,

    devices: OnceCell<Arc<Folder<dyn Component>>>,
    io_folder: OnceCell<Arc<Folder<dyn Component>>>,
    servers: OnceCell<Arc<Folder<dyn Component>>>,
    function_blocks: OnceCell<Arc<Folder<dyn Component>>>,
    signals: OnceCell<Arc<Folder<Signal>>>,
    sync_component: OnceCell<Arc<dyn Component>>,
    custom_components: OnceCell<Arc<Folder<dyn Component>>>,
}

impl Device {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        connection_string: impl Into<String>,
        domain: DeviceDomain,
        module_manager: Arc<ModuleManager>,
    ) -> DaqResult<Arc<Self>> {
        let base = ComponentBase::new(local_id, parent)?;
        let properties = PropertyObject::new("Device");
        properties.add_property(PropertyMetadata::new("UserName", ValueType::String).with_default(PropertyValue::String(String::new())))?;
        properties.add_property(PropertyMetadata::new("Location", ValueType::String).with_default(PropertyValue::String(String::new())))?;

        let device = Arc::new(Self {
            base,
            connection_string: connection_string.into(),
            module_manager,
            properties,
            info: OnceCell::new(),
            state: RwLock::new(DeviceState { domain, is_root: false, module_provided_fbs: HashSet::new() }),
            devices: OnceCell::new(),
            io_folder: OnceCell::new(),
            servers: OnceCell::new(),
            function_blocks: OnceCell::new(),
            signals: OnceCell::new(),
            sync_component: OnceCell::new(),
            custom_components: OnceCell::new(),
        });

        let owner = device.clone() as Arc<dyn Component>;
        let _ = device.devices.set(Folder::new("Dev", Some(&owner))?);
        let _ = device.io_folder.set(Folder::new("IO", Some(&owner))?);
        let _ = device.servers.set(Folder::new("Srv", Some(&owner))?);
        let _ = device.function_blocks.set(Folder::new("FB", Some(&owner))?);
        let _ = device.signals.set(Folder::new("Sig", Some(&owner))?);
        let _ = device.custom_components.set(Folder::new("CustomComponents", Some(&owner))?);
        let sync = Folder::<dyn Component>::new("Synchronization", Some(&owner))? as Arc<dyn Component>;
        let _ = device.sync_component.set(sync);

        device.devices().lock_all_attributes();
        device.io_folder().lock_all_attributes();
        device.servers().lock_all_attributes();
        device.devices().unlock_attributes(&["Active"]);
        device.io_folder().unlock_attributes(&["Active"]);
        device.servers().unlock_attributes(&["Active"]);

        Ok(device)
    }

    /// Marks this device as the root of its tree, unlocking server
    /// management.
    pub fn set_as_root(&self) {
        self.state.write().is_root = true;
    }

    pub fn is_root(&self) -> bool {
        self.state.read().is_root
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub fn properties(&self) -> &Arc<PropertyObject> {
        &self.properties
    }

    /// Lazily builds and caches the frozen device-info object.
    pub fn get_info(self: &Arc<Self>) -> &Arc<PropertyObject> {
        self.info.get_or_init(|| {
            let owner = self.clone() as Arc<dyn Component>;
            build_device_info(&owner, &self.connection_string).expect("device info schema is well-formed")
        })
    }

    pub fn domain(&self) -> DeviceDomain {
        self.state.read().domain.clone()
    }

    pub fn set_device_domain(self: &Arc<Self>, domain: DeviceDomain) {
        self.state.write().domain = domain;
        self.trigger_core_event(CoreEventArgs::new(CoreEventId::DeviceDomainChanged));
    }

    pub fn devices(&self) -> &Arc<Folder<dyn Component>> {
        self.devices.get().expect("filled in by Device::new")
    }

    pub fn io_folder(&self) -> &Arc<Folder<dyn Component>> {
        self.io_folder.get().expect("filled in by Device::new")
    }

    pub fn servers(&self) -> &Arc<Folder<dyn Component>> {
        self.servers.get().expect("filled in by Device::new")
    }

    pub fn function_blocks(&self) -> &Arc<Folder<dyn Component>> {
        self.function_blocks.get().expect("filled in by Device::new")
    }

    pub fn signals(&self) -> &Arc<Folder<Signal>> {
        self.signals.get().expect("filled in by Device::new")
    }

    pub fn sync_component(&self) -> &Arc<dyn Component> {
        self.sync_component.get().expect("filled in by Device::new")
    }

    pub fn custom_components(&self) -> &Arc<Folder<dyn Component>> {
        self.custom_components.get().expect("filled in by Device::new")
    }

    pub fn get_devices(&self, filter: Option<&dyn SearchFilter<dyn Component>>) -> Vec<Arc<dyn Component>> {
        self.devices().items(filter)
    }

    pub fn get_devices_recursive(&self, filter: &dyn SearchFilter<dyn Component>) -> Vec<Arc<dyn Component>> {
        let mut out = Vec::new();
        for item in self.devices().all_items() {
            collect_recursive(&item, filter, &mut out);
        }
        out
    }

    pub fn get_function_blocks(&self, filter: Option<&dyn SearchFilter<dyn Component>>) -> Vec<Arc<dyn Component>> {
        self.function_blocks().items(filter)
    }

    pub fn get_function_blocks_recursive(&self, filter: &dyn SearchFilter<dyn Component>) -> Vec<Arc<dyn Component>> {
        let mut out = self.function_blocks().items(Some(filter));
        for dev in self.devices().all_items() {
            if let Some(device) = dev.as_any().downcast_ref::<Device>() {
                out.extend(device.get_function_blocks_recursive(filter));
            }
        }
        out
    }

    pub fn get_signals(&self, filter: Option<&dyn SearchFilter<Signal>>) -> Vec<Arc<Signal>> {
        self.signals().items(filter)
    }

    /// Non-recursive channel listing: every direct child of the `IO`
    /// folder. Channels are a further specialization of function
    /// block not separately modeled in this runtime slice; callers that
    /// need channel-only filtering can supply a `SearchFilter`.
    pub fn get_channels(&self, filter: Option<&dyn SearchFilter<dyn Component>>) -> Vec<Arc<dyn Component>> {
        self.io_folder().items(filter)
    }

    pub fn get_channels_recursive(&self, filter: &dyn SearchFilter<dyn Component>) -> Vec<Arc<dyn Component>> {
        let mut out = Vec::new();
        for item in self.io_folder().all_items() {
            collect_recursive(&item, filter, &mut out);
        }
        for dev in self.devices().all_items() {
            if let Some(device) = dev.as_any().downcast_ref::<Device>() {
                out.extend(device.get_channels_recursive(filter));
            }
        }
        out
    }

    /// Delegates to the module manager and parents the result under
    /// `Dev`.
    pub fn add_device(self: &Arc<Self>, connection_string: &str, config: Option<&Arc<PropertyObject>>) -> DaqResult<Arc<dyn Component>> {
        let parent = self.devices().clone() as Arc<dyn Component>;
        let device = self.module_manager.create_device(connection_string, &parent, config)?;
        self.devices().add_item(device.clone())?;
        self.trigger_core_event(CoreEventArgs::new(CoreEventId::ComponentAdded).with_param("Owner", device.global_id().to_string()));
        Ok(device)
    }

    pub fn remove_device(self: &Arc<Self>, local_id: &str) -> DaqResult<()> {
        self.devices().remove_item_with_local_id(local_id)?;
        self.trigger_core_event(CoreEventArgs::new(CoreEventId::ComponentRemoved));
        Ok(())
    }

    pub fn add_function_block(self: &Arc<Self>, type_id: &str, config: Option<&Arc<PropertyObject>>) -> DaqResult<Arc<dyn Component>> {
        let parent = self.function_blocks().clone() as Arc<dyn Component>;
        let fb = self.module_manager.create_function_block(type_id, &parent, config)?;
        self.function_blocks().add_item(fb.clone())?;
        self.state.write().module_provided_fbs.insert(fb.local_id().to_string());
        self.trigger_core_event(CoreEventArgs::new(CoreEventId::ComponentAdded).with_param("Owner", fb.global_id().to_string()));
        Ok(fb)
    }

    /// Fails with `InvalidOperation` if `local_id` was not created through
    /// the module manager.
    pub fn remove_function_block(self: &Arc<Self>, local_id: &str) -> DaqResult<()> {
        if !self.state.read().module_provided_fbs.contains(local_id) {
            return Err(invalid_operation(format!("function block '{local_id}' was not created by a module")));
        }
        self.function_blocks().remove_item_with_local_id(local_id)?;
        self.state.write().module_provided_fbs.remove(local_id);
        self.trigger_core_event(CoreEventArgs::new(CoreEventId::ComponentRemoved));
        Ok(())
    }

    pub fn get_servers(&self, filter: Option<&dyn SearchFilter<dyn Component>>) -> DaqResult<Vec<Arc<dyn Component>>> {
        self.require_root()?;
        Ok(self.servers().items(filter))
    }

    pub fn add_server(self: &Arc<Self>, type_id: &str, config: Option<&Arc<PropertyObject>>) -> DaqResult<Arc<dyn Component>> {
        self.require_root()?;
        let parent = self.servers().clone() as Arc<dyn Component>;
        let server = self.module_manager.create_server(type_id, &parent, config)?;
        self.servers().add_item(server.clone())?;
        Ok(server)
    }

    pub fn remove_server(&self, local_id: &str) -> DaqResult<()> {
        self.require_root()?;
        self.servers().remove_item_with_local_id(local_id)
    }

    fn require_root(&self) -> DaqResult<()> {
        if self.is_root() {
            Ok(())
        } else {
            Err(invalid_operation("server management is only allowed on the root device"))
        }
    }

    /// A self-contained JSON document under the top-level `Device` key
    ///: the device's own properties plus the local-ID shape of each
    /// folder (`Sig`, `FB`, `Dev`, `IO`, `Srv`, `Synchronization`).
    pub fn save_configuration(&self) -> serde_json::Value {
        let folder_shape = |folder: &Arc<Folder<dyn Component>>| -> serde_json::Value {
            serde_json::Value::Object(
                folder
                    .all_items()
                    .iter()
                    .map(|item| (item.local_id().to_string(), serde_json::json!({})))
                    .collect(),
            )
        };

        serde_json::json!({
            "Device": {
                "properties": self.properties.serialize(),
                "Sig": self.signals().all_items().iter().map(|s| (s.local_id().to_string(), serde_json::json!({}))).collect::<serde_json::Map<_, _>>(),
                "FB": folder_shape(self.function_blocks()),
                "Dev": folder_shape(self.devices()),
                "IO": folder_shape(self.io_folder()),
                "Srv": folder_shape(self.servers()),
                "Synchronization": {},
            }
        })
    }

    /// Applies a document produced by [`Self::save_configuration`]
    /// through the property-object update protocol. Folder
    /// shape entries for children that no longer exist are ignored -
    /// this slice does not reconstruct missing children from
    /// configuration alone.
    pub fn load_configuration(self: &Arc<Self>, serialized: &serde_json::Value) -> DaqResult<()> {
        let Some(device_obj) = serialized.get("Device") else {
            return Err(crate::error::invalid_parameter("missing top-level 'Device' key"));
        };
        if let Some(properties) = device_obj.get("properties") {
            self.properties.update(properties)?;
        }
        Ok(())
    }
}

/// Walks `item` and, if `filter` allows descending into it, its children,
/// collecting every accepted component.
fn collect_recursive(item: &Arc<dyn Component>, filter: &dyn SearchFilter<dyn Component>, out: &mut Vec<Arc<dyn Component>>) {
    if filter.accepts_component(item) {
        out.push(item.clone());
    }
    if filter.visit_children(item) {
        for child in item.child_components() {
            collect_recursive(&child, filter, out);
        }
    }
}

impl Component for Device {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            self.devices().clone() as Arc<dyn Component>,
            self.io_folder().clone() as Arc<dyn Component>,
            self.function_blocks().clone() as Arc<dyn Component>,
            self.signals().clone() as Arc<dyn Component>,
            self.servers().clone() as Arc<dyn Component>,
            self.sync_component().clone(),
            self.custom_components().clone() as Arc<dyn Component>,
        ]
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device").field("global_id", &self.global_id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Ratio;

    fn root_device() -> Arc<Device> {
        let domain = DeviceDomain::new(Ratio { numerator: 1, denominator: 1 }, "1970-01-01T00:00:00Z", None);
        let manager = Arc::new(ModuleManager::new());
        let device = Device::new("dev0", None, "daq.nd://127.0.0.1", domain, manager).unwrap();
        device.set_as_root();
        device
    }

    #[test]
    fn get_info_is_cached_and_lazily_built() {
        let device = root_device();
        let a = device.get_info().clone();
        let b = device.get_info().clone();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn server_management_requires_root() {
        let domain = DeviceDomain::new(Ratio { numerator: 1, denominator: 1 }, "1970-01-01T00:00:00Z", None);
        let manager = Arc::new(ModuleManager::new());
        let device = Device::new("dev0", None, "daq.nd://127.0.0.1", domain, manager).unwrap();
        assert!(device.get_servers(None).is_err());
    }

    #[test]
    fn removing_non_module_function_block_fails() {
        let device = root_device();
        assert!(device.remove_function_block("missing").is_err());
    }

    #[test]
    fn save_configuration_round_trips_properties() {
        let device = root_device();
        device.properties().set_property_value("UserName", "alice").unwrap();
        let json = device.save_configuration();
        device.properties().set_property_value("UserName", "bob").unwrap();
        device.load_configuration(&json).unwrap();
        assert_eq!(
            device.properties().get_property_value("UserName").unwrap(),
            PropertyValue::String("alice".to_string())
        );
    }
}
