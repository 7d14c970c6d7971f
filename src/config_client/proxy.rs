//! Client-proxy component types: local mirrors of remote
//! components. Mutations forward over RPC; remote core events are
//! applied locally under a "remote-updating" guard so the proxy's own
//! resulting attribute/property writes don't loop back over the wire.
//! `set_property_value` forwards over RPC without a local write;
//! `get_property_value` reads the local mirror; `handle_remote_core_event`/
//! `apply_update_end` apply incoming state under that guard.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::component::{Component, ComponentBase};
use crate::config_client::comm::ConfigProtocolClientComm;
use crate::error::DaqResult;
use crate::event::{CoreEventArgs, CoreEventId};
use crate::folder::Folder;
use crate::property::{PropertyMetadata, PropertyObject, PropertyValue, ValueType};

/// Shared proxy state embedded by every `ConfigClient*` type: the local
/// component identity, the remote identity it mirrors, the RPC channel,
/// and a local property-value cache kept fresh by remote events.
pub struct ConfigClientComponent {
    base: ComponentBase,
    remote_global_id: RwLock<String>,
    comm: Arc<dyn ConfigProtocolClientComm>,
    properties: Arc<PropertyObject>,
    remote_updating: AtomicBool,
}

impl ConfigClientComponent {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        comm: Arc<dyn ConfigProtocolClientComm>,
        remote_global_id: impl Into<String>,
        class_name: &str,
    ) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            base: ComponentBase::new(local_id, parent)?,
            remote_global_id: RwLock::new(remote_global_id.into()),
            comm,
            properties: PropertyObject::new(class_name),
            remote_updating: AtomicBool::new(false),
        }))
    }

    pub fn remote_global_id(&self) -> String {
        self.remote_global_id.read().clone()
    }

    pub fn set_remote_global_id(&self, id: impl Into<String>) {
        *self.remote_global_id.write() = id.into();
    }

    pub fn properties(&self) -> &Arc<PropertyObject> {
        &self.properties
    }

    pub fn is_remote_updating(&self) -> bool {
        self.remote_updating.load(Ordering::Acquire)
    }

    /// Forwards a scalar write over RPC; the local cache is updated only
    /// when the server echoes a `PropertyValueChanged` event back
    /// - a direct local write here would race the echo.
    pub fn set_property_value(&self, property_name: &str, value: impl Into<PropertyValue>) -> DaqResult<()> {
        self.comm.set_property_value(&self.remote_global_id(), property_name, value.into())
    }

    pub fn set_protected_property_value(&self, property_name: &str, value: impl Into<PropertyValue>) -> DaqResult<()> {
        self.comm.set_protected_property_value(&self.remote_global_id(), property_name, value.into())
    }

    pub fn clear_property_value(&self, property_name: &str) -> DaqResult<()> {
        self.comm.clear_property_value(&self.remote_global_id(), property_name)
    }

    /// Reads from the local mirror without a round trip. Callable
    /// (function/procedure) properties are out of scope for this RPC
    /// surface.
    pub fn get_property_value(&self, property_name: &str) -> DaqResult<PropertyValue> {
        self.properties.get_property_value(property_name)
    }

    /// Applies an incoming `PropertyValueChanged` under the
    /// remote-updating guard so the resulting local write doesn't get
    /// forwarded back over RPC.
    pub fn apply_property_value_changed(&self, property_name: &str, value: PropertyValue) {
        self.with_remote_updating(|| {
            let _ = self.properties.set_protected_property_value(property_name, value);
        });
    }

    pub fn apply_property_cleared(&self, property_name: &str) {
        self.with_remote_updating(|| {
            let _ = self.properties.clear_property_value(property_name);
        });
    }

    /// Applies a remote `AttributeChanged` event to the local mirror's own
    /// attribute fields, bypassing RPC entirely - there's no `setName` echo
    /// to guard against here since nothing calls back out over the wire.
    pub fn apply_attribute_changed(&self, attribute: &str, args: &CoreEventArgs) {
        let _ = match attribute {
            "Name" => args.param("Name").and_then(|v| v.as_str()).map(|v| self.base.set_name(v)),
            "Description" => args.param("Description").and_then(|v| v.as_str()).map(|v| self.base.set_description(v)),
            "Visible" => args.param("Visible").and_then(|v| v.as_bool()).map(|v| self.base.set_visible(v)),
            "Active" => args.param("Active").and_then(|v| v.as_bool()).map(|v| self.base.set_active(v)),
            _ => None,
        };
    }

    /// Mirrors a remote `PropertyAdded` by reconstructing the property's
    /// metadata from the event's `ValueType`/`DefaultValue` params and
    /// adding it locally. Idempotent: a property already present (e.g. from
    /// a prior full sync) is left untouched rather than treated as an error.
    pub fn apply_property_added(&self, name: &str, args: &CoreEventArgs) {
        if self.properties.has_property(name) {
            return;
        }
        let Some(value_type) = args.param("ValueType").and_then(|v| serde_json::from_value::<ValueType>(v.clone()).ok()) else {
            return;
        };
        let mut metadata = PropertyMetadata::new(name, value_type);
        if let Some(default_raw) = args.param("DefaultValue") {
            if let Some(default_value) = PropertyValue::from_json_scalar(default_raw, value_type) {
                metadata = metadata.with_default(default_value);
            }
        }
        let _ = self.properties.add_property(metadata);
    }

    /// Applies a `PropertyObjectUpdateEnd` batch by replaying it
    /// through the same `update` path `loadConfiguration` uses, under the
    /// remote-updating guard.
    pub fn apply_update_end(&self, updated_properties: &serde_json::Value) {
        self.with_remote_updating(|| {
            let _ = self.properties.update(updated_properties);
        });
    }

    /// Dispatches one remote core event by ID. Any panic/failure
    /// from applying it is swallowed - remote handling must never
    /// propagate back to the firing thread.
    pub fn handle_remote_core_event(&self, args: &CoreEventArgs) {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| match args.id() {
            CoreEventId::PropertyValueChanged => {
                if let (Some(name), Some(raw_value)) = (args.param("Name").and_then(|v| v.as_str()), args.param("Value")) {
                    if let Some(value_type) = self.properties.property_value_type(name) {
                        if let Some(value) = PropertyValue::from_json_scalar(raw_value, value_type) {
                            self.apply_property_value_changed(name, value);
                        }
                    }
                }
            }
            CoreEventId::PropertyObjectUpdateEnd => {
                if let Some(updated @ serde_json::Value::Object(_)) = args.param("UpdatedProperties") {
                    self.apply_update_end(updated);
                }
            }
            CoreEventId::AttributeChanged => {
                if let Some(attribute) = args.param("AttributeName").and_then(|v| v.as_str()) {
                    let attribute = attribute.to_string();
                    self.with_remote_updating(|| self.apply_attribute_changed(&attribute, args));
                }
            }
            CoreEventId::PropertyAdded => {
                if let Some(name) = args.param("Name").and_then(|v| v.as_str()) {
                    self.with_remote_updating(|| self.apply_property_added(name, args));
                }
            }
            CoreEventId::PropertyRemoved => {
                if let Some(name) = args.param("Name").and_then(|v| v.as_str()) {
                    self.with_remote_updating(|| {
                        let _ = self.properties.remove_property(name);
                    });
                }
            }
            _ => {}
        }));
        if result.is_err() {
            tracing::warn!(target: "opendaq.config_client", "panic while applying remote core event");
        }
    }

    /// Applies a full serialized snapshot pushed by the server.
    pub fn remote_update(&self, serialized: &serde_json::Value) -> DaqResult<()> {
        self.with_remote_updating_result(|| self.properties.update(serialized))
    }

    fn with_remote_updating(&self, f: impl FnOnce()) {
        self.remote_updating.store(true, Ordering::Release);
        f();
        self.remote_updating.store(false, Ordering::Release);
    }

    fn with_remote_updating_result<T>(&self, f: impl FnOnce() -> DaqResult<T>) -> DaqResult<T> {
        self.remote_updating.store(true, Ordering::Release);
        let result = f();
        self.remote_updating.store(false, Ordering::Release);
        result
    }
}

impl Component for ConfigClientComponent {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ConfigClientComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClientComponent")
            .field("global_id", &self.global_id())
            .field("remote_global_id", &self.remote_global_id())
            .finish()
    }
}

/// Client-side mirror of a remote signal: exposes the same property
/// surface as [`ConfigClientComponent`] but owns no children. A real
/// signal also mirrors its descriptor/domain-signal links; out of scope
/// for this slice, which mirrors the property/attribute surface only.
pub struct ConfigClientSignal {
    shared: Arc<ConfigClientComponent>,
}

impl ConfigClientSignal {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        comm: Arc<dyn ConfigProtocolClientComm>,
        remote_global_id: impl Into<String>,
    ) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            shared: ConfigClientComponent::new(local_id, parent, comm, remote_global_id, "Signal")?,
        }))
    }

    pub fn shared(&self) -> &Arc<ConfigClientComponent> {
        &self.shared
    }
}

impl Component for ConfigClientSignal {
    fn base(&self) -> &ComponentBase {
        self.shared.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ConfigClientSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClientSignal").field("global_id", &self.global_id()).finish()
    }
}

/// Client-side mirror of a remote input port. `connect`/`disconnect`
/// forward over RPC; the locally
/// mirrored connection state is applied only once the server's
/// `SignalConnected`/`SignalDisconnected` core event echoes back.
pub struct ConfigClientInputPort {
    shared: Arc<ConfigClientComponent>,
    connected_signal_remote_id: RwLock<Option<String>>,
}

impl ConfigClientInputPort {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        comm: Arc<dyn ConfigProtocolClientComm>,
        remote_global_id: impl Into<String>,
    ) -> DaqResult<Arc<Self>> {
        Ok(Arc::new(Self {
            shared: ConfigClientComponent::new(local_id, parent, comm, remote_global_id, "InputPort")?,
            connected_signal_remote_id: RwLock::new(None),
        }))
    }

    pub fn shared(&self) -> &Arc<ConfigClientComponent> {
        &self.shared
    }

    pub fn connect(&self, signal: &ConfigClientSignal) -> DaqResult<()> {
        self.shared.comm.connect_port(&self.shared.remote_global_id(), &signal.shared.remote_global_id())
    }

    pub fn disconnect(&self) -> DaqResult<()> {
        self.shared.comm.disconnect_port(&self.shared.remote_global_id())
    }

    pub fn apply_connected(&self, signal_remote_global_id: impl Into<String>) {
        *self.connected_signal_remote_id.write() = Some(signal_remote_global_id.into());
    }

    pub fn apply_disconnected(&self) {
        *self.connected_signal_remote_id.write() = None;
    }

    pub fn connected_signal_remote_id(&self) -> Option<String> {
        self.connected_signal_remote_id.read().clone()
    }
}

impl Component for ConfigClientInputPort {
    fn base(&self) -> &ComponentBase {
        self.shared.base()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ConfigClientInputPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClientInputPort").field("global_id", &self.global_id()).finish()
    }
}

/// Client-side mirror of a remote function block: owns the same
/// `IP`/`Sig`/`FB` folder triple as [`crate::device::FunctionBlock`]
///, but every folder holds proxy types and `addFunctionBlock`
/// forwards to the server instead of a local module manager.
pub struct ConfigClientFunctionBlock {
    shared: Arc<ConfigClientComponent>,
    input_ports: OnceCell<Arc<Folder<ConfigClientInputPort>>>,
    signals: OnceCell<Arc<Folder<ConfigClientSignal>>>,
    function_blocks: OnceCell<Arc<Folder<ConfigClientFunctionBlock>>>,
}

impl ConfigClientFunctionBlock {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        comm: Arc<dyn ConfigProtocolClientComm>,
        remote_global_id: impl Into<String>,
    ) -> DaqResult<Arc<Self>> {
        let shared = ConfigClientComponent::new(local_id, parent, comm, remote_global_id, "FunctionBlock")?;
        let fb = Arc::new(Self {
            shared,
            input_ports: OnceCell::new(),
            signals: OnceCell::new(),
            function_blocks: OnceCell::new(),
        });
        let owner = fb.clone() as Arc<dyn Component>;
        fb.input_ports.set(Folder::new("IP", Some(&owner))?).expect("first set");
        fb.signals.set(Folder::new("Sig", Some(&owner))?).expect("first set");
        fb.function_blocks.set(Folder::new("FB", Some(&owner))?).expect("first set");
        Ok(fb)
    }

    pub fn shared(&self) -> &Arc<ConfigClientComponent> {
        &self.shared
    }

    pub fn input_ports(&self) -> &Arc<Folder<ConfigClientInputPort>> {
        self.input_ports.get().expect("filled in by ConfigClientFunctionBlock::new")
    }

    pub fn signals(&self) -> &Arc<Folder<ConfigClientSignal>> {
        self.signals.get().expect("filled in by ConfigClientFunctionBlock::new")
    }

    pub fn function_blocks(&self) -> &Arc<Folder<ConfigClientFunctionBlock>> {
        self.function_blocks.get().expect("filled in by ConfigClientFunctionBlock::new")
    }

    pub fn add_function_block(self: &Arc<Self>, type_id: &str, config: Option<&serde_json::Value>) -> DaqResult<Arc<ConfigClientFunctionBlock>> {
        let parent_remote_id = self.shared.remote_global_id();
        let local_id = self.shared.comm.add_function_block(&parent_remote_id, type_id, config)?;
        let child_remote_id = format!("{parent_remote_id}/{local_id}");
        let child_parent = self.function_blocks().clone() as Arc<dyn Component>;
        let child = ConfigClientFunctionBlock::new(&local_id, Some(&child_parent), self.shared.comm.clone(), child_remote_id)?;
        self.function_blocks().add_item(child.clone())?;
        Ok(child)
    }

    pub fn remove_function_block(&self, local_id: &str) -> DaqResult<()> {
        let child = self
            .function_blocks()
            .get_item(local_id)
            .ok_or_else(|| crate::error::not_found(format!("no function block with local id '{local_id}'")))?;
        self.shared.comm.remove_function_block(&self.shared.remote_global_id(), &child.shared.remote_global_id())?;
        self.function_blocks().remove_item_with_local_id(local_id)
    }
}

impl Component for ConfigClientFunctionBlock {
    fn base(&self) -> &ComponentBase {
        self.shared.base()
    }

    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            self.input_ports().clone() as Arc<dyn Component>,
            self.signals().clone() as Arc<dyn Component>,
            self.function_blocks().clone() as Arc<dyn Component>,
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ConfigClientFunctionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClientFunctionBlock").field("global_id", &self.global_id()).finish()
    }
}

/// A channel is, in this runtime slice, a function block with no
/// distinguishing proxy surface (mirrors the same simplification made
/// for [`crate::device::Device::get_channels`]).
pub type ConfigClientChannel = ConfigClientFunctionBlock;

/// Heterogeneous folder of opaque mirrored components, used for the
/// `IO`/`Srv` folders where a concretely-typed proxy isn't warranted.
pub type ConfigClientIoFolder = Folder<dyn Component>;

/// Client-side mirror of a remote device: the `Dev`/`IO`/`Srv`/`FB`/`Sig`
/// folder layout mirrors [`crate::device::Device`], but every
/// mutating call (`addDevice`, `addFunctionBlock`, `addServer`, ...)
/// forwards to the server through [`ConfigProtocolClientComm`] instead of
/// a local [`crate::device::ModuleManager`].
pub struct ConfigClientDevice {
    shared: Arc<ConfigClientComponent>,
    devices: OnceCell<Arc<Folder<ConfigClientDevice>>>,
    io_folder: OnceCell<Arc<ConfigClientIoFolder>>,
    servers: OnceCell<Arc<Folder<dyn Component>>>,
    function_blocks: OnceCell<Arc<Folder<ConfigClientFunctionBlock>>>,
    signals: OnceCell<Arc<Folder<ConfigClientSignal>>>,
}

impl ConfigClientDevice {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        comm: Arc<dyn ConfigProtocolClientComm>,
        remote_global_id: impl Into<String>,
    ) -> DaqResult<Arc<Self>> {
        let shared = ConfigClientComponent::new(local_id, parent, comm, remote_global_id, "Device")?;
        let device = Arc::new(Self {
            shared,
            devices: OnceCell::new(),
            io_folder: OnceCell::new(),
            servers: OnceCell::new(),
            function_blocks: OnceCell::new(),
            signals: OnceCell::new(),
        });
        let owner = device.clone() as Arc<dyn Component>;
        device.devices.set(Folder::new("Dev", Some(&owner))?).expect("first set");
        device.io_folder.set(Folder::new("IO", Some(&owner))?).expect("first set");
        device.servers.set(Folder::new("Srv", Some(&owner))?).expect("first set");
        device.function_blocks.set(Folder::new("FB", Some(&owner))?).expect("first set");
        device.signals.set(Folder::new("Sig", Some(&owner))?).expect("first set");
        Ok(device)
    }

    pub fn shared(&self) -> &Arc<ConfigClientComponent> {
        &self.shared
    }

    pub fn devices(&self) -> &Arc<Folder<ConfigClientDevice>> {
        self.devices.get().expect("filled in by ConfigClientDevice::new")
    }

    pub fn io_folder(&self) -> &Arc<ConfigClientIoFolder> {
        self.io_folder.get().expect("filled in by ConfigClientDevice::new")
    }

    pub fn servers(&self) -> &Arc<Folder<dyn Component>> {
        self.servers.get().expect("filled in by ConfigClientDevice::new")
    }

    pub fn function_blocks(&self) -> &Arc<Folder<ConfigClientFunctionBlock>> {
        self.function_blocks.get().expect("filled in by ConfigClientDevice::new")
    }

    pub fn signals(&self) -> &Arc<Folder<ConfigClientSignal>> {
        self.signals.get().expect("filled in by ConfigClientDevice::new")
    }

    pub fn add_device(self: &Arc<Self>, connection_string: &str, config: Option<&serde_json::Value>) -> DaqResult<Arc<ConfigClientDevice>> {
        let parent_remote_id = self.shared.remote_global_id();
        let local_id = self.shared.comm.add_device(&parent_remote_id, connection_string, config)?;
        let child_remote_id = format!("{parent_remote_id}/{local_id}");
        let child_parent = self.devices().clone() as Arc<dyn Component>;
        let child = ConfigClientDevice::new(&local_id, Some(&child_parent), self.shared.comm.clone(), child_remote_id)?;
        self.devices().add_item(child.clone())?;
        Ok(child)
    }

    pub fn remove_device(&self, local_id: &str) -> DaqResult<()> {
        let child = self
            .devices()
            .get_item(local_id)
            .ok_or_else(|| crate::error::not_found(format!("no device with local id '{local_id}'")))?;
        self.shared.comm.remove_device(&self.shared.remote_global_id(), &child.shared.remote_global_id())?;
        self.devices().remove_item_with_local_id(local_id)
    }

    pub fn add_function_block(self: &Arc<Self>, type_id: &str, config: Option<&serde_json::Value>) -> DaqResult<Arc<ConfigClientFunctionBlock>> {
        let parent_remote_id = self.shared.remote_global_id();
        let local_id = self.shared.comm.add_function_block(&parent_remote_id, type_id, config)?;
        let child_remote_id = format!("{parent_remote_id}/{local_id}");
        let child_parent = self.function_blocks().clone() as Arc<dyn Component>;
        let child = ConfigClientFunctionBlock::new(&local_id, Some(&child_parent), self.shared.comm.clone(), child_remote_id)?;
        self.function_blocks().add_item(child.clone())?;
        Ok(child)
    }

    pub fn remove_function_block(&self, local_id: &str) -> DaqResult<()> {
        let child = self
            .function_blocks()
            .get_item(local_id)
            .ok_or_else(|| crate::error::not_found(format!("no function block with local id '{local_id}'")))?;
        self.shared.comm.remove_function_block(&self.shared.remote_global_id(), &child.shared().remote_global_id())?;
        self.function_blocks().remove_item_with_local_id(local_id)
    }
}

impl Component for ConfigClientDevice {
    fn base(&self) -> &ComponentBase {
        self.shared.base()
    }

    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            self.devices().clone() as Arc<dyn Component>,
            self.io_folder().clone() as Arc<dyn Component>,
            self.servers().clone() as Arc<dyn Component>,
            self.function_blocks().clone() as Arc<dyn Component>,
            self.signals().clone() as Arc<dyn Component>,
        ]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for ConfigClientDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigClientDevice").field("global_id", &self.global_id()).finish()
    }
}
