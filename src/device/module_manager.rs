//! Module-manager contract: the external collaborator a device asks to
//! resolve a connection string or type ID into a live child. The core
//! depends only on the trait — discovery mechanisms (mDNS, OPC-UA,
//! native transports) are out of scope.

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::Component;
use crate::error::{not_supported, DaqResult};
use crate::property::PropertyObject;

/// Minimal type descriptor a module advertises for a device/function-block/
/// server kind it knows how to create.
#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// An external collaborator that can enumerate and create devices,
/// function blocks and servers. A real module wraps a plugin or
/// built-in driver; the core never reaches past this trait.
pub trait Module: Send + Sync {
    fn name(&self) -> &str;

    fn available_device_types(&self) -> HashMap<String, TypeInfo> {
        HashMap::new()
    }

    fn available_function_block_types(&self) -> HashMap<String, TypeInfo> {
        HashMap::new()
    }

    fn available_server_types(&self) -> HashMap<String, TypeInfo> {
        HashMap::new()
    }

    fn create_device(
        &self,
        _connection_string: &str,
        _parent: &Arc<dyn Component>,
        _config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        Err(not_supported("module does not create devices"))
    }

    fn create_function_block(
        &self,
        _type_id: &str,
        _parent: &Arc<dyn Component>,
        _config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        Err(not_supported("module does not create function blocks"))
    }

    fn create_server(
        &self,
        _type_id: &str,
        _parent: &Arc<dyn Component>,
        _config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        Err(not_supported("module does not create servers"))
    }
}

/// Fans discovery and creation requests out to every registered [`Module`].
/// Module errors are logged as warnings and the device does not retry.
#[derive(Default)]
pub struct ModuleManager {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    pub fn available_device_types(&self) -> HashMap<String, TypeInfo> {
        let mut all = HashMap::new();
        for module in &self.modules {
            all.extend(module.available_device_types());
        }
        all
    }

    pub fn available_function_block_types(&self) -> HashMap<String, TypeInfo> {
        let mut all = HashMap::new();
        for module in &self.modules {
            all.extend(module.available_function_block_types());
        }
        all
    }

    pub fn available_server_types(&self) -> HashMap<String, TypeInfo> {
        let mut all = HashMap::new();
        for module in &self.modules {
            all.extend(module.available_server_types());
        }
        all
    }

    /// Tries every registered module in order until one creates the
    /// device, logging each failure at warn before trying the next. It
    /// does not retry the *same* module, but trying the next registered
    /// module is how multi-module fan-out resolves a connection string
    /// at all.
    pub fn create_device(
        &self,
        connection_string: &str,
        parent: &Arc<dyn Component>,
        config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        for module in &self.modules {
            match module.create_device(connection_string, parent, config) {
                Ok(device) => return Ok(device),
                Err(err) => {
                    tracing::warn!(target: "opendaq.module_manager", module = module.name(), error = %err, "module failed to create device");
                }
            }
        }
        Err(crate::error::not_found(format!("no module could create a device for '{connection_string}'")))
    }

    pub fn create_function_block(
        &self,
        type_id: &str,
        parent: &Arc<dyn Component>,
        config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        for module in &self.modules {
            match module.create_function_block(type_id, parent, config) {
                Ok(fb) => return Ok(fb),
                Err(err) => {
                    tracing::warn!(target: "opendaq.module_manager", module = module.name(), error = %err, "module failed to create function block");
                }
            }
        }
        Err(crate::error::not_found(format!("no module could create function block type '{type_id}'")))
    }

    pub fn create_server(
        &self,
        type_id: &str,
        parent: &Arc<dyn Component>,
        config: Option<&Arc<PropertyObject>>,
    ) -> DaqResult<Arc<dyn Component>> {
        for module in &self.modules {
            match module.create_server(type_id, parent, config) {
                Ok(server) => return Ok(server),
                Err(err) => {
                    tracing::warn!(target: "opendaq.module_manager", module = module.name(), error = %err, "module failed to create server");
                }
            }
        }
        Err(crate::error::not_found(format!("no module could create server type '{type_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentBase;
    use std::any::Any;

    struct NoopModule;
    impl Module for NoopModule {
        fn name(&self) -> &str {
            "noop"
        }
    }

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
    fn create_device_fails_with_not_found_when_no_module_accepts() {
        let mut manager = ModuleManager::new();
        manager.register(Arc::new(NoopModule));
        let root: Arc<dyn Component> = Arc::new(Leaf { base: ComponentBase::new("root", None).unwrap() });
        let err = manager.create_device("daq.nd://localhost", &root, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
