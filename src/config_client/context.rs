//! Component deserialize context: the state threaded through a
//! config-protocol client's deserialization of a remote component tree.
//! Each deserialized node is handed a context carrying (a) the RPC
//! communicator, (b) its local parent, (c) the interface/class it is
//! expected to materialize as. A parent context is cloned, with the
//! parent and expected-kind fields swapped in, to produce each child's
//! context as deserialization recurses down the tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::component::Component;
use crate::config_client::comm::ConfigProtocolClientComm;

/// Expected component kind a serialized node should materialize into,
/// matching the `className` a remote factory call dispatches on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpectedComponentKind {
    Device,
    Folder,
    IoFolder,
    Signal,
    InputPort,
    FunctionBlock,
    Channel,
}

pub struct ComponentDeserializeContext {
    comm: Arc<dyn ConfigProtocolClientComm>,
    local_parent: Option<Arc<dyn Component>>,
    expected_kind: ExpectedComponentKind,
    complete: AtomicBool,
}

impl ComponentDeserializeContext {
    pub fn new(
        comm: Arc<dyn ConfigProtocolClientComm>,
        local_parent: Option<Arc<dyn Component>>,
        expected_kind: ExpectedComponentKind,
    ) -> Self {
        Self {
            comm,
            local_parent,
            expected_kind,
            complete: AtomicBool::new(false),
        }
    }

    pub fn comm(&self) -> &Arc<dyn ConfigProtocolClientComm> {
        &self.comm
    }

    pub fn local_parent(&self) -> Option<&Arc<dyn Component>> {
        self.local_parent.as_ref()
    }

    pub fn expected_kind(&self) -> ExpectedComponentKind {
        self.expected_kind
    }

    /// Produces the context a child deserialization step receives,
    /// carrying the same communicator with a new local parent and
    /// expected kind - mirrors `IComponentDeserializeContext::clone`.
    pub fn clone_for_child(&self, local_parent: Arc<dyn Component>, expected_kind: ExpectedComponentKind) -> Self {
        Self::new(self.comm.clone(), Some(local_parent), expected_kind)
    }

    /// Marks this node's deserialization complete. Idempotent.
    pub fn complete(&self) {
        self.complete.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
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

    struct FakeComm;
    impl ConfigProtocolClientComm for FakeComm {
        fn get_property_value(&self, _: &str, _: &str) -> crate::error::DaqResult<crate::property::PropertyValue> {
            unimplemented!()
        }
        fn set_property_value(&self, _: &str, _: &str, _: crate::property::PropertyValue) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn set_protected_property_value(&self, _: &str, _: &str, _: crate::property::PropertyValue) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn clear_property_value(&self, _: &str, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn begin_update(&self, _: &str, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn end_update(&self, _: &str, _: &str, _: Option<&serde_json::Value>) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn update(&self, _: &str, _: &serde_json::Value, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn set_attribute_value(&self, _: &str, _: &str, _: serde_json::Value) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn call_function(&self, _: &str, _: &str, _: &serde_json::Value) -> crate::error::DaqResult<serde_json::Value> {
            unimplemented!()
        }
        fn connect_port(&self, _: &str, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn disconnect_port(&self, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn add_function_block(&self, _: &str, _: &str, _: Option<&serde_json::Value>) -> crate::error::DaqResult<String> {
            unimplemented!()
        }
        fn remove_function_block(&self, _: &str, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
        fn add_device(&self, _: &str, _: &str, _: Option<&serde_json::Value>) -> crate::error::DaqResult<String> {
            unimplemented!()
        }
        fn remove_device(&self, _: &str, _: &str) -> crate::error::DaqResult<()> {
            unimplemented!()
        }
    }

    #[test]
    fn clone_for_child_keeps_comm_and_swaps_parent_and_kind() {
        let root: Arc<dyn Component> = Arc::new(Leaf { base: ComponentBase::new("root", None).unwrap() });
        let ctx = ComponentDeserializeContext::new(Arc::new(FakeComm), Some(root.clone()), ExpectedComponentKind::Device);

        let child_parent: Arc<dyn Component> = Arc::new(Leaf { base: ComponentBase::new("fb", Some(&root)).unwrap() });
        let child_ctx = ctx.clone_for_child(child_parent.clone(), ExpectedComponentKind::FunctionBlock);

        assert_eq!(child_ctx.expected_kind(), ExpectedComponentKind::FunctionBlock);
        assert!(Arc::ptr_eq(child_ctx.local_parent().unwrap(), &child_parent));
        assert!(!child_ctx.is_complete());
        child_ctx.complete();
        assert!(child_ctx.is_complete());
    }
}
