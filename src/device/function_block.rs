//! Function block: a signal container typed by an immutable
//! `FunctionBlockType`, exposing its input ports, signals and (for
//! composite blocks) nested function blocks, with an optional status
//! signal. A device is a function block plus device-only operations,
//! so the folder layout here is shared with [`super::device::Device`].

use std::any::Any;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::component::{Component, ComponentBase};
use crate::error::DaqResult;
use crate::folder::Folder;
use crate::property::PropertyObject;
use crate::signal::{InputPort, Signal};

/// Immutable identity of a function block kind (id/name/description),
/// analogous to openDAQ's `FunctionBlockTypeImpl`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionBlockType {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl FunctionBlockType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), description: description.into() }
    }
}

/// A function block: input ports, owned signals, and optionally nested
/// function blocks. `config` holds the block's property object,
/// if any was supplied at creation.
///
/// The child folders need the block's own `Arc<dyn Component>` as their
/// parent so their global IDs are prefixed correctly, but that `Arc`
/// doesn't exist until construction finishes. `new` builds the base
/// first, wraps it, then fills the folders in through a `OnceCell` -
/// each is set exactly once, so every getter after `new` returns can
/// unwrap unconditionally.
pub struct FunctionBlock {
    base: ComponentBase,
    fb_type: FunctionBlockType,
    input_ports: OnceCell<Arc<Folder<InputPort>>>,
    signals: OnceCell<Arc<Folder<Signal>>>,
    function_blocks: OnceCell<Arc<Folder<FunctionBlock>>>,
    config: Option<Arc<PropertyObject>>,
    status_signal: OnceCell<Arc<Signal>>,
}

impl FunctionBlock {
    pub fn new(
        local_id: &str,
        parent: Option<&Arc<dyn Component>>,
        fb_type: FunctionBlockType,
        config: Option<Arc<PropertyObject>>,
    ) -> DaqResult<Arc<Self>> {
        let base = ComponentBase::new(local_id, parent)?;
        let fb = Arc::new(Self {
            base,
            fb_type,
            input_ports: OnceCell::new(),
            signals: OnceCell::new(),
            function_blocks: OnceCell::new(),
            config,
            status_signal: OnceCell::new(),
        });

        let self_as_component = fb.clone() as Arc<dyn Component>;
        let _ = fb.input_ports.set(Folder::new("IP", Some(&self_as_component))?);
        let _ = fb.signals.set(Folder::new("Sig", Some(&self_as_component))?);
        let _ = fb.function_blocks.set(Folder::new("FB", Some(&self_as_component))?);
        Ok(fb)
    }

    pub fn function_block_type(&self) -> &FunctionBlockType {
        &self.fb_type
    }

    pub fn input_ports(&self) -> &Arc<Folder<InputPort>> {
        self.input_ports.get().expect("filled in by FunctionBlock::new")
    }

    pub fn signals(&self) -> &Arc<Folder<Signal>> {
        self.signals.get().expect("filled in by FunctionBlock::new")
    }

    pub fn function_blocks(&self) -> &Arc<Folder<FunctionBlock>> {
        self.function_blocks.get().expect("filled in by FunctionBlock::new")
    }

    pub fn config(&self) -> Option<&Arc<PropertyObject>> {
        self.config.as_ref()
    }

    /// A status signal reporting the block's own health, if it has one.
    pub fn status_signal(&self) -> Option<&Arc<Signal>> {
        self.status_signal.get()
    }

    pub fn set_status_signal(&self, signal: Arc<Signal>) -> DaqResult<()> {
        self.status_signal
            .set(signal)
            .map_err(|_| crate::error::invalid_state("status signal is already set"))
    }

    pub fn add_input_port(&self, port: Arc<InputPort>) -> DaqResult<()> {
        self.input_ports().add_item(port)
    }

    pub fn add_signal(&self, signal: Arc<Signal>) -> DaqResult<()> {
        self.signals().add_item(signal)
    }

    pub fn add_function_block(&self, child: Arc<FunctionBlock>) -> DaqResult<()> {
        self.function_blocks().add_item(child)
    }

    pub fn remove_function_block(&self, local_id: &str) -> DaqResult<()> {
        self.function_blocks().remove_item_with_local_id(local_id)
    }
}

impl Component for FunctionBlock {
    fn base(&self) -> &ComponentBase {
        &self.base
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            self.input_ports().clone() as Arc<dyn Component>,
            self.signals().clone() as Arc<dyn Component>,
            self.function_blocks().clone() as Arc<dyn Component>,
        ]
    }
}

impl std::fmt::Debug for FunctionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBlock").field("local_id", &self.local_id()).field("type", &self.fb_type.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_function_blocks_are_reachable_through_the_folder() {
        let fb_type = FunctionBlockType::new("ref_fb_module/renderer", "Renderer", "Signal renderer");
        let fb = FunctionBlock::new("fb0", None, fb_type, None).unwrap();

        // A nested function block's parent is the owning "FB" folder, not
        // the device itself.
        let fb_folder_as_component = fb.function_blocks().clone() as Arc<dyn Component>;
        let child_type = FunctionBlockType::new("ref_fb_module/classifier", "Classifier", "");
        let child = FunctionBlock::new("fb1", Some(&fb_folder_as_component), child_type, None).unwrap();
        fb.add_function_block(child.clone()).unwrap();

        assert_eq!(fb.function_blocks().len(), 1);
        assert!(fb.function_blocks().has_item("fb1"));
        assert_eq!(child.global_id(), "/fb0/FB/fb1");
    }

    #[test]
    fn removing_unknown_function_block_fails() {
        let fb_type = FunctionBlockType::new("ref_fb_module/renderer", "Renderer", "");
        let fb = FunctionBlock::new("fb0", None, fb_type, None).unwrap();
        assert!(fb.remove_function_block("missing").is_err());
    }
}
