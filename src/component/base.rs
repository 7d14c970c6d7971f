//! Component base: the named node every device, function block,
//! signal, input port and folder is built from.
//!
//! Capabilities compose through a shared `ComponentBase` struct embedded
//! by value in every concrete component
//! type, plus an object-safe `Component` trait whose default methods
//! delegate to that embedded base. A concrete type only has to supply
//! `base()`, and override `child_components()`/`on_remove()` where it
//! actually owns children or needs bespoke teardown; everything else - the
//! attribute getters/setters, tag and status access, locking, core-event
//! triggering, tree search - comes for free from the trait's defaults.

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::component::permission::PermissionManager;
use crate::component::status::StatusContainer;
use crate::component::tags::TagSet;
use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::event::{CoreEventArgs, CoreEventBus, CoreEventId, RootEventBus};

/// The four universally recognized attributes. `Visible` starts
/// locked; the others start unlocked.
pub const ATTR_NAME: &str = "Name";
pub const ATTR_DESCRIPTION: &str = "Description";
pub const ATTR_VISIBLE: &str = "Visible";
pub const ATTR_ACTIVE: &str = "Active";

/// Normalizes an attribute name to the stored, first-letter-uppercase form:
/// lookups are case-insensitive on input but the name is always stored with
/// the first letter uppercase.
pub fn normalize_attribute_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

struct MutableState {
    name: String,
    description: String,
    visible: bool,
    active: bool,
    locked_attributes: HashSet<String>,
}

/// Shared state embedded in every concrete component type.
pub struct ComponentBase {
    local_id: String,
    global_id: String,
    parent: RwLock<Option<Weak<dyn Component>>>,
    state: RwLock<MutableState>,
    tags: RwLock<TagSet>,
    status: Arc<StatusContainer>,
    permission: Arc<PermissionManager>,
    event_bus: CoreEventBus,
    frozen: AtomicBool,
    removed: AtomicBool,
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("global_id", &self.global_id)
            .finish()
    }
}

impl ComponentBase {
    /// Constructs a base. `local_id` must not contain `/` or whitespace
    ///; `parent` supplies the global-ID prefix and inherited
    /// permissions.
    pub fn new(local_id: impl Into<String>, parent: Option<&Arc<dyn Component>>) -> DaqResult<Self> {
        let local_id = local_id.into();
        if local_id.is_empty() {
            return Err(DaqError::new(ErrorKind::InvalidParameter, "local id must not be empty"));
        }
        if local_id.contains('/') || local_id.chars().any(char::is_whitespace) {
            return Err(DaqError::new(
                ErrorKind::InvalidParameter,
                format!("local id '{local_id}' must not contain '/' or whitespace"),
            ));
        }

        let global_id = match parent {
            Some(p) => format!("{}/{}", p.global_id(), local_id),
            None => format!("/{local_id}"),
        };

        let mut locked = HashSet::new();
        locked.insert(ATTR_VISIBLE.to_string());

        let permission = Arc::new(PermissionManager::inherit(parent.map(|p| p.base().permission())));

        let base = Self {
            local_id,
            global_id,
            parent: RwLock::new(parent.map(|p| Arc::downgrade(p))),
            state: RwLock::new(MutableState {
                name: String::new(),
                description: String::new(),
                visible: true,
                active: true,
                locked_attributes: locked,
            }),
            tags: RwLock::new(TagSet::new()),
            status: StatusContainer::new(),
            permission,
            event_bus: CoreEventBus::new(),
            frozen: AtomicBool::new(false),
            removed: AtomicBool::new(false),
        };
        // Name defaults to the local ID so an unconfigured component still
        // displays its path segment.
        base.state.write().name = base.local_id.clone();
        Ok(base)
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn global_id(&self) -> &str {
        &self.global_id
    }

    pub fn parent(&self) -> Option<Arc<dyn Component>> {
        self.parent.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn permission(&self) -> &Arc<PermissionManager> {
        &self.permission
    }

    pub fn event_bus(&self) -> &CoreEventBus {
        &self.event_bus
    }

    pub fn attach_root_bus(&self, root: &Arc<RootEventBus>) {
        self.event_bus.attach_root(root);
    }

    pub fn status_container(&self) -> &Arc<StatusContainer> {
        &self.status
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    fn check_mutable(&self) -> DaqResult<()> {
        if self.is_frozen() {
            return Err(DaqError::new(ErrorKind::Frozen, format!("component '{}' is frozen", self.global_id)));
        }
        if self.is_removed() {
            return Err(DaqError::new(
                ErrorKind::ComponentRemoved,
                format!("component '{}' has been removed", self.global_id),
            ));
        }
        Ok(())
    }

    fn is_locked(&self, attribute: &str) -> bool {
        let normalized = normalize_attribute_name(attribute);
        self.state.read().locked_attributes.contains(&normalized)
    }

    pub fn locked_attributes(&self) -> Vec<String> {
        let mut v: Vec<String> = self.state.read().locked_attributes.iter().cloned().collect();
        v.sort();
        v
    }

    pub fn lock_attributes(&self, names: &[&str]) {
        let mut state = self.state.write();
        for name in names {
            state.locked_attributes.insert(normalize_attribute_name(name));
        }
    }

    pub fn lock_all_attributes(&self) {
        self.lock_attributes(&[ATTR_NAME, ATTR_DESCRIPTION, ATTR_VISIBLE, ATTR_ACTIVE]);
    }

    pub fn unlock_attributes(&self, names: &[&str]) {
        let mut state = self.state.write();
        for name in names {
            state.locked_attributes.remove(&normalize_attribute_name(name));
        }
    }

    pub fn unlock_all_attributes(&self) {
        self.state.write().locked_attributes.clear();
    }

    pub fn name(&self) -> String {
        self.state.read().name.clone()
    }

    pub fn description(&self) -> String {
        self.state.read().description.clone()
    }

    pub fn visible(&self) -> bool {
        self.state.read().visible
    }

    pub fn active(&self) -> bool {
        self.state.read().active
    }

    pub fn tags(&self) -> TagSet {
        self.tags.read().clone()
    }

    /// Shared attribute write path used by the `Component` trait's default
    /// setters: checks frozen/removed, honors the locked-attribute set
    /// (returning the `Ignored` success variant rather than failing), and
    /// elides no-op writes. Returns `Ok(Some(old_value_as_json))` when a
    /// change actually happened so the caller can fire `AttributeChanged`.
    fn write_attribute<T: Clone + PartialEq>(
        &self,
        attribute: &str,
        current: impl Fn(&MutableState) -> &T,
        assign: impl FnOnce(&mut MutableState, T),
        new_value: T,
    ) -> DaqResult<bool> {
        self.check_mutable()?;
        if self.is_locked(attribute) {
            tracing::info!(target: "opendaq.component", global_id = %self.global_id, attribute, "attribute write ignored: locked");
            return Err(DaqError::new(
                ErrorKind::Ignored,
                format!("attribute '{attribute}' is locked"),
            ));
        }
        let mut state = self.state.write();
        if *current(&state) == new_value {
            return Ok(false);
        }
        assign(&mut state, new_value);
        Ok(true)
    }

    pub fn set_name(&self, value: &str) -> DaqResult<bool> {
        self.write_attribute(
            ATTR_NAME,
            |s| &s.name,
            |s, v| s.name = v,
            value.to_string(),
        )
    }

    pub fn set_description(&self, value: &str) -> DaqResult<bool> {
        self.write_attribute(
            ATTR_DESCRIPTION,
            |s| &s.description,
            |s, v| s.description = v,
            value.to_string(),
        )
    }

    pub fn set_visible(&self, value: bool) -> DaqResult<bool> {
        self.write_attribute(ATTR_VISIBLE, |s| &s.visible, |s, v| s.visible = v, value)
    }

    /// `active = false` is sticky in the sense that removal forces it and
    /// it can never be reactivated after removal; this method itself only
    /// implements the plain, non-removed write + no-op detection. The
    /// "sticky after remove" half of the invariant lives in
    /// [`Component::remove`].
    pub fn set_active(&self, value: bool) -> DaqResult<bool> {
        if self.is_removed() && value {
            return Err(DaqError::new(
                ErrorKind::InvalidState,
                "a removed component cannot be reactivated",
            ));
        }
        self.write_attribute(ATTR_ACTIVE, |s| &s.active, |s, v| s.active = v, value)
    }

    pub fn add_tag(&self, tag: impl Into<String>) -> bool {
        self.tags.write().add(tag)
    }

    pub fn remove_tag(&self, tag: &str) -> bool {
        self.tags.write().remove(tag)
    }

    fn mark_removed(&self) {
        self.removed.store(true, Ordering::Release);
        self.state.write().active = false;
    }
}

/// Object-safe capability every node in the component tree implements.
/// See the module docs for why the default methods are enough for most
/// concrete types.
pub trait Component: Send + Sync + fmt::Debug {
    /// Accessor for the embedded [`ComponentBase`]; the one method every
    /// implementor must hand-write.
    fn base(&self) -> &ComponentBase;

    /// Direct children subject to transitive `remove()` and to
    /// `find_component` path resolution. Leaf components (signals, input
    /// ports) keep the default empty list.
    fn child_components(&self) -> Vec<Arc<dyn Component>> {
        Vec::new()
    }

    /// Hook for component-specific teardown invoked once, before children
    /// are recursed into, when this component is removed (e.g. a signal
    /// clearing its connections).
    fn on_remove(&self) {}

    fn as_any(&self) -> &dyn Any;

    fn local_id(&self) -> &str {
        self.base().local_id()
    }

    fn global_id(&self) -> &str {
        self.base().global_id()
    }

    fn parent(&self) -> Option<Arc<dyn Component>> {
        self.base().parent()
    }

    fn name(&self) -> String {
        self.base().name()
    }

    fn description(&self) -> String {
        self.base().description()
    }

    fn visible(&self) -> bool {
        self.base().visible()
    }

    fn active(&self) -> bool {
        self.base().active()
    }

    fn tags(&self) -> TagSet {
        self.base().tags()
    }

    fn status_container(&self) -> Arc<StatusContainer> {
        self.base().status_container().clone()
    }

    fn locked_attributes(&self) -> Vec<String> {
        self.base().locked_attributes()
    }

    fn lock_attributes(&self, names: &[&str]) {
        self.base().lock_attributes(names)
    }

    fn lock_all_attributes(&self) {
        self.base().lock_all_attributes()
    }

    fn unlock_attributes(&self, names: &[&str]) {
        self.base().unlock_attributes(names)
    }

    fn unlock_all_attributes(&self) {
        self.base().unlock_all_attributes()
    }

    fn is_removed(&self) -> bool {
        self.base().is_removed()
    }

    /// Fires a core event through this component's emitter and the
    /// process-wide root bus. Errors from subscribers never reach
    /// the caller - see [`CoreEventBus::trigger`].
    fn trigger_core_event(self: &Arc<Self>, args: CoreEventArgs)
    where
        Self: Sized + 'static,
    {
        let owner: Arc<dyn Component> = self.clone();
        self.base().event_bus.trigger(&owner, &args);
    }

    fn enable_core_event_trigger(&self) {
        self.base().event_bus.set_enabled(true);
        for child in self.child_components() {
            child.enable_core_event_trigger();
        }
    }

    fn disable_core_event_trigger(&self) {
        self.base().event_bus.set_enabled(false);
        for child in self.child_components() {
            child.disable_core_event_trigger();
        }
    }

    /// Resolves a `/`-separated path of local IDs against `child_components`,
    /// one segment at a time.
    fn find_component(&self, path: &str) -> Option<Arc<dyn Component>> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut current = self
            .child_components()
            .into_iter()
            .find(|c| c.local_id() == first)?;
        for segment in segments {
            current = current
                .child_components()
                .into_iter()
                .find(|c| c.local_id() == segment)?;
        }
        Some(current)
    }

    /// Transitively removes this component and all of its children: every
    /// descendant's `remove()` is invoked in turn. Calling `remove()` on an
    /// already-removed component is a no-op.
    fn remove(&self) {
        if self.base().is_removed() {
            return;
        }
        self.on_remove();
        self.base().mark_removed();
        for child in self.child_components() {
            child.remove();
        }
    }
}

/// Sets or clears the `active` attribute and fires `AttributeChanged`
/// exactly once when the value actually changes, then propagates the same
/// value to every child. Writing the current
/// value is a no-op (`Ignored`) and touches no children.
pub fn set_active(component: &Arc<dyn Component>, value: bool) -> DaqResult<()> {
    match component.base().set_active(value) {
        Ok(true) => {
            let args = CoreEventArgs::new(CoreEventId::AttributeChanged)
                .with_param("AttributeName", ATTR_ACTIVE)
                .with_param("Active", value);
            component.base().event_bus.trigger(component, &args);
            for child in component.child_components() {
                let _ = set_active(&child, value);
            }
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Ignored => Ok(()),
        Err(e) => Err(e),
    }
}

/// Sets `name`/`description`/`visible` and fires `AttributeChanged` exactly
/// once on a real change. Unlike `active`, these attributes do not
/// propagate to children.
pub fn set_attribute_str(
    component: &Arc<dyn Component>,
    attribute: &'static str,
    value: &str,
) -> DaqResult<()> {
    let changed = match attribute {
        ATTR_NAME => component.base().set_name(value),
        ATTR_DESCRIPTION => component.base().set_description(value),
        _ => {
            return Err(DaqError::new(
                ErrorKind::InvalidParameter,
                format!("'{attribute}' is not a string attribute"),
            ))
        }
    };
    match changed {
        Ok(true) => {
            let args = CoreEventArgs::new(CoreEventId::AttributeChanged)
                .with_param("AttributeName", attribute)
                .with_param(attribute, value.to_string());
            component.base().event_bus.trigger(component, &args);
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Ignored => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn set_visible(component: &Arc<dyn Component>, value: bool) -> DaqResult<()> {
    match component.base().set_visible(value) {
        Ok(true) => {
            let args = CoreEventArgs::new(CoreEventId::AttributeChanged)
                .with_param("AttributeName", ATTR_VISIBLE)
                .with_param("Visible", value);
            component.base().event_bus.trigger(component, &args);
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Ignored => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any as StdAny;

    #[derive(Debug)]
    struct Leaf {
        base: ComponentBase,
    }

    impl Component for Leaf {
        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn as_any(&self) -> &dyn StdAny {
            self
        }
    }

    fn leaf(local_id: &str, parent: Option<&Arc<dyn Component>>) -> Arc<dyn Component> {
        Arc::new(Leaf {
            base: ComponentBase::new(local_id, parent).unwrap(),
        })
    }

    #[test]
    fn global_id_concatenates_parent_chain() {
        let root = leaf("dev", None);
        let child = leaf("sig", Some(&root));
        assert_eq!(root.global_id(), "/dev");
        assert_eq!(child.global_id(), "/dev/sig");
    }

    #[test]
    fn local_id_rejects_slash_and_whitespace() {
        assert!(ComponentBase::new("a/b", None).is_err());
        assert!(ComponentBase::new("a b", None).is_err());
        assert!(ComponentBase::new("ab", None).is_ok());
    }

    #[test]
    fn visible_starts_locked() {
        let c = leaf("c", None);
        assert!(c.locked_attributes().contains(&"Visible".to_string()));
        let err = c.base().set_visible(false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ignored);
    }

    #[test]
    fn setting_active_twice_fires_exactly_one_attribute_changed() {
        let c = leaf("c", None);
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count2 = count.clone();
        c.base().event_bus.subscribe(Arc::new(move |_owner, args| {
            if args.id() == CoreEventId::AttributeChanged {
                count2.fetch_add(1, Ordering::SeqCst);
            }
        }));
        set_active(&c, false).unwrap();
        set_active(&c, false).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_is_transitive_and_sticky() {
        let root = leaf("dev", None);
        let child = leaf("sig", Some(&root));
        root.remove();
        assert!(root.is_removed());
        assert!(!child.is_removed(), "default child_components() is empty; remove() only recurses declared children");
        assert!(set_active(&root, true).is_err());
    }

    #[test]
    fn frozen_component_rejects_mutation() {
        let c = leaf("c", None);
        c.base().freeze();
        let err = set_attribute_str(&c, ATTR_NAME, "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Frozen);
    }
}
