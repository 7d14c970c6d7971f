//! The core-event bus.
//!
//! A core event is a typed notification carrying a numeric ID, a stable
//! name and a parameter dictionary. Every [`crate::component::Component`]
//! owns an emitter; subscribers run inline on the firing thread, and any
//! exception a subscriber raises is caught, logged and swallowed - event
//! delivery never propagates a subscriber failure back to the component
//! that fired the event.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;

use crate::component::Component;

/// The closed set of core event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CoreEventId {
    PropertyValueChanged,
    PropertyObjectUpdateEnd,
    PropertyAdded,
    PropertyRemoved,
    ComponentAdded,
    ComponentRemoved,
    SignalConnected,
    SignalDisconnected,
    DataDescriptorChanged,
    ComponentUpdateEnd,
    AttributeChanged,
    TagsChanged,
    StatusChanged,
    TypeAdded,
    TypeRemoved,
    DeviceDomainChanged,
}

impl CoreEventId {
    /// Stable string name, as carried over the wire and used as the JSON
    /// event-packet ID for `DataDescriptorChanged`.
    pub fn name(self) -> &'static str {
        match self {
            CoreEventId::PropertyValueChanged => "PropertyValueChanged",
            CoreEventId::PropertyObjectUpdateEnd => "PropertyObjectUpdateEnd",
            CoreEventId::PropertyAdded => "PropertyAdded",
            CoreEventId::PropertyRemoved => "PropertyRemoved",
            CoreEventId::ComponentAdded => "ComponentAdded",
            CoreEventId::ComponentRemoved => "ComponentRemoved",
            CoreEventId::SignalConnected => "SignalConnected",
            CoreEventId::SignalDisconnected => "SignalDisconnected",
            CoreEventId::DataDescriptorChanged => "DataDescriptorChanged",
            CoreEventId::ComponentUpdateEnd => "ComponentUpdateEnd",
            CoreEventId::AttributeChanged => "AttributeChanged",
            CoreEventId::TagsChanged => "TagsChanged",
            CoreEventId::StatusChanged => "StatusChanged",
            CoreEventId::TypeAdded => "TypeAdded",
            CoreEventId::TypeRemoved => "TypeRemoved",
            CoreEventId::DeviceDomainChanged => "DeviceDomainChanged",
        }
    }

    /// Numeric ID, stable across a process's lifetime (and across the
    /// wire, for the packet-streaming event encoding).
    pub fn numeric(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for CoreEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters attached to a fired core event. `Owner` and `Path` are
/// conventional keys: `Owner` points at the firing object when it
/// differs from the dispatching component, `Path` carries the dotted
/// property path for events that originate inside a nested property
/// object.
#[derive(Clone, Debug, Default)]
pub struct CoreEventArgs {
    id: CoreEventId,
    params: HashMap<String, Value>,
}

impl Default for CoreEventId {
    fn default() -> Self {
        CoreEventId::ComponentUpdateEnd
    }
}

impl CoreEventArgs {
    pub fn new(id: CoreEventId) -> Self {
        Self {
            id,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_owner_path(self, path: impl Into<String>) -> Self {
        self.with_param("Path", path.into())
    }

    pub fn id(&self) -> CoreEventId {
        self.id
    }

    pub fn params(&self) -> &HashMap<String, Value> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Encodes the event for the `event` packet-streaming payload:
    /// `{"id": <name>, "parameters": {...}}`, matching the JSON schema the
    /// wire format expects for an event packet's serialized form.
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "id": self.id.name(),
            "parameters": self.params,
        })
    }
}

type Subscriber = dyn Fn(&Arc<dyn Component>, &CoreEventArgs) + Send + Sync;

/// Per-component event emitter plus the root-scoped subscriber fan-out.
/// `enable_core_event_trigger`/`disable_core_event_trigger` toggle
/// whether this component's `trigger` calls actually reach subscribers;
/// disabling is meant to be pushed recursively to children by the caller
/// (the component tree, not the bus itself, owns that recursion since only
/// it knows its children).
pub struct CoreEventBus {
    enabled: AtomicBool,
    local_subscribers: RwLock<Vec<Arc<Subscriber>>>,
    root: RwLock<Option<Weak<RootEventBus>>>,
}

impl fmt::Debug for CoreEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreEventBus")
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for CoreEventBus {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(true),
            local_subscribers: RwLock::new(Vec::new()),
            root: RwLock::new(None),
        }
    }
}

impl CoreEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches the process-wide root bus that ultimately sees every event,
    /// regardless of which component in the tree fired it.
    pub fn attach_root(&self, root: &Arc<RootEventBus>) {
        *self.root.write() = Some(Arc::downgrade(root));
    }

    pub fn subscribe(&self, listener: Arc<Subscriber>) {
        self.local_subscribers.write().push(listener);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Returns the previous state, so callers implementing the recursive
    /// disable/enable-with-restore dance can remember what to put
    /// back.
    pub fn set_enabled(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::AcqRel)
    }

    /// Fires `args` on behalf of `owner`. Subscriber panics are caught so a
    /// faulty listener can never take down the firing thread or the rest
    /// of the dispatch chain - note this only catches panics, not
    /// arbitrary `Result` errors, since listeners here are infallible by
    /// contract; a listener that needs to report failure should log it
    /// itself before returning.
    pub fn trigger(&self, owner: &Arc<dyn Component>, args: &CoreEventArgs) {
        if !self.is_enabled() {
            return;
        }
        for subscriber in self.local_subscribers.read().iter() {
            let subscriber = Arc::clone(subscriber);
            let owner = Arc::clone(owner);
            let args = args.clone();
            if let Err(payload) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || subscriber(&owner, &args)))
            {
                let reason = panic_message(&payload);
                tracing::error!(target: "opendaq.core_event", error = %reason, "core event subscriber panicked");
            }
        }
        if let Some(root) = self.root.read().as_ref().and_then(Weak::upgrade) {
            root.trigger(owner, args);
        }
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Root-scoped subscriber bus: every component's `trigger_core_event`
/// invokes the root-context subscribers here in addition to its own local
/// subscribers.
#[derive(Default)]
pub struct RootEventBus {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
}

impl RootEventBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(&self, listener: Arc<Subscriber>) {
        self.subscribers.write().push(listener);
    }

    pub fn trigger(&self, owner: &Arc<dyn Component>, args: &CoreEventArgs) {
        for subscriber in self.subscribers.read().iter() {
            let subscriber = Arc::clone(subscriber);
            let owner = Arc::clone(owner);
            let args = args.clone();
            if let Err(payload) =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || subscriber(&owner, &args)))
            {
                let reason = panic_message(&payload);
                tracing::error!(target: "opendaq.core_event", error = %reason, "root event subscriber panicked");
            }
        }
    }
}
