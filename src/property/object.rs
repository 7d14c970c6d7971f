//! The property object: an ordered, typed key/value bag with
//! coercion, validation, nested object-typed children, update transactions
//! and JSON serialization.
//!
//! Property objects form a tree distinct from the component tree: a
//! `PropertyObject` of value-type `Object` owns a nested `PropertyObject`
//! whose `path` records the dotted route back to the root. The remote
//! configuration-client mirror replaces those nested children with
//! proxies during deserialization; nothing in this module assumes the
//! child is the same concrete type as the parent.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value as Json;

use crate::error::{DaqError, DaqResult, ErrorKind};
use crate::property::metadata::PropertyMetadata;
use crate::property::value::{PropertyValue, ValueType};

type WriteCallback = Arc<dyn Fn(&PropertyValue) -> PropertyValue + Send + Sync>;
type ReadCallback = Arc<dyn Fn(&PropertyValue) -> PropertyValue + Send + Sync>;
type PropertyListener = Arc<dyn Fn(&PropertyEvent) + Send + Sync>;

/// Events a property object fires, mirroring the subset of [`crate::event::CoreEventId`]
/// that originates inside property objects.
#[derive(Debug, Clone)]
pub enum PropertyEvent {
    ValueChanged { name: String, value: PropertyValue },
    Added { name: String },
    Removed { name: String },
    UpdateEnd { updated: HashMap<String, PropertyValue> },
}

struct PropertyEntry {
    metadata: PropertyMetadata,
    value: RwLock<Option<PropertyValue>>,
}

struct MutableState {
    properties: Vec<String>,
    entries: HashMap<String, PropertyEntry>,
    write_callbacks: HashMap<String, WriteCallback>,
    read_callbacks: HashMap<String, ReadCallback>,
}

/// A typed, ordered property bag. See module docs.
pub struct PropertyObject {
    class_name: String,
    parent: RwLock<Option<Weak<PropertyObject>>>,
    path: RwLock<String>,
    state: RwLock<MutableState>,
    frozen: AtomicBool,
    update_depth: AtomicUsize,
    buffered_writes: RwLock<HashMap<String, PropertyValue>>,
    listeners: RwLock<Vec<PropertyListener>>,
    muted: AtomicBool,
}

impl fmt::Debug for PropertyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyObject")
            .field("class_name", &self.class_name)
            .field("path", &*self.path.read())
            .finish()
    }
}

impl PropertyObject {
    pub fn new(class_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            class_name: class_name.into(),
            parent: RwLock::new(None),
            path: RwLock::new(String::new()),
            state: RwLock::new(MutableState {
                properties: Vec::new(),
                entries: HashMap::new(),
                write_callbacks: HashMap::new(),
                read_callbacks: HashMap::new(),
            }),
            frozen: AtomicBool::new(false),
            update_depth: AtomicUsize::new(0),
            buffered_writes: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            muted: AtomicBool::new(false),
        })
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn path(&self) -> String {
        self.path.read().clone()
    }

    pub fn parent(&self) -> Option<Arc<PropertyObject>> {
        self.parent.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn subscribe(&self, listener: PropertyListener) {
        self.listeners.write().push(listener);
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::Release);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::Release);
    }

    fn emit(&self, event: PropertyEvent) {
        if self.muted.load(Ordering::Acquire) {
            return;
        }
        for listener in self.listeners.read().iter() {
            listener(&event);
        }
    }

    fn check_mutable(&self) -> DaqResult<()> {
        if self.is_frozen() {
            return Err(DaqError::new(ErrorKind::Frozen, "property object is frozen"));
        }
        Ok(())
    }

    /// Adds a property; fails with `AlreadyExists` if frozen or a property
    /// of the same name already exists. When the property is `Object`-typed
    /// and carries a default, the default is cloned and re-parented under
    /// this object.
    pub fn add_property(self: &Arc<Self>, metadata: PropertyMetadata) -> DaqResult<()> {
        self.check_mutable()?;
        let name = metadata.name.clone();
        {
            let state = self.state.read();
            if state.entries.contains_key(&name) {
                return Err(DaqError::new(
                    ErrorKind::AlreadyExists,
                    format!("property '{name}' already exists"),
                ));
            }
        }
        if metadata.value_type == ValueType::Object {
            if let Some(PropertyValue::Object(child)) = &metadata.default_value {
                *child.parent.write() = Some(Arc::downgrade(self));
                let parent_path = self.path.read().clone();
                *child.path.write() = if parent_path.is_empty() {
                    name.clone()
                } else {
                    format!("{parent_path}.{name}")
                };
            }
        }
        let mut state = self.state.write();
        state.properties.push(name.clone());
        state.entries.insert(
            name.clone(),
            PropertyEntry {
                metadata,
                value: RwLock::new(None),
            },
        );
        drop(state);
        self.emit(PropertyEvent::Added { name });
        Ok(())
    }

    pub fn remove_property(&self, name: &str) -> DaqResult<()> {
        self.check_mutable()?;
        let mut state = self.state.write();
        if state.entries.remove(name).is_none() {
            return Err(DaqError::new(ErrorKind::NotFound, format!("property '{name}' not found")));
        }
        state.properties.retain(|p| p != name);
        drop(state);
        self.emit(PropertyEvent::Removed { name: name.to_string() });
        Ok(())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.state.read().properties.clone()
    }

    pub fn property_value_type(&self, name: &str) -> Option<ValueType> {
        self.state.read().entries.get(name).map(|e| e.metadata.value_type)
    }

    pub fn on_property_value_write(&self, name: impl Into<String>, callback: WriteCallback) {
        self.state.write().write_callbacks.insert(name.into(), callback);
    }

    pub fn on_property_value_read(&self, name: impl Into<String>, callback: ReadCallback) {
        self.state.write().read_callbacks.insert(name.into(), callback);
    }

    /// Resolves a dotted path (`"a.b.c"`) to the object that owns the final
    /// segment, returning that object and the final segment's name.
    fn resolve_path<'a>(self: &Arc<Self>, path: &'a str) -> DaqResult<(Arc<PropertyObject>, &'a str)> {
        let mut segments = path.split('.');
        let first = segments.next().ok_or_else(|| DaqError::new(ErrorKind::InvalidParameter, "empty property path"))?;
        let mut current = self.clone();
        let mut last = first;
        for segment in segments {
            let child = {
                let state = current.state.read();
                let entry = state
                    .entries
                    .get(last)
                    .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("property '{last}' not found")))?;
                match entry.value.read().as_ref().or(entry.metadata.default_value.as_ref()) {
                    Some(PropertyValue::Object(obj)) => obj.clone(),
                    _ => {
                        return Err(DaqError::new(
                            ErrorKind::InvalidParameter,
                            format!("property '{last}' is not an object property"),
                        ))
                    }
                }
            };
            current = child;
            last = segment;
        }
        Ok((current, last))
    }

    /// Write path: coerce (if a coercer is registered) then validate (if a
    /// validator is registered); failure leaves the stored value unchanged.
    fn coerce_and_validate(&self, entry: &PropertyEntry, candidate: PropertyValue) -> DaqResult<PropertyValue> {
        let coerced = match &entry.metadata.coercer {
            Some(coercer) => coercer(&candidate, self)?,
            None => candidate,
        };
        if let Some(validator) = &entry.metadata.validator {
            if !validator(&coerced, self) {
                return Err(DaqError::new(
                    ErrorKind::InvalidParameter,
                    format!("value rejected by validator for property '{}'", entry.metadata.name),
                ));
            }
        }
        Ok(coerced)
    }

    fn set_value_inner(self: &Arc<Self>, name: &str, value: PropertyValue, bypass_read_only: bool) -> DaqResult<()> {
        self.check_mutable()?;
        let (owner, local_name) = self.resolve_path(name)?;
        let applied = {
            let state = owner.state.read();
            let entry = state
                .entries
                .get(local_name)
                .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("property '{local_name}' not found")))?;
            if entry.metadata.read_only && !bypass_read_only {
                return Err(DaqError::new(
                    ErrorKind::AccessDenied,
                    format!("property '{local_name}' is read-only"),
                ));
            }
            if entry.metadata.value_type != value.value_type() {
                return Err(DaqError::new(
                    ErrorKind::InvalidParameter,
                    format!("type mismatch writing property '{local_name}'"),
                ));
            }
            let mut applied = owner.coerce_and_validate(entry, value)?;
            if let Some(cb) = state.write_callbacks.get(local_name) {
                applied = cb(&applied);
            }
            *entry.value.write() = Some(applied.clone());
            applied
        };

        let depth = owner.update_depth.load(Ordering::Acquire);
        if depth > 0 {
            owner.buffered_writes.write().insert(local_name.to_string(), applied);
        } else {
            owner.emit(PropertyEvent::ValueChanged {
                name: local_name.to_string(),
                value: applied,
            });
        }
        Ok(())
    }

    pub fn set_property_value(self: &Arc<Self>, name: &str, value: impl Into<PropertyValue>) -> DaqResult<()> {
        self.set_value_inner(name, value.into(), false)
    }

    pub fn set_protected_property_value(self: &Arc<Self>, name: &str, value: impl Into<PropertyValue>) -> DaqResult<()> {
        self.set_value_inner(name, value.into(), true)
    }

    /// Reads a property's effective value: an explicit write, else a
    /// referenced-property redirection evaluated against sibling values,
    /// else the declared default.
    pub fn get_property_value(self: &Arc<Self>, name: &str) -> DaqResult<PropertyValue> {
        let (owner, local_name) = self.resolve_path(name)?;
        let state = owner.state.read();
        let entry = state
            .entries
            .get(local_name)
            .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("property '{local_name}' not found")))?;

        if let Some(resolver) = &entry.metadata.referenced_property {
            if let Some(target_name) = resolver(&owner) {
                drop(state);
                return owner.get_property_value(&target_name);
            }
        }

        let value = entry
            .value
            .read()
            .clone()
            .or_else(|| entry.metadata.default_value.clone())
            .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("property '{local_name}' has no value")))?;

        let value = match state.read_callbacks.get(local_name) {
            Some(cb) => cb(&value),
            None => value,
        };
        Ok(value)
    }

    pub fn clear_property_value(self: &Arc<Self>, name: &str) -> DaqResult<()> {
        self.check_mutable()?;
        let (owner, local_name) = self.resolve_path(name)?;
        let state = owner.state.read();
        let entry = state
            .entries
            .get(local_name)
            .ok_or_else(|| DaqError::new(ErrorKind::NotFound, format!("property '{local_name}' not found")))?;
        *entry.value.write() = None;
        Ok(())
    }

    /// Every currently-set or defaulted Object-typed child, in declaration
    /// order.
    fn object_typed_children(&self) -> Vec<Arc<PropertyObject>> {
        let state = self.state.read();
        state
            .properties
            .iter()
            .filter_map(|name| {
                let entry = state.entries.get(name)?;
                if entry.metadata.value_type != ValueType::Object {
                    return None;
                }
                match entry.value.read().as_ref().or(entry.metadata.default_value.as_ref()) {
                    Some(PropertyValue::Object(child)) => Some(child.clone()),
                    _ => None,
                }
            })
            .collect()
    }

    /// Begins an update transaction. Transactions nest (LIFO); writes made
    /// while `update_depth > 0` are buffered per name rather than applied
    /// immediately. Forwards to every Object-typed child so a parent/child
    /// transaction pair commits together.
    pub fn begin_update(&self) {
        self.update_depth.fetch_add(1, Ordering::AcqRel);
        for child in self.object_typed_children() {
            child.begin_update();
        }
    }

    /// Ends an update transaction. Only the outermost `end_update` commits:
    /// it emits a single `PropertyObjectUpdateEnd`-shaped [`PropertyEvent::UpdateEnd`]
    /// carrying every name buffered during the transaction, then clears the
    /// buffer. No `ValueChanged` events fire for buffered writes. Forwards
    /// to every Object-typed child first, so a child's own `UpdateEnd`
    /// fires (if its own transaction closes) before the parent's.
    pub fn end_update(&self) -> DaqResult<()> {
        let depth = self.update_depth.load(Ordering::Acquire);
        if depth == 0 {
            return Err(DaqError::new(ErrorKind::InvalidState, "end_update without matching begin_update"));
        }
        for child in self.object_typed_children() {
            child.end_update()?;
        }
        let remaining = self.update_depth.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let updated = std::mem::take(&mut *self.buffered_writes.write());
            if !updated.is_empty() {
                self.emit(PropertyEvent::UpdateEnd { updated });
            }
        }
        Ok(())
    }

    /// Serializes every explicitly-set, non-default property value to JSON:
    /// a property left at its default is omitted, the same way attribute
    /// serialization only writes non-default attribute values.
    pub fn serialize(&self) -> Json {
        let state = self.state.read();
        let mut map = serde_json::Map::new();
        for name in &state.properties {
            if let Some(entry) = state.entries.get(name) {
                if let Some(value) = entry.value.read().as_ref() {
                    map.insert(name.clone(), value.to_json());
                }
            }
        }
        Json::Object(map)
    }

    /// Applies a serialized document produced by [`Self::serialize`].
    /// Unknown keys are ignored; keys naming a nested object property
    /// recurse into `update` on the existing child rather than replacing
    /// it, clearing any of the child's properties the new document does
    /// not mention before applying the serialized value.
    pub fn update(self: &Arc<Self>, serialized: &Json) -> DaqResult<()> {
        self.check_mutable()?;
        let Json::Object(map) = serialized else {
            return Err(DaqError::new(ErrorKind::InvalidParameter, "update() expects a JSON object"));
        };
        self.begin_update();
        let result = (|| -> DaqResult<()> {
            for (name, value) in map {
                let value_type = {
                    let state = self.state.read();
                    state.entries.get(name.as_str()).map(|e| e.metadata.value_type)
                };
                let Some(value_type) = value_type else { continue };
                if value_type == ValueType::Object {
                    if let Some(child) = self
                        .get_property_value(name)
                        .ok()
                        .and_then(|v| v.as_object().cloned())
                    {
                        let existing_names = child.property_names();
                        if let Json::Object(child_map) = value {
                            for existing in &existing_names {
                                if !child_map.contains_key(existing) {
                                    let _ = child.clear_property_value(existing);
                                }
                            }
                        }
                        child.update(value)?;
                    }
                    continue;
                }
                if let Some(parsed) = PropertyValue::from_json_scalar(value, value_type) {
                    self.set_protected_property_value(name, parsed)?;
                }
            }
            Ok(())
        })();
        self.end_update()?;
        result
    }
}
