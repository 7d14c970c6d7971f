//! Serializer/deserializer registry.
//!
//! Every serializable type in the tree - components, folders, signals,
//! property objects - publishes a stable string serialization ID. The
//! registry maps that ID back to a deserialization function so that
//! `update()`/`loadConfiguration()` can reconstruct the right concrete type
//! from a JSON blob without the caller needing to know it up front.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{not_found, DaqResult};

/// A deserialization function: takes the serialized JSON object and an
/// opaque deserialization context (carried as `&dyn std::any::Any` so the
/// registry itself stays independent of the config-client proxy types that
/// need extra context), and produces a boxed value behind a factory the
/// caller downcasts from.
pub type DeserializeFn =
    Arc<dyn Fn(&Value, Option<&dyn std::any::Any>) -> DaqResult<Box<dyn std::any::Any>> + Send + Sync>;

/// Maps serialization IDs to deserialization functions. Populated once at
/// startup by each module that wants its types reconstructable from JSON.
#[derive(Default)]
pub struct SerializerRegistry {
    factories: HashMap<String, DeserializeFn>,
}

impl SerializerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a deserializer under `id`. Re-registering the same ID
    /// overwrites the previous entry - callers are expected to register
    /// exactly once at startup, but tests frequently re-register fakes.
    pub fn register(&mut self, id: impl Into<String>, factory: DeserializeFn) {
        self.factories.insert(id.into(), factory);
    }

    pub fn deserialize(
        &self,
        id: &str,
        value: &Value,
        context: Option<&dyn std::any::Any>,
    ) -> DaqResult<Box<dyn std::any::Any>> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| not_found(format!("no deserializer registered for '{id}'")))?;
        factory(value, context)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }
}
