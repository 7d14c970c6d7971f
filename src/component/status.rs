//! Status container: a named, enumeration-valued map seeded with a
//! `"component status"` key initialized to `Ok`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::event::{CoreEventArgs, CoreEventId};

pub const COMPONENT_STATUS_KEY: &str = "component status";

/// Status value: an enumeration name plus an optional human message. Two
/// statuses are equal, for the purposes of "did anything change", iff both
/// the name and the message match; a write that doesn't change the
/// (status, message) pair is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusValue {
    pub name: String,
    pub message: Option<String>,
}

impl StatusValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn ok() -> Self {
        Self::new("Ok")
    }
}

#[derive(Default)]
struct StatusContainerState {
    values: HashMap<String, StatusValue>,
}

/// Owns the status map for a single component. Emits `StatusChanged`
/// through the owner's core-event bus and logs at a level that matches the
/// status name (best-effort heuristic: "Ok" logs at info, anything else at
/// warn) whenever a write actually changes something.
pub struct StatusContainer {
    state: RwLock<StatusContainerState>,
}

impl StatusContainer {
    pub fn new() -> Arc<Self> {
        let container = Self {
            state: RwLock::new(StatusContainerState::default()),
        };
        container
            .state
            .write()
            .values
            .insert(COMPONENT_STATUS_KEY.to_string(), StatusValue::ok());
        Arc::new(container)
    }

    pub fn get(&self, name: &str) -> Option<StatusValue> {
        self.state.read().values.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.state.read().values.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }

    /// Adds a new status name with an initial value. Fails with
    /// `DuplicateItem` if the name already exists - use [`Self::set`] to
    /// change an existing status's value.
    pub fn add(&self, name: impl Into<String>, value: StatusValue) -> crate::error::DaqResult<()> {
        let name = name.into();
        let mut state = self.state.write();
        if state.values.contains_key(&name) {
            return Err(crate::error::already_exists(format!(
                "status '{name}' already registered"
            )));
        }
        state.values.insert(name, value);
        Ok(())
    }

    /// Sets an existing status's value, firing `StatusChanged` and logging
    /// iff the (name, message) pair actually changed.
    pub fn set(&self, owner: &Arc<dyn Component>, name: &str, value: StatusValue) -> crate::error::DaqResult<()> {
        let changed = {
            let mut state = self.state.write();
            let existing = state
                .values
                .get(name)
                .ok_or_else(|| crate::error::not_found(format!("status '{name}' not registered")))?;
            if *existing == value {
                false
            } else {
                state.values.insert(name.to_string(), value.clone());
                true
            }
        };
        if changed {
            if value.name.eq_ignore_ascii_case("ok") {
                tracing::info!(target: "opendaq.status", status = %name, value = %value.name, "status changed");
            } else {
                tracing::warn!(target: "opendaq.status", status = %name, value = %value.name, message = value.message.as_deref().unwrap_or(""), "status changed");
            }
            let args = CoreEventArgs::new(CoreEventId::StatusChanged)
                .with_param("StatusName", name.to_string())
                .with_param("Status", value.name.clone());
            owner.trigger_core_event(args);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_component_status_as_ok() {
        let status = StatusContainer::new();
        assert_eq!(status.get(COMPONENT_STATUS_KEY), Some(StatusValue::ok()));
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let status = StatusContainer::new();
        let err = status.add(COMPONENT_STATUS_KEY, StatusValue::ok()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::AlreadyExists);
    }
}
