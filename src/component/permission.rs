//! Minimal permission manager: a per-component allow/deny table that may
//! inherit from its parent. Authentication beyond a username/password
//! pair is out of scope here, so this stays a small inheritable stub
//! rather than a full ACL engine - it gives the component tree a place to
//! hang access decisions without inventing policy nothing else needs yet.

use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct PermissionManager {
    denied_actions: Vec<String>,
}

impl PermissionManager {
    /// Creates a manager that inherits its parent's denials, if any.
    pub fn inherit(parent: Option<&Arc<PermissionManager>>) -> Self {
        match parent {
            Some(p) => Self {
                denied_actions: p.denied_actions.clone(),
            },
            None => Self::default(),
        }
    }

    pub fn deny(&mut self, action: impl Into<String>) {
        self.denied_actions.push(action.into());
    }

    pub fn is_allowed(&self, action: &str) -> bool {
        !self.denied_actions.iter().any(|a| a == action)
    }
}
