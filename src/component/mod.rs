//! The component object model: the named, tree-structured base every
//! device, function block, signal, input port and folder is built from.

mod base;
mod permission;
mod status;
mod tags;

pub use base::{
    normalize_attribute_name, set_active, set_attribute_str, set_visible, Component, ComponentBase,
    ATTR_ACTIVE, ATTR_DESCRIPTION, ATTR_NAME, ATTR_VISIBLE,
};
pub use permission::PermissionManager;
pub use status::{StatusContainer, StatusValue, COMPONENT_STATUS_KEY};
pub use tags::TagSet;
