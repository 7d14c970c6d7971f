//! The RPC surface a configuration-protocol client mirror calls through -
//! every mutating call on a client-side proxy forwards here instead of
//! mutating local state directly, keyed by the remote's `remoteGlobalId`.

use crate::error::DaqResult;
use crate::property::PropertyValue;

/// Transport-agnostic RPC contract a `ConfigProtocolClientComm`
/// implementation provides. A real implementation carries these calls
/// over a socket/websocket to the server process; tests can substitute an
/// in-process fake.
pub trait ConfigProtocolClientComm: Send + Sync {
    fn get_property_value(&self, remote_global_id: &str, property_name: &str) -> DaqResult<PropertyValue>;

    fn set_property_value(&self, remote_global_id: &str, property_name: &str, value: PropertyValue) -> DaqResult<()>;

    fn set_protected_property_value(&self, remote_global_id: &str, property_name: &str, value: PropertyValue) -> DaqResult<()>;

    fn clear_property_value(&self, remote_global_id: &str, property_name: &str) -> DaqResult<()>;

    fn begin_update(&self, remote_global_id: &str, path: &str) -> DaqResult<()>;

    fn end_update(&self, remote_global_id: &str, path: &str, extended_values: Option<&serde_json::Value>) -> DaqResult<()>;

    /// Pushes a full serialized update to the remote
    /// object, used by `loadConfiguration` and by explicit re-sync.
    fn update(&self, remote_global_id: &str, serialized: &serde_json::Value, path: &str) -> DaqResult<()>;

    fn set_attribute_value(&self, remote_global_id: &str, attribute: &str, value: serde_json::Value) -> DaqResult<()>;

    fn call_function(&self, remote_global_id: &str, name: &str, args: &serde_json::Value) -> DaqResult<serde_json::Value>;

    fn connect_port(&self, input_port_remote_global_id: &str, signal_remote_global_id: &str) -> DaqResult<()>;

    fn disconnect_port(&self, input_port_remote_global_id: &str) -> DaqResult<()>;

    /// Returns the new child's local ID; the caller derives its remote
    /// global ID by appending that local ID to `remote_global_id`.
    fn add_function_block(&self, remote_global_id: &str, type_id: &str, config: Option<&serde_json::Value>) -> DaqResult<String>;

    fn remove_function_block(&self, remote_global_id: &str, fb_remote_global_id: &str) -> DaqResult<()>;

    /// Returns the new child's local ID (see [`Self::add_function_block`]).
    fn add_device(&self, remote_global_id: &str, connection_string: &str, config: Option<&serde_json::Value>) -> DaqResult<String>;

    fn remove_device(&self, remote_global_id: &str, device_remote_global_id: &str) -> DaqResult<()>;
}
