//! Device / function block: devices and function blocks compose
//! the folder model and the module-manager contract into a
//! concrete signal-container tree.

pub mod device;
pub mod domain;
pub mod function_block;
pub mod info;
pub mod module_manager;

pub use device::Device;
pub use domain::DeviceDomain;
pub use function_block::{FunctionBlock, FunctionBlockType};
pub use info::build_device_info;
pub use module_manager::{Module, ModuleManager, TypeInfo};
