//! Convenience re-exports of the types most call sites need together.
//!
//! `use opendaq_core::prelude::*;` pulls in the component tree's core
//! vocabulary without needing to know which submodule each type lives
//! in.

pub use crate::component::{Component, ComponentBase};
pub use crate::connection_string::{ConnectionString, HostType};
pub use crate::device::{Device, DeviceDomain, FunctionBlock, FunctionBlockType, Module, ModuleManager};
pub use crate::error::{DaqError, DaqResult, ErrorKind};
pub use crate::event::{CoreEventArgs, CoreEventId};
pub use crate::folder::{Folder, SearchFilter};
pub use crate::logger::{LogLevel, Logger, LoggerComponent};
pub use crate::property::{PropertyMetadata, PropertyObject, PropertyValue, ValueType};
pub use crate::signal::{Connection, DataDescriptor, InputPort, Signal};

#[cfg(feature = "config-client")]
pub use crate::config_client::{
    ComponentDeserializeContext, ConfigClientComponent, ConfigClientDevice, ConfigClientFunctionBlock, ConfigProtocolClientComm,
};
