//! Configuration client mirror: local proxy types that mirror a
//! remote component tree over a [`comm::ConfigProtocolClientComm`] RPC
//! channel.

pub mod comm;
pub mod context;
pub mod proxy;

pub use comm::ConfigProtocolClientComm;
pub use context::{ComponentDeserializeContext, ExpectedComponentKind};
pub use proxy::{
    ConfigClientChannel, ConfigClientComponent, ConfigClientDevice, ConfigClientFunctionBlock, ConfigClientInputPort, ConfigClientIoFolder,
    ConfigClientSignal,
};
