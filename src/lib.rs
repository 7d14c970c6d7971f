//! openDAQ core runtime: the object/component model, the property
//! system, the signal-path data engine, the packet-streaming wire
//! protocol and a configuration-protocol client mirror.
//!
//! The crate is organized one module per capability rather than per class:
//!
//! - [`kernel`] - typed containers and the serializer registry.
//! - [`component`] - the shared, tree-structured component base.
//! - [`property`] - typed, validated, transactional property objects.
//! - [`folder`] - ordered, concretely-typed child sets.
//! - [`signal`] - signals, connections, input ports.
//! - [`device`] - devices and function blocks.
//! - [`event`] - the core-event bus.
//! - [`streaming`] - the packet-streaming wire protocol.
//! - [`config_client`] - the configuration-protocol client mirror,
//!   gated behind the `config-client` feature.
//! - [`connection_string`], [`logger`] - the ambient external-collaborator
//!   contracts the rest of the tree calls through.

pub mod component;
#[cfg(feature = "config-client")]
pub mod config_client;
pub mod connection_string;
pub mod device;
pub mod error;
pub mod event;
pub mod folder;
pub mod kernel;
pub mod logger;
pub mod property;
pub mod signal;
pub mod streaming;

pub mod prelude;

pub use error::{DaqError, DaqResult, ErrorKind};
