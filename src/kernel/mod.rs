//! The object kernel: typed containers and the serializer registry
//! that every other module builds on.
//!
//! A COM-style `queryInterface`/`addRef`/`releaseRef` object model, and a
//! construction helper that destroys a partially built object if a required
//! capability lookup fails, collapse in idiomatic Rust onto two things we
//! get for free: `Arc` for shared, reference-counted ownership, and plain
//! trait objects (`Arc<dyn Trait>`) for capability lookup - a failed
//! `query_interface` becomes a failed `downcast`/`Option`, and "destroy on
//! partial construction failure" is just RAII: a value that never finishes
//! its constructor is never returned and gets dropped. What the kernel
//! module actually needs to provide on top of that is the pair of concerns
//! that cross every object: ordered typed containers (`List`/`Dict`/`Set`)
//! and a serializer/deserializer registry keyed by a stable string ID.

pub mod containers;
pub mod ids;
pub mod registry;

pub use containers::{DaqDict, DaqList, DaqSet};
pub use ids::{InterfaceId, ObjectId};
pub use registry::{DeserializeFn, SerializerRegistry};
