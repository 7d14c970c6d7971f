//! The property system: typed, validated, transactional key/value
//! bags that back device info, function block configuration and every
//! other configurable surface in the component tree.

pub mod metadata;
pub mod object;
pub mod value;

pub use metadata::{CoercerFn, PropertyMetadata, ReferencedPropertyFn, ValidatorFn};
pub use object::{PropertyEvent, PropertyObject};
pub use value::{Callable, PropertyValue, Ratio, ValueType};
