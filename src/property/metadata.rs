//! Property metadata: the declaration a property carries alongside
//! its current value.

use crate::property::value::{PropertyValue, ValueType};

/// A coercer or validator expression, evaluated against the candidate
/// value and the owning object's sibling properties: a closure over
/// `(candidate, siblings) -> DaqResult<PropertyValue>` for coercers,
/// `(candidate, siblings) -> bool` for validators, rather than an
/// embedded expression-language parser nothing here needs.
pub type CoercerFn =
    std::sync::Arc<dyn Fn(&PropertyValue, &crate::property::object::PropertyObject) -> crate::error::DaqResult<PropertyValue> + Send + Sync>;
pub type ValidatorFn =
    std::sync::Arc<dyn Fn(&PropertyValue, &crate::property::object::PropertyObject) -> bool + Send + Sync>;
pub type ReferencedPropertyFn =
    std::sync::Arc<dyn Fn(&crate::property::object::PropertyObject) -> Option<String> + Send + Sync>;

#[derive(Clone)]
pub struct PropertyMetadata {
    pub name: String,
    pub value_type: ValueType,
    pub unit: Option<String>,
    pub min: Option<PropertyValue>,
    pub max: Option<PropertyValue>,
    pub default_value: Option<PropertyValue>,
    pub suggested_values: Vec<PropertyValue>,
    pub selection_values: Vec<PropertyValue>,
    pub visible: bool,
    pub read_only: bool,
    pub coercer: Option<CoercerFn>,
    pub validator: Option<ValidatorFn>,
    pub referenced_property: Option<ReferencedPropertyFn>,
}

impl std::fmt::Debug for PropertyMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyMetadata")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("read_only", &self.read_only)
            .field("visible", &self.visible)
            .finish()
    }
}

impl PropertyMetadata {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            unit: None,
            min: None,
            max: None,
            default_value: None,
            suggested_values: Vec::new(),
            selection_values: Vec::new(),
            visible: true,
            read_only: false,
            coercer: None,
            validator: None,
            referenced_property: None,
        }
    }

    pub fn with_default(mut self, value: PropertyValue) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_range(mut self, min: PropertyValue, max: PropertyValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_coercer(mut self, f: CoercerFn) -> Self {
        self.coercer = Some(f);
        self
    }

    pub fn with_validator(mut self, f: ValidatorFn) -> Self {
        self.validator = Some(f);
        self
    }

    pub fn with_referenced_property(mut self, f: ReferencedPropertyFn) -> Self {
        self.referenced_property = Some(f);
        self
    }
}
