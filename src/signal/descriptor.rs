//! Data descriptors: the metadata a signal attaches to every sample it
//! produces.

use std::collections::HashMap;

use crate::property::Ratio;

/// Sample type carried by a data packet. `Null` is reserved as the
/// event-packet marker: setting a `Null`-sample-type descriptor fails, and
/// `Null` is never a legal data descriptor sample type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleType {
    Null,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Binary,
    String,
    Struct,
}

impl SampleType {
    /// Byte size of one sample, where fixed - `Binary`/`Struct`/`String`
    /// have no fixed per-sample size and rely on the packet's own size
    /// accounting instead.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            SampleType::Null => None,
            SampleType::Int8 | SampleType::UInt8 => Some(1),
            SampleType::Int16 | SampleType::UInt16 => Some(2),
            SampleType::Int32 | SampleType::UInt32 | SampleType::Float32 => Some(4),
            SampleType::Int64 | SampleType::UInt64 | SampleType::Float64 => Some(8),
            SampleType::Binary | SampleType::String | SampleType::Struct => None,
        }
    }
}

/// How samples are produced from the packet payload. `Explicit` carries
/// one value per sample in the payload; `Constant` stores a single scalar
/// and synthesizes `sampleCount` repetitions of it.
#[derive(Clone, Debug, PartialEq)]
pub enum DataRule {
    Explicit,
    Constant { value_bytes: Vec<u8> },
    Linear { delta: f64, start: f64 },
}

/// A struct-type field declaration, used when `sample_type == Struct`.
#[derive(Clone, Debug, PartialEq)]
pub struct StructField {
    pub name: String,
    pub sample_type: SampleType,
}

/// Value range hint for display/validation purposes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Range {
    pub low: f64,
    pub high: f64,
}

/// Full descriptor of the samples a signal produces.
#[derive(Clone, Debug, PartialEq)]
pub struct DataDescriptor {
    pub name: String,
    pub sample_type: SampleType,
    pub dimensions: Vec<usize>,
    pub rule: DataRule,
    pub unit: Option<String>,
    pub value_range: Option<Range>,
    pub origin: Option<String>,
    pub tick_resolution: Option<Ratio>,
    pub struct_fields: Vec<StructField>,
    pub metadata: HashMap<String, String>,
}

impl DataDescriptor {
    pub fn new(name: impl Into<String>, sample_type: SampleType) -> Self {
        Self {
            name: name.into(),
            sample_type,
            dimensions: Vec::new(),
            rule: DataRule::Explicit,
            unit: None,
            value_range: None,
            origin: None,
            tick_resolution: None,
            struct_fields: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Total element count across all dimensions; `1` for a scalar
    /// descriptor with no declared dimensions.
    pub fn element_count(&self) -> usize {
        if self.dimensions.is_empty() {
            1
        } else {
            self.dimensions.iter().product()
        }
    }

    pub fn sample_byte_size(&self) -> Option<usize> {
        self.sample_type.fixed_size().map(|sz| sz * self.element_count())
    }

    /// Reconstructs a descriptor from the JSON shape produced by
    /// `EventPacket::data_descriptor_changed`, as the
    /// streaming client does when it rebuilds descriptors off the wire.
    pub fn from_wire_json(value: &serde_json::Value) -> Option<Self> {
        let name = value.get("name")?.as_str()?.to_string();
        let sample_type = match value.get("sampleType")?.as_str()? {
            "Int8" => SampleType::Int8,
            "Int16" => SampleType::Int16,
            "Int32" => SampleType::Int32,
            "Int64" => SampleType::Int64,
            "UInt8" => SampleType::UInt8,
            "UInt16" => SampleType::UInt16,
            "UInt32" => SampleType::UInt32,
            "UInt64" => SampleType::UInt64,
            "Float32" => SampleType::Float32,
            "Float64" => SampleType::Float64,
            "Binary" => SampleType::Binary,
            "String" => SampleType::String,
            "Struct" => SampleType::Struct,
            _ => return None,
        };
        let dimensions = value
            .get("dimensions")
            .and_then(|d| d.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_u64().map(|n| n as usize)).collect())
            .unwrap_or_default();
        let unit = value.get("unit").and_then(|u| u.as_str()).map(|s| s.to_string());
        Some(Self {
            name,
            sample_type,
            dimensions,
            rule: DataRule::Explicit,
            unit,
            value_range: None,
            origin: None,
            tick_resolution: None,
            struct_fields: Vec::new(),
            metadata: HashMap::new(),
        })
    }
}
