//! Device domain: the immutable clock triple a
//! device attaches for descendants to interpret domain samples by.

use crate::property::Ratio;

/// `(tickResolution, origin, unit)`, set once at device construction.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceDomain {
    tick_resolution: Ratio,
    origin: String,
    unit: Option<String>,
}

impl DeviceDomain {
    pub fn new(tick_resolution: Ratio, origin: impl Into<String>, unit: Option<String>) -> Self {
        Self {
            tick_resolution,
            origin: origin.into(),
            unit,
        }
    }

    pub fn tick_resolution(&self) -> Ratio {
        self.tick_resolution
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_fields_round_trip() {
        let domain = DeviceDomain::new(Ratio { numerator: 1, denominator: 1_000_000 }, "1970-01-01T00:00:00Z", Some("s".to_string()));
        assert_eq!(domain.origin(), "1970-01-01T00:00:00Z");
        assert_eq!(domain.unit(), Some("s"));
    }
}
