//! Per-cycle readings produced by the assembler

use serde::{Serialize, Serializer};

/// Placeholder for absent, malformed, or non-positive channel values
pub const MISSING: f64 = f64::NAN;

/// True when a value is the missing marker
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Values for one channel group, always exactly one per channel.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReading {
    pub name: String,
    #[serde(serialize_with = "serialize_values")]
    pub values: Vec<f64>,
}

impl GroupReading {
    /// Number of channels that carried a usable value
    pub fn present_count(&self) -> usize {
        self.values.iter().filter(|v| !is_missing(**v)).count()
    }
}

/// Missing values go out as `null`, JSON has no NaN.
fn serialize_values<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(|&v| if is_missing(v) { None } else { Some(v) }))
}

/// One update cycle's worth of readings, one entry per configured group in
/// configuration order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Frame {
    pub groups: Vec<GroupReading>,
}

impl Frame {
    pub fn group(&self, name: &str) -> Option<&GroupReading> {
        self.groups.iter().find(|g| g.name == name)
    }
}
