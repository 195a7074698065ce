//! Shared types for the spectra monitor

use serde::{Deserialize, Serialize};

/// Field separator used by the sensor firmware
pub const DEFAULT_SEPARATOR: char = ',';

/// Block delimiter for one channel group.
///
/// Never empty. Two groups in the same configuration must not share a sentinel,
/// which is checked by `Config::validate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sentinel(String);

impl Sentinel {
    /// Build a sentinel from a symbol; surrounding whitespace is ignored.
    /// Returns `None` for an empty symbol.
    pub fn new(symbol: impl Into<String>) -> Option<Self> {
        let symbol = symbol.into();
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Sentinel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "sentinel must not be empty".to_string())
    }
}

impl From<Sentinel> for String {
    fn from(value: Sentinel) -> Self {
        value.0
    }
}

impl std::fmt::Display for Sentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Color gradient used when drawing a group's bars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Viridis,
    Plasma,
}

/// A named sensor with a fixed, ordered set of channels sharing one sentinel.
///
/// The label count is the number of values expected per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelGroup {
    pub name: String,
    pub sentinel: Sentinel,
    pub labels: Vec<String>,
    #[serde(default)]
    pub palette: Palette,
}

impl ChannelGroup {
    pub fn new(name: &str, sentinel: Sentinel, labels: &[&str], palette: Palette) -> Self {
        Self {
            name: name.to_string(),
            sentinel,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            palette,
        }
    }

    /// Number of values expected per block
    pub fn channel_count(&self) -> usize {
        self.labels.len()
    }

    /// AS7341 11-channel spectrometer (12 reported values), framed by `&`
    pub fn as7341() -> Self {
        Self::new(
            "AS7341",
            Sentinel("&".to_string()),
            &[
                "415nm", "445nm", "480nm", "515nm", "Clear0", "NIR0", "555nm", "590nm", "630nm",
                "680nm", "Clear", "NIR",
            ],
            Palette::Viridis,
        )
    }

    /// AS7263 6-channel NIR spectrometer, framed by `$`
    pub fn as7263() -> Self {
        Self::new(
            "AS7263",
            Sentinel("$".to_string()),
            &["Violet", "Blue", "Green", "Yellow", "Orange", "Red"],
            Palette::Plasma,
        )
    }

    /// The sensor pair the monitor ships configured for
    pub fn defaults() -> Vec<Self> {
        vec![Self::as7341(), Self::as7263()]
    }
}
