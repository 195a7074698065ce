//! Domain models - channel groups and frames
//!
//! This module contains the canonical data types used throughout the system:
//! - `Sentinel` - block delimiter for one channel group
//! - `ChannelGroup` - a sensor's fixed, ordered channel labels
//! - `Frame` - per-cycle readings, one vector per group

pub mod frame;
pub mod types;

// Re-export commonly used types at module level
pub use frame::{is_missing, Frame, GroupReading, MISSING};
pub use types::{ChannelGroup, Palette, Sentinel, DEFAULT_SEPARATOR};
