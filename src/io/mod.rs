//! IO modules - line sources feeding the extractor
//!
//! This module contains all external IO operations:
//! - `line_source` - `LineSource` trait, stream reader, read errors
//! - `serial` - Serial port connection to the sensor bridge
//! - `replay` - Capture file playback
//! - `scripted` - In-memory script for tests and demos

pub mod line_source;
pub mod replay;
pub mod scripted;
pub mod serial;

// Re-export commonly used types
pub use line_source::{LineSource, ReadError, StreamLineReader};
pub use replay::open_replay;
pub use scripted::ScriptedLines;
pub use serial::{list_ports, open_serial};
