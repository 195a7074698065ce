//! Services - block extraction and frame assembly
//!
//! This module contains the core logic:
//! - `extractor` - Sentinel-framed block state machine over a line source
//! - `assembler` - Per-cycle frame assembly with total numeric conversion

pub mod assembler;
pub mod extractor;

// Re-export commonly used types
pub use assembler::{to_reading, ReadingAssembler};
pub use extractor::{BlockExtractor, BlockParser};
