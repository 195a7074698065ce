//! Terminal presentation of frames
//!
//! - `dashboard` - ratatui bar charts, one panel per channel group
//! - `palette` - per-channel gradient colors

pub mod dashboard;
pub mod palette;

pub use dashboard::{draw, DashboardState};
