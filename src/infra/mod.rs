//! Infrastructure - configuration and logging
//!
//! This module contains infrastructure concerns:
//! - `config` - Application configuration (TOML loading, defaults, validation)
//! - `logging` - tracing subscriber setup for terminal and headless modes

pub mod config;
pub mod logging;

// Re-export commonly used types
pub use config::Config;
