//! Configuration module
//!
//! Handles loading monitor settings from TOML.

mod monitor;

pub use monitor::*;
