//! Parsing and validation of `pack.toml` legalization options.
//!
//! This crate reads the options file that tunes netlist legalization and
//! produces a strongly-typed [`PackConfig`]. Every key is optional; an empty
//! file yields the defaults.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
