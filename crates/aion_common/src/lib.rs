//! Shared foundational types used across the Aion FPGA toolchain.
//!
//! This crate provides the error type for internal invariant violations and the [`Property`] value stored in netlist attribute bags.

#![warn(missing_docs)]

pub mod property;
pub mod result;

pub use property::Property;
pub use result::InternalError;
