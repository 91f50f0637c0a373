//! Utility types and functions for OMF.
//!
//! This module contains fundamental helpers used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`ByteOrder`] and the swap primitives
//! - 80-bit extended float conversion

mod byte_order;
mod error;
mod ieee;

pub use byte_order::*;
pub use error::*;
pub use ieee::*;
