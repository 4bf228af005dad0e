//! Core types shared by the persistent skip list crates
//!
//! This crate holds the handful of types that don't belong to any one module
//! of the skip list itself:
//!
//! - [`Timestamp`], the type of a point in the structure's linear history
//! - [`Error`] and [`Result`], the shared error type
//!
//! # Example
//!
//! ```
//! use pskl_core::Timestamp;
//!
//! let t: Timestamp = 0;
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
