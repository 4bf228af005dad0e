//! Error types for the persistent skip list
//!
//! There is no I/O in this crate, so every variant here reflects either a
//! caller-visible outcome (duplicate insert, missing remove, out-of-range
//! query) or an internal consistency check that should never fire outside a
//! bug in the skip list implementation itself.

use thiserror::Error;

use crate::Timestamp;

/// The error type for persistent skip list operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `insert` was called with a datum already live at the present. The
    /// structure is left unchanged; callers may treat this as idempotent.
    #[error("datum is already live at the present")]
    Duplicate,

    /// `remove` was called with a datum that is not live at the present.
    /// The structure is left unchanged.
    #[error("datum is not live at the present")]
    Absent,

    /// A query was made at a timestamp outside `[0, present]`.
    #[error("timestamp {t} is out of range: present is {present}")]
    OutOfRange {
        /// The timestamp the caller asked for.
        t: Timestamp,
        /// The present timestamp at the time of the query.
        present: Timestamp,
    },

    /// An internal consistency assertion failed. Surfacing this indicates a
    /// programmer bug, not a runtime condition a caller can recover from by
    /// retrying.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// A specialized `Result` type for persistent skip list operations
pub type Result<T> = std::result::Result<T, Error>;
