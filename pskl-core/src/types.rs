//! Core types shared across the persistent skip list crates

/// A point in the linear history of a persistent skip list.
///
/// Timestamps are monotone: `present` starts at zero and only ever grows via
/// `tick`. Every timestamp `t <= present` that has ever been current remains
/// queryable forever — the list never rewrites history, only appends to it.
pub type Timestamp = u64;
