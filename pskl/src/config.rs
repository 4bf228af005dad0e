//! Configuration for the persistent skip list

use pskl_core::Timestamp;

/// The floor on a node's fatness regardless of `fat_multiplier`, so that even
/// height-1 nodes get more than a single change before triggering a copy.
pub(crate) const MIN_FAT: usize = 4;

/// Configuration options for a [`PersistentSkipList`](crate::PersistentSkipList)
///
/// # Example
///
/// ```
/// use pskl::PslConfig;
///
/// let config = PslConfig {
///     fat_multiplier: 3,
///     seed: Some(42),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct PslConfig {
    /// Multiplier used to derive a node's fatness (`FAT`) from its height:
    /// `FAT = max(MIN_FAT, fat_multiplier * height)`. Spec calls for
    /// `FAT >= 2h`; the default multiplier is `2`.
    pub fat_multiplier: usize,

    /// The largest timestamp `tick` will advance to. Ticking past this bound
    /// returns `Error::OutOfRange` instead of wrapping or silently
    /// overflowing the counter.
    pub max_timestamp: Timestamp,

    /// When set, node heights are drawn from a `StdRng` seeded with this
    /// value, making height assignment (and therefore the resulting shape of
    /// the skip list) reproducible across runs — useful for tests and for
    /// replaying a recorded sweep deterministically. When `None`, the PRNG
    /// is seeded from the OS entropy source.
    pub seed: Option<u64>,
}

impl Default for PslConfig {
    fn default() -> Self {
        Self {
            fat_multiplier: 2,
            max_timestamp: Timestamp::MAX / 2,
            seed: None,
        }
    }
}

impl PslConfig {
    /// Computes the fatness cap for a node of the given height.
    pub(crate) fn fat_for_height(&self, height: usize) -> usize {
        (self.fat_multiplier * height).max(MIN_FAT)
    }
}
