//! A partially persistent ordered dictionary
//!
//! Every past version of the dictionary stays queryable. Mutations
//! (`insert`, `remove`) always happen at the current `present`; advancing
//! the present with [`PersistentSkipList::tick`] freezes everything written
//! so far, and a query at any earlier timestamp keeps returning exactly
//! what was live then — forever.
//!
//! This is the Driscoll-Sarnak-Sleator-Tarjan node-copying technique for
//! partial persistence, specialized to a skip list:
//!
//! - `TimeStampedArray`: an immutable snapshot of one node's forward
//!   pointers as of one timestamp
//! - `Node`: a skip-list entry, carrying a bounded history of such
//!   snapshots instead of a single mutable forward array
//! - [`PersistentSkipList`]: the dictionary itself — present-mutable,
//!   past-immutable, single-writer
//!
//! # Concurrency
//!
//! This structure is deliberately not concurrent: writers and readers must
//! not run against it at the same time, and it carries no locking of its
//! own. A typical caller is a plane sweep, where the sweep line is the only
//! writer and queries against past sweep positions are the only readers,
//! never interleaved with an in-progress write.
//!
//! # Example
//!
//! ```
//! use pskl::PersistentSkipList;
//!
//! let mut list = PersistentSkipList::new();
//! list.insert(3).unwrap();
//! list.insert(1).unwrap();
//! list.insert(4).unwrap();
//!
//! let t0 = list.present();
//! list.tick().unwrap();
//! list.remove(&1).unwrap();
//!
//! // The present reflects the removal...
//! assert_eq!(list.iter_at(list.present()).unwrap().collect::<Vec<_>>(), vec![&3, &4]);
//! // ...but the past does not.
//! assert_eq!(list.iter_at(t0).unwrap().collect::<Vec<_>>(), vec![&1, &3, &4]);
//! ```

mod config;
mod node;
mod psl;
mod query;
mod tsa;

pub use config::PslConfig;
pub use psl::PersistentSkipList;
pub use query::{IterAt, Predecessor};
