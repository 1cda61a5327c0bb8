//! Caching subsystem.
//!
//! - [`ResultCache`] - bounded, TTL-based, in-memory store with a
//!   configurable [`EvictionPolicy`]. Volatile: nothing is
//!   written to disk and everything is lost when the process exits.
//!
//! - [`CacheKey`] - content-addressed key derivation. Keys embed a hash of
//!   the analyzed text, so editing a file invalidates its entries
//!   implicitly. Explicit invalidation (by file prefix or regex) covers
//!   forced refreshes.
//!
//! The coordinator's results index is a separate store with a separate
//! lifetime; clearing one never clears the other.

pub mod key;
pub mod policy;
pub mod result;

pub use key::{CacheKey, analyzer_set};
pub use policy::{DEFAULT_PROTECT_WINDOW, EvictionPolicy};
pub use result::{AnalysisCache, CacheConfig, CacheStatistics, EntryInfo, ResultCache};
