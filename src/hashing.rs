//! This module provides deterministic `HashMap` and `HashSet` variants. The hashing data
//! structures in the standard library are randomly seeded, which makes iteration order differ
//! from run to run; a simulation that must replay exactly from a seed cannot depend on that.
//!
//! `HashMap<K, V, S>` does not have a `new` method for non-default hashers. Use
//! `HashMap::default()` instead to create a new map with the deterministic hasher.
//!
//! The `hash_str` free function is used to derive per-stream seeds in `crate::random`.

use xxhash_rust::xxh3::xxh3_64;

pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};

/// A convenience method to compute a stable 64-bit hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}
