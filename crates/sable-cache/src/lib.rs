//! Persistent, fingerprint-keyed record store for per-file analysis results.
//!
//! Each record maps `(canonical path, content fingerprint)` to a serialized
//! payload. Lookups never fail: a missing, stale or corrupt record is a
//! [`CacheLookup::Miss`] and the caller recomputes. The schema version is
//! stored once at the store root; a mismatch wipes the store.

mod cache_dir;
mod error;
mod store;
mod util;

pub use cache_dir::{CacheDir, CACHE_DIR_ENV};
pub use error::{CacheError, Result};
pub use store::{CacheLookup, CacheRecord, CacheStore, MissReason, StoreStatus};
pub use util::{atomic_write, now_millis, BINCODE_PAYLOAD_LIMIT_BYTES};
