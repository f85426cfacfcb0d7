//! # Cache System
//!
//! On-disk storage of fetched resources. Each `(owner, alias, version)`
//! maps to exactly one file; once written it is never fetched again while it
//! exists. Stale versions are not cleaned up here.

mod layout;
mod types;
mod writer;

pub use layout::{CacheLayout, sanitize};
pub use types::{CachedResource, FetchOutcome, ProbedVersion, ResourceKey};
pub use writer::{ensure_dir, entry_exists, write_atomically};
