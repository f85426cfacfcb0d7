//! # Pull Engine
//!
//! A per-owner cache of remote resources. Owners register named resources
//! (aliases) by URL; the engine probes each URL for a version token, keeps one
//! file per `(owner, alias, version)` on disk and tells the owner where the
//! current version lives.
//!
//! ## Features
//!
//! - Version probing with HEAD requests and bounded manual redirects
//! - One serialized job queue per `(owner, alias)`, concurrency across aliases
//! - Atomic cache writes that never leave truncated entries behind
//! - Completion events for observers of the engine

pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod job;
pub mod notify;
pub mod proxy;

#[cfg(test)]
mod test_support;

pub use builder::PullConfigBuilder;
pub use cache::{CacheLayout, CachedResource, FetchOutcome, ProbedVersion, ResourceKey};
pub use client::create_client;
pub use config::PullConfig;
pub use engine::{RegistrationInfo, ResourceCacheEngine};
pub use error::{FetchError, NotifyError};
pub use events::ResourceEvent;
pub use fetcher::{HttpFetcher, ResourceFetcher};
pub use notify::ResourceNotifier;

// Re-export proxy utilities
pub use proxy::{ProxyAuth, ProxyConfig, ProxyType};
