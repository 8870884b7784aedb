//! Filesystem cache store for ciartifact
//!
//! [`LocalCacheStore`] keeps one zstd-compressed tar bundle per cache key
//! under a root directory. It implements the
//! [`CacheStore`](ciartifact_core::CacheStore) seam, so it can stand in for a
//! hosted CI cache on developer machines and self-hosted runners.

mod error;
mod local;

pub use error::{Error, Result};
pub use local::LocalCacheStore;
