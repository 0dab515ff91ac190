//! # Cache System
//!
//! Content-addressed storage for fetched weights files. Each URL maps to one
//! file in the cache directory, named after the digest of the URL.

mod key;
mod resolver;

pub use key::{CacheKey, EXTRACTED_MARKER};
pub use resolver::{CacheEntry, CacheResolver, CacheTarget};
