//! # lorafetch
//!
//! Download-and-cache for LoRA weight files referenced by URL.
//!
//! ## Features
//!
//! - Content-addressed cache: one file per URL, named after the URL digest
//! - Direct weights downloads and selective extraction from tar bundles
//!   (plain, gzip, bzip2 or xz), with an exact-path rule and a directory fallback
//! - Scratch archives and partial files never outlive a failed fetch
//! - Host-facing node that falls back to the unmodified model on any error

pub mod acquirer;
pub mod archive;
pub mod builder;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod node;
pub mod progress;
pub mod source;

pub use acquirer::Acquirer;
pub use archive::{ArchiveMember, MemberTarget};
pub use builder::FetcherConfigBuilder;
pub use cache::{CacheEntry, CacheKey, CacheResolver, CacheTarget};
pub use client::create_client;
pub use config::FetcherConfig;
pub use error::{ErrorKind, FetchError};
pub use node::{LoraUrlNode, ModelComposer, NodeError, Strength, WeightsLoader};
pub use progress::{AcquireState, ProgressCallback, ProgressEvent};
pub use source::{RemoteResource, ResourceKind};
