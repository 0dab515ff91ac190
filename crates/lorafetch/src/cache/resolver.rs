//! # Cache Resolver
//!
//! Maps a URL to its deterministic cache path and only touches the network
//! when nothing exists there yet. Entries are never evicted automatically;
//! [`CacheResolver::remove`] and [`CacheResolver::clear`] are the manual
//! counterparts.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, instrument, warn};

use super::key::CacheKey;
use crate::acquirer::Acquirer;
use crate::source::{RemoteResource, ResourceKind};
use crate::{FetchError, FetcherConfig};

/// Where a URL lives in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTarget {
    pub resource: RemoteResource,
    pub key: CacheKey,
    pub path: PathBuf,
}

/// A file found in the cache directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub kind: ResourceKind,
    pub path: PathBuf,
    pub size: u64,
}

pub struct CacheResolver {
    cache_dir: PathBuf,
    acquirer: Acquirer,
}

impl CacheResolver {
    /// Create a resolver over `cache_dir`, creating the directory if needed.
    pub fn new(cache_dir: impl Into<PathBuf>, acquirer: Acquirer) -> Result<Self, FetchError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir)?;
        debug!(cache_dir = ?cache_dir, "Cache directory ready");
        Ok(Self {
            cache_dir,
            acquirer,
        })
    }

    /// Create a resolver with a fresh [`Acquirer`] built from `config`
    pub fn with_config(
        cache_dir: impl Into<PathBuf>,
        config: FetcherConfig,
    ) -> Result<Self, FetchError> {
        Self::new(cache_dir, Acquirer::with_config(config)?)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    fn extension(&self) -> &str {
        &self.acquirer.config().member_target.extension
    }

    /// Compute the cache location of `url` without any I/O
    pub fn target(&self, url: &str) -> Result<CacheTarget, FetchError> {
        let resource = RemoteResource::parse(url)?;
        let key = CacheKey::from_url(url);
        let path = self
            .cache_dir
            .join(key.to_filename(resource.kind(), self.extension()));
        Ok(CacheTarget {
            resource,
            key,
            path,
        })
    }

    /// Whether the entry for `url` is already present
    pub async fn is_cached(&self, url: &str) -> Result<bool, FetchError> {
        let target = self.target(url)?;
        Ok(fs::try_exists(&target.path).await?)
    }

    /// Return the local path for `url`, downloading it on a cache miss.
    #[instrument(skip(self), level = "debug")]
    pub async fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let target = self.target(url)?;

        if fs::try_exists(&target.path).await? {
            debug!(url = %url, path = ?target.path, "Cache hit");
            return Ok(target.path);
        }

        info!(
            url = %url,
            key = %target.key,
            kind = ?target.resource.kind(),
            "Cache miss, fetching"
        );
        self.acquirer
            .acquire(
                target.resource.url().as_str(),
                &target.path,
                target.resource.kind(),
            )
            .await
    }

    /// List cache entries, sorted by file name
    pub async fn entries(&self) -> Result<Vec<CacheEntry>, FetchError> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.cache_dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let file_name = item.file_name();
            let Some((key, kind)) = CacheKey::parse_filename(&file_name.to_string_lossy()) else {
                continue;
            };
            let metadata = item.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(CacheEntry {
                key,
                kind,
                path: item.path(),
                size: metadata.len(),
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    /// Delete the cached file(s) for `url`. Returns how many were removed.
    pub async fn remove(&self, url: &str) -> Result<usize, FetchError> {
        let key = CacheKey::from_url(url);
        let mut removed = 0;

        for kind in [ResourceKind::Direct, ResourceKind::Archive] {
            let path = self.cache_dir.join(key.to_filename(kind, self.extension()));
            match fs::remove_file(&path).await {
                Ok(()) => {
                    info!(path = ?path, "Removed cache entry");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(removed)
    }

    /// Delete every cache entry and leftover `.part` file.
    /// Other files are left alone. Returns how many files were removed.
    pub async fn clear(&self) -> Result<usize, FetchError> {
        let mut removed = 0;
        let mut dir = fs::read_dir(&self.cache_dir).await?;

        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name().to_string_lossy().into_owned();
            let is_entry = CacheKey::parse_filename(&name).is_some();
            let is_part = name.starts_with('.') && name.ends_with(".part");
            if !(is_entry || is_part) || !item.file_type().await?.is_file() {
                continue;
            }

            match fs::remove_file(item.path()).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = ?item.path(), error = %e, "Failed to remove cache file");
                    return Err(e.into());
                }
            }
        }

        info!(cache_dir = ?self.cache_dir, removed, "Cache cleared");
        Ok(removed)
    }
}
