//! # Cache Keys
//!
//! Cache entries are named after the MD5 digest of the URL they were fetched
//! from, so the same URL always maps to the same file.

use std::fmt;

use md5::{Digest, Md5};

use crate::source::ResourceKind;

/// Marker inserted between key and extension for entries extracted from archives
pub const EXTRACTED_MARKER: &str = "extracted";

const KEY_LEN: usize = 32;

/// Deterministic digest of a source URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute the key for a URL string, byte for byte
    pub fn from_url(url: &str) -> Self {
        let digest = Md5::digest(url.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the cache entry for this key
    pub fn to_filename(&self, kind: ResourceKind, extension: &str) -> String {
        match kind {
            ResourceKind::Direct => format!("{}.{extension}", self.0),
            ResourceKind::Archive => format!("{}_{EXTRACTED_MARKER}.{extension}", self.0),
        }
    }

    /// Recover key and kind from a cache entry file name
    pub fn parse_filename(name: &str) -> Option<(Self, ResourceKind)> {
        let key = name.get(..KEY_LEN)?;
        if !key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return None;
        }

        let rest = &name[KEY_LEN..];
        let kind = if let Some(ext) = rest.strip_prefix('.') {
            if ext.is_empty() {
                return None;
            }
            ResourceKind::Direct
        } else {
            let ext = rest
                .strip_prefix('_')?
                .strip_prefix(EXTRACTED_MARKER)?
                .strip_prefix('.')?;
            if ext.is_empty() {
                return None;
            }
            ResourceKind::Archive
        };

        Some((Self(key.to_owned()), kind))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
