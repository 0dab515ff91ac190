//! # Remote resources
//!
//! A URL plus its classification. Whether a URL points at a tar archive or a
//! bare weights file is decided from the suffix of its path alone; the query
//! string and fragment never take part.

use reqwest::Url;

use crate::FetchError;

/// Path suffixes (lowercase) that mark a URL as a tar archive
pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tbz", ".tar.xz", ".txz",
];

/// How a remote resource is turned into a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// The body is the weights file itself
    Direct,
    /// The body is a tar archive holding the weights file
    Archive,
}

impl ResourceKind {
    /// Classify a URL path by its suffix, ignoring ASCII case
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            ResourceKind::Archive
        } else {
            ResourceKind::Direct
        }
    }

    #[inline]
    pub fn is_archive(self) -> bool {
        self == ResourceKind::Archive
    }
}

/// A parsed download URL and its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    url: Url,
    kind: ResourceKind,
}

impl RemoteResource {
    /// Parse and classify a URL. Only http and https are accepted.
    pub fn parse(url_str: &str) -> Result<Self, FetchError> {
        let url = url_str
            .trim()
            .parse::<Url>()
            .map_err(|e| FetchError::InvalidUrl(format!("{url_str}: {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(FetchError::InvalidUrl(format!(
                    "{url_str}: unsupported scheme '{other}'"
                )));
            }
        }

        let kind = ResourceKind::from_path(url.path());
        Ok(Self { url, kind })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_archive_suffixes() {
        assert_eq!(ResourceKind::from_path("/a/lora.tar"), ResourceKind::Archive);
        assert_eq!(ResourceKind::from_path("/a/lora.TAR.GZ"), ResourceKind::Archive);
        assert_eq!(ResourceKind::from_path("/a/lora.tgz"), ResourceKind::Archive);
        for path in ["/a/lora.tar.bz2", "/a/lora.TBZ2", "/a/lora.tbz", "/a/lora.tar.xz", "/a/lora.txz"] {
            assert_eq!(ResourceKind::from_path(path), ResourceKind::Archive, "{path}");
        }
        assert_eq!(
            ResourceKind::from_path("/a/lora.safetensors"),
            ResourceKind::Direct
        );
        assert_eq!(ResourceKind::from_path("/a/tar"), ResourceKind::Direct);
        assert_eq!(ResourceKind::from_path("/a/lora.gz"), ResourceKind::Direct);
        assert_eq!(ResourceKind::from_path("/a/lora.xz"), ResourceKind::Direct);
    }

    #[test]
    fn test_query_is_ignored() {
        let res = RemoteResource::parse("https://example.com/w.safetensors?name=x.tar").unwrap();
        assert_eq!(res.kind(), ResourceKind::Direct);

        let res = RemoteResource::parse("https://example.com/lora.tar?sig=abc#frag").unwrap();
        assert!(res.kind().is_archive());
    }

    #[test]
    fn test_invalid_urls() {
        let err = RemoteResource::parse("not a url").unwrap_err();
        assert!(err.is_network());

        let err = RemoteResource::parse("ftp://example.com/lora.tar").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(msg) if msg.contains("ftp")));
    }
}
