//! # Builder for FetcherConfig
//!
//! Fluent construction of [`FetcherConfig`] instances.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use lorafetch_engine::{FetcherConfig, MemberTarget};
//!
//! let config = FetcherConfig::builder()
//!     .with_timeout(Duration::from_secs(120))
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_user_agent("MyApp/1.0")
//!     .with_header("Authorization", "Bearer token")
//!     .with_member_target(MemberTarget::new("my-lora", "my-lora.safetensors"))
//!     .build();
//!
//! assert_eq!(config.member_target.dir_name, "my-lora");
//! ```

use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::{FetcherConfig, archive::MemberTarget};

/// Builder for creating FetcherConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the overall timeout for a single HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout (maximum time between receiving data chunks)
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set whether to follow redirects
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    /// Set the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Set all HTTP headers, replacing any existing headers
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers = headers;
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        self.config.use_system_proxy = use_system_proxy;
        self
    }

    /// Set the streaming buffer size. Zero is bumped to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the directory for temporary archive copies
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Set the archive member to extract
    pub fn with_member_target(mut self, target: MemberTarget) -> Self {
        self.config.member_target = target;
        self
    }

    /// Build the FetcherConfig instance
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

impl Default for FetcherConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
