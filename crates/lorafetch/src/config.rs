use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::archive::MemberTarget;

const DEFAULT_USER_AGENT: &str = concat!("lorafetch/", env!("CARGO_PKG_VERSION"));

/// Size of the buffer used when streaming bodies and archive members to disk
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Configurable options for fetching weights files
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Overall timeout for a single HTTP request, body included (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    /// Buffer size used for streaming writes
    pub chunk_size: usize,

    /// Directory for temporary archive copies. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,

    /// The member to pull out of tar archives
    pub member_target: MemberTarget,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: FetcherConfig::get_default_headers(),
            use_system_proxy: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            scratch_dir: None,
            member_target: MemberTarget::default(),
        }
    }
}

impl FetcherConfig {
    pub fn builder() -> crate::builder::FetcherConfigBuilder {
        crate::builder::FetcherConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        // Archives must arrive as stored; compression is detected after download.
        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("identity"),
        );
        default_headers
    }

    /// Directory used for temporary archive copies
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}
