use std::path::PathBuf;
use std::time::Duration;

use lorafetch_engine::{FetcherConfig, MemberTarget};

use crate::cli::{CliArgs, Command};
use crate::error::AppError;
use crate::utils::parse_headers;

/// Cache location used when neither `--cache-dir` nor `LORAFETCH_CACHE_DIR` is set
pub const DEFAULT_CACHE_DIR: &str = "input/url_loras";

/// Configuration for the entire program
#[derive(Debug, Clone)]
pub struct ProgramConfig {
    pub cache_dir: PathBuf,

    pub fetcher: FetcherConfig,

    pub show_progress: bool,
}

impl ProgramConfig {
    pub fn from_args(args: &CliArgs) -> Result<Self, AppError> {
        if args.member_dir.is_empty() || args.member_file.is_empty() {
            return Err(AppError::InvalidInput(
                "--member-dir and --member-file must not be empty".to_string(),
            ));
        }

        let cache_dir = args
            .cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));

        let mut builder = FetcherConfig::builder().with_member_target(MemberTarget::new(
            args.member_dir.clone(),
            args.member_file.clone(),
        ));
        let mut show_progress = false;

        if let Command::Fetch(fetch) = &args.command {
            builder = builder
                .with_timeout(Duration::from_secs(fetch.timeout))
                .with_connect_timeout(Duration::from_secs(fetch.connect_timeout))
                .with_read_timeout(Duration::from_secs(fetch.read_timeout))
                .with_chunk_size(fetch.chunk_size)
                .with_system_proxy(!fetch.no_proxy);

            let mut headers = FetcherConfig::get_default_headers();
            for (name, value) in parse_headers(&fetch.headers)?.iter() {
                headers.insert(name.clone(), value.clone());
            }
            builder = builder.with_headers(headers);

            if let Some(scratch_dir) = &fetch.scratch_dir {
                builder = builder.with_scratch_dir(scratch_dir.clone());
            }
            show_progress = !fetch.no_progress;
        }

        Ok(Self {
            cache_dir,
            fetcher: builder.build(),
            show_progress,
        })
    }
}
