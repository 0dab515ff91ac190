use clap::{Args, Parser, Subcommand};
use lorafetch_engine::archive::{DEFAULT_DIR_NAME, DEFAULT_FILE_NAME};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Fetch LoRA weights by URL into a local cache",
    long_about = "Download LoRA weight files by URL into a content-addressed cache.\n\
                  \n\
                  URLs ending in .tar, .tar.gz, .tgz, .tar.bz2 or .tar.xz are treated as archives: only the\n\
                  weights file inside (by default flux-lora/flux-lora.safetensors) is kept.\n\
                  Cached URLs are never downloaded again; use `clear` to drop entries."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Cache directory
    #[arg(
        short,
        long,
        global = true,
        env = "LORAFETCH_CACHE_DIR",
        help = "Directory holding cached weights files (default: ./input/url_loras)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Directory name the weights file is packaged under in archives
    #[arg(long, global = true, default_value = DEFAULT_DIR_NAME)]
    pub member_dir: String,

    /// File name of the weights file in archives; its extension names cache entries
    #[arg(long, global = true, default_value = DEFAULT_FILE_NAME)]
    pub member_file: String,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download URLs into the cache and print their local paths
    Fetch(FetchArgs),

    /// Print the cache path each URL maps to, without downloading
    Path {
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// List cached entries
    List,

    /// Remove the entries of the given URLs, or everything with --all
    Clear {
        urls: Vec<String>,

        #[arg(long, conflicts_with = "urls")]
        all: bool,
    },
}

#[derive(Args)]
pub struct FetchArgs {
    /// URLs to fetch
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for a single download (default 0: disabled)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Read timeout in seconds (maximum time between receiving data chunks)"
    )]
    pub read_timeout: u64,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Disable all proxy settings for downloads
    #[arg(long, help = "Ignore system proxy settings")]
    pub no_proxy: bool,

    /// Streaming buffer size in bytes
    #[arg(long, default_value = "8192")]
    pub chunk_size: usize,

    /// Where temporary archive copies are written
    #[arg(long, value_name = "DIR", help = "Directory for temporary archive copies (default: system temp dir)")]
    pub scratch_dir: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}
