//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Fetch resolved share-link files into a local cache directory.
///
/// URLs come from positional arguments, from stdin (one per line), or from a
/// resolver listing passed with --share-json.
#[derive(Parser, Debug)]
#[command(name = "sharefetch")]
#[command(author, version, about)]
pub struct Args {
    /// Direct download URLs to fetch
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Read files to fetch from a resolver listing (JSON)
    #[arg(long, value_name = "FILE")]
    pub share_json: Option<PathBuf>,

    /// Directory that receives fetched files [default: cache]
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-100) [default: 4]
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Allow HTTP/2 instead of forcing HTTP/1.1
    #[arg(long)]
    pub allow_http2: bool,

    /// Store gzip-encoded bodies as received instead of decoding them
    #[arg(long)]
    pub no_gzip: bool,

    /// Send desktop Firefox request headers
    #[arg(long)]
    pub browser_headers: bool,

    /// Seconds to wait for response headers (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub header_timeout: Option<u64>,

    /// Overall per-request timeout in seconds (1-3600) [default: 300]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Connect timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout: Option<u64>,

    /// Config file path [default: $XDG_CONFIG_HOME/sharefetch/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
