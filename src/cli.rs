//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use webdl_core::{DEFAULT_CONCURRENCY, FileType, parse_page_url};

/// Default destination directory for downloaded files.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Default directory for `downloads.log` and `errors.log`.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Download every file of one type linked from a web page.
///
/// Files already present in the output directory are skipped; each failed
/// download is retried once after all others have finished.
#[derive(Parser, Debug)]
#[command(name = "webdl")]
#[command(author, version, about)]
pub struct Args {
    /// Page to collect links from (absolute http or https URL)
    #[arg(value_parser = parse_page_url)]
    pub url: Url,

    /// File extension to download, e.g. pdf or .zip
    #[arg(value_parser = FileType::parse)]
    pub file_type: FileType,

    /// Directory the files are written to (created if absent)
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Directory holding downloads.log and errors.log (created if absent)
    #[arg(long, default_value = DEFAULT_LOGS_DIR)]
    pub logs_dir: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Render the page in headless Chromium before collecting links
    #[arg(long)]
    pub render: bool,

    /// Config file (default: $XDG_CONFIG_HOME/webdl/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
