use clap::Parser;
use derive_setters::Setters;
use std::path::PathBuf;
use std::time::Duration;

use crate::browser::{DEFAULT_PAGE_SIZE, PAGE_SIZES};
use crate::record::Collection;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Browse and manage portfolio blogs and projects.")]
pub struct Args {
    /// Base url of the portfolio api
    #[arg(long, env = "FOLIO_API", default_value = "http://localhost:5000/api/v1")]
    pub api: String,

    /// Access token used for create, update and delete
    #[arg(long, env = "FOLIO_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Sign in with this email to obtain a token
    #[arg(long, env = "FOLIO_EMAIL", requires = "password", conflicts_with = "token")]
    pub email: Option<String>,

    #[arg(long, env = "FOLIO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Browse a csv, parquet or arrow export instead of the api (read-only)
    #[arg(short, long, conflicts_with = "demo")]
    pub file: Option<String>,

    /// Browse built-in sample data
    #[arg(long)]
    pub demo: bool,

    #[arg(short, long, value_enum, default_value_t = Collection::Blogs)]
    pub collection: Collection,

    /// Rows per page: 5, 10, 20 or 50
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    pub page_size: usize,

    /// How long to wait for terminal events between redraws, in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,

    /// Request timeout for api calls, in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Where to write logs. Verbosity is read from FOLIO_LOG.
    #[arg(long, default_value = "~/.folio.log")]
    pub log_file: String,
}

fn parse_page_size(s: &str) -> Result<usize, String> {
    let size: usize = s.parse().map_err(|_| format!("\"{s}\" is not a number"))?;
    if PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("page size must be one of {PAGE_SIZES:?}"))
    }
}

/// Expands `~` and environment variables in user supplied paths.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

#[derive(Debug, Clone, Setters)]
pub struct FolioConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub collection: Collection,
    pub request_timeout: Duration,
}

impl Default for FolioConfig {
    fn default() -> Self {
        FolioConfig {
            event_poll_time: 100,
            page_size: DEFAULT_PAGE_SIZE,
            collection: Collection::Blogs,
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&Args> for FolioConfig {
    fn from(args: &Args) -> Self {
        FolioConfig::default()
            .event_poll_time(args.poll_ms)
            .page_size(args.page_size)
            .collection(args.collection)
            .request_timeout(Duration::from_secs(args.timeout_secs))
    }
}
