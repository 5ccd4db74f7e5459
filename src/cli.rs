use clap::{Parser, Subcommand};

use crate::config::{Config, StorageConfig};

/// CLI entry point so operators can inspect and reset crawl state.
/// Exit codes: 0=success, 2=invalid arguments, 3=config error, 4=store/network error
#[derive(Parser, Debug)]
#[command(name = "crawl-state")]
#[command(about = "Inspect and manage Redis-backed crawl state")]
#[command(version)]
pub struct Cli {
    #[arg(
        long,
        env = "REDIS_URL",
        default_value = Config::DEFAULT_REDIS_URL,
        global = true,
        help = "Redis connection URL"
    )]
    pub redis_url: String,

    #[arg(
        short,
        long,
        default_value = Config::DEFAULT_PREFIX,
        global = true,
        help = "Key prefix of the crawl to operate on"
    )]
    pub prefix: String,

    #[arg(
        long,
        default_value_t = Config::DEFAULT_EXPIRATION_SECS,
        global = true,
        help = "Visited marker retention in seconds (0 keeps markers forever)"
    )]
    pub expiration: u64,

    #[arg(
        long,
        default_value_t = Config::DEFAULT_TIMEOUT_SECS,
        global = true,
        help = "Deadline in seconds for the whole command (0 = none)"
    )]
    pub timeout: u64,

    #[arg(long, global = true, help = "Also write JSON logs to this directory")]
    pub log_dir: Option<String>,

    #[arg(short, long, global = true, help = "Debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that Redis answers.
    Ping,

    /// Show queue length and key counts for the prefix.
    Stats {
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },

    /// Delete every visited marker, cookie record and queued request of the prefix.
    Clear {
        #[arg(long, help = "Confirm the irreversible delete")]
        yes: bool,
    },

    /// Enqueue one request per argument.
    Push {
        #[arg(required = true, help = "Request payloads")]
        payloads: Vec<String>,
    },

    /// Dequeue the oldest requests.
    Pop {
        #[arg(short = 'n', long, default_value_t = 1, help = "How many to pop")]
        count: usize,
    },

    /// Mark a request id as visited.
    MarkVisited { id: u64 },

    /// Check whether a request id is visited.
    IsVisited { id: u64 },

    /// Print the stored cookies for a URL's origin.
    GetCookies { url: String },

    /// Replace the stored cookies for a URL's origin.
    SetCookies { url: String, cookies: String },
}

impl Cli {
    /// Parse CLI arguments so the rest of the program can rely on structured options.
    /// On error, clap prints help and exits with code 2 (usage error).
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            redis_url: self.redis_url.clone(),
            prefix: self.prefix.clone(),
            expiration_secs: self.expiration,
            timeout_secs: self.timeout,
        }
    }
}
