//! CLI definitions using clap.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use versionist::util::Config;

/// Versionist - pin go.mod dependencies across a source tree to one manifest
#[derive(Parser)]
#[command(name = "versionist")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the manifest file
    #[arg(
        short,
        long = "config-path",
        env = "VERSIONIST_CONFIG",
        default_value = "versionist.yml"
    )]
    pub config_path: PathBuf,

    /// Root of the source tree (defaults to the manifest's directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Show what would change without writing any file
    #[arg(long)]
    pub dry_run: bool,

    /// Number of parallel workers (defaults to the number of CPUs)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Proxy list in GOPROXY syntax (overrides GOPROXY)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Credentials file (overrides NETRC)
    #[arg(long)]
    pub netrc: Option<PathBuf>,

    /// Timeout for each proxy request, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn config(&self) -> Config {
        let mut config =
            Config::from_env().with_request_timeout(Duration::from_secs(self.timeout));

        if let Some(proxy) = &self.proxy {
            config = config.with_proxy_list(proxy.clone());
        }
        if let Some(netrc) = &self.netrc {
            config = config.with_netrc_path(netrc.clone());
        }
        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        config
    }

    /// The tree to reconcile.
    pub fn root(&self) -> PathBuf {
        if let Some(root) = &self.root {
            return root.clone();
        }
        match self.config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        }
    }
}
