//! Run configuration.
//!
//! Everything the core reads from the process environment is gathered here
//! once, at startup, and then passed down by reference. The resolver and the
//! credential loader never look at environment variables themselves.
//!
//! | Variable  | Meaning                                        |
//! |-----------|------------------------------------------------|
//! | `GOPROXY` | Proxy list, `,` or `|` separated               |
//! | `NETRC`   | Credentials file (default `~/.netrc`)          |

use std::path::PathBuf;
use std::time::Duration;

use directories::BaseDirs;

use crate::util::netrc::{Machines, NetrcError};

/// Environment variable holding the proxy list.
pub const PROXY_ENV: &str = "GOPROXY";

/// Environment variable overriding the netrc location.
pub const NETRC_ENV: &str = "NETRC";

/// Proxy list used when none is configured.
pub const DEFAULT_PROXY_LIST: &str = "https://proxy.golang.org,direct";

/// Upper bound for a single proxy request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one versionist run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Raw proxy list in `GOPROXY` syntax
    pub proxy_list: String,

    /// Credentials file, if one could be located
    pub netrc_path: Option<PathBuf>,

    /// Timeout applied to each proxy request
    pub request_timeout: Duration,

    /// Worker ceiling (0 = available parallelism)
    pub jobs: usize,

    /// User-Agent sent with proxy requests
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            proxy_list: DEFAULT_PROXY_LIST.to_string(),
            netrc_path: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            jobs: 0,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("versionist/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), default_netrc_path())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// `home_netrc` is used when `NETRC` is not set.
    pub fn from_lookup<F>(lookup: F, home_netrc: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            proxy_list: lookup(PROXY_ENV).unwrap_or_else(|| DEFAULT_PROXY_LIST.to_string()),
            netrc_path: lookup(NETRC_ENV).map(PathBuf::from).or(home_netrc),
            ..Config::default()
        }
    }

    pub fn with_proxy_list(mut self, proxy_list: impl Into<String>) -> Self {
        self.proxy_list = proxy_list.into();
        self
    }

    pub fn with_netrc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.netrc_path = Some(path.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Load the configured netrc file.
    pub fn load_machines(&self) -> Result<Machines, NetrcError> {
        match &self.netrc_path {
            Some(path) => Machines::load(path),
            None => Err(NetrcError::NoLocation),
        }
    }
}

/// `~/.netrc`, when a home directory can be determined.
pub fn default_netrc_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".netrc"))
}
