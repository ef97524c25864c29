//! Resolution of `latest` version pins.
//!
//! The manifest only depends on the [`LatestResolver`] trait; [`ProxyClient`]
//! is the implementation that talks to Go module proxies.

pub mod endpoints;
pub mod errors;
pub mod escape;
pub mod proxy;

use std::collections::{BTreeMap, BTreeSet};

use crate::util::cancel::CancelToken;
use crate::util::errors::AggregateError;

pub use endpoints::{parse_proxy_list, EndpointProvider, ProxyList, StaticEndpoints};
pub use errors::LookupError;
pub use escape::{escape_path, unescape_path};
pub use proxy::{LatestInfo, ProxyClient};

/// Outcome of one resolution batch.
///
/// `versions` may be non-empty even when `errors` is not: a project that
/// failed on one proxy and succeeded on the next shows up in both.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Package path to concrete version
    pub versions: BTreeMap<String, String>,
    pub errors: AggregateError,
}

/// Resolves the latest version of a set of packages.
pub trait LatestResolver: Send + Sync {
    fn resolve_latest(&self, packages: &BTreeSet<String>, cancel: &CancelToken) -> Resolution;
}
