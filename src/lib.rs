//! Versionist - keep `go.mod` files in a source tree pinned to one manifest.
//!
//! A run loads the [`Manifest`], resolves any `latest` pins through the
//! configured Go module proxies, then rewrites every descriptor under the
//! root whose Go version or direct requirements disagree with it.

pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities shared by unit tests.
#[cfg(test)]
pub mod test_support;

pub use core::{
    manifest::Manifest, matcher::Matcher, manifest::Project, modfile::ModFile,
    modfile::Requirement,
};

pub use ops::{ReconcileOptions, ReconcileReport, Reconciler};
pub use resolver::{LatestResolver, ProxyClient, Resolution};
pub use util::{AggregateError, CancelToken, Config};
