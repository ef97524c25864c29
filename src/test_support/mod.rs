//! Test utilities shared by unit tests.
//!
//! Provides descriptor-tree fixtures and a resolver stub that answers from a
//! fixed table without any network access.

pub mod fixtures;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::resolver::{LatestResolver, Resolution};
use crate::util::cancel::CancelToken;

pub use fixtures::*;

/// Resolver answering from a fixed table and recording every request.
#[derive(Debug, Default)]
pub struct StubResolver {
    versions: BTreeMap<String, String>,
    calls: Mutex<Vec<BTreeSet<String>>>,
}

impl StubResolver {
    pub fn new() -> Self {
        StubResolver::default()
    }

    pub fn with_version(mut self, package: &str, version: &str) -> Self {
        self.versions
            .insert(package.to_string(), version.to_string());
        self
    }

    /// Package sets passed to each `resolve_latest` call, in order.
    pub fn calls(&self) -> Vec<BTreeSet<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl LatestResolver for StubResolver {
    fn resolve_latest(&self, packages: &BTreeSet<String>, _cancel: &CancelToken) -> Resolution {
        self.calls.lock().unwrap().push(packages.clone());

        let mut resolution = Resolution::default();
        for package in packages {
            match self.versions.get(package) {
                Some(version) => {
                    resolution
                        .versions
                        .insert(package.clone(), version.clone());
                }
                None => resolution
                    .errors
                    .push(anyhow::anyhow!("no stub version for {}", package)),
            }
        }
        resolution
    }
}
