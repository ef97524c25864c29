//! Bounded parallel iteration over key/value collections.
//!
//! Both the proxy lookups and the descriptor rewrites go through
//! [`ParallelMapper`], so the two share one concurrency ceiling.

use std::num::NonZeroUsize;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::util::errors::AggregateError;

/// Number of workers used when no explicit ceiling is configured.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Runs fallible work over every entry of a collection on a fixed-size pool.
pub struct ParallelMapper {
    pool: rayon::ThreadPool,
    ceiling: usize,
}

impl ParallelMapper {
    /// Create a mapper with at most `ceiling` entries in flight.
    ///
    /// A ceiling of zero falls back to the available hardware parallelism.
    pub fn new(ceiling: usize) -> Result<Self> {
        let ceiling = if ceiling == 0 {
            default_parallelism()
        } else {
            ceiling
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(ceiling)
            .thread_name(|i| format!("versionist-worker-{}", i))
            .build()
            .context("failed to build worker pool")?;

        Ok(ParallelMapper { pool, ceiling })
    }

    /// Create a mapper sized to the available hardware parallelism.
    pub fn with_default_parallelism() -> Result<Self> {
        Self::new(default_parallelism())
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Apply `f` to every entry and wait for all of them.
    ///
    /// A failing entry never prevents the others from running. Every error is
    /// returned in the aggregate; entries run in no particular order.
    pub fn map_entries<I, K, V, F>(&self, entries: I, f: F) -> AggregateError
    where
        I: IntoIterator<Item = (K, V)>,
        K: Send,
        V: Send,
        F: Fn(K, V) -> Result<()> + Sync,
    {
        let entries: Vec<(K, V)> = entries.into_iter().collect();

        self.pool.install(|| {
            entries
                .into_par_iter()
                .filter_map(|(k, v)| f(k, v).err())
                .collect::<Vec<_>>()
        })
        .into_iter()
        .collect()
    }
}
