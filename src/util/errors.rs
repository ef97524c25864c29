//! Aggregate error for batch operations.
//!
//! Lookups and file iteration never stop at the first failure. Every error
//! produced by a batch is collected here and handed back to the caller as one
//! value.

use std::fmt;

/// A collection of errors produced by independent units of work.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<anyhow::Error>,
}

impl AggregateError {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        AggregateError { errors: Vec::new() }
    }

    /// Record one error.
    pub fn push(&mut self, err: impl Into<anyhow::Error>) {
        self.errors.push(err.into());
    }

    /// Absorb every error of another aggregate.
    pub fn extend(&mut self, other: AggregateError) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &anyhow::Error> {
        self.errors.iter()
    }

    /// Check whether any recorded error is (or wraps) an `E`.
    pub fn contains<E>(&self) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.errors
            .iter()
            .any(|e| e.chain().any(|cause| cause.downcast_ref::<E>().is_some()))
    }

    /// `Ok(())` when nothing was recorded, the aggregate otherwise.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no errors"),
            1 => write!(f, "{:#}", self.errors[0]),
            n => {
                write!(f, "{} errors occurred:", n)?;
                for err in &self.errors {
                    write!(f, "\n  - {:#}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for AggregateError {}

impl From<anyhow::Error> for AggregateError {
    fn from(err: anyhow::Error) -> Self {
        AggregateError { errors: vec![err] }
    }
}

impl FromIterator<anyhow::Error> for AggregateError {
    fn from_iter<I: IntoIterator<Item = anyhow::Error>>(iter: I) -> Self {
        AggregateError {
            errors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AggregateError {
    type Item = anyhow::Error;
    type IntoIter = std::vec::IntoIter<anyhow::Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
