//! Shared utilities

pub mod cancel;
pub mod config;
pub mod diagnostic;
pub mod errors;
pub mod netrc;
pub mod parallel;
pub mod request;
pub mod walk;

pub use cancel::CancelToken;
pub use config::Config;
pub use diagnostic::Diagnostic;
pub use errors::AggregateError;
pub use parallel::ParallelMapper;
pub use walk::WalkedFileSet;
