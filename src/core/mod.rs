//! Core data model: manifests, matchers and descriptor files.

pub mod manifest;
pub mod matcher;
pub mod modfile;

pub use manifest::{Manifest, ManifestError, Project};
pub use matcher::Matcher;
pub use modfile::{ModFile, ParseError, Requirement};
