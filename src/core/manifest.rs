//! The version manifest.
//!
//! A manifest pins a Go toolchain version and an ordered list of projects.
//! Each project carries the version every matching requirement should be set
//! to, and the rules that decide which module paths it covers.
//!
//! ```yaml
//! go_version: "1.21"
//! projects:
//!   - package: go.opentelemetry.io/collector
//!     version: latest
//!     match:
//!       - regexp:^go.opentelemetry.io/collector/.*$
//!   - package: go.uber.org/zap
//!     version: v1.27.0
//! ```
//!
//! Manifests ending in `.toml` are read as TOML with the same fields.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::core::matcher::{Matcher, REGEX_PREFIX};
use crate::resolver::LatestResolver;
use crate::util::cancel::CancelToken;
use crate::util::errors::AggregateError;

/// Version sentinel resolved through the module proxy.
pub const LATEST: &str = "latest";

/// Version reported by [`Manifest::check`] when nothing matches.
pub const DEFAULT_VERSION: &str = "v0.0.0";

/// Errors raised while loading a manifest. All of them are fatal.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum ManifestError {
    #[error("failed to read manifest {}", path.display())]
    #[diagnostic(code(versionist::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest")]
    #[diagnostic(
        code(versionist::manifest::yaml),
        help("only `go_version` and `projects` are accepted at the top level")
    )]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse manifest")]
    #[diagnostic(
        code(versionist::manifest::toml),
        help("only `go_version` and `projects` are accepted at the top level")
    )]
    Toml(#[from] toml::de::Error),

    #[error("invalid match `{entry}` for project `{package}`")]
    #[diagnostic(
        code(versionist::manifest::invalid_match),
        help("match expressions must start with `regexp:`")
    )]
    InvalidMatch { package: String, entry: String },

    #[error("invalid regular expression `{pattern}` for project `{package}`")]
    #[diagnostic(code(versionist::manifest::invalid_regex))]
    InvalidRegex {
        package: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Manifest document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Yaml,
    Toml,
}

impl ManifestFormat {
    /// Pick the format from the file extension; anything but `.toml` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ManifestFormat::Toml,
            _ => ManifestFormat::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestRecord {
    go_version: String,
    #[serde(default)]
    projects: Vec<ProjectRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectRecord {
    package: String,
    version: String,
    #[serde(default, rename = "match")]
    matches: Vec<String>,
}

/// One pinned project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    package: String,
    version: String,
    /// Always starts with an exact matcher on `package`
    matchers: Vec<Matcher>,
}

impl Project {
    /// Create a project that matches only its own package path.
    pub fn new(package: impl Into<String>, version: impl Into<String>) -> Self {
        let package = package.into();
        Project {
            matchers: vec![Matcher::exact(package.clone())],
            package,
            version: version.into(),
        }
    }

    /// Add a match expression in manifest syntax (`regexp:<pattern>`).
    pub fn with_match(mut self, entry: &str) -> Result<Self, ManifestError> {
        let Some(pattern) = entry.strip_prefix(REGEX_PREFIX) else {
            return Err(ManifestError::InvalidMatch {
                package: self.package.clone(),
                entry: entry.to_string(),
            });
        };
        let re = Regex::new(pattern).map_err(|source| ManifestError::InvalidRegex {
            package: self.package.clone(),
            pattern: pattern.to_string(),
            source,
        })?;
        self.matchers.push(Matcher::Regex(re));
        Ok(self)
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Whether the version still has to be resolved.
    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }

    /// Whether any rule of this project covers `path`.
    pub fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }

    fn from_record(record: ProjectRecord) -> Result<Self, ManifestError> {
        record
            .matches
            .iter()
            .try_fold(Project::new(record.package, record.version), |p, entry| {
                p.with_match(entry)
            })
    }
}

/// The authoritative list of version pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    go_version: String,
    projects: Vec<Project>,
}

impl Manifest {
    pub fn new(go_version: impl Into<String>, projects: Vec<Project>) -> Self {
        Manifest {
            go_version: go_version.into(),
            projects,
        }
    }

    /// Load and validate a manifest file.
    ///
    /// `latest` pins are left as they are; see [`Manifest::resolve_latest`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, ManifestFormat::from_path(path))
    }

    /// Parse manifest content.
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, ManifestError> {
        let record: ManifestRecord = match format {
            ManifestFormat::Yaml => serde_yaml::from_str(content)?,
            ManifestFormat::Toml => toml::from_str(content)?,
        };

        let projects = record
            .projects
            .into_iter()
            .map(Project::from_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Manifest {
            go_version: record.go_version,
            projects,
        })
    }

    pub fn go_version(&self) -> &str {
        &self.go_version
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// The first project, in declaration order, with a rule matching `path`.
    pub fn find_project(&self, path: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.matches(path))
    }

    /// Look up the pinned version for a module path.
    ///
    /// Returns the version of the first matching project and `true`, or
    /// [`DEFAULT_VERSION`] and `false` when no project matches. A later,
    /// more specific project never overrides an earlier match.
    pub fn check(&self, path: &str) -> (&str, bool) {
        match self.find_project(path) {
            Some(project) => (project.version(), true),
            None => (DEFAULT_VERSION, false),
        }
    }

    /// Packages still pinned to `latest`.
    pub fn latest_packages(&self) -> BTreeSet<String> {
        self.projects
            .iter()
            .filter(|p| p.is_latest())
            .map(|p| p.package.clone())
            .collect()
    }

    /// Replace `latest` pins with the versions the resolver finds.
    ///
    /// Lookup failures are returned, not raised: projects the resolver could
    /// not answer keep their `latest` pin and are skipped during
    /// reconciliation.
    pub fn resolve_latest(
        &mut self,
        resolver: &dyn LatestResolver,
        cancel: &CancelToken,
    ) -> AggregateError {
        let packages = self.latest_packages();
        if packages.is_empty() {
            return AggregateError::new();
        }

        tracing::info!("Resolving {} latest versions", packages.len());
        let resolution = resolver.resolve_latest(&packages, cancel);

        for project in self.projects.iter_mut().filter(|p| p.is_latest()) {
            match resolution.versions.get(&project.package) {
                Some(version) => {
                    tracing::info!("Resolved {} to {}", project.package, version);
                    project.version = version.clone();
                }
                None => tracing::warn!("Could not resolve latest version of {}", project.package),
            }
        }

        resolution.errors
    }
}
