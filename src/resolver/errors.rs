//! Proxy lookup errors.

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A failed attempt to resolve one project against one proxy.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request to {url} failed")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: Url, status: StatusCode },

    #[error("failed to decode response from {url}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("lookup of `{project}` cancelled")]
    Cancelled { project: String },
}

impl LookupError {
    /// The URL involved, if a request was attempted.
    pub fn url(&self) -> Option<&Url> {
        match self {
            LookupError::Request { url, .. }
            | LookupError::Status { url, .. }
            | LookupError::Decode { url, .. } => Some(url),
            LookupError::Cancelled { .. } => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::warning(self.to_string());
        match self {
            LookupError::Status { status, .. } if *status == StatusCode::NOT_FOUND => diag
                .with_context("the proxy does not know this module")
                .with_suggestion("Check the `package` spelling in the manifest"),
            LookupError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                diag.with_suggestion("Add credentials for the proxy host to your netrc file")
            }
            LookupError::Cancelled { .. } => diag,
            _ => diag.with_suggestion(suggestions::LOOKUP_FAILED),
        }
    }
}
