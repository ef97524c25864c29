//! User-facing diagnostics for the command line.
//!
//! Errors are printed with their root cause, any related context lines and,
//! where one exists, a suggested fix.

use std::fmt;
use std::path::PathBuf;

use crate::util::errors::AggregateError;

/// Common suggestion messages.
pub mod suggestions {
    /// Proxy lookups failed.
    pub const LOOKUP_FAILED: &str =
        "Check GOPROXY and your network connection; unresolved `latest` pins were left untouched";

    /// Some descriptor files could not be processed.
    pub const SCAN_FAILED: &str = "Run with --verbose to see each file as it is processed";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related file
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Build a diagnostic listing every error of an aggregate as context.
    pub fn from_aggregate(message: impl Into<String>, errors: &AggregateError) -> Self {
        errors
            .iter()
            .fold(Diagnostic::error(message), |diag, err| {
                diag.with_context(format!("{:#}", err))
            })
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = match (color, self.severity) {
            (true, Severity::Error) => "\x1b[1;31merror\x1b[0m".to_string(),
            (true, Severity::Warning) => "\x1b[1;33mwarning\x1b[0m".to_string(),
            (false, severity) => severity.to_string(),
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  - {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            for suggestion in &self.suggestions {
                output.push_str(&format!("{}: {}\n", help_prefix, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("failed to load manifest")
            .with_location("versionist.yml")
            .with_context("unknown match `example.com/*`")
            .with_suggestion("Prefix match expressions with `regexp:`");

        let output = diag.format(false);
        assert!(output.starts_with("error: failed to load manifest"));
        assert!(output.contains("--> versionist.yml"));
        assert!(output.contains("unknown match"));
        assert!(output.contains("help: Prefix match expressions"));
    }

    #[test]
    fn test_from_aggregate_lists_each_error() {
        let mut errs = AggregateError::new();
        errs.push(anyhow::anyhow!("proxy one failed"));
        errs.push(anyhow::anyhow!("proxy two failed"));

        let diag = Diagnostic::from_aggregate("lookups failed", &errs);
        assert_eq!(diag.context.len(), 2);
        assert_eq!(diag.severity, Severity::Error);
        assert!(Diagnostic::warning("w").format(false).starts_with("warning: w"));
    }
}
