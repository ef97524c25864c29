//! Case-folding escape for module paths in proxy URLs.
//!
//! Module proxies serve case-insensitive file systems, so an uppercase letter
//! is written as `!` followed by its lowercase form:
//! `github.com/BurntSushi/toml` becomes `github.com/!burnt!sushi/toml`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnescapeError {
    #[error("invalid escaped path `{0}`: `!` must be followed by a lowercase letter")]
    DanglingBang(String),

    #[error("invalid escaped path `{0}`: unescaped uppercase letter")]
    Uppercase(String),
}

/// Escape a module path for use in a proxy URL.
pub fn escape_path(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if c.is_uppercase() {
            escaped.push('!');
            escaped.extend(c.to_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Reverse [`escape_path`].
pub fn unescape_path(escaped: &str) -> Result<String, UnescapeError> {
    let mut path = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();

    while let Some(c) = chars.next() {
        match c {
            '!' => match chars.next() {
                Some(next) if next.is_lowercase() => path.extend(next.to_uppercase()),
                _ => return Err(UnescapeError::DanglingBang(escaped.to_string())),
            },
            c if c.is_uppercase() => return Err(UnescapeError::Uppercase(escaped.to_string())),
            c => path.push(c),
        }
    }
    Ok(path)
}
