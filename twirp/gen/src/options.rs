//! Extraction of method options and auth markers from proto comments.
//!
//! Two conventions are recognized:
//!
//! - a trailing comment containing `<prefix>:<value>` attaches an option value
//!   to the method (the generated dispatcher tags the context with it)
//! - a leading comment line consisting solely of `@auth` marks the method (or
//!   every method of the service) as requiring an authenticated user
//!
//! Both are resolved once, when the schema is loaded, into
//! [`MethodOptions`](crate::schema::MethodOptions).

use regex::Regex;

use crate::errors::GeneratorError;

/// The marker line that requests authentication.
pub const AUTH_MARKER: &str = "@auth";

/// Compiled `<prefix>:([^:\s]+)` pattern.
#[derive(Debug, Clone)]
pub struct OptionMatcher {
    pattern: Regex,
}

impl OptionMatcher {
    /// Compiles the option pattern for `prefix`.
    ///
    /// The prefix is used as a regular expression fragment, not escaped.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::ConfigError` if the resulting pattern does not
    /// compile.
    pub fn new(prefix: &str) -> Result<Self, GeneratorError> {
        let pattern = Regex::new(&format!(r"{}:([^:\s]+)", prefix)).map_err(|e| {
            GeneratorError::ConfigError(format!("invalid option_prefix '{}': {}", prefix, e))
        })?;
        Ok(Self { pattern })
    }

    /// Returns the first captured option value in `comment`, if any.
    ///
    /// ## Examples
    ///
    /// ```
    /// use twirp_gen::options::OptionMatcher;
    ///
    /// let matcher = OptionMatcher::new("auth_prefix").unwrap();
    /// assert_eq!(matcher.extract(" auth_prefix:special\n"), Some("special".to_string()));
    /// assert_eq!(matcher.extract(" nothing here\n"), None);
    /// ```
    pub fn extract(&self, comment: &str) -> Option<String> {
        self.pattern
            .captures(comment)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Extracts a method option from comment text using `prefix`.
///
/// Convenience wrapper around [`OptionMatcher`] for one-off lookups.
///
/// ## Errors
///
/// Returns `GeneratorError::ConfigError` if `prefix` is not a valid pattern.
pub fn extract_method_option(comment: &str, prefix: &str) -> Result<Option<String>, GeneratorError> {
    Ok(OptionMatcher::new(prefix)?.extract(comment))
}

/// Returns true if `comment` has a line that is exactly the auth marker.
///
/// The marker line must be terminated by a newline; surrounding whitespace on
/// that line is ignored (protoc keeps the space after `//`).
pub fn has_auth_marker(comment: &str) -> bool {
    comment
        .split_inclusive('\n')
        .any(|line| line.ends_with('\n') && line.trim() == AUTH_MARKER)
}

/// Returns true if either the method's or the service's leading comment
/// carries the auth marker.
pub fn needs_auth(method_comment: &str, service_comment: &str) -> bool {
    has_auth_marker(method_comment) || has_auth_marker(service_comment)
}
