//! Generator configuration parsed from the protoc parameter string.
//!
//! protoc forwards everything after `--twirp_out=` and before `:` as a single
//! comma separated string, e.g.
//!
//! ```text
//! --twirp_out=option_prefix=auth_prefix,validate_enable=true:gen
//! ```
//!
//! ## Recognized keys
//!
//! - `option_prefix` - regex prefix used to pull method options out of trailing comments
//! - `twirp_package` - Rust path of the protocol runtime module
//! - `ctxkit_package` - Rust path of the context helpers used for auth checks
//! - `validate_enable` - whether validate (and auth) call sites are emitted
//! - `extern_path` - `.proto.package=::rust::path`, may be repeated

use crate::errors::GeneratorError;

/// Default option prefix for method option markers.
pub const DEFAULT_OPTION_PREFIX: &str = "method_option";

/// Default path of the protocol runtime.
pub const DEFAULT_TWIRP_PACKAGE: &str = "crate::util::twirp";

/// Default path of the context helpers.
pub const DEFAULT_CTXKIT_PACKAGE: &str = "crate::util::ctxkit";

/// Maps a proto package prefix onto an existing Rust module path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternPath {
    /// Fully qualified proto package with leading dot (e.g. `.google.protobuf`).
    pub proto_package: String,
    /// Rust path the package is reachable at (e.g. `::prost_types`).
    pub rust_path: String,
}

/// Configuration for one generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Pattern placed in front of `:([^:\s]+)` to extract method options.
    pub option_prefix: String,
    /// Rust path of the protocol runtime module.
    pub twirp_package: String,
    /// Rust path of the context helpers module.
    pub ctxkit_package: String,
    /// Emit `validate()` call sites and auth gating.
    pub validate_enable: bool,
    /// Foreign package overrides.
    pub extern_paths: Vec<ExternPath>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            option_prefix: DEFAULT_OPTION_PREFIX.to_string(),
            twirp_package: DEFAULT_TWIRP_PACKAGE.to_string(),
            ctxkit_package: DEFAULT_CTXKIT_PACKAGE.to_string(),
            validate_enable: false,
            extern_paths: Vec::new(),
        }
    }
}

impl GeneratorConfig {
    /// Parses a protoc parameter string.
    ///
    /// An absent or empty parameter yields the default configuration.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::ConfigError` for unknown keys, entries without
    /// `=`, non-boolean `validate_enable` values, or values that fail
    /// [`GeneratorConfig::validate`].
    ///
    /// ## Examples
    ///
    /// ```
    /// use twirp_gen::config::GeneratorConfig;
    ///
    /// let config = GeneratorConfig::from_parameter(Some("validate_enable=true")).unwrap();
    /// assert!(config.validate_enable);
    /// assert_eq!(config.option_prefix, "method_option");
    /// ```
    pub fn from_parameter(parameter: Option<&str>) -> Result<Self, GeneratorError> {
        let mut config = Self::default();
        let Some(parameter) = parameter else {
            return Ok(config);
        };

        for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                GeneratorError::ConfigError(format!("expected key=value, got '{}'", part))
            })?;
            match key.trim() {
                "option_prefix" => config.option_prefix = value.to_string(),
                "twirp_package" => config.twirp_package = value.to_string(),
                "ctxkit_package" => config.ctxkit_package = value.to_string(),
                "validate_enable" => config.validate_enable = parse_bool(key, value)?,
                "extern_path" => config.extern_paths.push(parse_extern_path(value)?),
                other => {
                    return Err(GeneratorError::ConfigError(format!(
                        "unknown parameter '{}'",
                        other
                    )));
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that every configured path is a valid Rust path and the option
    /// prefix compiles as a regular expression.
    ///
    /// ## Errors
    ///
    /// Returns `GeneratorError::ConfigError` naming the offending value.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        check_rust_path("twirp_package", &self.twirp_package)?;
        check_rust_path("ctxkit_package", &self.ctxkit_package)?;
        for extern_path in &self.extern_paths {
            check_rust_path("extern_path", &extern_path.rust_path)?;
        }
        crate::options::OptionMatcher::new(&self.option_prefix)?;
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, GeneratorError> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(GeneratorError::ConfigError(format!(
            "{} expects true or false, got '{}'",
            key, other
        ))),
    }
}

fn parse_extern_path(value: &str) -> Result<ExternPath, GeneratorError> {
    let (proto_package, rust_path) = value.split_once('=').ok_or_else(|| {
        GeneratorError::ConfigError(format!(
            "extern_path expects .proto.package=rust::path, got '{}'",
            value
        ))
    })?;
    let proto_package = if proto_package.starts_with('.') {
        proto_package.to_string()
    } else {
        format!(".{}", proto_package)
    };
    Ok(ExternPath {
        proto_package,
        rust_path: rust_path.to_string(),
    })
}

fn check_rust_path(key: &str, value: &str) -> Result<(), GeneratorError> {
    syn::parse_str::<syn::Path>(value).map(|_| ()).map_err(|e| {
        GeneratorError::ConfigError(format!("{} '{}' is not a Rust path: {}", key, value, e))
    })
}
