//! Error types for the twirp generator.

use thiserror::Error;

/// Errors that can occur during code generation.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The plugin request (or descriptor set) could not be decoded.
    #[error("Failed to decode plugin input: {0}")]
    DecodeError(#[from] prost::DecodeError),

    /// The schema references something that cannot be resolved.
    #[error("Invalid schema: {0}")]
    SchemaError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to generate code
    #[error("Code generation failed: {0}")]
    CodeGenError(String),

    /// The emitted source did not parse.
    ///
    /// This is always a defect in the generator itself. The listing holds the
    /// raw emitted text annotated with line numbers.
    #[error("bad Rust source code was generated: {message}\n{listing}")]
    InvalidGeneratedCode {
        /// Parser diagnostic.
        message: String,
        /// Line-numbered copy of the offending text.
        listing: String,
    },

    /// Failed to write output file
    #[error("Failed to write output file '{path}': {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read plugin input or write the plugin response.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
