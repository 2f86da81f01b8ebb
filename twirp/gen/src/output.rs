//! Verification, formatting and writing of generated files.
//!
//! ## Safety Guarantees
//!
//! - **Validation**: the whole emitted text is parsed with `syn` before anything is formatted
//! - **Formatting**: code segments are formatted with `prettyplease`; banners and the packed descriptor keep their layout
//! - **Atomic writes**: uses temp file + rename so a file is never left half written

use std::fs;
use std::path::Path;

use crate::VERSION;
use crate::emitter::{Emitter, Segment, banner_text};
use crate::errors::GeneratorError;

/// Header placed above every generated file.
pub fn generated_header(source: &str) -> String {
    format!(
        "// Code generated by protoc-gen-twirp {}, DO NOT EDIT.\n// source: {}\n",
        VERSION, source
    )
}

/// Prefixes each line of `text` with its 1-based line number.
///
/// ```
/// use twirp_gen::output::number_lines;
///
/// assert_eq!(number_lines("a\nb"), "    1\ta\n    2\tb\n");
/// ```
pub fn number_lines(text: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("{:5}\t{}\n", i + 1, line))
        .collect()
}

/// Parses `text` as a complete Rust file.
///
/// ## Errors
///
/// Returns `GeneratorError::InvalidGeneratedCode` with a line-numbered copy
/// of `text` if it does not parse.
pub fn validate_source(text: &str) -> Result<syn::File, GeneratorError> {
    syn::parse_file(text).map_err(|e| GeneratorError::InvalidGeneratedCode {
        message: e.to_string(),
        listing: number_lines(text),
    })
}

/// Verifies the emitted buffer and renders the final file contents.
///
/// The whole buffer must parse before any segment is formatted. Code
/// segments are then pretty-printed one by one, banners are rendered as
/// comments and verbatim segments are copied unchanged.
///
/// ## Errors
///
/// Returns `GeneratorError::InvalidGeneratedCode` if the buffer, or any code
/// segment on its own, is not valid Rust.
pub fn format_generated(emitter: &Emitter, source: &str) -> Result<String, GeneratorError> {
    validate_source(&emitter.raw_text())?;

    let mut out = generated_header(source);
    for segment in emitter.segments() {
        match segment {
            Segment::Code(code) => {
                out.push('\n');
                out.push_str(&prettyplease::unparse(&validate_source(code)?));
            }
            Segment::Banner(title) => out.push_str(&banner_text(title)),
            Segment::Verbatim(text) => {
                out.push('\n');
                out.push_str(text);
            }
        }
    }
    Ok(out)
}

/// Writes content to a file atomically using temp file + rename.
///
/// ## Errors
///
/// Returns `GeneratorError::WriteError` if:
/// - Parent directories cannot be created
/// - The temp file cannot be written
/// - The rename operation fails
pub fn write_atomic(path: &Path, content: &str) -> Result<(), GeneratorError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| GeneratorError::WriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, content).map_err(|e| GeneratorError::WriteError {
        path: temp_path.display().to_string(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| GeneratorError::WriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use tempfile::TempDir;

    // === validation ===

    #[test]
    fn validate_source_accepts_valid_code() {
        assert!(validate_source("pub struct A;\nfn f() {}\n").is_ok());
    }

    #[test]
    fn validate_source_rejects_invalid_code_with_listing() {
        let result = validate_source("pub struct A;\nfn f( {\n");
        match result {
            Err(GeneratorError::InvalidGeneratedCode { listing, .. }) => {
                assert_eq!(listing, "    1\tpub struct A;\n    2\tfn f( {\n");
            }
            other => panic!("expected invalid code error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_code_error_displays_listing() {
        let err = validate_source("let x =").unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("bad Rust source code was generated: "));
        assert!(text.contains("    1\tlet x ="));
    }

    // === formatting ===

    #[test]
    fn format_generated_keeps_banners_and_verbatim() {
        let mut emitter = Emitter::new();
        emitter.emit(quote! { pub struct A { x: u32 } });
        emitter.section_banner("Greeter");
        emitter.emit_verbatim("static B: &[u8] = &[\n    0x01, 0x02,\n];\n");

        let out = format_generated(&emitter, "greeter.proto").unwrap();

        assert!(out.starts_with(
            "// Code generated by protoc-gen-twirp v0.1.0, DO NOT EDIT.\n// source: greeter.proto\n"
        ));
        assert!(out.contains("pub struct A {\n    x: u32,\n}\n"));
        assert!(out.contains("// =======\n// Greeter\n// =======\n"));
        assert!(out.contains("static B: &[u8] = &[\n    0x01, 0x02,\n];\n"));
        assert!(syn::parse_file(&out).is_ok());
    }

    #[test]
    fn format_generated_rejects_broken_verbatim_blocks() {
        let mut emitter = Emitter::new();
        emitter.emit(quote! { pub struct A; });
        emitter.emit_verbatim("static B: &[u8] = &[\n");

        assert!(matches!(
            format_generated(&emitter, "x.proto"),
            Err(GeneratorError::InvalidGeneratedCode { .. })
        ));
    }

    // === write_atomic ===

    #[test]
    fn write_atomic_creates_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("greeter.rpc.rs");

        write_atomic(&file_path, "// content").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "// content");
    }

    #[test]
    fn write_atomic_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("pkg/v1/greeter.rpc.rs");

        write_atomic(&file_path, "// nested").unwrap();

        assert!(file_path.exists());
    }

    #[test]
    fn write_atomic_overwrites_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("existing.rs");
        fs::write(&file_path, "// old").unwrap();

        write_atomic(&file_path, "// new").unwrap();

        assert_eq!(fs::read_to_string(&file_path).unwrap(), "// new");
        assert!(!file_path.with_extension("tmp").exists());
    }
}
