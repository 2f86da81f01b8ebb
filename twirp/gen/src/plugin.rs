//! protoc plugin protocol.
//!
//! protoc writes a `CodeGeneratorRequest` to the plugin's stdin and expects a
//! `CodeGeneratorResponse` on stdout. Errors are never reported through the
//! response: the binary prints them to stderr and exits non-zero, so protoc
//! sees no partial output.

use std::io::{Read, Write};
use std::path::Path;

use prost::Message;
use prost_types::FileDescriptorSet;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::errors::GeneratorError;
use crate::generator::{GeneratedFile, Generator};
use crate::output::write_atomic;

/// Decodes a serialized `CodeGeneratorRequest`.
///
/// ## Errors
///
/// Returns `GeneratorError::DecodeError` if `bytes` is not a valid request.
pub fn decode_request(bytes: &[u8]) -> Result<CodeGeneratorRequest, GeneratorError> {
    Ok(CodeGeneratorRequest::decode(bytes)?)
}

/// Runs one generation for a plugin request.
///
/// ## Errors
///
/// Returns the first configuration, schema or generation error.
pub fn handle_request(
    request: &CodeGeneratorRequest,
) -> Result<CodeGeneratorResponse, GeneratorError> {
    let config = GeneratorConfig::from_parameter(request.parameter.as_deref())?;
    debug!(
        parameter = request.parameter.as_deref().unwrap_or_default(),
        files = request.file_to_generate.len(),
        "handling plugin request"
    );

    let mut generator = Generator::new(config)?;
    let files = generator.generate(&request.proto_file, &request.file_to_generate)?;
    debug!(
        handled = generator.files_handled(),
        emitted = files.len(),
        "plugin request done"
    );

    Ok(CodeGeneratorResponse {
        file: files.into_iter().map(into_response_file).collect(),
        supported_features: Some(Feature::Proto3Optional as u64),
        ..Default::default()
    })
}

fn into_response_file(file: GeneratedFile) -> File {
    File {
        name: Some(file.name),
        content: Some(file.content),
        ..Default::default()
    }
}

/// Reads a request from `input`, generates, and writes the encoded response
/// to `output`.
///
/// Nothing is written to `output` unless generation succeeded for every file.
///
/// ## Errors
///
/// Returns I/O, decode and generation errors.
pub fn run<R: Read, W: Write>(mut input: R, mut output: W) -> Result<(), GeneratorError> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    let request = decode_request(&bytes)?;

    let response = handle_request(&request)?;
    output.write_all(&response.encode_to_vec())?;
    output.flush()?;
    Ok(())
}

/// Generates from a serialized `FileDescriptorSet`, as produced by
/// `protoc --descriptor_set_out --include_imports --include_source_info`.
///
/// When `files` is empty every file in the set is a candidate; files without
/// services are skipped as usual.
///
/// ## Errors
///
/// Returns decode, configuration, schema and generation errors.
pub fn generate_from_descriptor_set(
    bytes: &[u8],
    files: &[String],
    config: GeneratorConfig,
) -> Result<Vec<GeneratedFile>, GeneratorError> {
    let set = FileDescriptorSet::decode(bytes)?;
    let file_to_generate: Vec<String> = if files.is_empty() {
        set.file.iter().map(|f| f.name().to_string()).collect()
    } else {
        files.to_vec()
    };

    let mut generator = Generator::new(config)?;
    generator.generate(&set.file, &file_to_generate)
}

/// Writes generated files under `out_dir`, each one atomically.
///
/// ## Errors
///
/// Returns `GeneratorError::WriteError` for the first file that fails.
pub fn write_files(out_dir: &Path, files: &[GeneratedFile]) -> Result<(), GeneratorError> {
    for file in files {
        let path = out_dir.join(&file.name);
        write_atomic(&path, &file.content)?;
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}
