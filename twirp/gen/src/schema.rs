//! In-memory service schema built from protoc descriptors.
//!
//! The generator never works on raw descriptors directly. Loading resolves
//! every method's input and output message (possibly from another proto
//! package), extracts the documentation comments, and turns comment markers
//! into a typed [`MethodOptions`] table, so code generation only does lookups.

use std::collections::HashMap;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use tracing::warn;

use crate::config::GeneratorConfig;
use crate::errors::GeneratorError;
use crate::naming::{to_snake_case, to_upper_camel_case};
use crate::options::{OptionMatcher, needs_auth};

/// `FileDescriptorProto.service` field number.
const FILE_SERVICE_FIELD: i32 = 6;

/// `ServiceDescriptorProto.method` field number.
const SERVICE_METHOD_FIELD: i32 = 2;

/// Leading and trailing documentation attached to a service or method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub leading: String,
    pub trailing: String,
}

/// Scalar kinds the form decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float32,
    Float64,
    /// Anything else; skipped by form decoding.
    Unsupported,
}

impl FieldKind {
    fn from_descriptor(field: &FieldDescriptorProto) -> Self {
        // prost moves oneof members into a separate enum, so they cannot be
        // assigned as plain struct fields.
        if field.oneof_index.is_some() && !field.proto3_optional() {
            return Self::Unsupported;
        }
        match field.r#type() {
            Type::String => Self::String,
            Type::Bool => Self::Bool,
            Type::Int32 => Self::Int32,
            Type::Int64 => Self::Int64,
            Type::Uint32 => Self::Uint32,
            Type::Uint64 => Self::Uint64,
            Type::Float => Self::Float32,
            Type::Double => Self::Float64,
            _ => Self::Unsupported,
        }
    }
}

/// A field of an input message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Proto field name; also the form key.
    pub name: String,
    pub kind: FieldKind,
    pub repeated: bool,
    /// Rendered by prost as `Option<T>` (proto3 `optional`, proto2 `optional`).
    pub optional: bool,
}

/// Output messages shaped like `google.api.HttpBody` bypass the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBody {
    /// The message also carries an `int32 status` field.
    pub has_status: bool,
}

/// A resolved reference to a message used as method input or output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Fully qualified proto name with leading dot.
    pub proto_name: String,
    /// Proto package the message belongs to.
    pub package: String,
    /// Rust path of the type inside its package module (`outer::Inner`).
    pub type_path: Vec<String>,
    pub fields: Vec<Field>,
    pub raw_body: Option<RawBody>,
}

impl MessageRef {
    /// The type path joined with `::`.
    pub fn rust_name(&self) -> String {
        self.type_path.join("::")
    }
}

/// Options resolved from comment markers when the schema is loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodOptions {
    /// Value tagged onto the request context before dispatch.
    pub option: Option<String>,
    /// Requests must carry an authenticated user id.
    pub requires_auth: bool,
}

/// One RPC method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// Proto method name; used verbatim in URLs.
    pub name: String,
    pub input: MessageRef,
    pub output: MessageRef,
    pub comments: Comments,
    pub options: MethodOptions,
}

/// One RPC service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    /// `package.Service`, or just `Service` without a package.
    pub full_name: String,
    pub methods: Vec<Method>,
    pub comments: Comments,
}

/// One proto source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Path of the proto file as given to protoc.
    pub name: String,
    pub package: String,
    pub services: Vec<Service>,
    /// The descriptor as received, packed into the generated file.
    pub descriptor: FileDescriptorProto,
}

impl Schema {
    /// File name without the `.proto` extension.
    pub fn generated_filename_prefix(&self) -> &str {
        self.name.strip_suffix(".proto").unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone)]
struct IndexedMessage {
    package: String,
    type_path: Vec<String>,
    fields: Vec<Field>,
    raw_body: Option<RawBody>,
}

/// Every message of every descriptor, keyed by fully qualified name.
#[derive(Debug, Default)]
struct MessageIndex {
    messages: HashMap<String, IndexedMessage>,
}

impl MessageIndex {
    fn build(files: &[FileDescriptorProto]) -> Self {
        let mut index = Self::default();
        for file in files {
            let package = file.package().to_string();
            let prefix = if package.is_empty() {
                String::new()
            } else {
                format!(".{}", package)
            };
            let proto2 = matches!(file.syntax(), "" | "proto2");
            for message in &file.message_type {
                index.add(&package, &prefix, &[], proto2, message);
            }
        }
        index
    }

    fn add(
        &mut self,
        package: &str,
        prefix: &str,
        parents: &[String],
        proto2: bool,
        message: &DescriptorProto,
    ) {
        let proto_name = format!("{}.{}", prefix, message.name());

        let mut type_path: Vec<String> = parents.iter().map(|p| to_snake_case(p)).collect();
        type_path.push(to_upper_camel_case(message.name()));

        self.messages.insert(
            proto_name.clone(),
            IndexedMessage {
                package: package.to_string(),
                type_path,
                fields: message
                    .field
                    .iter()
                    .map(|f| Field {
                        name: f.name().to_string(),
                        kind: FieldKind::from_descriptor(f),
                        repeated: f.label() == Label::Repeated,
                        optional: renders_as_option(f, proto2),
                    })
                    .collect(),
                raw_body: raw_body_shape(message),
            },
        );

        let mut nested_parents = parents.to_vec();
        nested_parents.push(message.name().to_string());
        for nested in &message.nested_type {
            self.add(package, &proto_name, &nested_parents, proto2, nested);
        }
    }

    fn resolve(&self, proto_name: &str) -> Option<MessageRef> {
        self.messages.get(proto_name).map(|m| MessageRef {
            proto_name: proto_name.to_string(),
            package: m.package.clone(),
            type_path: m.type_path.clone(),
            fields: m.fields.clone(),
            raw_body: m.raw_body,
        })
    }
}

/// prost renders proto3 `optional` and proto2 `optional` scalars as `Option<T>`.
fn renders_as_option(field: &FieldDescriptorProto, proto2: bool) -> bool {
    field.proto3_optional()
        || (proto2 && field.label() == Label::Optional && field.oneof_index.is_none())
}

fn raw_body_shape(message: &DescriptorProto) -> Option<RawBody> {
    let has = |name: &str, ty: Type| {
        message
            .field
            .iter()
            .any(|f| f.name() == name && f.r#type() == ty && f.label() != Label::Repeated)
    };
    if has("content_type", Type::String) && has("data", Type::Bytes) {
        Some(RawBody {
            has_status: has("status", Type::Int32),
        })
    } else {
        None
    }
}

fn comments_at(file: &FileDescriptorProto, path: &[i32]) -> Comments {
    file.source_code_info
        .as_ref()
        .and_then(|info| info.location.iter().find(|loc| loc.path == path))
        .map(|loc| Comments {
            leading: loc.leading_comments().to_string(),
            trailing: loc.trailing_comments().to_string(),
        })
        .unwrap_or_default()
}

/// Builds schemas for the files protoc asked us to generate.
///
/// `files` must contain every descriptor the requested files depend on, in
/// any order. Files with zero services are skipped.
///
/// ## Errors
///
/// Returns `GeneratorError::SchemaError` if a requested file is missing or a
/// method references an unknown message, and `GeneratorError::ConfigError`
/// if the option prefix does not compile.
pub fn load_schemas(
    files: &[FileDescriptorProto],
    file_to_generate: &[String],
    config: &GeneratorConfig,
) -> Result<Vec<Schema>, GeneratorError> {
    let index = MessageIndex::build(files);
    let matcher = OptionMatcher::new(&config.option_prefix)?;

    let mut schemas = Vec::new();
    for name in file_to_generate {
        let file = files.iter().find(|f| f.name() == name).ok_or_else(|| {
            GeneratorError::SchemaError(format!("file to generate '{}' not in request", name))
        })?;
        if file.service.is_empty() {
            continue;
        }
        schemas.push(load_schema(file, &index, &matcher)?);
    }
    Ok(schemas)
}

fn load_schema(
    file: &FileDescriptorProto,
    index: &MessageIndex,
    matcher: &OptionMatcher,
) -> Result<Schema, GeneratorError> {
    let package = file.package().to_string();
    let mut services = Vec::with_capacity(file.service.len());

    for (si, service) in file.service.iter().enumerate() {
        let service_comments = comments_at(file, &[FILE_SERVICE_FIELD, si as i32]);
        let full_name = if package.is_empty() {
            service.name().to_string()
        } else {
            format!("{}.{}", package, service.name())
        };

        let mut methods = Vec::with_capacity(service.method.len());
        for (mi, method) in service.method.iter().enumerate() {
            if method.client_streaming() || method.server_streaming() {
                warn!(
                    service = %full_name,
                    method = method.name(),
                    "streaming is not supported, generating a unary handler"
                );
            }

            let resolve = |type_name: &str| {
                index.resolve(type_name).ok_or_else(|| {
                    GeneratorError::SchemaError(format!(
                        "method {}.{} references unknown message '{}'",
                        full_name,
                        method.name(),
                        type_name
                    ))
                })
            };

            let comments = comments_at(
                file,
                &[FILE_SERVICE_FIELD, si as i32, SERVICE_METHOD_FIELD, mi as i32],
            );
            let options = MethodOptions {
                option: matcher
                    .extract(&comments.trailing)
                    .or_else(|| matcher.extract(&service_comments.trailing)),
                requires_auth: needs_auth(&comments.leading, &service_comments.leading),
            };

            methods.push(Method {
                name: method.name().to_string(),
                input: resolve(method.input_type())?,
                output: resolve(method.output_type())?,
                comments,
                options,
            });
        }

        services.push(Service {
            name: service.name().to_string(),
            full_name,
            methods,
            comments: service_comments,
        });
    }

    Ok(Schema {
        name: file.name().to_string(),
        package,
        services,
        descriptor: file.clone(),
    })
}
