//! Shared test utilities for twirp-gen tests.
//!
//! Builders for hand-written descriptors, so tests do not need protoc.

use proc_macro2::TokenStream;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo,
};

use crate::config::GeneratorConfig;
use crate::schema::{Schema, load_schemas};

/// Creates a field descriptor.
pub fn field(name: &str, ty: Type, repeated: bool) -> FieldDescriptorProto {
    let mut field = FieldDescriptorProto {
        name: Some(name.to_string()),
        ..Default::default()
    };
    field.set_type(ty);
    field.set_label(if repeated {
        Label::Repeated
    } else {
        Label::Optional
    });
    field
}

/// Creates a message descriptor.
pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

/// Creates a unary method descriptor.
pub fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input.to_string()),
        output_type: Some(output.to_string()),
        ..Default::default()
    }
}

/// Creates a service descriptor.
pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
        ..Default::default()
    }
}

/// Creates a file descriptor.
pub fn file_with(
    name: &str,
    package: &str,
    messages: Vec<DescriptorProto>,
    services: Vec<ServiceDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_string()),
        package: Some(package.to_string()),
        message_type: messages,
        service: services,
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Creates a source location carrying comments.
pub fn location(path: &[i32], leading: &str, trailing: &str) -> Location {
    Location {
        path: path.to_vec(),
        span: vec![0, 0, 0],
        leading_comments: (!leading.is_empty()).then(|| leading.to_string()),
        trailing_comments: (!trailing.is_empty()).then(|| trailing.to_string()),
        ..Default::default()
    }
}

/// `pkg.Greeter` with a single `Greet(HelloReq) -> HelloReply` method.
pub fn greeter_file() -> FileDescriptorProto {
    let mut file = file_with(
        "greeter.proto",
        "pkg",
        vec![
            message("HelloReq", vec![field("name", Type::String, false)]),
            message("HelloReply", vec![field("message", Type::String, false)]),
        ],
        vec![service(
            "Greeter",
            vec![method("Greet", ".pkg.HelloReq", ".pkg.HelloReply")],
        )],
    );
    file.source_code_info = Some(SourceCodeInfo {
        location: vec![location(&[4, 0], " A greeting request.\n", "")],
    });
    file
}

/// Loads a single file with the given configuration.
pub fn load_one(file: FileDescriptorProto, config: &GeneratorConfig) -> Schema {
    let name = file.name().to_string();
    load_schemas(&[file], &[name], config)
        .expect("fixture should load")
        .remove(0)
}

/// The greeter fixture loaded with the default configuration.
pub fn greeter_schema() -> Schema {
    load_one(greeter_file(), &GeneratorConfig::default())
}

/// Validates generated code using syn.
pub fn validate_generated_code(tokens: &TokenStream) -> Result<(), String> {
    syn::parse2::<syn::File>(tokens.clone()).map_err(|e| e.to_string())?;
    Ok(())
}

/// Formats generated code using prettyplease.
pub fn format_generated_code(tokens: &TokenStream) -> Result<String, String> {
    let file = syn::parse2::<syn::File>(tokens.clone()).map_err(|e| e.to_string())?;
    Ok(prettyplease::unparse(&file))
}
