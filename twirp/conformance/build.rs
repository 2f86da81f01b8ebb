//! Build script that runs the generator over `greeter.proto` and writes the
//! result to OUT_DIR, where `src/pb.rs` includes it.
//!
//! The descriptor is built by hand, with the source info protoc would attach,
//! so building this crate needs no protoc install.

use std::env;
use std::fs;
use std::path::Path;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo,
};
use twirp_gen::config::GeneratorConfig;
use twirp_gen::generator::Generator;

fn field(name: &str, number: i32, ty: Type, label: Label) -> FieldDescriptorProto {
    let mut field = FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        json_name: Some(name.to_string()),
        ..Default::default()
    };
    field.set_type(ty);
    field.set_label(label);
    field
}

fn hello_fields() -> Vec<FieldDescriptorProto> {
    vec![
        field("ids", 2, Type::Int64, Label::Repeated),
        field("on", 3, Type::Bool, Label::Optional),
    ]
}

fn message(name: &str, first: FieldDescriptorProto) -> DescriptorProto {
    let mut fields = vec![first];
    fields.extend(hello_fields());
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(".pkg.HelloReq".to_string()),
        output_type: Some(".pkg.HelloReply".to_string()),
        ..Default::default()
    }
}

fn comment(path: &[i32], leading: Option<&str>, trailing: Option<&str>) -> Location {
    Location {
        path: path.to_vec(),
        span: vec![0, 0, 0],
        leading_comments: leading.map(str::to_string),
        trailing_comments: trailing.map(str::to_string),
        ..Default::default()
    }
}

fn greeter_proto() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("greeter.proto".to_string()),
        package: Some("pkg".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message("HelloReq", field("name", 1, Type::String, Label::Optional)),
            message("HelloReply", field("message", 1, Type::String, Label::Optional)),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("Greeter".to_string()),
            method: vec![method("Greet"), method("Whoami")],
            ..Default::default()
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                comment(&[6, 0], Some(" Greeter greets people.\n"), None),
                comment(
                    &[6, 0, 2, 0],
                    Some(" Greet says hello.\n"),
                    Some(" method_option:public\n"),
                ),
                comment(
                    &[6, 0, 2, 1],
                    Some(" Whoami reports the caller.\n @auth\n"),
                    None,
                ),
            ],
        }),
        ..Default::default()
    }
}

fn main() {
    println!("cargo::rerun-if-changed=build.rs");
    println!("cargo::rerun-if-changed=../gen/src");

    let config = GeneratorConfig {
        validate_enable: true,
        ..Default::default()
    };
    let mut generator = Generator::new(config).expect("default config is valid");
    let files = generator
        .generate(&[greeter_proto()], &["greeter.proto".to_string()])
        .unwrap_or_else(|e| panic!("generating greeter.proto: {e}"));

    let out_dir = env::var("OUT_DIR").unwrap();
    for file in files {
        let dest_path = Path::new(&out_dir).join(&file.name);
        fs::write(&dest_path, file.content).unwrap();
    }
}
