//! Twirp code generator library.
//!
//! This crate is the engine behind the `protoc-gen-twirp` protoc plugin. For
//! every proto file that declares services it generates a Rust source file
//! containing:
//!
//! - An async service trait per service
//! - A protobuf client and a JSON client implementing that trait
//! - A server type that routes `POST /<pkg>.<Service>/<Method>` requests,
//!   decodes JSON, protobuf or form bodies, runs server hooks, and contains
//!   panics raised by the service
//! - The gzipped source descriptor, exposed through the server
//!
//! Generated files are meant to be `include!`d next to the `prost` message
//! types of the same proto package.
//!
//! ## Modules
//!
//! - [`plugin`] - protoc plugin protocol and offline descriptor-set mode
//! - [`generator`] - per-run orchestration
//! - [`schema`] - descriptor loading and method option resolution
//! - [`codegen`] - code generation for the individual parts of a file
//! - [`output`] - verification, formatting and file writing
//! - [`errors`] - error types for the generator
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::io;
//!
//! // Acts as a protoc plugin: request on stdin, response on stdout.
//! twirp_gen::plugin::run(io::stdin().lock(), io::stdout().lock()).unwrap();
//! ```
//!
//! ## Generated Code Structure
//!
//! For `service Greeter { rpc Greet(HelloReq) returns (HelloReply); }` in
//! package `pkg`:
//!
//! ```text
//! #[twirp::async_trait]
//! pub trait Greeter: Send + Sync + 'static {
//!     async fn greet(&self, ctx: twirp::Context, req: HelloReq)
//!         -> Result<Option<HelloReply>, twirp::Error>;
//! }
//!
//! pub struct GreeterProtobufClient<C> { ... }
//! pub struct GreeterJsonClient<C> { ... }
//!
//! pub const GREETER_PATH_PREFIX: &str = "/pkg.Greeter/";
//! pub struct GreeterServer<S> { ... }
//! impl<S: Greeter> twirp::Server for GreeterServer<S> { ... }
//!
//! static TWIRP_FILE_DESCRIPTOR_0_SHA...: &[u8] = &[ ... ];
//! ```

pub mod codegen;
pub mod config;
pub mod deps;
pub mod descriptor;
pub mod emitter;
pub mod errors;
pub mod generator;
pub mod naming;
pub mod options;
pub mod output;
pub mod plugin;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_utils;

/// Version stamped into every generated file and reported by generated servers.
pub const VERSION: &str = "v0.1.0";
