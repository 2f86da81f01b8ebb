//! Code generation for one proto file.
//!
//! Each submodule renders one part of the generated file as a
//! `proc_macro2::TokenStream`:
//!
//! - [`imports`] - runtime imports and foreign package imports
//! - [`interface`] - the async service trait
//! - [`client`] - protobuf and JSON clients implementing the trait
//! - [`server`] - server type, router and service metadata accessors
//! - [`handler`] - the per-wire-format request handlers
//! - [`form`] - field decoding for form-encoded requests
//!
//! Everything a generator needs about the file being emitted travels in a
//! [`FileContext`]; nothing is read from generator-wide state.
//!
//! See [`crate::output`] for verification and formatting.

pub mod client;
pub mod form;
pub mod handler;
pub mod imports;
pub mod interface;
pub mod server;

pub use client::{ClientKind, generate_client};
pub use form::generate_form_decoders;
pub use handler::{WireFormat, generate_handler};
pub use imports::generate_imports;
pub use interface::generate_interface;
pub use server::generate_server;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use crate::config::GeneratorConfig;
use crate::deps::DependencyMap;
use crate::naming::{field_ident, rust_ident, to_constant_case, to_upper_camel_case};
use crate::options::AUTH_MARKER;
use crate::schema::{MessageRef, Method, Schema, Service};

/// Everything known about the file currently being generated.
#[derive(Debug)]
pub struct FileContext<'a> {
    pub schema: &'a Schema,
    pub config: &'a GeneratorConfig,
    pub deps: DependencyMap,
    /// Alias the protocol runtime is imported under.
    pub twirp: Ident,
    /// Alias the context helpers are imported under.
    pub ctxkit: Ident,
    /// Name of the static holding the packed descriptor.
    pub descriptor_var: Ident,
}

impl<'a> FileContext<'a> {
    pub fn new(
        schema: &'a Schema,
        config: &'a GeneratorConfig,
        twirp_alias: &str,
        ctxkit_alias: &str,
        descriptor_var: &str,
    ) -> Self {
        Self {
            deps: DependencyMap::collect(schema, &config.extern_paths),
            schema,
            config,
            twirp: rust_ident(twirp_alias),
            ctxkit: rust_ident(ctxkit_alias),
            descriptor_var: Ident::new(descriptor_var, Span::call_site()),
        }
    }

    /// Type reference to `message` from inside this file.
    pub fn type_tokens(&self, message: &MessageRef) -> TokenStream {
        self.deps
            .type_tokens(message, &self.schema.package, &self.config.extern_paths)
    }

    /// Human readable name of `message` for generated messages.
    pub fn type_name(&self, message: &MessageRef) -> String {
        self.deps
            .type_name(message, &self.schema.package, &self.config.extern_paths)
    }

    /// `Result<Option<Output>, twirp::Error>` for `method`.
    pub fn result_type(&self, method: &Method) -> TokenStream {
        let twirp = &self.twirp;
        let output = self.type_tokens(&method.output);
        quote! {
            ::core::result::Result<::core::option::Option<#output>, #twirp::Error>
        }
    }
}

/// Rust name of the service trait.
pub fn service_trait_ident(service: &Service) -> Ident {
    rust_ident(&to_upper_camel_case(&service.name))
}

/// Rust name of the server type.
pub fn server_ident(service: &Service) -> Ident {
    format_ident!("{}Server", service_trait_ident(service))
}

/// Name of the path prefix constant.
pub fn path_prefix_ident(service: &Service) -> Ident {
    format_ident!("{}_PATH_PREFIX", to_constant_case(&service.name))
}

/// Path prefix shared by every method of `service`, with trailing slash.
pub fn path_prefix(service: &Service) -> String {
    format!("/{}/", service.full_name)
}

/// Full request path of `method`.
pub fn path_for(service: &Service, method: &Method) -> String {
    format!("{}{}", path_prefix(service), method.name)
}

/// Rust name of the trait method.
pub fn method_ident(method: &Method) -> Ident {
    field_ident(&method.name)
}

/// Name of the content-type dispatcher for `method`.
pub fn dispatcher_ident(method: &Method) -> Ident {
    format_ident!("serve_{}", method_ident(method).to_string().trim_start_matches("r#"))
}

/// `#[doc]` attributes carrying a leading comment, one per line.
///
/// The auth marker is a directive, not documentation, and is left out.
pub fn doc_attrs(comment: &str) -> TokenStream {
    let text = comment.strip_suffix('\n').unwrap_or(comment);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end())
        .filter(|line| line.trim() != AUTH_MARKER)
        .collect();
    if lines.iter().all(|line| line.trim().is_empty()) {
        return TokenStream::new();
    }
    quote! { #(#[doc = #lines])* }
}
