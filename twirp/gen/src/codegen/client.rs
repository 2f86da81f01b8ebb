//! Client generation.
//!
//! Two clients are generated per service, one per request encoding. Both
//! implement the service trait, so callers can swap a client for an
//! in-process implementation.

use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::codegen::{FileContext, method_ident, path_prefix_ident, service_trait_ident};
use crate::schema::Service;

/// The request encoding a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Protobuf,
    Json,
}

impl ClientKind {
    /// Both kinds, in emission order.
    pub const ALL: [ClientKind; 2] = [ClientKind::Protobuf, ClientKind::Json];

    /// Name used in the client type and section banner.
    pub fn name(self) -> &'static str {
        match self {
            Self::Protobuf => "Protobuf",
            Self::Json => "Json",
        }
    }

    /// Banner title for the client section.
    pub fn banner(self, service: &Service) -> String {
        let label = match self {
            Self::Protobuf => "Protobuf",
            Self::Json => "JSON",
        };
        format!("{} {} Client", service.name, label)
    }

    fn request_fn(self) -> &'static str {
        match self {
            Self::Protobuf => "do_protobuf_request",
            Self::Json => "do_json_request",
        }
    }
}

/// Generates one client type for `service`.
///
/// ## Examples
///
/// ```ignore
/// pub struct GreeterJsonClient<C> {
///     client: C,
///     urls: [::std::string::String; 1],
/// }
///
/// impl<C> GreeterJsonClient<C> {
///     pub fn new(addr: &str, client: C) -> Self { ... }
/// }
///
/// #[twirp::async_trait]
/// impl<C> Greeter for GreeterJsonClient<C>
/// where
///     C: twirp::HttpClient + Send + Sync + 'static,
/// {
///     async fn greet(&self, ctx: twirp::Context, req: HelloReq) -> ... {
///         let ctx = twirp::with_package_name(ctx, "pkg");
///         let ctx = twirp::with_service_name(ctx, "Greeter");
///         let ctx = twirp::with_method_name(ctx, "Greet");
///         let out: HelloReply = twirp::do_json_request(ctx, &self.client, &self.urls[0], &req).await?;
///         Ok(Some(out))
///     }
/// }
/// ```
pub fn generate_client(ctx: &FileContext<'_>, service: &Service, kind: ClientKind) -> TokenStream {
    let twirp = &ctx.twirp;
    let trait_name = service_trait_ident(service);
    let client_name = format_ident!("{}{}Client", trait_name, kind.name());
    let prefix_const = path_prefix_ident(service);
    let request_fn = format_ident!("{}", kind.request_fn());
    let package = &ctx.schema.package;
    let service_name = &service.name;
    let method_count = Literal::usize_unsuffixed(service.methods.len());

    let doc = format!(
        " Calls a `{}` server using the {} encoding.",
        trait_name,
        kind.name().to_lowercase()
    );
    let url_names = service.methods.iter().map(|m| m.name.as_str());

    let methods = service.methods.iter().enumerate().map(|(i, method)| {
        let i = Literal::usize_unsuffixed(i);
        let name = method_ident(method);
        let method_name = &method.name;
        let input = ctx.type_tokens(&method.input);
        let output = ctx.type_tokens(&method.output);
        let result = ctx.result_type(method);
        quote! {
            async fn #name(&self, ctx: #twirp::Context, req: #input) -> #result {
                let ctx = #twirp::with_package_name(ctx, #package);
                let ctx = #twirp::with_service_name(ctx, #service_name);
                let ctx = #twirp::with_method_name(ctx, #method_name);
                let out: #output =
                    #twirp::#request_fn(ctx, &self.client, &self.urls[#i], &req).await?;
                Ok(Some(out))
            }
        }
    });

    quote! {
        #[doc = #doc]
        pub struct #client_name<C> {
            client: C,
            urls: [::std::string::String; #method_count],
        }

        impl<C> #client_name<C> {
            /// Creates a client for the server at `addr`, sending requests through `client`.
            pub fn new(addr: &str, client: C) -> Self {
                let prefix = format!("{}{}", addr, #prefix_const);
                let urls = [#(format!("{}{}", prefix, #url_names)),*];
                Self { client, urls }
            }
        }

        #[#twirp::async_trait]
        impl<C> #trait_name for #client_name<C>
        where
            C: #twirp::HttpClient + Send + Sync + 'static,
        {
            #(#methods)*
        }
    }
}
