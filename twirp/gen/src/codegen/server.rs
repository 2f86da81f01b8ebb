//! Server generation: server type, router and content-type dispatch.

use proc_macro2::{Literal, TokenStream};
use quote::quote;

use crate::VERSION;
use crate::codegen::handler::{WireFormat, generate_handler, handler_ident};
use crate::codegen::{
    FileContext, dispatcher_ident, path_for, path_prefix, path_prefix_ident, server_ident,
    service_trait_ident,
};
use crate::schema::{Method, Service};

/// Generates the content-type dispatcher for `method`.
///
/// The media type is the header value up to the first `;`, trimmed and
/// lowercased. Anything other than JSON or protobuf is treated as a form.
fn generate_dispatcher(ctx: &FileContext<'_>, method: &Method) -> TokenStream {
    let twirp = &ctx.twirp;
    let name = dispatcher_ident(method);

    let option = match &method.options.option {
        Some(value) => quote! {
            let ctx = #twirp::with_method_option(ctx, #value);
        },
        None => TokenStream::new(),
    };

    let arms = WireFormat::ALL.iter().map(|format| {
        let handler = handler_ident(method, *format);
        let pattern = match format.media_type() {
            Some(media_type) => quote!(#media_type),
            None => quote!(_),
        };
        quote! {
            #pattern => self.#handler(ctx, req, resp).await,
        }
    });

    quote! {
        async fn #name(
            &self,
            ctx: #twirp::Context,
            req: &mut #twirp::Request,
            resp: &mut dyn #twirp::ResponseWriter,
        ) {
            let header = req.header("Content-Type").unwrap_or_default();
            let media_type = header
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_lowercase();
            #option
            match media_type.as_str() {
                #(#arms)*
            }
        }
    }
}

/// Generates the router body of `serve_http`.
fn generate_router(ctx: &FileContext<'_>, service: &Service) -> TokenStream {
    let twirp = &ctx.twirp;
    let package = &ctx.schema.package;
    let service_name = &service.name;

    let routes = service.methods.iter().map(|method| {
        let path = path_for(service, method);
        let dispatcher = dispatcher_ident(method);
        quote! {
            #path => self.#dispatcher(ctx, req, resp).await,
        }
    });

    quote! {
        async fn serve_http(
            &self,
            req: &mut #twirp::Request,
            resp: &mut dyn #twirp::ResponseWriter,
        ) {
            let ctx = req.context();
            let ctx = #twirp::with_http_request(ctx, req);
            let ctx = #twirp::with_package_name(ctx, #package);
            let ctx = #twirp::with_service_name(ctx, #service_name);
            let ctx = match self.hooks.call_request_received(&ctx) {
                Ok(ctx) => ctx,
                Err(err) => {
                    self.write_error(&ctx, resp, err);
                    return;
                }
            };

            if req.method() != "POST" && !#twirp::allow_get(&ctx) {
                let msg = format!("unsupported method {:?} (only POST is allowed)", req.method());
                let err = Self::bad_route_error(msg, req.method(), req.path());
                self.write_error(&ctx, resp, err);
                return;
            }

            let path = req.path().to_owned();
            match path.as_str() {
                #(#routes)*
                _ => {
                    let msg = format!("no handler for path {:?}", path);
                    let err = Self::bad_route_error(msg, req.method(), &path);
                    self.write_error(&ctx, resp, err);
                }
            }
        }
    }
}

/// Generates the server for `service`.
///
/// ## Examples
///
/// ```ignore
/// pub const GREETER_PATH_PREFIX: &str = "/pkg.Greeter/";
///
/// pub struct GreeterServer<S> {
///     service: S,
///     hooks: twirp::ServerHooks,
/// }
///
/// impl<S: Greeter> GreeterServer<S> {
///     pub fn new(service: S, hooks: twirp::ServerHooks) -> Self { ... }
///     async fn serve_greet(...) { ... }
///     async fn serve_greet_json(...) { ... }
///     async fn serve_greet_protobuf(...) { ... }
///     async fn serve_greet_form(...) { ... }
/// }
///
/// #[twirp::async_trait]
/// impl<S: Greeter> twirp::Server for GreeterServer<S> {
///     async fn serve_http(&self, req: &mut twirp::Request, resp: &mut dyn twirp::ResponseWriter) { ... }
///     fn service_descriptor(&self) -> (&'static [u8], usize) { ... }
///     fn protoc_gen_twirp_version(&self) -> &'static str { ... }
/// }
/// ```
pub fn generate_server(ctx: &FileContext<'_>, service: &Service, index: usize) -> TokenStream {
    let twirp = &ctx.twirp;
    let trait_name = service_trait_ident(service);
    let server = server_ident(service);
    let prefix_const = path_prefix_ident(service);
    let prefix = path_prefix(service);
    let descriptor_var = &ctx.descriptor_var;
    let index = Literal::usize_unsuffixed(index);

    let prefix_doc = format!(
        " Used for all URL paths on a twirp `{}` server. Requests are always `POST {}<Method>`.",
        trait_name, prefix
    );

    let methods = service.methods.iter().map(|method| {
        let dispatcher = generate_dispatcher(ctx, method);
        let handlers = WireFormat::ALL
            .iter()
            .map(|format| generate_handler(ctx, method, *format));
        quote! {
            #dispatcher
            #(#handlers)*
        }
    });
    let router = generate_router(ctx, service);

    quote! {
        #[doc = #prefix_doc]
        pub const #prefix_const: &str = #prefix;

        pub struct #server<S> {
            service: S,
            hooks: #twirp::ServerHooks,
        }

        impl<S: #trait_name> #server<S> {
            pub fn new(service: S, hooks: #twirp::ServerHooks) -> Self {
                Self { service, hooks }
            }

            /// Writes a twirp error response and triggers hooks. Errors that
            /// are not twirp errors are reported as internal errors.
            fn write_error(
                &self,
                ctx: &#twirp::Context,
                resp: &mut dyn #twirp::ResponseWriter,
                err: impl Into<#twirp::Error>,
            ) {
                self.hooks.write_error(ctx, resp, err.into());
            }

            /// Used when the server cannot route a request.
            fn bad_route_error(msg: String, method: &str, url: &str) -> #twirp::Error {
                #twirp::Error::new(#twirp::ErrorCode::BadRoute, msg)
                    .with_meta("twirp_invalid_route", format!("{} {}", method, url))
            }

            #(#methods)*
        }

        #[#twirp::async_trait]
        impl<S: #trait_name> #twirp::Server for #server<S> {
            #router

            fn service_descriptor(&self) -> (&'static [u8], usize) {
                (#descriptor_var, #index)
            }

            fn protoc_gen_twirp_version(&self) -> &'static str {
                #VERSION
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::schema::Schema;
    use crate::test_utils::{
        format_generated_code, greeter_file, greeter_schema, load_one, location,
        validate_generated_code,
    };
    use prost_types::SourceCodeInfo;

    fn render(schema: &Schema, index: usize) -> String {
        let config = GeneratorConfig::default();
        let ctx = FileContext::new(schema, &config, "twirp", "ctxkit", "DESC");
        let tokens = generate_server(&ctx, &schema.services[0], index);
        validate_generated_code(&tokens).unwrap();
        format_generated_code(&tokens).unwrap()
    }

    #[test]
    fn declares_path_prefix_and_server_type() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains(r#"pub const GREETER_PATH_PREFIX: &str = "/pkg.Greeter/";"#));
        assert!(code.contains("pub struct GreeterServer<S> {"));
        assert!(code.contains("hooks: twirp::ServerHooks,"));
        assert!(code.contains("impl<S: Greeter> twirp::Server for GreeterServer<S> {"));
    }

    #[test]
    fn write_error_converts_into_twirp_errors() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains("err: impl Into<twirp::Error>,"));
        assert!(code.contains("self.hooks.write_error(ctx, resp, err.into());"));
    }

    #[test]
    fn bad_route_errors_carry_method_and_url() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains("twirp::ErrorCode::BadRoute"));
        assert!(code.contains(r#""twirp_invalid_route""#));
        assert!(code.contains(r#"format!("{} {}", method, url)"#));
    }

    #[test]
    fn router_only_accepts_post_unless_get_is_allowed() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains(r#"if req.method() != "POST" && !twirp::allow_get(&ctx) {"#));
        assert!(code.contains("unsupported method {:?} (only POST is allowed)"));
    }

    #[test]
    fn router_matches_exact_paths() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains("match path.as_str() {"));
        assert!(code.contains(r#""/pkg.Greeter/Greet" => self.serve_greet(ctx, req, resp).await,"#));
        assert!(code.contains("no handler for path {:?}"));
    }

    #[test]
    fn router_runs_request_received_hook_first() {
        let code = render(&greeter_schema(), 0);

        let tagged = code.find(r#"twirp::with_service_name(ctx, "Greeter")"#).unwrap();
        let received = code.find("self.hooks.call_request_received(&ctx)").unwrap();
        let method_check = code.find(r#"req.method() != "POST""#).unwrap();
        assert!(tagged < received && received < method_check);
    }

    #[test]
    fn dispatcher_routes_on_media_type() {
        let code = render(&greeter_schema(), 0);

        assert!(code.contains(r#"req.header("Content-Type").unwrap_or_default()"#));
        assert!(code.contains(".split(';')"));
        assert!(code.contains(".to_lowercase()"));
        assert!(code.contains(r#""application/json" => self.serve_greet_json(ctx, req, resp).await,"#));
        assert!(code.contains(
            r#""application/protobuf" => self.serve_greet_protobuf(ctx, req, resp).await,"#
        ));
        assert!(code.contains("_ => self.serve_greet_form(ctx, req, resp).await,"));
        assert!(!code.contains("with_method_option"));
    }

    #[test]
    fn dispatcher_tags_method_option() {
        let mut file = greeter_file();
        file.source_code_info = Some(SourceCodeInfo {
            location: vec![location(&[6, 0, 2, 0], "", " method_option:special\n")],
        });
        let schema = load_one(file, &GeneratorConfig::default());
        let code = render(&schema, 0);

        let option = code.find(r#"twirp::with_method_option(ctx, "special")"#).unwrap();
        let branch = code.find("match media_type.as_str() {").unwrap();
        assert!(option < branch);
    }

    #[test]
    fn metadata_accessors_return_descriptor_index_and_version() {
        let code = render(&greeter_schema(), 2);

        assert!(code.contains("fn service_descriptor(&self) -> (&'static [u8], usize) {"));
        assert!(code.contains("(DESC, 2)"));
        assert!(code.contains("fn protoc_gen_twirp_version(&self) -> &'static str {"));
        assert!(code.contains(r#""v0.1.0""#));
    }

    #[test]
    fn every_method_gets_three_handlers() {
        let code = render(&greeter_schema(), 0);

        for name in [
            "async fn serve_greet(",
            "async fn serve_greet_json(",
            "async fn serve_greet_protobuf(",
            "async fn serve_greet_form(",
        ] {
            assert!(code.contains(name), "missing {}", name);
        }
    }
}
