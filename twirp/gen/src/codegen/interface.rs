//! Service trait generation.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::{FileContext, doc_attrs, method_ident, service_trait_ident};
use crate::schema::Service;

/// Generates the async trait a server implements and the clients provide.
///
/// Leading comments of the service and its methods become doc comments.
///
/// ## Examples
///
/// For `service Greeter { rpc Greet(HelloReq) returns (HelloReply); }`:
///
/// ```ignore
/// #[twirp::async_trait]
/// pub trait Greeter: Send + Sync + 'static {
///     async fn greet(
///         &self,
///         ctx: twirp::Context,
///         req: HelloReq,
///     ) -> ::core::result::Result<::core::option::Option<HelloReply>, twirp::Error>;
/// }
/// ```
///
/// Returning `Ok(None)` is the "no result and no error" case, which servers
/// reject as an internal error.
pub fn generate_interface(ctx: &FileContext<'_>, service: &Service) -> TokenStream {
    let twirp = &ctx.twirp;
    let trait_name = service_trait_ident(service);
    let docs = doc_attrs(&service.comments.leading);

    let methods = service.methods.iter().map(|method| {
        let docs = doc_attrs(&method.comments.leading);
        let name = method_ident(method);
        let input = ctx.type_tokens(&method.input);
        let result = ctx.result_type(method);
        quote! {
            #docs
            async fn #name(&self, ctx: #twirp::Context, req: #input) -> #result;
        }
    });

    quote! {
        #docs
        #[#twirp::async_trait]
        pub trait #trait_name: Send + Sync + 'static {
            #(#methods)*
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::test_utils::{format_generated_code, greeter_schema};

    #[test]
    fn generates_async_trait() {
        let schema = greeter_schema();
        let config = GeneratorConfig::default();
        let ctx = FileContext::new(&schema, &config, "twirp", "ctxkit", "DESC");

        let code = format_generated_code(&generate_interface(&ctx, &schema.services[0])).unwrap();

        assert!(code.contains("#[twirp::async_trait]"));
        assert!(code.contains("pub trait Greeter: Send + Sync + 'static {"));
        assert!(code.contains("async fn greet("));
        assert!(code.contains("ctx: twirp::Context"));
        assert!(code.contains("req: HelloReq"));
        assert!(code.contains("::core::option::Option<HelloReply>"));
    }

    #[test]
    fn keeps_leading_comments_as_docs() {
        let mut schema = greeter_schema();
        schema.services[0].comments.leading = " Says hello.\n".to_string();
        schema.services[0].methods[0].comments.leading = " Greets someone.\n Politely.\n".to_string();
        let config = GeneratorConfig::default();
        let ctx = FileContext::new(&schema, &config, "twirp", "ctxkit", "DESC");

        let code = format_generated_code(&generate_interface(&ctx, &schema.services[0])).unwrap();

        assert!(code.contains("/// Says hello.\n"));
        assert!(code.contains("/// Greets someone.\n"));
        assert!(code.contains("/// Politely.\n"));
    }

    #[test]
    fn uses_registered_alias() {
        let schema = greeter_schema();
        let config = GeneratorConfig::default();
        let ctx = FileContext::new(&schema, &config, "twirp2", "ctxkit", "DESC");

        let code = format_generated_code(&generate_interface(&ctx, &schema.services[0])).unwrap();

        assert!(code.contains("#[twirp2::async_trait]"));
        assert!(code.contains("twirp2::Error"));
    }
}
