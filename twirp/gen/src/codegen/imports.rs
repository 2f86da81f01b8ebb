//! Imports at the top of a generated file.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::FileContext;
use crate::errors::GeneratorError;

/// Generates the runtime imports and one `use` per foreign package.
///
/// The runtime modules are imported under the aliases handed out by the
/// run's [`NameRegistry`](crate::naming::NameRegistry). Not every file uses
/// the context helpers, so every import allows being unused.
///
/// ## Errors
///
/// Returns `GeneratorError::CodeGenError` if a configured or derived module
/// path is not a valid Rust path.
pub fn generate_imports(ctx: &FileContext<'_>) -> Result<TokenStream, GeneratorError> {
    let twirp_path = parse_path("twirp_package", &ctx.config.twirp_package)?;
    let ctxkit_path = parse_path("ctxkit_package", &ctx.config.ctxkit_package)?;
    let twirp = &ctx.twirp;
    let ctxkit = &ctx.ctxkit;
    let deps = ctx.deps.use_items()?;

    Ok(quote! {
        #[allow(unused_imports)]
        use #twirp_path as #twirp;
        #[allow(unused_imports)]
        use #ctxkit_path as #ctxkit;

        #deps
    })
}

fn parse_path(key: &str, value: &str) -> Result<syn::Path, GeneratorError> {
    syn::parse_str(value).map_err(|e| {
        GeneratorError::CodeGenError(format!("{} '{}' is not a Rust path: {}", key, value, e))
    })
}
