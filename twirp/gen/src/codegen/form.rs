//! Field decoding for form-encoded requests.
//!
//! For every supported scalar field of the input message the form handler
//! looks up the same-named form key and parses it:
//!
//! - repeated fields accept either several values (`ids=1&ids=2`) or a single
//!   comma separated value (`ids=1,2`)
//! - singular fields use the first value only
//! - the first value that fails to parse aborts the request with an
//!   invalid-argument error naming the field
//!
//! Fields of unsupported kinds are skipped without error.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::FileContext;
use crate::naming::field_ident;
use crate::schema::{Field, FieldKind, MessageRef};

impl FieldKind {
    /// Expression parsing the `&str` in `value` into this kind, evaluating to
    /// a `Result` whose error implements `Display`. `None` for strings, which
    /// need no parsing, and for unsupported kinds.
    fn parse_expr(self, value: TokenStream) -> Option<TokenStream> {
        let ty = match self {
            FieldKind::Bool => return Some(parse_bool(value)),
            FieldKind::Int32 => quote!(i32),
            FieldKind::Int64 => quote!(i64),
            FieldKind::Uint32 => quote!(u32),
            FieldKind::Uint64 => quote!(u64),
            FieldKind::Float32 => quote!(f32),
            FieldKind::Float64 => quote!(f64),
            FieldKind::String | FieldKind::Unsupported => return None,
        };
        Some(quote!(#value.parse::<#ty>()))
    }
}

/// Boolean spellings accepted from HTML forms: `1`, `t`, `T`, `TRUE`,
/// `true`, `True` and their false counterparts.
fn parse_bool(value: TokenStream) -> TokenStream {
    quote! {
        match #value {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            other => Err(format!("parsing {:?}: invalid syntax", other)),
        }
    }
}

/// Returns true if at least one field of `message` is form-decodable.
pub fn has_form_fields(message: &MessageRef) -> bool {
    message
        .fields
        .iter()
        .any(|f| f.kind != FieldKind::Unsupported)
}

/// Generates decoding statements for every supported field of `input`.
///
/// The statements expect `form`, `req_content`, `ctx` and `resp` in scope
/// and run inside a server method returning `()`.
pub fn generate_form_decoders(ctx: &FileContext<'_>, input: &MessageRef) -> TokenStream {
    input
        .fields
        .iter()
        .filter(|f| f.kind != FieldKind::Unsupported)
        .map(|field| {
            if field.repeated {
                repeated_decoder(ctx, field)
            } else {
                singular_decoder(ctx, field)
            }
        })
        .collect()
}

fn parse_error(ctx: &FileContext<'_>, field: &Field) -> TokenStream {
    let twirp = &ctx.twirp;
    let key = &field.name;
    quote! {
        self.write_error(&ctx, resp, #twirp::invalid_argument_error(#key, err.to_string()));
        return;
    }
}

fn repeated_decoder(ctx: &FileContext<'_>, field: &Field) -> TokenStream {
    let key = &field.name;
    let ident = field_ident(&field.name);

    let assign = match field.kind.parse_expr(quote!(vv)) {
        None => quote! {
            req_content.#ident = v.iter().map(|vv| vv.to_string()).collect();
        },
        Some(parse) => {
            let on_error = parse_error(ctx, field);
            quote! {
                let mut vs = ::std::vec::Vec::with_capacity(v.len());
                for vv in v {
                    let parsed = #parse;
                    match parsed {
                        Ok(vvv) => vs.push(vvv),
                        Err(err) => {
                            #on_error
                        }
                    }
                }
                req_content.#ident = vs;
            }
        }
    };

    quote! {
        if let Some(v) = form.get(#key) {
            let v: ::std::vec::Vec<&str> = if v.len() == 1 {
                v[0].split(',').collect()
            } else {
                v.iter().map(|vv| vv.as_str()).collect()
            };
            #assign
        }
    }
}

fn singular_decoder(ctx: &FileContext<'_>, field: &Field) -> TokenStream {
    let key = &field.name;
    let ident = field_ident(&field.name);
    let wrap = |value: TokenStream| {
        if field.optional {
            quote!(Some(#value))
        } else {
            value
        }
    };

    let assign = match field.kind.parse_expr(quote!(v.as_str())) {
        None => {
            let value = wrap(quote!(v.clone()));
            quote! {
                req_content.#ident = #value;
            }
        }
        Some(parse) => {
            let on_error = parse_error(ctx, field);
            let value = wrap(quote!(vv));
            quote! {
                let parsed = #parse;
                match parsed {
                    Ok(vv) => req_content.#ident = #value,
                    Err(err) => {
                        #on_error
                    }
                }
            }
        }
    };

    quote! {
        if let Some(v) = form.get(#key).and_then(|v| v.first()) {
            #assign
        }
    }
}
