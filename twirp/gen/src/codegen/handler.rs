//! Per-wire-format request handlers.
//!
//! Every method gets three handlers, one per [`WireFormat`]. They share a
//! single template and differ only in how the request is decoded and the
//! response encoded, so the protocol behavior cannot drift between formats:
//!
//! 1. tag the method name and run the `request_routed` hook
//! 2. decode the request (format specific)
//! 3. tag the request; validate and check auth when enabled
//! 4. call the service, containing panics
//! 5. reject the "no result and no error" case
//! 6. tag the response and run the `response_prepared` hook
//! 7. encode the response (format specific, raw bodies bypass the codec)
//! 8. write status and body, reporting short writes to the error hook

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::codegen::form::{generate_form_decoders, has_form_fields};
use crate::codegen::{FileContext, dispatcher_ident, method_ident};
use crate::schema::{Method, RawBody};

/// Request encodings a server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    Protobuf,
    Form,
}

impl WireFormat {
    /// Every format, in emission order.
    pub const ALL: [WireFormat; 3] = [WireFormat::Json, WireFormat::Protobuf, WireFormat::Form];

    /// Suffix of the handler name.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Protobuf => "protobuf",
            Self::Form => "form",
        }
    }

    /// Media type selecting this format, `None` for the fallback format.
    pub fn media_type(self) -> Option<&'static str> {
        match self {
            Self::Json => Some("application/json"),
            Self::Protobuf => Some("application/protobuf"),
            Self::Form => None,
        }
    }

    /// `Content-Type` of encoded responses. Form requests are answered in JSON.
    pub fn default_content_type(self) -> &'static str {
        match self {
            Self::Json | Self::Form => "application/json",
            Self::Protobuf => "application/protobuf",
        }
    }

    /// Runtime codec module used for responses.
    fn response_codec(self) -> &'static str {
        match self {
            Self::Json | Self::Form => "json",
            Self::Protobuf => "protobuf",
        }
    }

    /// Statements binding `req_content` from the request.
    fn decode(self, ctx: &FileContext<'_>, method: &Method) -> TokenStream {
        let twirp = &ctx.twirp;
        let input = ctx.type_tokens(&method.input);

        let unmarshal = match self {
            Self::Json => quote! { #twirp::json::unmarshal(&body, true) },
            Self::Protobuf => quote! { #twirp::protobuf::unmarshal(&body) },
            Self::Form => return decode_form(ctx, method),
        };
        let parse_failure = format!("failed to parse request {}", self.label());

        quote! {
            let body = match req.read_body().await {
                Ok(body) => body,
                Err(err) => {
                    self.write_error(
                        &ctx,
                        resp,
                        #twirp::internal_error_with(err, "failed to read request body"),
                    );
                    return;
                }
            };
            let req_content: #input = match #unmarshal {
                Ok(req_content) => req_content,
                Err(err) => {
                    let twerr = #twirp::Error::new(
                        #twirp::ErrorCode::InvalidArgument,
                        format!("{}: {}", #parse_failure, err),
                    )
                    .with_meta("cause", ::std::any::type_name_of_val(&err));
                    self.write_error(&ctx, resp, twerr);
                    return;
                }
            };
        }
    }

    /// Statements binding `resp_bytes` from `resp_content` with the codec.
    fn encode(self, ctx: &FileContext<'_>) -> TokenStream {
        let twirp = &ctx.twirp;
        let codec = format_ident!("{}", self.response_codec());
        let content_type = self.default_content_type();
        let failure = format!("failed to marshal {} response", self.response_label());

        quote! {
            let resp_bytes = match #twirp::#codec::marshal(&resp_content) {
                Ok(resp_bytes) => resp_bytes,
                Err(err) => {
                    self.write_error(&ctx, resp, #twirp::internal_error_with(err, #failure));
                    return;
                }
            };
            resp.set_header("Content-Type", #content_type);
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Protobuf => "proto",
            Self::Form => "form",
        }
    }

    fn response_label(self) -> &'static str {
        match self {
            Self::Json | Self::Form => "json",
            Self::Protobuf => "proto",
        }
    }
}

/// Name of the handler for `method` in `format`.
pub fn handler_ident(method: &Method, format: WireFormat) -> Ident {
    format_ident!("{}_{}", dispatcher_ident(method), format.suffix())
}

fn decode_form(ctx: &FileContext<'_>, method: &Method) -> TokenStream {
    let input = ctx.type_tokens(&method.input);
    let parse = quote! {
        match req.parse_form().await {
            Ok(form) => form,
            Err(err) => {
                self.write_error(&ctx, resp, err);
                return;
            }
        }
    };

    if !has_form_fields(&method.input) {
        return quote! {
            let _form = #parse;
            let req_content = #input::default();
        };
    }

    let decoders = generate_form_decoders(ctx, &method.input);
    quote! {
        let form = #parse;
        let mut req_content = #input::default();
        #decoders
    }
}

/// Validation and auth checks, emitted only when validation is enabled.
///
/// Validation always runs before the auth check.
fn generate_checks(ctx: &FileContext<'_>, method: &Method) -> TokenStream {
    if !ctx.config.validate_enable {
        return TokenStream::new();
    }
    let twirp = &ctx.twirp;
    let ctxkit = &ctx.ctxkit;

    let auth = if method.options.requires_auth {
        quote! {
            if #ctxkit::get_user_id(&ctx) == 0 {
                self.write_error(
                    &ctx,
                    resp,
                    #twirp::Error::new(#twirp::ErrorCode::Unauthenticated, "need login"),
                );
                return;
            }
        }
    } else {
        TokenStream::new()
    };

    quote! {
        if let Err(validerr) = req_content.validate() {
            self.write_error(
                &ctx,
                resp,
                #twirp::invalid_argument_error("argument", validerr.to_string()),
            );
            return;
        }
        #auth
    }
}

/// Statements binding `resp_bytes` and `resp_status`.
fn generate_encode(ctx: &FileContext<'_>, method: &Method, format: WireFormat) -> TokenStream {
    match method.output.raw_body {
        Some(RawBody { has_status }) => {
            let status = if has_status {
                quote! {
                    let mut resp_status: u16 = 200;
                    if resp_content.status > 0 {
                        resp_status = u16::try_from(resp_content.status).unwrap_or(500);
                    }
                }
            } else {
                quote! { let resp_status: u16 = 200; }
            };
            quote! {
                #status
                if !resp_content.content_type.is_empty() {
                    resp.set_header("Content-Type", &resp_content.content_type);
                }
                let resp_bytes = resp_content.data.to_vec();
            }
        }
        None => {
            let encode = format.encode(ctx);
            quote! {
                let resp_status: u16 = 200;
                #encode
            }
        }
    }
}

/// Generates the handler for `method` in `format`.
///
/// The handler is an inherent method of the server type.
pub fn generate_handler(ctx: &FileContext<'_>, method: &Method, format: WireFormat) -> TokenStream {
    let twirp = &ctx.twirp;
    let name = handler_ident(method, format);
    let method_name = &method.name;
    let service_method = method_ident(method);

    let decode = format.decode(ctx, method);
    let checks = generate_checks(ctx, method);
    let encode = generate_encode(ctx, method, format);
    let nil_response = format!(
        "received a nil {} and nil error while calling {}. nil responses are not supported",
        ctx.type_name(&method.output),
        method.name
    );

    quote! {
        async fn #name(
            &self,
            ctx: #twirp::Context,
            req: &mut #twirp::Request,
            resp: &mut dyn #twirp::ResponseWriter,
        ) {
            let ctx = #twirp::with_method_name(ctx, #method_name);
            let ctx = match self.hooks.call_request_routed(&ctx) {
                Ok(ctx) => ctx,
                Err(err) => {
                    self.write_error(&ctx, resp, err);
                    return;
                }
            };

            #decode

            let ctx = #twirp::with_request(ctx, req_content.clone());
            #checks

            let call = self.service.#service_method(ctx.clone(), req_content);
            let result = match #twirp::futures::FutureExt::catch_unwind(
                ::std::panic::AssertUnwindSafe(call),
            )
            .await
            {
                Ok(result) => result,
                Err(panic) => {
                    self.write_error(&ctx, resp, #twirp::internal_error("Internal service panic"));
                    ::std::panic::resume_unwind(panic);
                }
            };
            let resp_content = match result {
                Ok(Some(resp_content)) => resp_content,
                Ok(None) => {
                    self.write_error(&ctx, resp, #twirp::internal_error(#nil_response));
                    return;
                }
                Err(err) => {
                    self.write_error(&ctx, resp, err);
                    return;
                }
            };

            let ctx = #twirp::with_response(ctx, resp_content.clone());
            let ctx = self.hooks.call_response_prepared(ctx);

            #encode

            let ctx = #twirp::with_status_code(ctx, resp_status);
            resp.write_header(resp_status);
            match resp.write(&resp_bytes) {
                Ok(n) if n == resp_bytes.len() => {}
                Ok(n) => {
                    let msg = format!(
                        "failed to write response, {} of {} bytes written",
                        n,
                        resp_bytes.len()
                    );
                    self.hooks
                        .call_error(&ctx, &#twirp::Error::new(#twirp::ErrorCode::Unknown, msg));
                }
                Err(err) => {
                    let msg = format!(
                        "failed to write response, 0 of {} bytes written: {}",
                        resp_bytes.len(),
                        err
                    );
                    self.hooks
                        .call_error(&ctx, &#twirp::Error::new(#twirp::ErrorCode::Unknown, msg));
                }
            }
            self.hooks.call_response_sent(&ctx);
        }
    }
}
