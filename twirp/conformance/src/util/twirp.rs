//! In-process Twirp runtime.
//!
//! Implements the surface generated code calls into: request context, hooks,
//! errors, codecs, the HTTP request/response abstractions and client helpers.
//! Requests never touch a socket; a [`Recorder`] captures what a server wrote.

use std::any::Any;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use async_trait::async_trait;
pub use futures;

// ============================================================================
// Context
// ============================================================================

/// Request-scoped values, threaded by value through a request.
#[derive(Clone, Default, Debug)]
pub struct Context {
    package_name: Option<String>,
    service_name: Option<String>,
    method_name: Option<String>,
    method_option: Option<String>,
    status_code: Option<u16>,
    http_path: Option<String>,
    allow_get: bool,
    request: Option<Arc<dyn Any + Send + Sync>>,
    response: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) user_id: i64,
}

impl Context {
    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    pub fn method_option(&self) -> Option<&str> {
        self.method_option.as_deref()
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Path of the HTTP request being served.
    pub fn http_path(&self) -> Option<&str> {
        self.http_path.as_deref()
    }

    /// Decoded request message, if it is a `T`.
    pub fn request<T: Any>(&self) -> Option<&T> {
        self.request.as_deref()?.downcast_ref()
    }

    /// Response message, if it is a `T`.
    pub fn response<T: Any>(&self) -> Option<&T> {
        self.response.as_deref()?.downcast_ref()
    }
}

pub fn with_package_name(mut ctx: Context, name: &str) -> Context {
    ctx.package_name = Some(name.to_string());
    ctx
}

pub fn with_service_name(mut ctx: Context, name: &str) -> Context {
    ctx.service_name = Some(name.to_string());
    ctx
}

pub fn with_method_name(mut ctx: Context, name: &str) -> Context {
    ctx.method_name = Some(name.to_string());
    ctx
}

pub fn with_method_option(mut ctx: Context, option: &str) -> Context {
    ctx.method_option = Some(option.to_string());
    ctx
}

pub fn with_status_code(mut ctx: Context, status: u16) -> Context {
    ctx.status_code = Some(status);
    ctx
}

pub fn with_http_request(mut ctx: Context, req: &Request) -> Context {
    ctx.http_path = Some(req.path().to_string());
    ctx
}

pub fn with_request<T: Any + Send + Sync>(mut ctx: Context, req: T) -> Context {
    ctx.request = Some(Arc::new(req));
    ctx
}

pub fn with_response<T: Any + Send + Sync>(mut ctx: Context, resp: T) -> Context {
    ctx.response = Some(Arc::new(resp));
    ctx
}

/// Lets servers accept methods other than POST for this request.
pub fn with_allow_get(mut ctx: Context, allow: bool) -> Context {
    ctx.allow_get = allow;
    ctx
}

pub fn allow_get(ctx: &Context) -> bool {
    ctx.allow_get
}

// ============================================================================
// Errors
// ============================================================================

/// Twirp error codes, serialized in their wire spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Canceled,
    Unknown,
    InvalidArgument,
    Malformed,
    NotFound,
    BadRoute,
    Unauthenticated,
    PermissionDenied,
    Internal,
    Unavailable,
}

impl ErrorCode {
    /// HTTP status a server answers with for this code.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Canceled => 408,
            Self::InvalidArgument | Self::Malformed => 400,
            Self::NotFound | Self::BadRoute => 404,
            Self::Unauthenticated => 401,
            Self::PermissionDenied => 403,
            Self::Unknown | Self::Internal => 500,
            Self::Unavailable => 503,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
            Self::InvalidArgument => "invalid_argument",
            Self::Malformed => "malformed",
            Self::NotFound => "not_found",
            Self::BadRoute => "bad_route",
            Self::Unauthenticated => "unauthenticated",
            Self::PermissionDenied => "permission_denied",
            Self::Internal => "internal",
            Self::Unavailable => "unavailable",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Twirp error as written to the wire: `{"code", "msg", "meta"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("twirp error {code}: {msg}")]
pub struct Error {
    pub code: ErrorCode,
    pub msg: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl Error {
    pub fn new(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }
}

pub fn internal_error(msg: impl Into<String>) -> Error {
    Error::new(ErrorCode::Internal, msg)
}

/// Internal error wrapping `err`; the message keeps both.
pub fn internal_error_with(err: impl Display, msg: impl Into<String>) -> Error {
    Error::new(ErrorCode::Internal, format!("{}: {}", msg.into(), err))
}

/// Invalid-argument error naming `argument` in the message and in metadata.
pub fn invalid_argument_error(argument: &str, msg: impl Into<String>) -> Error {
    Error::new(
        ErrorCode::InvalidArgument,
        format!("{} {}", argument, msg.into()),
    )
    .with_meta("argument", argument)
}

// ============================================================================
// Hooks
// ============================================================================

type ContextHook = Box<dyn Fn(&Context) -> Result<Context, Error> + Send + Sync>;

/// Callbacks a server runs at fixed points of a request. Unset hooks are
/// no-ops.
#[derive(Default)]
pub struct ServerHooks {
    pub request_received: Option<ContextHook>,
    pub request_routed: Option<ContextHook>,
    pub response_prepared: Option<Box<dyn Fn(Context) -> Context + Send + Sync>>,
    pub response_sent: Option<Box<dyn Fn(&Context) + Send + Sync>>,
    pub error: Option<Box<dyn Fn(&Context, &Error) + Send + Sync>>,
}

impl ServerHooks {
    pub fn call_request_received(&self, ctx: &Context) -> Result<Context, Error> {
        match &self.request_received {
            Some(hook) => hook(ctx),
            None => Ok(ctx.clone()),
        }
    }

    pub fn call_request_routed(&self, ctx: &Context) -> Result<Context, Error> {
        match &self.request_routed {
            Some(hook) => hook(ctx),
            None => Ok(ctx.clone()),
        }
    }

    pub fn call_response_prepared(&self, ctx: Context) -> Context {
        match &self.response_prepared {
            Some(hook) => hook(ctx),
            None => ctx,
        }
    }

    pub fn call_response_sent(&self, ctx: &Context) {
        if let Some(hook) = &self.response_sent {
            hook(ctx);
        }
    }

    pub fn call_error(&self, ctx: &Context, err: &Error) {
        if let Some(hook) = &self.error {
            hook(ctx, err);
        }
    }

    /// Writes `err` as a JSON error body with the status of its code, running
    /// the error and response-sent hooks around it.
    pub fn write_error(&self, ctx: &Context, resp: &mut dyn ResponseWriter, err: Error) {
        let status = err.code.http_status();
        let ctx = with_status_code(ctx.clone(), status);
        self.call_error(&ctx, &err);

        let body = match serde_json::to_vec(&err) {
            Ok(body) => body,
            Err(e) => format!(r#"{{"code":"internal","msg":"{}"}}"#, e).into_bytes(),
        };
        resp.set_header("Content-Type", "application/json");
        resp.write_header(status);
        if let Err(e) = resp.write(&body) {
            let msg = format!("failed to write error response: {}", e);
            self.call_error(&ctx, &Error::new(ErrorCode::Unknown, msg));
        }
        self.call_response_sent(&ctx);
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Form values by key, in the order they appeared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Form {
    values: BTreeMap<String, Vec<String>>,
}

impl Form {
    fn extend(&mut self, encoded: &[u8]) {
        for (key, value) in url::form_urlencoded::parse(encoded) {
            self.values
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.values.get(key).map(Vec::as_slice)
    }
}

/// An incoming HTTP request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: String,
    path: String,
    query: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    context: Context,
}

impl Request {
    /// Request for `target`, a path with an optional `?query`.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: query.to_string(),
            ..Default::default()
        }
    }

    /// `POST` request with a body of the given content type.
    pub fn post(target: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new("POST", target)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.context = ctx;
        self
    }

    pub fn context(&self) -> Context {
        self.context.clone()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// First value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Takes the body; later reads see it empty.
    pub async fn read_body(&mut self) -> io::Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.body))
    }

    /// Parses the query string, then a urlencoded body. Body values come
    /// first for keys present in both.
    pub async fn parse_form(&mut self) -> Result<Form, Error> {
        let mut form = Form::default();
        let urlencoded = self
            .header("Content-Type")
            .is_some_and(|v| v.trim().starts_with("application/x-www-form-urlencoded"));
        if urlencoded {
            let body = self
                .read_body()
                .await
                .map_err(|e| internal_error_with(e, "failed to read form body"))?;
            if let Err(e) = std::str::from_utf8(&body) {
                return Err(Error::new(
                    ErrorCode::Malformed,
                    format!("form body is not valid UTF-8: {}", e),
                ));
            }
            form.extend(&body);
        }
        form.extend(self.query.as_bytes());
        Ok(form)
    }
}

/// Where a server writes its response.
pub trait ResponseWriter: Send {
    fn set_header(&mut self, name: &str, value: &str);
    fn write_header(&mut self, status: u16);
    /// Writes `body`, returning how many bytes were accepted.
    fn write(&mut self, body: &[u8]) -> io::Result<usize>;
}

/// A `ResponseWriter` that keeps everything written to it.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    /// `0` until a status or body is written.
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorder {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

impl ResponseWriter for Recorder {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    fn write_header(&mut self, status: u16) {
        if self.status == 0 {
            self.status = status;
        }
    }

    fn write(&mut self, body: &[u8]) -> io::Result<usize> {
        if self.status == 0 {
            self.status = 200;
        }
        self.body.extend_from_slice(body);
        Ok(body.len())
    }
}

/// A generated Twirp server.
#[async_trait]
pub trait Server: Send + Sync {
    async fn serve_http(&self, req: &mut Request, resp: &mut dyn ResponseWriter);

    /// Gzipped `FileDescriptorProto` of the service's file, and the service's
    /// index in it.
    fn service_descriptor(&self) -> (&'static [u8], usize);

    fn protoc_gen_twirp_version(&self) -> &'static str;
}

// ============================================================================
// Codecs
// ============================================================================

pub mod json {
    use serde::Serialize;
    use serde::de::DeserializeOwned;

    /// Decodes a JSON message. serde skips unknown fields, so every caller
    /// gets discard-unknown behavior.
    pub fn unmarshal<T: DeserializeOwned>(
        body: &[u8],
        _discard_unknown: bool,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn marshal<T: Serialize>(msg: &T) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(msg)
    }
}

pub mod protobuf {
    use std::convert::Infallible;

    use prost::Message;

    pub fn unmarshal<T: Message + Default>(body: &[u8]) -> Result<T, prost::DecodeError> {
        T::decode(body)
    }

    pub fn marshal<T: Message>(msg: &T) -> Result<Vec<u8>, Infallible> {
        Ok(msg.encode_to_vec())
    }
}

// ============================================================================
// Clients
// ============================================================================

/// Transport generated clients send requests through.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POSTs `body` to `url`, returning the body of a 200 response or the
    /// Twirp error the server answered with.
    async fn post(
        &self,
        ctx: &Context,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, Error>;
}

pub async fn do_json_request<C, I, O>(
    ctx: Context,
    client: &C,
    url: &str,
    req: &I,
) -> Result<O, Error>
where
    C: HttpClient + ?Sized,
    I: Serialize + Sync,
    O: DeserializeOwned,
{
    let body =
        json::marshal(req).map_err(|e| internal_error_with(e, "failed to marshal json request"))?;
    let resp = client.post(&ctx, url, "application/json", body).await?;
    json::unmarshal(&resp, true)
        .map_err(|e| internal_error_with(e, "failed to unmarshal json response"))
}

pub async fn do_protobuf_request<C, I, O>(
    ctx: Context,
    client: &C,
    url: &str,
    req: &I,
) -> Result<O, Error>
where
    C: HttpClient + ?Sized,
    I: prost::Message,
    O: prost::Message + Default,
{
    let body = protobuf::marshal(req).unwrap_or_else(|never: Infallible| match never {});
    let resp = client.post(&ctx, url, "application/protobuf", body).await?;
    protobuf::unmarshal(&resp)
        .map_err(|e| internal_error_with(e, "failed to unmarshal proto response"))
}
