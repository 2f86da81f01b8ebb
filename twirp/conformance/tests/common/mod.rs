//! Service implementation and request helpers shared by the test files.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;

use twirp_conformance::pb::{Greeter, GreeterServer, HelloReply, HelloReq};
use twirp_conformance::util::ctxkit;
use twirp_conformance::util::twirp::{
    self, Context, Error, ErrorCode, Recorder, Request, Server, ServerHooks,
};

/// Replies with the name, the tagged method option and the echoed fields.
///
/// Two names are special: `nobody` returns neither a response nor an error,
/// and `panic` panics.
pub struct Echo;

#[async_trait]
impl Greeter for Echo {
    async fn greet(&self, ctx: Context, req: HelloReq) -> Result<Option<HelloReply>, Error> {
        match req.name.as_str() {
            "nobody" => Ok(None),
            "panic" => panic!("greeter blew up"),
            "missing" => Err(Error::new(ErrorCode::NotFound, "no such greeting")),
            name => Ok(Some(HelloReply {
                message: format!("hello {} ({})", name, ctx.method_option().unwrap_or("-")),
                ids: req.ids,
                on: req.on,
            })),
        }
    }

    async fn whoami(&self, ctx: Context, _req: HelloReq) -> Result<Option<HelloReply>, Error> {
        Ok(Some(HelloReply {
            message: format!("user {}", ctxkit::get_user_id(&ctx)),
            ..Default::default()
        }))
    }
}

pub fn server() -> GreeterServer<Echo> {
    GreeterServer::new(Echo, ServerHooks::default())
}

pub async fn serve(server: &impl Server, mut req: Request) -> Recorder {
    let mut resp = Recorder::default();
    server.serve_http(&mut req, &mut resp).await;
    resp
}

pub async fn post_json(path: &str, body: serde_json::Value) -> Recorder {
    serve(
        &server(),
        Request::post(path, "application/json", body.to_string()),
    )
    .await
}

pub async fn post_form(path: &str, body: &str) -> Recorder {
    serve(
        &server(),
        Request::post(path, "application/x-www-form-urlencoded", body),
    )
    .await
}

pub fn reply(resp: &Recorder) -> HelloReply {
    assert_eq!(resp.status, 200, "body: {}", String::from_utf8_lossy(&resp.body));
    resp.json().unwrap()
}

pub fn error(resp: &Recorder) -> twirp::Error {
    let err: twirp::Error = resp.json().unwrap();
    assert_eq!(resp.status, err.code.http_status());
    err
}

pub fn hello(name: &str, ids: &[i64]) -> serde_json::Value {
    json!({ "name": name, "ids": ids })
}

pub const GREET: &str = "/pkg.Greeter/Greet";
pub const WHOAMI: &str = "/pkg.Greeter/Whoami";
