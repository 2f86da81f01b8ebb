//! Generated clients talking to the generated server in-process.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use common::{Echo, server};
use twirp_conformance::pb::{
    Greeter, GreeterJsonClient, GreeterProtobufClient, GreeterServer, HelloReq,
};
use twirp_conformance::util::ctxkit;
use twirp_conformance::util::twirp::{
    Context, Error, ErrorCode, HttpClient, Recorder, Request, Server,
};

const ADDR: &str = "http://localhost";

type CallLog = Arc<Mutex<Vec<(String, String)>>>;

/// Hands requests straight to a server, logging each URL and content type.
struct Loopback {
    server: GreeterServer<Echo>,
    calls: CallLog,
}

impl Loopback {
    fn new() -> Self {
        Self::logging_to(CallLog::default())
    }

    fn logging_to(calls: CallLog) -> Self {
        Self {
            server: server(),
            calls,
        }
    }
}

#[async_trait]
impl HttpClient for Loopback {
    async fn post(
        &self,
        ctx: &Context,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<Vec<u8>, Error> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), content_type.to_string()));

        let path = url.strip_prefix(ADDR).unwrap_or(url);
        let mut req = Request::post(path, content_type, body).with_context(ctx.clone());
        let mut resp = Recorder::default();
        self.server.serve_http(&mut req, &mut resp).await;

        if resp.status == 200 {
            Ok(resp.body)
        } else {
            Err(resp.json().unwrap())
        }
    }
}

fn hello(name: &str) -> HelloReq {
    HelloReq {
        name: name.to_string(),
        ids: vec![3, 1],
        on: true,
    }
}

#[tokio::test]
async fn json_client_round_trips() {
    let client = GreeterJsonClient::new(ADDR, Loopback::new());

    let reply = client
        .greet(Context::default(), hello("bob"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply.message, "hello bob (public)");
    assert_eq!(reply.ids, vec![3, 1]);
    assert!(reply.on);
}

#[tokio::test]
async fn protobuf_client_round_trips() {
    let client = GreeterProtobufClient::new(ADDR, Loopback::new());

    let reply = client
        .greet(Context::default(), hello("ann"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply.message, "hello ann (public)");
    assert_eq!(reply.ids, vec![3, 1]);
}

#[tokio::test]
async fn clients_post_to_method_urls() {
    let json_calls = CallLog::default();
    let client = GreeterJsonClient::new(ADDR, Loopback::logging_to(Arc::clone(&json_calls)));
    let ctx = ctxkit::with_user_id(Context::default(), 9);
    client.greet(ctx.clone(), hello("cy")).await.unwrap();
    client.whoami(ctx, hello("cy")).await.unwrap();

    let proto_calls = CallLog::default();
    let client =
        GreeterProtobufClient::new(ADDR, Loopback::logging_to(Arc::clone(&proto_calls)));
    client.greet(Context::default(), hello("cy")).await.unwrap();

    let call = |url: &str, content_type: &str| (url.to_string(), content_type.to_string());
    assert_eq!(
        *json_calls.lock().unwrap(),
        vec![
            call("http://localhost/pkg.Greeter/Greet", "application/json"),
            call("http://localhost/pkg.Greeter/Whoami", "application/json"),
        ]
    );
    assert_eq!(
        *proto_calls.lock().unwrap(),
        vec![call("http://localhost/pkg.Greeter/Greet", "application/protobuf")]
    );
}

#[tokio::test]
async fn server_errors_surface_as_client_errors() {
    let client = GreeterJsonClient::new(ADDR, Loopback::new());

    let err = client
        .whoami(Context::default(), hello("dee"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::Unauthenticated);

    let err = client
        .greet(Context::default(), hello("missing"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn context_travels_with_the_request() {
    let client = GreeterProtobufClient::new(ADDR, Loopback::new());

    let reply = client
        .whoami(ctxkit::with_user_id(Context::default(), 5), hello("eve"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(reply.message, "user 5");
}
