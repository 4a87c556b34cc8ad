//! A mock Unikraft Cloud API served by hyper on a random local port.
//!
//! Routes are keyed by method and path (without the `/v1` prefix). Each
//! route holds a queue of replies: every request takes the next reply, and
//! the last one keeps being served. Unrouted requests get a 501.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use unikraft_cloud_provider::platform::{Client, ClientConfig};
use unikraft_cloud_provider::UnikraftCloudProvider;

pub const TOKEN: &str = "test-token";

/// A canned response.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Reply {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    /// A successful envelope carrying `items` under `collection`.
    pub fn ok(collection: &str, items: Value) -> Self {
        Self::json(
            200,
            json!({
                "status": "success",
                "data": { collection: items }
            }),
        )
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(
            status,
            json!({
                "status": "error",
                "message": message,
                "errors": [{"status": status, "message": message}]
            }),
        )
    }

    pub fn not_found() -> Self {
        Self::error(404, "not found")
    }

    pub fn events(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            body: body.to_string(),
        }
    }
}

/// A request as the mock API saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct State {
    routes: HashMap<(String, String), VecDeque<Reply>>,
    requests: Vec<Recorded>,
}

impl State {
    fn reply(&mut self, method: &str, path: &str) -> Option<Reply> {
        let queue = self
            .routes
            .get_mut(&(method.to_string(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

pub struct MockApi {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl MockApi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let state = Arc::new(Mutex::new(State::default()));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(
                            TokioIo::new(stream),
                            service_fn(move |req| handle(Arc::clone(&state), req)),
                        )
                        .await;
                });
            }
        });

        Self { addr, state }
    }

    /// Base URL to configure the client with.
    pub fn url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn route(&self, method: &str, path: &str, reply: Reply) -> &Self {
        self.state
            .lock()
            .expect("lock state")
            .routes
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().expect("lock state").requests.clone()
    }

    pub fn client(&self) -> Client {
        Client::new(ClientConfig::new(self.url(), TOKEN)).expect("build client")
    }

    /// A provider already configured against this mock.
    pub fn provider(&self) -> UnikraftCloudProvider {
        UnikraftCloudProvider::new()
            .with_env(no_env)
            .with_client(self.client())
    }
}

pub fn no_env(_: &str) -> Option<String> {
    None
}

async fn handle(
    state: Arc<Mutex<State>>,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let full_path = req
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let path = full_path
        .strip_prefix("/v1")
        .unwrap_or(&full_path)
        .to_string();
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let authorization = header("authorization");
    let accept = header("accept");
    let body = match req.into_body().collect().await {
        Ok(collected) => String::from_utf8_lossy(&collected.to_bytes()).into_owned(),
        Err(_) => String::new(),
    };

    let reply = {
        let mut state = state.lock().expect("lock state");
        state.requests.push(Recorded {
            method: method.clone(),
            path: path.clone(),
            authorization,
            accept,
            body,
        });
        state.reply(&method, &path)
    };

    let reply = reply.unwrap_or_else(|| Reply {
        status: 501,
        content_type: "text/plain",
        body: format!("no route for {} {}", method, path),
    });
    let response = Response::builder()
        .status(reply.status)
        .header("content-type", reply.content_type)
        .body(Full::new(Bytes::from(reply.body)))
        .expect("build response");
    Ok(response)
}
