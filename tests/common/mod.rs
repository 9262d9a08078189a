//! Shared utilities for integration tests.
//!
//! Everything binds to `127.0.0.1:0`, so tests never race on fixed ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Multipart, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use storefront_gateway::config::ProxyConfig;
use storefront_gateway::http::HttpServer;
use storefront_gateway::lifecycle::Shutdown;

/// One request as the mock backend saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    /// Path and query, e.g. `/api/products?page=2`.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One multipart part as the mock backend parsed it.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Clone, Default)]
struct MockState {
    hits: Arc<Mutex<Vec<Captured>>>,
    parts: Arc<Mutex<Vec<CapturedPart>>>,
}

/// In-process backend recording everything it receives.
pub struct MockBackend {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockBackend {
    /// Base URL to configure the gateway with.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> Vec<Captured> {
        self.state.hits.lock().unwrap().clone()
    }

    pub fn last_hit(&self) -> Captured {
        self.hits().pop().expect("backend received no requests")
    }

    pub fn parts(&self) -> Vec<CapturedPart> {
        self.state.parts.lock().unwrap().clone()
    }
}

/// Start the mock backend.
///
/// Fixed routes cover the special cases; everything else is echoed back as
/// JSON and recorded.
pub async fn start_mock_backend() -> MockBackend {
    let state = MockState::default();
    let app = Router::new()
        .route("/api/upload", post(upload))
        .route("/api/redirect", get(redirect))
        .route("/api/text", get(text))
        .route("/api/broken", get(broken_json))
        .route("/api/missing", get(missing))
        .route("/api/cart/{id}", delete(no_content))
        .fallback(echo)
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, state }
}

async fn record(state: &MockState, request: Request<Body>) -> Captured {
    let (parts, body) = request.into_parts();
    let captured = Captured {
        method: parts.method,
        uri: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body: to_bytes(body, usize::MAX).await.unwrap(),
    };
    state.hits.lock().unwrap().push(captured.clone());
    captured
}

async fn echo(State(state): State<MockState>, request: Request<Body>) -> Response {
    let captured = record(&state, request).await;
    let mut response = Json(json!({
        "success": true,
        "method": captured.method.as_str(),
        "uri": captured.uri,
        "received": String::from_utf8_lossy(&captured.body),
    }))
    .into_response();

    let headers = response.headers_mut();
    headers.append(header::SET_COOKIE, HeaderValue::from_static("session=abc; Path=/"));
    headers.append(header::SET_COOKIE, HeaderValue::from_static("cart=7; Path=/"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
    headers.insert("x-backend", HeaderValue::from_static("mock"));
    response
}

async fn upload(State(state): State<MockState>, mut multipart: Multipart) -> impl IntoResponse {
    let mut count = 0;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part = CapturedPart {
            name: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_owned),
            content_type: field.content_type().map(str::to_owned),
            data: field.bytes().await.unwrap(),
        };
        state.parts.lock().unwrap().push(part);
        count += 1;
    }
    (StatusCode::CREATED, Json(json!({ "success": true, "parts": count })))
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/api/elsewhere")])
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "plain body\n")
}

async fn broken_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "<html>oops</html>")
}

async fn missing() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Product not found" })),
    )
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Config pointing at `base_url` under the given environment.
pub fn test_config(base_url: &str, environment: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backend.base_url = base_url.to_string();
    config.backend.environment = environment.to_string();
    config.timeouts.connect_secs = 2;
    config.timeouts.upstream_secs = Some(10);
    config
}

/// Start the gateway on an ephemeral port.
pub async fn start_gateway(config: ProxyConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(Arc::new(config)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Client that neither uses system proxies nor follows redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// A 1 KiB payload with every byte value represented.
pub fn kib_payload() -> Vec<u8> {
    (0..1024u32).map(|i| (i % 256) as u8).collect()
}

/// Send `GET <raw_path>` over a bare socket so no client-side URL
/// normalization touches the path. Returns the status code and the raw
/// response text.
pub async fn raw_get(addr: SocketAddr, raw_path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {raw_path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response).into_owned();
    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    (status, response)
}
