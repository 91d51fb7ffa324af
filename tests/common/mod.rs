//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use storage_gateway::alerting::Notifier;
use storage_gateway::config::BackendConfig;
use storage_gateway::{GatewayConfig, HttpServer, Shutdown};

/// In-process stand-in for a storage service.
#[derive(Clone)]
pub struct MockStorage {
    pub addr: SocketAddr,
    healthy: Arc<AtomicBool>,
    data_failing: Arc<AtomicBool>,
    health_probes: Arc<AtomicUsize>,
    data_requests: Arc<AtomicUsize>,
    payload: Arc<Mutex<String>>,
    stop: Arc<Notify>,
}

impl MockStorage {
    /// Start a healthy mock on an ephemeral port serving `payload` at `/data`.
    pub async fn start(payload: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mock = Self {
            addr,
            healthy: Arc::new(AtomicBool::new(true)),
            data_failing: Arc::new(AtomicBool::new(false)),
            health_probes: Arc::new(AtomicUsize::new(0)),
            data_requests: Arc::new(AtomicUsize::new(0)),
            payload: Arc::new(Mutex::new(payload.to_string())),
            stop: Arc::new(Notify::new()),
        };

        let app = Router::new()
            .route("/health", get(health))
            .route("/data", get(data))
            .route("/fail/{*rest}", get(fail))
            .fallback(echo)
            .with_state(mock.clone());

        let stop = mock.stop.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.notified().await })
                .await;
        });

        mock
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections.
    pub fn stop(&self) {
        self.stop.notify_one();
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Fail `/data` while `/health` keeps reporting ok.
    pub fn set_data_failing(&self, failing: bool) {
        self.data_failing.store(failing, Ordering::SeqCst);
    }

    pub fn health_probes(&self) -> usize {
        self.health_probes.load(Ordering::SeqCst)
    }

    pub fn data_requests(&self) -> usize {
        self.data_requests.load(Ordering::SeqCst)
    }
}

async fn health(State(mock): State<MockStorage>) -> Response {
    mock.health_probes.fetch_add(1, Ordering::SeqCst);
    if mock.healthy.load(Ordering::SeqCst) {
        Json(json!({"status": "ok"})).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "down"}))).into_response()
    }
}

async fn data(State(mock): State<MockStorage>) -> Response {
    mock.data_requests.fetch_add(1, Ordering::SeqCst);
    if !mock.healthy.load(Ordering::SeqCst) || mock.data_failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "down").into_response();
    }
    let payload = mock.payload.lock().unwrap().clone();
    ([("content-type", "application/json")], payload).into_response()
}

async fn fail() -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({"error": "upstream broke"}))).into_response()
}

/// Echoes the request back so tests can see what the gateway forwarded.
async fn echo(State(mock): State<MockStorage>, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    Json(json!({
        "backend": mock.url(),
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "host": headers.get("host").and_then(|v| v.to_str().ok()),
        "body": body,
    }))
    .into_response()
}

/// Notifier that keeps every alert subject.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    subjects: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.subjects.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, _body: &str) {
        self.subjects.lock().unwrap().push(subject.to_string());
    }
}

/// Config pointing at `urls` with millisecond-scale timings.
pub fn test_config(urls: &[String]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backends = urls
        .iter()
        .enumerate()
        .map(|(i, url)| BackendConfig::new(format!("storage_service_{}", i + 1), url.clone()))
        .collect();
    config.health_check.interval_ms = 50;
    config.health_check.timeout_ms = 200;
    config.circuit_breaker.recovery_timeout_ms = 300;
    config.circuit_breaker.recovery_interval_ms = 25;
    config.upstream.request_timeout_ms = 500;
    config.upstream.connect_retries = 0;
    config
}

/// A running gateway and the handles tests need.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let notifier = Arc::new(RecordingNotifier::default());
    let server = HttpServer::with_notifier(config, notifier.clone()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        shutdown,
        notifier,
    }
}

/// A port nothing is listening on.
pub async fn unused_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` until it holds or `timeout` passes.
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check().await
}

/// Current `/status` body.
pub async fn status(gateway: &TestGateway) -> serde_json::Value {
    client()
        .get(gateway.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}
