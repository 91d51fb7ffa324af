//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble registry, balancer, cache, upstream client and notifier
//! - Create the Axum router with gateway and proxy handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Start the health monitor and recovery prober
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    http::Request,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::alerting::{notifier, Notifier};
use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::error::StartupError;
use crate::health::{HealthMonitor, HealthProber, RecoveryProber};
use crate::http::handlers;
use crate::http::request::{request_id, MakeRequestUuid};
use crate::http::upstream::UpstreamClient;
use crate::lifecycle::Shutdown;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::{BackendRegistry, LoadBalancer, RoundRobin};
use crate::resilience::CircuitBreaker;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub balancer: Arc<dyn LoadBalancer>,
    pub cache: Arc<ResponseCache>,
    pub upstream: UpstreamClient,
    pub services: Arc<Vec<String>>,
}

impl AppState {
    /// Pick a healthy backend, or `None` if there is none.
    pub fn select_backend(&self) -> Option<Arc<Backend>> {
        self.balancer.next_server(&self.registry.healthy())
    }
}

/// HTTP server for the storage gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    registry: Arc<BackendRegistry>,
    cache: Arc<ResponseCache>,
    notifier: Arc<dyn Notifier>,
}

impl HttpServer {
    /// Create a server whose alerts go where the configuration says.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let notifier = notifier::from_config(&config.notifier);
        Self::with_notifier(config, notifier)
    }

    /// Create a server with an explicit alert sink.
    pub fn with_notifier(config: GatewayConfig, notifier: Arc<dyn Notifier>) -> Result<Self, StartupError> {
        let registry = Arc::new(BackendRegistry::new(&config.backends)?);
        let cache = Arc::new(ResponseCache::new());
        let upstream = UpstreamClient::new(&config.upstream)?;

        let state = AppState {
            registry: registry.clone(),
            balancer: Arc::new(RoundRobin::new()),
            cache: cache.clone(),
            upstream,
            services: Arc::new(config.upstream.services.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            registry,
            cache,
            notifier,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let proxy = get(handlers::proxy)
            .post(handlers::proxy)
            .put(handlers::proxy)
            .delete(handlers::proxy);

        Router::new()
            .route("/data", get(handlers::get_data))
            .route("/status", get(handlers::get_status))
            .route("/health", get(handlers::gateway_health))
            .route("/{service}/{*path}", proxy)
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.upstream.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request),
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Router with state attached, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> Arc<BackendRegistry> {
        self.registry.clone()
    }

    pub fn cache(&self) -> Arc<ResponseCache> {
        self.cache.clone()
    }

    /// Start the health monitor and recovery prober.
    pub fn spawn_background(&self, shutdown: &Shutdown) {
        let breaker = CircuitBreaker::new(
            self.config.health_check.failure_threshold,
            self.config.circuit_breaker.recovery_timeout(),
        );
        let prober = HealthProber::new(&self.config.health_check);

        let monitor = HealthMonitor::new(
            self.registry.clone(),
            breaker,
            prober.clone(),
            self.notifier.clone(),
            self.config.health_check.clone(),
        );
        let monitor_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            monitor.run(monitor_shutdown).await;
        });

        let recovery = RecoveryProber::new(
            self.registry.clone(),
            breaker,
            prober,
            self.notifier.clone(),
            self.config.circuit_breaker.recovery_interval(),
        );
        let recovery_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            recovery.run(recovery_shutdown).await;
        });
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.registry.backends().len(),
            "HTTP server starting"
        );

        self.spawn_background(&shutdown);

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::load_balancer::{Availability, CircuitState, FailureDelta, StatusUpdate};
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server() -> HttpServer {
        let mut config = GatewayConfig::default();
        config.backends = vec![
            BackendConfig::new("a", "http://127.0.0.1:9"),
            BackendConfig::new("b", "http://127.0.0.1:19"),
        ];
        config.upstream.connect_retries = 0;
        HttpServer::with_notifier(config, Arc::new(crate::alerting::NoopNotifier)).unwrap()
    }

    async fn send(router: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (status, headers, body) = send(server().router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Gateway service is running");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_status_reflects_registry() {
        let server = server();
        let registry = server.registry();
        let a = registry.list_all()[0].clone();
        registry.update_status(&a, |_| {
            Some(StatusUpdate::new(Availability::Unavailable, CircuitState::Open, FailureDelta::Increment))
        });

        let (status, _, body) = send(server.router(), "/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["http://127.0.0.1:9"]["state"], "OPEN");
        assert_eq!(body["http://127.0.0.1:9"]["status"], "unavailable");
        assert_eq!(body["http://127.0.0.1:9"]["failures"], 1);
        assert_eq!(body["http://127.0.0.1:19"]["status"], "unknown");
    }

    #[tokio::test]
    async fn test_data_without_backends_or_cache_is_503() {
        let (status, _, body) = send(server().router(), "/data").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "No Storage Services are available and no cached data is available");
    }

    #[tokio::test]
    async fn test_data_without_backends_serves_cache() {
        let server = server();
        let source = server.registry().list_all()[0].clone();
        server.cache().store(Bytes::from_static(br#"{"id":1}"#), source);

        let (status, headers, body) = send(server.router(), "/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["x-cache"], "HIT");
        assert_eq!(body, serde_json::json!({"id": 1}));
    }

    #[tokio::test]
    async fn test_unknown_service_is_404() {
        let (status, _, body) = send(server().router(), "/service9/items").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown service 'service9'");
    }

    #[tokio::test]
    async fn test_proxy_without_healthy_backend_is_503() {
        let (status, _, body) = send(server().router(), "/service1/data").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "Storage Service is not available");
    }
}
