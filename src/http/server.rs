//! HTTP server setup and the proxy pipeline.
//!
//! # Responsibilities
//! - Create the Axum router and wire up middleware (timeout, request ID,
//!   tracing)
//! - Resolve the environment from the first path segment
//! - Record the audit trail around each upstream call
//! - Relay the upstream response to the client unchanged
//! - Run the sink flush task alongside the server
//!
//! The handler is the interception pipeline from the top of the crate docs:
//! resolve → audit request → forward → audit response → relay. Audit
//! failures degrade the record; they never change what the client receives.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use bytes::Bytes;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CaptureConfig, ProxyConfig};
use crate::http::forward::{self, UpstreamClient};
use crate::intercept::{capture, CaptureDecision, ContentEncoding, LogEntry};
use crate::observability::metrics;
use crate::routing::EnvironmentRouter;
use crate::sink::LogSink;

/// Header carrying the caller's workspace identifier.
const WORKSPACE_HEADER: &str = "x-workspace";

/// Generates a UUID v4 request ID for correlation across log output.
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EnvironmentRouter>,
    pub client: UpstreamClient,
    pub sink: Arc<LogSink>,
    pub capture: CaptureConfig,
}

/// HTTP server for the audit proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    sink: Arc<LogSink>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, url::ParseError> {
        let env_router = Arc::new(EnvironmentRouter::from_config(&config.environments)?);
        let sink = Arc::new(LogSink::new(&config.log.directory, config.log.echo));
        let client = forward::build_client(Duration::from_secs(config.timeouts.connect_secs));

        let state = AppState {
            router: env_router,
            client,
            sink: sink.clone(),
            capture: config.capture.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            sink,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Spawns the sink flush loop for the lifetime of the server. On
    /// shutdown the server drains connections, the loop performs its final
    /// flush, and a last sweep catches entries enqueued while draining.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let HttpServer {
            router,
            config,
            sink,
        } = self;

        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let flush_period = Duration::from_millis(config.log.flush_interval_ms);
        let flush_handle =
            tokio::spawn(sink.clone().run_flush_loop(flush_period, shutdown.resubscribe()));

        let app = router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        let _ = flush_handle.await;
        sink.flush_once().await;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler: resolve environment, audit, forward, relay.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();

    let path = request.uri().path().to_string();
    let resolved = match state.router.resolve(&path) {
        Some(resolved) => resolved,
        None => {
            // No upstream call and no audit entry for unroutable requests.
            tracing::warn!(path = %path, "unknown environment prefix");
            return (
                StatusCode::BAD_REQUEST,
                "Invalid environment prefix in URL",
            )
                .into_response();
        }
    };

    let environment = resolved.environment;
    let env_name = environment.name.clone();
    let rewritten_path = resolved.rewritten_path.clone();

    let method = request.method().clone();
    let original_url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let query = request.uri().query().map(str::to_string);

    let request_headers = headers_to_map(request.headers());
    let workspace = header_value(request.headers(), WORKSPACE_HEADER);
    let user_agent = header_value(request.headers(), header::USER_AGENT.as_str());

    let (parts, body) = request.into_parts();

    // Body-carrying methods are buffered in full so the identical bytes can
    // be audited and forwarded; other methods stream straight through.
    let (outbound_body, request_body) = if carries_body(&method) {
        match axum::body::to_bytes(body, usize::MAX).await {
            Ok(bytes) => (Body::from(bytes.clone()), Some(bytes)),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read client request body");
                return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            }
        }
    } else {
        (body, None)
    };

    let request_entry = LogEntry::Request {
        time: LogEntry::timestamp_now(),
        environment: env_name.clone(),
        method: method.to_string(),
        url: original_url.clone(),
        query: parse_query(query.as_deref()),
        headers: request_headers,
        workspace,
        user_agent,
        body: request_body
            .as_deref()
            .and_then(|bytes| capture::render_request_body(bytes, state.capture.excerpt_chars)),
    };
    state.sink.enqueue(&env_name, request_entry.to_json_line());

    let upstream = forward::forward(
        &state.client,
        environment,
        &rewritten_path,
        query.as_deref(),
        method.clone(),
        &parts.headers,
        outbound_body,
    )
    .await;

    let response = match upstream {
        Ok(response) => response,
        Err(error) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::error!(
                environment = %env_name,
                error = %error,
                "upstream request failed"
            );
            state.sink.enqueue(
                &env_name,
                LogEntry::Error {
                    time: LogEntry::timestamp_now(),
                    environment: env_name.clone(),
                    method: method.to_string(),
                    url: original_url,
                    error: error.to_string(),
                    duration_ms,
                }
                .to_json_line(),
            );
            metrics::record_request(method.as_str(), 502, &env_name, start);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    let status = response.status();
    let content_length = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let encoding = ContentEncoding::from_header(
        response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok()),
    );
    let response_headers = headers_to_map(response.headers());

    // Self-handled response mode: the whole body is collected before the
    // relay, so the audit record carries completion-time latency and the
    // client receives exactly the bytes the upstream sent.
    let (resp_parts, resp_body) = response.into_parts();
    let body_bytes: Bytes = match axum::body::to_bytes(Body::new(resp_body), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(error) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            tracing::error!(
                environment = %env_name,
                error = %error,
                "failed to read upstream response body"
            );
            state.sink.enqueue(
                &env_name,
                LogEntry::Error {
                    time: LogEntry::timestamp_now(),
                    environment: env_name.clone(),
                    method: method.to_string(),
                    url: original_url,
                    error: format!("upstream body read failed: {error}"),
                    duration_ms,
                }
                .to_json_line(),
            );
            metrics::record_request(method.as_str(), 502, &env_name, start);
            return (StatusCode::BAD_GATEWAY, "Failed to read upstream response").into_response();
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let (body_field, body_omitted) =
        match capture::decide(content_length, state.capture.max_body_bytes) {
            CaptureDecision::Capture => (
                Some(capture::render_response_body(&body_bytes, &encoding)),
                None,
            ),
            CaptureDecision::Skip(reason) => (None, Some(reason)),
        };

    state.sink.enqueue(
        &env_name,
        LogEntry::Response {
            time: LogEntry::timestamp_now(),
            environment: env_name.clone(),
            method: method.to_string(),
            url: original_url,
            status: status.as_u16(),
            content_length,
            duration_ms,
            headers: response_headers,
            body: body_field,
            body_omitted,
        }
        .to_json_line(),
    );
    metrics::record_request(method.as_str(), status.as_u16(), &env_name, start);

    Response::from_parts(resp_parts, Body::from(body_bytes)).into_response()
}

/// Methods that conventionally carry a request body.
fn carries_body(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
}

fn headers_to_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn parse_query(query: Option<&str>) -> BTreeMap<String, String> {
    match query {
        Some(q) => url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect(),
        None => BTreeMap::new(),
    }
}
