//! Upstream request forwarding.
//!
//! # Responsibilities
//! - Build the outbound request: rewritten path + original query, original
//!   method and headers minus `Host` and hop-by-hop headers
//! - Issue the call over a fresh connection (no idle pooling)
//! - Surface transport failures as `ForwardError` for the caller to map to
//!   a gateway error
//!
//! # Design Decisions
//! - The `Host` sent upstream derives from the upstream URI, so the
//!   upstream sees its own host, not the client-facing one
//! - Failed upstream calls are never retried

use std::time::Duration;

use axum::body::Body;
use axum::http::uri::InvalidUri;
use axum::http::{header, HeaderMap, HeaderName, Method, Request, Response, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::routing::Environment;

/// Outbound HTTP client for upstream calls.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Headers that describe the client↔proxy connection, never forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Why an upstream call could not produce a response.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream URI: {0}")]
    Uri(#[from] InvalidUri),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("upstream call failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Build the outbound client: HTTPS-capable, connect timeout applied, and
/// no idle connection pooling (fresh connection per upstream call).
pub fn build_client(connect_timeout: Duration) -> UpstreamClient {
    let mut connector = HttpConnector::new();
    connector.set_connect_timeout(Some(connect_timeout));
    connector.enforce_http(false);

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(connector);

    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(0)
        .build(https)
}

/// Forward a request to the environment's upstream.
pub async fn forward(
    client: &UpstreamClient,
    environment: &Environment,
    rewritten_path: &str,
    query: Option<&str>,
    method: Method,
    headers: &HeaderMap,
    body: Body,
) -> Result<Response<hyper::body::Incoming>, ForwardError> {
    let uri = upstream_uri(&environment.upstream, rewritten_path, query)?;
    tracing::debug!(environment = %environment.name, uri = %uri, "forwarding upstream");

    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(outbound) = builder.headers_mut() {
        *outbound = forwardable_headers(headers);
    }
    let request = builder.body(body)?;

    Ok(client.request(request).await?)
}

/// Copy of `headers` with `Host` and hop-by-hop headers removed.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if *name == header::HOST || is_hop_by_hop(name) {
            continue;
        }
        forwarded.append(name.clone(), value.clone());
    }
    forwarded
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.iter().any(|h| name.as_str() == *h)
}

/// Join the upstream base URL with the rewritten path and original query.
fn upstream_uri(base: &Url, path: &str, query: Option<&str>) -> Result<Uri, InvalidUri> {
    let base = base.as_str().trim_end_matches('/');
    let uri = match query {
        Some(q) if !q.is_empty() => format!("{base}{path}?{q}"),
        _ => format!("{base}{path}"),
    };
    uri.parse()
}
