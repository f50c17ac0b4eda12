//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use audit_proxy::config::{EnvironmentConfig, ProxyConfig};
use audit_proxy::intercept::LogEntry;
use audit_proxy::{HttpServer, Shutdown};

/// One request as seen by a mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Response a mock upstream sends back.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: body.as_bytes().to_vec(),
            delay: None,
        }
    }
}

/// Start a mock upstream. Every accepted connection is counted, every
/// parsed request recorded, and `respond` decides the answer.
pub async fn start_upstream<F>(
    respond: F,
) -> (SocketAddr, Arc<Mutex<Vec<RecordedRequest>>>, Arc<AtomicU32>)
where
    F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let connections = Arc::new(AtomicU32::new(0));

    let requests_task = requests.clone();
    let connections_task = connections.clone();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    connections_task.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    let requests = requests_task.clone();
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        if let Some(request) = read_request(&mut socket).await {
                            let response = respond(&request);
                            requests.lock().unwrap().push(request);
                            if let Some(delay) = response.delay {
                                tokio::time::sleep(delay).await;
                            }
                            let _ = write_response(&mut socket, &response).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, requests, connections)
}

/// Minimal HTTP/1.1 request parser for the mock upstream.
async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if buf.len() > 64 * 1024 {
            return None;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

async fn write_response(socket: &mut TcpStream, response: &MockResponse) -> std::io::Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n",
        response.status,
        status_text(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("Connection: close\r\n\r\n");

    socket.write_all(head.as_bytes()).await?;
    socket.write_all(&response.body).await?;
    socket.flush().await
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Config wired for tests: given environments, a scratch log dir, and a
/// fast flush interval.
pub fn test_config(environments: &[(&str, SocketAddr)], log_dir: &Path) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.environments = environments
        .iter()
        .map(|(name, addr)| EnvironmentConfig {
            name: name.to_string(),
            upstream_url: format!("http://{addr}"),
        })
        .collect();
    config.log.directory = log_dir.to_string_lossy().to_string();
    config.log.flush_interval_ms = 100;
    config.log.echo = false;
    config
}

/// Spawn the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig) -> (SocketAddr, Arc<Shutdown>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config).unwrap();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    // Let the accept loop come up before the test fires requests.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, shutdown, handle)
}

/// Stop the proxy and wait for its final flush to complete.
pub async fn stop_proxy(shutdown: &Shutdown, handle: JoinHandle<()>) {
    shutdown.trigger();
    let _ = handle.await;
}

/// Non-pooled client so every test request uses a fresh connection.
pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .user_agent("audit-proxy-tests")
        .no_proxy()
        .build()
        .unwrap()
}

/// Read and parse every persisted audit entry for an environment.
pub fn read_entries(log_dir: &Path, environment: &str) -> Vec<LogEntry> {
    let date = chrono::Local::now().format("%d_%m_%Y");
    let path = log_dir.join(environment).join(format!("log_{date}.txt"));
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(|line| serde_json::from_str(line).expect("persisted line must parse"))
            .collect(),
        Err(_) => Vec::new(),
    }
}
