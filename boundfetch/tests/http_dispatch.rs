//! End-to-end tests: dispatcher + reqwest transports against a local server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use boundfetch::transport::{Transport, TransportKind};
use boundfetch::{DispatchError, Dispatcher, DispatcherConfig, FetchError};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

// =============================================================================
// Test Server
// =============================================================================

/// Minimal HTTP/1.1 server with a few fixed routes.
///
/// - `/refs`: JSON with `cache-control: public, max-age=300`
/// - `/nocache`: JSON with `cache-control: no-store`
/// - `/missing`: 404
/// - `/garbage`: 200 with a non-JSON body
/// - `/slow/<n>`: JSON after 40ms, tracking how many are held at once
struct TestServer {
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
    peak: Arc<AtomicUsize>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let server = Self {
            base,
            requests: Arc::clone(&requests),
            peak: Arc::clone(&peak),
        };

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let requests = Arc::clone(&requests);
                let active = Arc::clone(&active);
                let peak = Arc::clone(&peak);
                tokio::spawn(handle(stream, requests, active, peak));
            }
        });

        server
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

async fn handle(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let head = String::from_utf8_lossy(&buf).to_string();
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    requests.lock().push(head);

    let refs = r#"{"refs":[{"id":"master","ref":"abc123"}]}"#;
    let (status, cache_control, body) = match path.as_str() {
        "/refs" => ("200 OK", Some("public, max-age=300"), refs.to_string()),
        "/nocache" => ("200 OK", Some("no-store"), refs.to_string()),
        "/missing" => ("404 Not Found", Some("max-age=60"), "not found".to_string()),
        "/garbage" => ("200 OK", None, "<html>oops</html>".to_string()),
        p if p.starts_with("/slow/") => {
            // Counted only while the response is held back.
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(40)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            ("200 OK", None, format!(r#"{{"path":"{}"}}"#, p))
        }
        _ => ("404 Not Found", None, String::new()),
    };

    let mut response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        status,
        body.len()
    );
    if let Some(value) = cache_control {
        response.push_str(&format!("Cache-Control: {}\r\n", value));
    }
    response.push_str("\r\n");
    response.push_str(&body);

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn dispatcher(max_concurrency: usize, order: Vec<TransportKind>) -> Dispatcher {
    let config = DispatcherConfig::default()
        .with_max_concurrency(max_concurrency)
        .with_timeout(Duration::from_secs(5))
        .with_transport_order(order);
    Dispatcher::from_config(&config).unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_json_response_with_ttl() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(4, TransportKind::DEFAULT_ORDER.to_vec());

    let outcome = dispatcher.fetch(server.url("/refs")).await.unwrap();

    assert_eq!(outcome.status(), Some(200));
    assert_eq!(outcome.ttl, Some(300));
    assert_eq!(
        outcome.body(),
        Some(&json!({"refs": [{"id": "master", "ref": "abc123"}]}))
    );
    let metadata = outcome.metadata.as_ref().unwrap();
    assert_eq!(metadata.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_request_headers_sent() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(1, vec![TransportKind::Fetch]);

    dispatcher.fetch(server.url("/refs")).await.unwrap();

    let head = server.requests().remove(0).to_ascii_lowercase();
    assert!(head.starts_with("get /refs "));
    assert!(head.contains("accept: application/json"));
    assert!(head.contains(&format!("user-agent: {}", boundfetch::user_agent().to_ascii_lowercase())));
}

#[tokio::test]
async fn test_custom_user_agent() {
    let server = TestServer::start().await;
    let config = DispatcherConfig::default().with_user_agent("prismic-sync/2.0");
    let dispatcher = Dispatcher::from_config(&config).unwrap();

    dispatcher.fetch(server.url("/refs")).await.unwrap();

    let head = server.requests().remove(0).to_ascii_lowercase();
    assert!(head.contains("user-agent: prismic-sync/2.0"));
}

#[tokio::test]
async fn test_no_store_has_no_ttl() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(1, vec![TransportKind::Fetch]);

    let outcome = dispatcher.fetch(server.url("/nocache")).await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.ttl, None);
}

#[tokio::test]
async fn test_not_found_is_status_error() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(1, vec![TransportKind::Fetch]);
    let url = server.url("/missing");

    let outcome = dispatcher.fetch(url.clone()).await.unwrap();

    assert_eq!(
        outcome.error(),
        Some(&FetchError::HttpStatus {
            status: 404,
            url: url.clone()
        })
    );
    assert_eq!(
        outcome.error().unwrap().to_string(),
        format!("Unexpected status code [404] on URL {}", url)
    );
    assert!(outcome.body().is_none());
    assert_eq!(outcome.ttl, None);
    assert_eq!(outcome.status(), Some(404));
}

#[tokio::test]
async fn test_invalid_json_is_decode_error() {
    let server = TestServer::start().await;

    for kind in TransportKind::DEFAULT_ORDER {
        let dispatcher = dispatcher(1, vec![kind]);
        let outcome = dispatcher.fetch(server.url("/garbage")).await.unwrap();
        assert!(
            matches!(outcome.error(), Some(FetchError::Decode { .. })),
            "{} transport: {:?}",
            kind,
            outcome.error()
        );
        assert_eq!(outcome.status(), Some(200));
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dispatcher = dispatcher(1, vec![TransportKind::Fetch]);

    let outcome = dispatcher
        .fetch(format!("http://127.0.0.1:{}/refs", port))
        .await
        .unwrap();
    assert!(matches!(outcome.error(), Some(FetchError::Transport { .. })));
    assert!(outcome.metadata.is_none());
}

#[tokio::test]
async fn test_stream_transport_matches_fetch() {
    let server = TestServer::start().await;

    let fetched = dispatcher(1, vec![TransportKind::Fetch])
        .fetch(server.url("/refs"))
        .await
        .unwrap();
    let streamed = dispatcher(1, vec![TransportKind::Stream])
        .fetch(server.url("/refs"))
        .await
        .unwrap();

    assert_eq!(fetched.body(), streamed.body());
    assert_eq!(fetched.ttl, streamed.ttl);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_server_never_sees_more_than_cap() {
    let server = TestServer::start().await;
    let dispatcher = dispatcher(2, TransportKind::DEFAULT_ORDER.to_vec());

    let pending: Vec<_> = (0..6)
        .map(|i| dispatcher.fetch(server.url(&format!("/slow/{}", i))))
        .collect();
    let outcomes = futures::future::join_all(pending).await;

    assert!(outcomes.iter().all(|o| o.as_ref().unwrap().is_success()));
    assert!(server.peak() <= 2, "peak was {}", server.peak());
    assert_eq!(server.requests().len(), 6);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.succeeded, 6);
    assert!(metrics.peak_in_flight <= 2);
}

#[tokio::test]
async fn test_typed_decode() {
    #[derive(Debug, Deserialize)]
    struct Refs {
        refs: Vec<Ref>,
    }

    #[derive(Debug, Deserialize)]
    struct Ref {
        id: String,
        #[serde(rename = "ref")]
        reference: String,
    }

    let server = TestServer::start().await;
    let dispatcher = dispatcher(1, vec![TransportKind::Fetch]);

    let refs: Refs = dispatcher
        .fetch(server.url("/refs"))
        .await
        .unwrap()
        .decode()
        .unwrap();
    assert_eq!(refs.refs.len(), 1);
    assert_eq!(refs.refs[0].id, "master");
    assert_eq!(refs.refs[0].reference, "abc123");
}

#[test]
fn test_builtin_transports_need_runtime() {
    let transport = TransportKind::Fetch.build(Duration::from_secs(1), "test");
    assert!(!transport.probe());

    let dispatcher = dispatcher(1, TransportKind::DEFAULT_ORDER.to_vec());
    assert_eq!(
        dispatcher.submit("http://127.0.0.1:1/", |_| {}),
        Err(DispatchError::NoRuntime)
    );
}
