//! Serves a small configuration over a real socket.

use dito::config::AppConfig;
use dito::metrics::Metrics;
use dito::specs::{build_domain_table, SpecContext};
use dito::workdir::MemoryWorkDir;
use dito::MockServer;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const CONFIG: &str = r#"
domains:
  localhost:
    type: plain
    rules:
      - 'Path("/health") => StatusCode(200)'
      - 'Method("POST") -> JsonPath("$.user.role", "admin") => Json(202, "{\"accepted\":true}")'
      - 'Query("format", "txt") => File("notes.txt")'
  petstore.test:
    type: openapi
    schema: petstore.yaml
server:
  request:
    max_body_size: 1kb
"#;

const PETSTORE: &str = r#"
openapi: "3.0.0"
info: { title: Petstore, version: "1" }
paths:
  /pets/{petId}:
    get:
      responses:
        "200":
          description: one pet
          content:
            application/json:
              example: { "id": 7, "name": "rex" }
"#;

struct TestServer {
    addr: SocketAddr,
    metrics: Arc<Metrics>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start() -> Self {
        let config: AppConfig = serde_yaml::from_str(CONFIG).unwrap();
        let workdir = MemoryWorkDir::new()
            .with_file("petstore.yaml", PETSTORE)
            .with_file("notes.txt", "plain notes\n");
        let ctx = SpecContext::new(Arc::new(workdir));
        let domains = build_domain_table(&config.domains, &ctx).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let metrics = Arc::new(Metrics::new().unwrap());
        let server = MockServer::new(domains, &config.server).with_metrics(Arc::clone(&metrics));
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = rx.await;
        }));

        Self {
            addr,
            metrics,
            shutdown: Some(tx),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_rules_over_http() {
    let server = TestServer::start().await;
    let client = client();
    let host = "localhost";

    let resp = client
        .get(server.url("/health"))
        .header("Host", host)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(server.url("/login"))
        .header("Host", host)
        .json(&json!({ "user": { "role": "admin" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({ "accepted": true }));

    let resp = client
        .get(server.url("/notes?format=txt"))
        .header("Host", host)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "text/plain; charset=utf-8"
    );
    assert_eq!(resp.text().await.unwrap(), "plain notes\n");

    server.stop().await;
}

#[tokio::test]
async fn test_unmatched_request_is_not_found() {
    let server = TestServer::start().await;
    let client = client();

    let resp = client
        .post(server.url("/login"))
        .header("Host", "localhost")
        .json(&json!({ "user": { "role": "guest" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "404 page not found\n");

    let resp = client
        .get(server.url("/health"))
        .header("Host", "unknown.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_does_not_match() {
    let server = TestServer::start().await;
    let padding = "x".repeat(4096);

    let resp = client()
        .post(server.url("/login"))
        .header("Host", "localhost")
        .json(&json!({ "user": { "role": "admin" }, "padding": padding }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn test_openapi_domain() {
    let server = TestServer::start().await;

    let resp = client()
        .get(server.url("/pets/7"))
        .header("Host", "petstore.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.json::<Value>().await.unwrap(),
        json!({ "id": 7, "name": "rex" })
    );

    server.stop().await;
}

#[tokio::test]
async fn test_request_durations_are_recorded_per_domain() {
    let server = TestServer::start().await;
    let client = client();

    for host in ["localhost", "localhost", "petstore.test", "unknown.test"] {
        client
            .get(server.url("/health"))
            .header("Host", host)
            .send()
            .await
            .unwrap();
    }

    let text = server.metrics.collect().unwrap();
    assert!(text.contains(r#"dito_request_duration_seconds_count{domain="localhost",status="200"} 2"#));
    assert!(text.contains(r#"dito_request_duration_seconds_count{domain="petstore.test",status="404"} 1"#));
    assert!(text.contains(r#"dito_request_duration_seconds_count{domain="unknown",status="404"} 1"#));
    assert!(!text.contains("unknown.test"));

    server.stop().await;
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let metrics = Arc::new(Metrics::new().unwrap());
    metrics.record_request("localhost", 200, Duration::from_millis(2));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(dito::metrics::serve(listener, Arc::clone(&metrics)));

    let resp = client()
        .get(format!("http://{addr}/metrics"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains(r#"dito_request_duration_seconds_count{domain="localhost",status="200"} 1"#));

    let resp = client()
        .get(format!("http://{addr}/other"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    task.abort();
}
