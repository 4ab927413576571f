//! End-to-end tests against a live server on an ephemeral port.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use quotesheet::api::{SaveResponse, ADMIN_PAGE, DATA_PATH, SAVE_PATH};
use quotesheet::client::FallbackReason;
use quotesheet::config::RenderConfig;
use quotesheet::server::{build_router, AppState};
use quotesheet::{HttpTransport, Quote, QuoteStore, SaveClient, SaveOutcome, SaveTransport};
use tempfile::TempDir;

const SAMPLE: &str = r#"{
  "title": "Quote",
  "client": "ACME",
  "intro": "Line one\nLine two",
  "groups": [
    {"label": "Doors", "items": [
      {"type": "Oak", "origin": "IT", "price": 1200, "notes": "", "highlight": true},
      {"type": "Pine", "origin": "TR", "price": "300.5", "notes": "x"}
    ]}
  ],
  "total": 1500.5
}"#;

struct TestServer {
    addr: SocketAddr,
    dir: TempDir,
    http: reqwest::Client,
}

impl TestServer {
    async fn start(seed: Option<&str>) -> Self {
        Self::start_with(seed, 64 * 1024).await
    }

    async fn start_with(seed: Option<&str>, max_body_bytes: usize) -> Self {
        let dir = TempDir::new().unwrap();
        let data_file = dir.path().join("data.json");
        if let Some(seed) = seed {
            std::fs::write(&data_file, seed).unwrap();
        }
        std::fs::write(dir.path().join("styles.css"), "body{}").unwrap();

        let state = AppState::new(
            QuoteStore::new(&data_file),
            dir.path().to_path_buf(),
            RenderConfig::default(),
            max_body_bytes,
        );
        Self::launch(state, dir).await
    }

    async fn launch(state: AppState, dir: TempDir) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        Self { addr, dir, http }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    fn data_file(&self) -> std::path::PathBuf {
        self.dir.path().join("data.json")
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_get_data_returns_stored_bytes() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let resp = server.http.get(server.url(DATA_PATH)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );
    assert!(resp.headers().contains_key("etag"));
    assert_eq!(resp.text().await.unwrap(), SAMPLE);
}

#[tokio::test]
async fn test_get_data_missing_is_404() {
    let server = TestServer::start(None).await;
    let resp = server.http.get(server.url(DATA_PATH)).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "data.json not found");
}

#[tokio::test]
async fn test_save_writes_normalized_document() {
    let server = TestServer::start(None).await;
    let resp = server
        .http
        .post(server.url(SAVE_PATH))
        .header("content-type", "application/json")
        .body(SAMPLE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: SaveResponse = resp.json().await.unwrap();
    assert!(body.success);
    assert_eq!(body.message.as_deref(), Some("Data saved successfully"));
    assert_eq!(body.total, Some(1500.5));

    let stored = read_json(&server.data_file());
    assert_eq!(stored["client"], "ACME");
    assert_eq!(stored["total"], 1500.5);
    assert_eq!(stored["groups"][0]["items"][0]["price"], 1200);
    assert_eq!(stored["groups"][0]["items"][1]["price"], 300.5);
}

#[tokio::test]
async fn test_save_invalid_json_is_400() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let resp = server
        .http
        .post(server.url(SAVE_PATH))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: SaveResponse = resp.json().await.unwrap();
    assert!(!body.success);
    assert!(body.error.is_some());
    assert_eq!(std::fs::read_to_string(server.data_file()).unwrap(), SAMPLE);
}

#[tokio::test]
async fn test_cors_preflight_and_headers() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let resp = server
        .http
        .request(reqwest::Method::OPTIONS, server.url(SAVE_PATH))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(
        resp.headers()["access-control-allow-methods"],
        "GET, POST, PUT, OPTIONS"
    );

    let resp = server.http.get(server.url(DATA_PATH)).send().await.unwrap();
    assert_eq!(resp.headers()["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn test_admin_redirects_permanently() {
    let server = TestServer::start(None).await;
    for path in ["/admin", "/admin/"] {
        let resp = server.http.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers()["location"], ADMIN_PAGE);
    }
}

#[tokio::test]
async fn test_quote_page_renders_document() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let resp = server.http.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("ACME"));
    assert!(html.contains("Line one<br>Line two"));
    assert!(html.contains("1,501"));
    assert!(html.contains("1,200"));
}

#[tokio::test]
async fn test_quote_page_without_data_shows_error_row() {
    let server = TestServer::start(None).await;
    let resp = server.http.get(server.url("/index.html")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert!(resp.text().await.unwrap().contains("Error loading data"));
}

#[tokio::test]
async fn test_static_assets_and_traversal() {
    let server = TestServer::start(None).await;
    let resp = server.http.get(server.url("/styles.css")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "text/css");
    assert_eq!(resp.text().await.unwrap(), "body{}");

    let resp = server.http.get(server.url("/missing.js")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(resp.text().await.unwrap(), "404 Not Found");

    let resp = server
        .http
        .get(server.url("/%2e%2e/%2e%2e/etc/passwd"))
        .send()
        .await
        .unwrap();
    assert!(resp.status() == 403 || resp.status() == 404);
}

#[tokio::test]
async fn test_editor_add_group_then_save() {
    let server = TestServer::start(None).await;

    let resp = server.http.get(server.url(ADMIN_PAGE)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("<form"));

    let resp = server
        .http
        .post(server.url("/editor"))
        .form(&[("title", "Q"), ("client", "Bob"), ("action", "add-group")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("groups[0][items][0][price]"));
    assert!(!server.data_file().exists());

    let resp = server
        .http
        .post(server.url("/editor"))
        .form(&[
            ("title", "Q"),
            ("client", "Bob"),
            ("intro", ""),
            ("groups[0][label]", "Windows"),
            ("groups[0][items][0][type]", "Alu"),
            ("groups[0][items][0][origin]", "DE"),
            ("groups[0][items][0][price]", "250"),
            ("groups[0][items][0][notes]", ""),
            ("groups[0][items][0][highlight]", "on"),
            ("groups[0][items][1][type]", ""),
            ("groups[0][items][1][origin]", ""),
            ("groups[0][items][1][price]", ""),
            ("groups[0][items][1][notes]", ""),
            ("action", "save"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()["location"], "/");

    let stored = read_json(&server.data_file());
    assert_eq!(stored["client"], "Bob");
    assert_eq!(stored["total"], 250);
    assert_eq!(stored["groups"][0]["items"].as_array().unwrap().len(), 1);
    assert_eq!(stored["groups"][0]["items"][0]["highlight"], true);
}

#[tokio::test]
async fn test_editor_rejects_unknown_field() {
    let server = TestServer::start(None).await;
    let resp = server
        .http
        .post(server.url("/editor"))
        .form(&[("groups[x][label]", "bad")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::start(None).await;
    let resp = server
        .http
        .get(server.url(DATA_PATH))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_save_client_saves_to_live_server() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let downloads = TempDir::new().unwrap();
    let transport =
        HttpTransport::new(&format!("http://{}", server.addr), Duration::from_secs(2)).unwrap();
    assert!(transport.probe().await);
    assert!(transport.admin_url().ends_with(ADMIN_PAGE));

    let client = SaveClient::new(transport, downloads.path());
    let mut quote = Quote::from_json_slice(SAMPLE.as_bytes()).unwrap();
    quote.client = "Globex".to_string();

    let outcome = client.save(&quote).await.unwrap();
    assert!(outcome.is_saved());
    assert_eq!(read_json(&server.data_file())["client"], "Globex");
    assert_eq!(std::fs::read_dir(downloads.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_save_client_downloads_when_server_down() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let downloads = TempDir::new().unwrap();
    let transport =
        HttpTransport::new(&format!("http://{addr}"), Duration::from_millis(500)).unwrap();
    let client = SaveClient::new(transport, downloads.path());
    let quote = Quote::from_json_slice(SAMPLE.as_bytes()).unwrap();

    let outcome = client.save(&quote).await.unwrap();
    match outcome {
        SaveOutcome::Downloaded { path, reason } => {
            assert_eq!(reason, FallbackReason::ServerUnavailable);
            assert_eq!(path, downloads.path().join("data.json"));
            assert_eq!(read_json(&path)["client"], "ACME");
        }
        other => panic!("expected download, got {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = TestServer::start_with(None, 1024).await;
    let intro = "x".repeat(4096);
    let body = serde_json::json!({"title": "Big", "intro": intro}).to_string();
    let resp = server
        .http
        .post(server.url(SAVE_PATH))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(!server.data_file().exists());
}

#[tokio::test]
async fn test_save_disk_failure_is_500() {
    let dir = TempDir::new().unwrap();
    let blocked = dir.path().join("data.json");
    std::fs::create_dir(&blocked).unwrap();
    let state = AppState::new(
        QuoteStore::new(&blocked),
        dir.path().to_path_buf(),
        RenderConfig::default(),
        64 * 1024,
    );
    let server = TestServer::launch(state, dir).await;

    let resp = server
        .http
        .post(server.url(SAVE_PATH))
        .body(SAMPLE)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: SaveResponse = resp.json().await.unwrap();
    assert!(!body.success);
    assert!(body.error.unwrap().contains("failed to write"));
}

#[tokio::test]
async fn test_quote_page_unreadable_document_is_500() {
    let server = TestServer::start(Some("{ this is not json")).await;
    let resp = server.http.get(server.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 500);
    assert!(resp.text().await.unwrap().contains("Error loading data"));
}

#[tokio::test]
async fn test_editor_reset_discards_edits() {
    let server = TestServer::start(Some(SAMPLE)).await;
    let resp = server
        .http
        .post(server.url("/editor"))
        .form(&[
            ("title", "Edited title"),
            ("client", "Someone else"),
            ("groups[0][label]", "Changed"),
            ("action", "reset"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let html = resp.text().await.unwrap();
    assert!(html.contains("value=\"ACME\""));
    assert!(html.contains("value=\"Doors\""));
    assert!(!html.contains("Someone else"));
    assert!(!html.contains("Changed"));
    assert_eq!(std::fs::read_to_string(server.data_file()).unwrap(), SAMPLE);
}

#[tokio::test]
async fn test_editor_rejection_keeps_typed_values() {
    let server = TestServer::start(None).await;
    let resp = server
        .http
        .post(server.url("/editor"))
        .form(&[
            ("title", "Unsaved draft"),
            ("groups[0][label]", "Windows"),
            ("groups[0][colour]", "red"),
            ("action", "save"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let html = resp.text().await.unwrap();
    assert!(html.contains("value=\"Unsaved draft\""));
    assert!(html.contains("value=\"Windows\""));
    assert!(html.contains("groups[0][colour]"));
    assert!(!server.data_file().exists());
}
