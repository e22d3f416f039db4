//! Router tests driven through `tower::ServiceExt::oneshot`.

use super::*;
use crate::config::{AnalysisConfig, AnalysisMode};
use crate::error::{AnalyzeError, StorageError};
use crate::pipeline::extract::one_page_pdf;
use crate::pipeline::llm::{ChatCompletion, Completion, LlmRequest};
use crate::storage::{LocalStorage, Storage};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::future::{BoxFuture, FutureExt};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

/// Answers every prompt with the same text and counts calls.
struct FixedModel {
    reply: &'static str,
    calls: AtomicUsize,
}

impl FixedModel {
    fn new(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

impl ChatCompletion for FixedModel {
    fn complete<'a>(
        &'a self,
        _request: &'a LlmRequest,
    ) -> BoxFuture<'a, Result<Completion, AnalyzeError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(Completion::model(self.reply)) }.boxed()
    }

    fn model(&self) -> &str {
        "fixed-model"
    }
}

/// Storage wrapper that counts downloads.
struct Counting {
    inner: LocalStorage,
    downloads: AtomicUsize,
}

impl Storage for Counting {
    fn download<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.inner.download(path)
    }

    fn upload<'a>(
        &'a self,
        path: &'a str,
        bytes: Vec<u8>,
        content_type: &'a str,
    ) -> BoxFuture<'a, Result<String, StorageError>> {
        self.inner.upload(path, bytes, content_type)
    }

    fn ensure_bucket(&self) -> BoxFuture<'_, Result<bool, StorageError>> {
        self.inner.ensure_bucket()
    }

    fn bucket_exists(&self) -> BoxFuture<'_, bool> {
        self.inner.bucket_exists()
    }
}

const SCORECARD_REPLY: &str =
    "1. Yes\n2. Yes\n3. Yes\n4. Yes\n5. Yes\n6. Yes\n7. Yes\n8. No\n9. Yes\n10. Yes";

struct Harness {
    _dir: tempfile::TempDir,
    storage: Arc<Counting>,
    model: Arc<FixedModel>,
    app: Router,
}

fn harness(config: AnalysisConfig, reply: &'static str, max_bytes: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(Counting {
        inner: LocalStorage::new(dir.path()).with_max_bytes(max_bytes),
        downloads: AtomicUsize::new(0),
    });
    let model = FixedModel::new(reply);
    let analyzer = Analyzer::new(config, storage.clone(), model.clone());
    Harness {
        _dir: dir,
        storage,
        model,
        app: router(AppState::new(analyzer)),
    }
}

fn scorecard_config(fallback: bool) -> AnalysisConfig {
    AnalysisConfig::builder()
        .mode(AnalysisMode::Scorecard)
        .use_local_fallback(fallback)
        .build()
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart_request(file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "marketmetric-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn analyze_sample_scorecard_end_to_end() {
    let h = harness(scorecard_config(true), SCORECARD_REPLY, 1024);

    let (status, headers, body) = send(
        &h.app,
        json_request(
            "/analyze",
            json!({ "filePath": "reports/x.pdf", "fileName": "x.pdf", "userId": "u-1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(body["results"]["has_cagr"], true);
    assert_eq!(body["results"]["has_publication_date"], true);
    assert_eq!(body["results"]["has_industry_trends"], false);
    assert_eq!(body["results"]["total_score"], 9);
    assert_eq!(body["provenance"]["text"], "fallback");
    assert_eq!(body["provenance"]["fallback_reason"], "requested");
    assert_eq!(body["provenance"]["completion"], "model");
    assert_eq!(h.storage.downloads.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_file_path_is_rejected_before_any_call() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 1024);

    let (status, headers, body) =
        send(&h.app, json_request("/analyze", json!({ "fileName": "x.pdf" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["stage"], "received");
    assert!(body["error"].as_str().unwrap().contains("filePath"));
    assert!(body.get("details").is_none());
    assert_eq!(h.storage.downloads.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 1024);
    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, _, body) = send(&h.app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_path_fails_at_extracting() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 1024);

    let (status, _, body) = send(
        &h.app,
        json_request(
            "/analyze",
            json!({ "filePath": "reports/missing.pdf", "fileName": "missing.pdf" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["stage"], "extracting");
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert_eq!(h.storage.downloads.load(Ordering::SeqCst), 1);
    assert_eq!(h.model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upload_then_analyze_unparseable_pdf_uses_fallback() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 1024);

    let (status, _, body) = send(
        &h.app,
        multipart_request("Q3 market report.pdf", "application/pdf", b"%PDF-1.4 broken"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["fileName"], "Q3 market report.pdf");
    let path = body["filePath"].as_str().unwrap().to_string();
    assert!(path.starts_with("reports/"));
    assert!(path.ends_with("_Q3_market_report.pdf"));

    let (status, _, body) = send(
        &h.app,
        json_request("/analyze", json!({ "filePath": path, "fileName": "Q3 market report.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["provenance"]["text"], "fallback");
    assert_eq!(h.storage.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_then_analyze_real_pdf_uses_extracted_text() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 4096);
    let pdf = one_page_pdf("Global AI market CAGR of 37.5%");

    let (status, _, body) =
        send(&h.app, multipart_request("ai.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    let path = body["filePath"].as_str().unwrap().to_string();

    let (status, _, body) = send(
        &h.app,
        json_request("/analyze", json!({ "filePath": path, "fileName": "ai.pdf" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["provenance"]["text"], "extracted");
    assert!(body["provenance"].get("fallback_reason").map_or(true, Value::is_null));
    assert_eq!(body["results"]["total_score"], 9);
    assert_eq!(h.storage.downloads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_rejects_non_pdf() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 1024);

    let (status, _, body) =
        send(&h.app, multipart_request("notes.txt", "text/plain", b"hello")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("PDF"));
}

#[tokio::test]
async fn upload_over_storage_limit_is_413() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, 8);

    let (status, _, body) = send(
        &h.app,
        multipart_request("big.pdf", "application/pdf", b"%PDF-1.4 more than eight bytes"),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "STORAGE_ERROR");
}

#[tokio::test]
async fn upload_over_body_limit_is_413() {
    let h = harness(scorecard_config(false), SCORECARD_REPLY, MAX_UPLOAD_BYTES);
    let data = vec![b'x'; MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD + 1];

    let (status, _, body) =
        send(&h.app, multipart_request("huge.pdf", "application/pdf", &data)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE, "body: {body}");
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert_eq!(body["stage"], "received");
}

#[tokio::test]
async fn summary_mode_returns_cleaned_markdown() {
    let config = AnalysisConfig::builder()
        .use_local_fallback(true)
        .build()
        .unwrap();
    let h = harness(
        config,
        "Sure, here it is.\nEXECUTIVE SUMMARY\nValued at $10.4 billion.\nEMERGING TRENDS\nVision AI.",
        1024,
    );

    let (status, _, body) = send(
        &h.app,
        json_request("/analyze", json!({ "filePath": "reports/x.pdf", "fileName": "x.pdf" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let summary = body["results"]["summary"].as_str().unwrap();
    assert!(summary.starts_with("# Market Research Report Summary"));
    assert!(summary.contains("## EXECUTIVE SUMMARY"));
    assert!(summary.contains("\n---\n\n## EMERGING TRENDS"));
    assert!(summary.contains("`$10.4 billion`"));
    assert!(!summary.contains("Sure, here it is"));
}

#[tokio::test]
async fn init_creates_bucket_once_and_health_reports_it() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path().join("market-reports")));
    let analyzer = Analyzer::new(
        scorecard_config(false),
        storage,
        FixedModel::new(SCORECARD_REPLY),
    );
    let app = router(AppState::new(analyzer));

    let get_health = || {
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap()
    };
    let post_init = || {
        Request::builder()
            .method("POST")
            .uri("/init")
            .body(Body::empty())
            .unwrap()
    };

    let (_, headers, health) = send(&app, get_health()).await;
    assert_eq!(headers["cache-control"], "no-store");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["mode"], "scorecard");
    assert_eq!(health["model"], "fixed-model");
    assert_eq!(health["bucket_exists"], false);

    let (status, _, body) = send(&app, post_init()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], true);

    let get_init = Request::builder().uri("/init").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, get_init).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], false);
    assert!(body["message"].as_str().unwrap().contains("already exists"));

    let (_, _, health) = send(&app, get_health()).await;
    assert_eq!(health["bucket_exists"], true);
}
