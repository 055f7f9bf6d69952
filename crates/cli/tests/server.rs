use axum::body::Body;
use axum::http::{Request, StatusCode};
use cli::server::router;
use http_body_util::BodyExt;
use providers::hashing::HashingProvider;
use skillmap_core::embeddings::Embedder;
use skillmap_core::extractor::{ExtractError, PhraseExtractor};
use skillmap_core::matcher::Matcher;
use skillmap_core::pipeline::SkillService;
use skillmap_core::taxonomy::{SourceRecord, TaxonomyStore};
use skillmap_core::vectorstore::EmbeddingIndex;
use std::sync::Arc;
use tower::ServiceExt;

/// Treats every comma-separated piece of the input as a phrase.
struct CommaExtractor;

#[async_trait::async_trait]
impl PhraseExtractor for CommaExtractor {
    async fn extract(&self, text: &str) -> Result<Vec<String>, ExtractError> {
        Ok(text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn model(&self) -> &str {
        "comma-splitter"
    }
}

async fn test_app() -> axum::Router {
    router(Arc::new(test_service().await), None)
}

async fn test_service() -> SkillService {
    let store = TaxonomyStore::build(vec![
        vec![
            SourceRecord::new("Python", "15-1252.00"),
            SourceRecord::new("Java", "15-1252.00"),
        ],
        vec![SourceRecord::new("Critical Thinking", "11-1011.00")],
    ])
    .unwrap();
    let index = EmbeddingIndex::build(&store, Embedder::new(Arc::new(HashingProvider::default())))
        .await
        .unwrap();
    let matcher = Matcher::new(Arc::new(store), Arc::new(index));
    SkillService::new(matcher, Arc::new(CommaExtractor))
}

async fn post_json(app: axum::Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/extract")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn extract_returns_phrases_mapping_and_timing() {
    let (status, body) = post_json(
        test_app().await,
        serde_json::json!({ "text": "python, critical thinking", "top_k": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["extracted_phrases"],
        serde_json::json!(["python", "critical thinking"])
    );
    let python = body["mapping"]["python"].as_array().unwrap();
    assert_eq!(python.len(), 1);
    assert_eq!(python[0]["display_name"], "Python");
    assert_eq!(python[0]["provenance_codes"], serde_json::json!(["15-1252.00"]));
    assert_eq!(
        body["mapping"]["critical thinking"][0]["display_name"],
        "Critical Thinking"
    );
    assert!(body["elapsed_time"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn top_k_defaults_to_two() {
    let (status, body) = post_json(test_app().await, serde_json::json!({ "text": "java" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mapping"]["java"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn missing_top_k_uses_the_configured_default() {
    let app = router(Arc::new(test_service().await.with_default_top_k(1)), None);
    let (status, body) = post_json(app, serde_json::json!({ "text": "java" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mapping"]["java"].as_array().unwrap().len(), 1);

    let app = router(Arc::new(test_service().await.with_default_top_k(1)), None);
    let (status, body) = post_json(app, serde_json::json!({ "text": "java", "top_k": 3 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mapping"]["java"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn non_positive_top_k_is_a_client_error() {
    for top_k in [0, -3] {
        let (status, body) = post_json(
            test_app().await,
            serde_json::json!({ "text": "java", "top_k": top_k }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("top_k"));
    }
}

#[tokio::test]
async fn malformed_request_is_rejected() {
    let (status, _) = post_json(test_app().await, serde_json::json!({ "top_k": 2 })).await;
    assert!(status.is_client_error());

    let (status, _) = post_json(
        test_app().await,
        serde_json::json!({ "text": "java", "top_k": "two" }),
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn empty_text_gives_empty_report() {
    let (status, body) = post_json(test_app().await, serde_json::json!({ "text": "" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["extracted_phrases"], serde_json::json!([]));
    assert_eq!(body["mapping"], serde_json::json!({}));
}

#[tokio::test]
async fn health_reports_model_and_taxonomy_size() {
    let resp = test_app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "comma-splitter");
    assert_eq!(body["taxonomy_size"], 3);
}

#[tokio::test]
async fn static_dir_serves_the_frontend() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>skills</h1>").unwrap();

    let store = TaxonomyStore::build(vec![vec![SourceRecord::new("Python", "15-1252.00")]]).unwrap();
    let index = EmbeddingIndex::build(&store, Embedder::new(Arc::new(HashingProvider::default())))
        .await
        .unwrap();
    let service = SkillService::new(
        Matcher::new(Arc::new(store), Arc::new(index)),
        Arc::new(CommaExtractor),
    );
    let app = router(Arc::new(service), dir.path().to_str());

    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"<h1>skills</h1>");
}
