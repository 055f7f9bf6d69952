//! HTTP surface: `POST /extract` and `GET /health`, plus an optional static frontend.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use skillmap_core::config::ServerConfig;
use skillmap_core::models::ExtractionReport;
use skillmap_core::pipeline::{validate_top_k, SkillService};
use skillmap_core::SkillMapError;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
    /// Falls back to the service's configured default when absent.
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    #[serde(flatten)]
    pub report: ExtractionReport,
    /// Seconds spent handling the request.
    pub elapsed_time: f64,
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    model: &'a str,
    taxonomy_size: usize,
}

pub struct ApiError(SkillMapError);

impl From<SkillMapError> for ApiError {
    fn from(err: SkillMapError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SkillMapError::InvalidTopK(_) => StatusCode::BAD_REQUEST,
            e if e.is_embedding_failure() => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status != StatusCode::BAD_REQUEST {
            error!("request failed: {}", self.0);
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

async fn extract(
    State(service): State<Arc<SkillService>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let start = Instant::now();
    let top_k = req
        .top_k
        .unwrap_or_else(|| i64::try_from(service.default_top_k()).unwrap_or(i64::MAX));
    let k = validate_top_k(top_k)?;
    let report = service.extract_and_map(&req.text, k).await?;
    Ok(Json(ExtractResponse {
        report,
        elapsed_time: start.elapsed().as_secs_f64(),
    }))
}

async fn health(State(service): State<Arc<SkillService>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        model: service.extractor_model(),
        taxonomy_size: service.taxonomy_size(),
    })
    .into_response()
}

pub fn router(service: Arc<SkillService>, static_dir: Option<&str>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/extract", post(extract))
        .route("/health", get(health))
        .with_state(service);
    if let Some(dir) = static_dir {
        info!("Serving static files from: {}", dir);
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(TraceLayer::new_for_http()).layer(cors)
}

pub async fn serve(service: Arc<SkillService>, cfg: &ServerConfig) -> anyhow::Result<()> {
    let app = router(service, cfg.static_dir.as_deref());
    let listener = tokio::net::TcpListener::bind(&cfg.bind).await?;
    info!("Skill extraction API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
