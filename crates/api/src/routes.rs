use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use index::IndexStats;
use query::RetrievalResult;

use crate::metrics::MetricsSnapshot;
use crate::service::QueryService;

type AppState = Arc<QueryService>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(e) => {
                tracing::error!(error = %format!("{:#}", e), "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "error": format!("{:#}", self) }));
        (status, body).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub llm: bool,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub documents: usize,
    pub index: IndexStats,
    pub summary: String,
}

#[derive(Deserialize)]
pub struct RetrieveRequest {
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub question: String,
    pub results: Vec<RetrievalResult>,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: Option<usize>,
    #[serde(default)]
    pub use_llm: bool,
}

#[derive(Serialize, Deserialize)]
pub struct QueryResponse {
    pub question: String,
    pub response: String,
}

pub fn router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/metrics", get(get_metrics))
        .route("/retrieve", post(retrieve))
        .route("/query", post(answer_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn health_check(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        llm: service.has_llm(),
    })
}

async fn get_stats(State(service): State<AppState>) -> Json<StatsResponse> {
    let pipeline = service.pipeline();
    Json(StatsResponse {
        documents: pipeline.artifacts().documents.len(),
        index: pipeline.stats(),
        summary: pipeline.explain_graph(),
    })
}

async fn get_metrics(State(service): State<AppState>) -> Json<MetricsSnapshot> {
    Json(service.metrics().snapshot())
}

async fn retrieve(
    State(service): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let result = run_retrieve(&service, &req);
    service.metrics().record_request(result.is_ok());
    result.map(Json)
}

async fn answer_query(
    State(service): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let result = run_query(&service, &req).await;
    service.metrics().record_request(result.is_ok());
    result.map(Json)
}

fn run_retrieve(service: &QueryService, req: &RetrieveRequest) -> Result<RetrieveResponse, ApiError> {
    let question = require_question(&req.question)?;
    let top_k = req.top_k.unwrap_or(service.default_top_k());
    let results = service.retrieve(question, top_k)?;
    Ok(RetrieveResponse {
        question: question.to_string(),
        results,
    })
}

async fn run_query(service: &QueryService, req: &QueryRequest) -> Result<QueryResponse, ApiError> {
    let question = require_question(&req.question)?;
    if req.use_llm && !service.has_llm() {
        return Err(ApiError::Unavailable(
            "LLM answers are disabled: no Gemini API key is configured".to_string(),
        ));
    }
    let top_k = req.top_k.unwrap_or(service.default_top_k());
    let response = service.answer(question, top_k, req.use_llm).await?;
    Ok(QueryResponse {
        question: question.to_string(),
        response,
    })
}

fn require_question(question: &str) -> Result<&str, ApiError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }
    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use ingest::Document;
    use query::{GraphRagPipeline, PipelineConfig};
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::metrics::Metrics;

    fn app() -> Router {
        let documents = vec![
            Document {
                doc_id: "a.txt".to_string(),
                title: "A".to_string(),
                body: "Alice met Bob in Paris.".to_string(),
            },
            Document {
                doc_id: "b.txt".to_string(),
                title: "B".to_string(),
                body: "Bob travels to Paris often.".to_string(),
            },
        ];
        let pipeline = GraphRagPipeline::from_documents(documents, &PipelineConfig::default()).unwrap();
        let service = QueryService::new(pipeline, None, &AppConfig::default(), Metrics::new());
        router(Arc::new(service))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "ok");
        assert!(!health.llm);
    }

    #[tokio::test]
    async fn test_stats() {
        let response = app()
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let stats: serde_json::Value = body_json(response).await;
        assert_eq!(stats["documents"], 2);
        assert_eq!(stats["index"]["entities"], 2);
        assert_eq!(stats["index"]["co_occurs"], 1);
    }

    #[tokio::test]
    async fn test_retrieve() {
        let response = app()
            .oneshot(post_json("/retrieve", serde_json::json!({ "question": "Where did Bob go?", "top_k": 1 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: RetrieveResponse = body_json(response).await;
        assert_eq!(body.results.len(), 2);
        assert!(body.results[1].is_expansion());
    }

    #[tokio::test]
    async fn test_empty_question_is_bad_request() {
        let response = app()
            .oneshot(post_json("/query", serde_json::json!({ "question": "   " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_offline() {
        let response = app()
            .oneshot(post_json("/query", serde_json::json!({ "question": "Where did Bob go?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: QueryResponse = body_json(response).await;
        assert!(body.response.contains("Answer:\n- "));
    }

    #[tokio::test]
    async fn test_query_with_llm_unavailable() {
        let response = app()
            .oneshot(post_json("/query", serde_json::json!({ "question": "Where?", "use_llm": true })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
