//! HTTP API server for the web frontend and other clients.
//!
//! Exposes course questions, the catalog summary and session reset as JSON endpoints.

use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let load_docs = settings.server.load_docs_on_startup;
    let docs_dir = settings.docs_dir();

    let rag = Arc::new(RagSystem::new(settings)?);

    if load_docs {
        if docs_dir.is_dir() {
            let spinner = Output::spinner("Loading course documents...");
            let loaded = rag.add_course_folder(&docs_dir, false).await;
            spinner.finish_and_clear();
            match loaded {
                Ok((courses, chunks)) => {
                    info!("Startup ingest: {} courses, {} chunks", courses, chunks);
                    Output::success(&format!("Loaded {} courses with {} chunks", courses, chunks));
                }
                Err(e) => Output::warning(&format!("Could not load documents: {}", e)),
            }
        } else {
            warn!("Docs directory {} not found, skipping startup ingest", docs_dir.display());
        }
    }

    let app = router(rag);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Pensum API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    Output::kv("Clear session", "POST /api/sessions/clear");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router over a shared assistant.
pub fn router(rag: Arc<RagSystem>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/sessions/clear", post(clear_session))
        .layer(cors)
        .with_state(rag)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
    sources: Vec<String>,
    source_links: Vec<Option<String>>,
    session_id: String,
}

#[derive(Deserialize)]
struct ClearSessionRequest {
    session_id: String,
}

#[derive(Serialize)]
struct ClearSessionResponse {
    message: String,
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Course Materials RAG System API" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(rag): State<Arc<RagSystem>>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
        }
    };

    match rag.query(&req.query, req.session_id.as_deref()).await {
        Ok(response) => Json(QueryResponse {
            sources: response.source_labels(),
            source_links: response.source_links(),
            answer: response.answer,
            session_id: response.session_id,
        })
        .into_response(),
        Err(e) => {
            error!("Query failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn courses(State(rag): State<Arc<RagSystem>>) -> Response {
    match rag.course_analytics().await {
        Ok(analytics) => Json(analytics).into_response(),
        Err(e) => {
            error!("Course analytics failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn clear_session(
    State(rag): State<Arc<RagSystem>>,
    body: Result<Json<ClearSessionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
        }
    };

    rag.clear_session(&req.session_id);
    Json(ClearSessionResponse {
        message: "Session cleared successfully".to_string(),
        session_id: req.session_id,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{InferenceRequest, ModelClient, ModelReply};
    use crate::config::Prompts;
    use crate::embedding::HashingEmbedder;
    use crate::vector_store::MemoryVectorStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Answers every request with the same text.
    struct EchoModel;

    #[async_trait]
    impl ModelClient for EchoModel {
        async fn infer(&self, _request: InferenceRequest) -> crate::Result<ModelReply> {
            Ok(ModelReply::Text("Courses cover retrieval.".to_string()))
        }
    }

    fn test_rag() -> Arc<RagSystem> {
        Arc::new(RagSystem::with_components(
            Settings::default(),
            Prompts::default(),
            Arc::new(MemoryVectorStore::new()),
            Arc::new(HashingEmbedder::new(128)),
            Arc::new(EchoModel),
        ))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_message() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = send(router(test_rag()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Course Materials RAG System API"}));
    }

    #[tokio::test]
    async fn test_query_creates_session() {
        let (status, body) = send(
            router(test_rag()),
            post_json("/api/query", r#"{"query": "What is covered?"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Courses cover retrieval.");
        assert_eq!(body["sources"], json!([]));
        assert_eq!(body["source_links"], json!([]));
        assert!(!body["session_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_keeps_given_session() {
        let (status, body) = send(
            router(test_rag()),
            post_json("/api/query", r#"{"query": "Hi", "session_id": "abc"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["session_id"], "abc");
    }

    #[tokio::test]
    async fn test_query_missing_field_is_unprocessable() {
        let (status, body) = send(
            router(test_rag()),
            post_json("/api/query", r#"{"session_id": "abc"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_query_failure_is_internal_error() {
        let (status, body) = send(
            router(test_rag()),
            post_json("/api/query", r#"{"query": "   "}"#),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .contains("Query must not be empty"));
    }

    #[tokio::test]
    async fn test_courses_endpoint() {
        let rag = test_rag();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.txt");
        std::fs::write(&path, "Course Title: Prompt Basics\nLesson 1: Intro\nPrompts matter.").unwrap();
        rag.add_course_document(&path).await.unwrap();

        let request = Request::builder()
            .uri("/api/courses")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(router(rag), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"total_courses": 1, "course_titles": ["Prompt Basics"]})
        );
    }

    #[tokio::test]
    async fn test_clear_session() {
        let (status, body) = send(
            router(test_rag()),
            post_json("/api/sessions/clear", r#"{"session_id": "abc"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Session cleared successfully", "session_id": "abc"})
        );
    }
}
