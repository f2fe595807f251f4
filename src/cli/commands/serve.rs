//! HTTP API server for the course assistant.
//!
//! Provides REST endpoints for queries, course analytics and sessions.

use crate::agent::Source;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::{CourseAnalytics, RagSystem};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
struct AppState {
    rag: RagSystem,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: &Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let rag = RagSystem::new(settings)?;

    let docs_dir = settings.docs_dir();
    if docs_dir.is_dir() {
        let (courses, chunks) = rag.add_course_folder(&docs_dir, false).await?;
        Output::info(&format!(
            "Loaded {} courses with {} chunks from {}",
            courses,
            chunks,
            docs_dir.display()
        ));
    }

    let app = router(Arc::new(AppState { rag }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Course Materials API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    Output::kv("New session", "POST /api/new-session");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .route("/api/new-session", post(new_session))
        .layer(cors)
        .with_state(state)
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
    sources: Vec<Source>,
    session_id: String,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    match state.rag.query(&req.query, req.session_id.as_deref()).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources,
            session_id: response.session_id,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.rag.get_course_analytics().await {
        Ok(analytics) => Json::<CourseAnalytics>(analytics).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn new_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.rag.sessions().create_session() {
        Ok(session_id) => Json(SessionResponse { session_id }).into_response(),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AIGenerator;
    use crate::llm::{ContentBlock, MessageResponse};
    use crate::session::SessionManager;
    use crate::test_support::{populated_store, ScriptedClient};
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    async fn state(responses: Vec<MessageResponse>) -> Arc<AppState> {
        let client = ScriptedClient::new(responses.into_iter().map(Ok).collect());
        let generator = AIGenerator::new(client, "test-model");
        let rag = RagSystem::with_components(
            Arc::new(populated_store().await),
            generator,
            SessionManager::new(2),
        )
        .unwrap();
        Arc::new(AppState { rag })
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_query_endpoint() {
        let state = state(vec![
            MessageResponse::tool_use(vec![ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "search_course_content".to_string(),
                input: json!({"query": "supervised", "lesson_number": 2}),
            }]),
            MessageResponse::text("Supervised learning uses labels."),
        ])
        .await;

        let request = QueryRequest {
            query: "What is supervised learning?".to_string(),
            session_id: None,
        };
        let response = query(State(state), Json(request)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["answer"], "Supervised learning uses labels.");
        assert_eq!(body["session_id"], "session_1");
        assert_eq!(
            body["sources"],
            json!([{
                "text": "Introduction to Machine Learning, Lesson 2",
                "url": "https://example.com/ml-course/lesson-2"
            }])
        );
    }

    #[tokio::test]
    async fn test_courses_endpoint() {
        let response = courses(State(state(Vec::new()).await)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(
            body,
            json!({
                "total_courses": 1,
                "course_titles": ["Introduction to Machine Learning"]
            })
        );
    }

    #[tokio::test]
    async fn test_new_session_endpoint() {
        let state = state(Vec::new()).await;
        let first = body_json(new_session(State(state.clone())).await.into_response()).await;
        let second = body_json(new_session(State(state)).await.into_response()).await;
        assert_eq!(first["session_id"], "session_1");
        assert_eq!(second["session_id"], "session_2");
    }

    #[tokio::test]
    async fn test_router_builds() {
        let _ = router(state(Vec::new()).await);
    }
}
