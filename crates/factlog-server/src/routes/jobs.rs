//! Job submission and status routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::routes::error_response;
use crate::state::AppState;
use factlog_runtime::{JobStatus, JobView};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/submit_question_and_documents", post(submit_question_and_documents))
        .route("/get_question_and_facts", get(get_question_and_facts))
        .route("/jobs/current", get(get_current_job))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    question: Option<String>,
    #[serde(default, alias = "documentURLs")]
    documents: Vec<String>,
}

/// POST /api/submit_question_and_documents: start a new batch.
async fn submit_question_and_documents(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> Response {
    let Some(question) = body.question.filter(|q| !q.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "question is required");
    };

    let handle = state.coordinator.submit(question, body.documents);
    info!("Accepted batch {}", handle.batch_id());

    Json(serde_json::json!({
        "message": "Processing started",
        "batchId": handle.batch_id(),
    }))
    .into_response()
}

/// GET /api/get_question_and_facts: poll the current job.
async fn get_question_and_facts(State(state): State<Arc<AppState>>) -> Response {
    let view = state.coordinator.status();
    match view.status {
        JobStatus::Processing => Json(serde_json::json!({
            "question": view.question,
            "status": view.status,
        }))
        .into_response(),
        JobStatus::Done => Json(serde_json::json!({
            "question": view.question,
            "factsByDay": view.facts_by_day.unwrap_or_default(),
            "status": view.status,
        }))
        .into_response(),
        JobStatus::Idle => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "No processing in progress or started" })),
        )
            .into_response(),
    }
}

/// GET /api/jobs/current: the current job with per-document outcomes.
async fn get_current_job(State(state): State<Arc<AppState>>) -> Json<JobView> {
    Json(state.coordinator.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::routes::test_support::{get, post_json, send, state};

    const URL: &str = "https://calls.example.com/call_log_20240115.txt";

    #[tokio::test]
    async fn test_poll_before_submission_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(state(&dir, &[]));
        let (status, body) = send(app, get("/api/get_question_and_facts")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No processing in progress or started");
    }

    #[tokio::test]
    async fn test_submit_then_poll_until_done() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, &[URL]);

        let (status, body) = send(
            build_router(state.clone()),
            post_json(
                "/api/submit_question_and_documents",
                serde_json::json!({"question": "What was decided?", "documents": [URL]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Processing started");
        let batch_id = body["batchId"].as_str().unwrap().to_string();

        let mut polled = serde_json::Value::Null;
        for _ in 0..200 {
            let (status, body) = send(build_router(state.clone()), get("/api/get_question_and_facts")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["question"], "What was decided?");
            if body["status"] == "done" {
                polled = body;
                break;
            }
            assert_eq!(body["status"], "processing");
            assert!(body.get("factsByDay").is_none());
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let facts = polled["factsByDay"]["2024-01-15"].as_array().unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0]["question"], "What was decided?");
        assert_eq!(facts[0]["fact"], "The team will use blue.");

        let (_, job) = send(build_router(state), get("/api/jobs/current")).await;
        assert_eq!(job["batchId"], batch_id.as_str());
        assert_eq!(job["status"], "done");
        assert_eq!(job["documents"][0]["state"], "done");
        assert_eq!(job["documents"][0]["factsAdded"], 2);
        assert_eq!(job["documents"][0]["date"], "2024-01-15");
    }

    #[tokio::test]
    async fn test_submit_accepts_document_urls_alias() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            build_router(state(&dir, &[])),
            post_json(
                "/api/submit_question_and_documents",
                serde_json::json!({"question": "Q", "documentURLs": [URL]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["batchId"].is_string());
    }

    #[tokio::test]
    async fn test_submit_requires_question() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(
            build_router(state(&dir, &[])),
            post_json(
                "/api/submit_question_and_documents",
                serde_json::json!({"documents": [URL]}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "question is required");
    }

    #[tokio::test]
    async fn test_current_job_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(build_router(state(&dir, &[])), get("/api/jobs/current")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
        assert!(body["batchId"].is_null());
        assert_eq!(body["documents"], serde_json::json!([]));
    }
}
