//! Fact store read routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::routes::error_response;
use crate::state::AppState;
use factlog_core::{DateKey, Error, FactsByDay};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/facts", get(get_all_facts))
        .route("/facts/dates", get(get_dates))
        .route("/facts/{date}", get(get_facts_for_date))
}

/// GET /api/facts: every stored bucket.
async fn get_all_facts(State(state): State<Arc<AppState>>) -> Json<FactsByDay> {
    Json(state.store().snapshot())
}

/// GET /api/facts/dates: available date range.
async fn get_dates(State(state): State<Arc<AppState>>) -> Response {
    let store = state.store();
    match store.date_range() {
        Ok((min, max)) => Json(serde_json::json!({
            "min": min,
            "max": max,
            "dates": store.dates(),
        }))
        .into_response(),
        Err(e @ Error::EmptyStore) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/facts/{date}: facts stored for one `YYYY-MM-DD` date.
async fn get_facts_for_date(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
) -> Response {
    let date = match DateKey::parse(&date) {
        Ok(d) => d,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let facts = state.store().query_by_date(&date);
    Json(serde_json::json!({
        "date": date,
        "facts": facts,
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::build_router;
    use crate::routes::test_support::{get, send, state};
    use factlog_core::FactEntry;

    fn seed(state: &AppState) {
        let day = DateKey::parse("2024-01-15").unwrap();
        let later = DateKey::parse("2024-03-02").unwrap();
        state
            .store()
            .append(&day, [FactEntry::new("Q", "Use blue.").unwrap()])
            .unwrap();
        state
            .store()
            .append(&later, [FactEntry::new("Q", "Ship Friday.").unwrap()])
            .unwrap();
    }

    #[tokio::test]
    async fn test_dates_on_empty_store_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = send(build_router(state(&dir, &[])), get("/api/facts/dates")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Fact store is empty");
    }

    #[tokio::test]
    async fn test_dates_range() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, &[]);
        seed(&state);
        let (status, body) = send(build_router(state), get("/api/facts/dates")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["min"], "2024-01-15");
        assert_eq!(body["max"], "2024-03-02");
        assert_eq!(body["dates"], serde_json::json!(["2024-01-15", "2024-03-02"]));
    }

    #[tokio::test]
    async fn test_facts_for_date() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, &[]);
        seed(&state);

        let (status, body) = send(build_router(state.clone()), get("/api/facts/2024-01-15")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2024-01-15");
        assert_eq!(
            body["facts"],
            serde_json::json!([{"question": "Q", "fact": "Use blue."}])
        );

        let (status, body) = send(build_router(state.clone()), get("/api/facts/2023-12-31")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["facts"], serde_json::json!([]));

        let (status, body) = send(build_router(state), get("/api/facts/2024-1-5")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid date format"));
    }

    #[tokio::test]
    async fn test_all_facts_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir, &[]);
        seed(&state);
        let (status, body) = send(build_router(state), get("/api/facts")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_object().unwrap().len(), 2);
        assert_eq!(body["2024-03-02"][0]["fact"], "Ship Friday.");
    }
}
