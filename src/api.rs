use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::store::{JobQuery, JobStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/api/v1/jobs", get(list_jobs))
        .route("/api/v1/jobs/{id}", get(get_job))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn list_jobs(State(state): State<AppState>, Query(q): Query<JobQuery>) -> Response {
    let q = q.normalized();
    match state.store.list(&q).await {
        Ok(page) if page.is_out_of_range() => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!(
                    "Invalid page number. The last available page is {}.",
                    page.total_pages
                ),
                "total": page.total,
                "totalPages": page.total_pages,
            })),
        )
            .into_response(),
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "listing jobs failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch jobs" })),
            )
                .into_response()
        }
    }
}

async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Job not found" })),
        )
            .into_response()
    };

    let Ok(id) = Uuid::parse_str(id.trim()) else {
        return not_found();
    };

    match state.store.get(id).await {
        Ok(Some(job)) => Json(job).into_response(),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::error!(error = %e, %id, "fetching job failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to fetch job" })),
            )
                .into_response()
        }
    }
}
