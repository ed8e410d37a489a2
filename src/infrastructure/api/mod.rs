//! Read-only HTTP API over the provider catalog

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::application::errors::AppError;
use crate::application::services::CatalogService;
use crate::domain::entities::Provider;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
}

/// JSON error body: `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match &err {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderFilter {
    pub category: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/providers", get(list_providers))
        .route("/api/providers/{slug}", get(get_provider))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_providers(
    State(state): State<AppState>,
    Query(filter): Query<ProviderFilter>,
) -> Result<Json<Vec<Provider>>, ApiError> {
    let category = filter.category.as_deref().filter(|c| !c.is_empty());
    Ok(Json(state.catalog.list_providers(category)?))
}

async fn get_provider(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Provider>, ApiError> {
    Ok(Json(state.catalog.get_provider(&slug)?))
}

/// Bind and serve until ctrl-c
pub async fn serve(bind: &str, state: AppState) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| AppError::Internal(format!("cannot bind {}: {}", bind, e)))?;
    tracing::info!("Listening on http://{}", bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
}
