//! HTTP transport: router, shared state and error mapping.
//!
//! Caller identity arrives as `x-actor-id` / `x-actor-role` headers set by
//! the auth gateway in front of this service; the gateway contract itself
//! is not part of this crate.

mod files;
mod orders;
mod payments;
mod services;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::domain::value_objects::{Actor, Role};
use crate::notify::Notifier;
use crate::pipeline::FileProcessor;
use crate::store::Store;
use crate::Error;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub notifier: Notifier,
    pub files: FileProcessor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/services", get(services::list).post(services::create))
        .route(
            "/api/v1/services/:id",
            get(services::get).put(services::update).delete(services::deactivate),
        )
        .route("/api/v1/services/:id/price", post(services::price))
        .route("/api/v1/orders", get(orders::list).post(orders::create))
        .route("/api/v1/orders/:id", get(orders::get).put(orders::update))
        .route("/api/v1/orders/:id/status", post(orders::set_status))
        .route("/api/v1/orders/:id/invoice", post(orders::create_invoice))
        .route("/api/v1/invoices/:id", get(orders::get_invoice))
        .route("/api/v1/payments", get(payments::list).post(payments::create))
        .route("/api/v1/payments/callback", post(payments::provider_callback))
        .route("/api/v1/payments/:id", get(payments::get))
        .route("/api/v1/payments/:id/refund", post(payments::refund))
        .route("/api/v1/payments/:id/status", post(payments::set_status))
        .route("/api/v1/files", post(files::upload))
        .route("/api/v1/files/:id", get(files::get))
        .route("/api/v1/files/:id/validation", get(files::validation))
        .route("/api/v1/files/:id/convert", post(files::convert))
        .route("/api/v1/files/:id/optimize", post(files::optimize))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "printforge"}))
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, category) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidQuantity { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_quantity"),
            Error::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Error::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Error::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            Error::Storage(_) | Error::Serde(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(serde_json::json!({"error": category, "message": message}))).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| Error::Forbidden("missing or invalid x-actor-id header".into()))?;
        let role = parts
            .headers
            .get("x-actor-role")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or_else(|| Error::Forbidden("missing or invalid x-actor-role header".into()))?;
        Ok(Actor { id, role })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}
