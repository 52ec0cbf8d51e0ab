//! Service catalog endpoints.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{AppState, ListParams, PaginatedResponse};
use crate::domain::aggregates::{Quote, Service, ServiceCategory, ServiceOption, ServiceUpdate};
use crate::domain::value_objects::{Actor, Money};
use crate::{Error, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub category: ServiceCategory,
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(length(min = 1, max = 50))]
    pub unit: String,
    pub min_quantity: u32,
    pub max_quantity: u32,
    #[serde(default)]
    pub options: Vec<ServiceOption>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>)> {
    require_staff(&actor)?;
    req.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let mut service = Service::new(
        req.name,
        req.category,
        Money::new(req.base_price, &req.currency),
        req.unit,
        req.min_quantity,
        req.max_quantity,
        req.options,
    )?;
    service.description = req.description;
    state.store.insert_service(&service).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

#[derive(Debug, Deserialize)]
pub struct ServiceListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    #[serde(default)]
    pub include_inactive: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ServiceListParams>,
) -> Result<Json<PaginatedResponse<Service>>> {
    let list = ListParams { page: params.page, per_page: params.per_page };
    let (data, total) = state
        .store
        .list_services(list.page(), list.per_page(), !params.include_inactive)
        .await?;
    Ok(Json(PaginatedResponse { data, total, page: list.page() }))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Service>> {
    Ok(Json(state.store.fetch_service(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ServiceUpdate>,
) -> Result<Json<Service>> {
    require_staff(&actor)?;
    let mut service = state.store.fetch_service(id).await?;
    service.apply(req)?;
    state.store.update_service(&service).await?;
    Ok(Json(service))
}

/// Soft deactivation; services referenced by historical orders are never
/// hard-deleted.
pub async fn deactivate(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    require_staff(&actor)?;
    let mut service = state.store.fetch_service(id).await?;
    service.deactivate();
    state.store.update_service(&service).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PriceRequest {
    pub quantity: u32,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

/// Price quote without creating an order.
pub async fn price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<Quote>> {
    let service = state.store.fetch_service(id).await?;
    Ok(Json(service.quote(req.quantity, &req.options)?))
}

fn require_staff(actor: &Actor) -> Result<()> {
    if !actor.is_staff() {
        return Err(Error::Forbidden("only staff may manage the catalog".into()));
    }
    Ok(())
}
