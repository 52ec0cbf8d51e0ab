//! Order lifecycle endpoints.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{AppState, PaginatedResponse};
use crate::domain::aggregates::order::ResolvedItem;
use crate::domain::aggregates::{
    ClientOrderUpdate, ClientSnapshot, Invoice, InvoiceKind, Order, OrderStatus, Priority,
    StaffOrderUpdate,
};
use crate::domain::value_objects::{order_number, Actor, Address};
use crate::{Error, Result};

#[derive(Debug, Deserialize, Serialize)]
pub struct OrderItemInput {
    pub service_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub client: ClientSnapshot,
    /// Staff may create an order on behalf of a client.
    pub client_id: Option<Uuid>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(length(min = 1, message = "an order needs at least one line item"))]
    pub items: Vec<OrderItemInput>,
    pub notes: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
}

fn default_currency() -> String {
    "EUR".to_string()
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    req.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let client_id = req.client_id.filter(|_| actor.is_staff()).unwrap_or(actor.id);

    let today = Utc::now().date_naive();
    let seq = state.store.next_sequence("order", &today.format("%Y%m%d").to_string()).await?;
    let number = order_number(today, seq);

    let mut order = Order::create(number, client_id, req.client, &req.currency);
    for item in req.items {
        let service = state.store.fetch_service(item.service_id).await?;
        order.add_item(&service, item.quantity, item.options, item.file_ids)?;
    }
    order.apply_client_update(
        &actor,
        ClientOrderUpdate {
            items: None,
            notes: req.notes,
            shipping_address: req.shipping_address,
            billing_address: req.billing_address,
        },
    )?;
    state.store.insert_order(&order).await?;
    state.notifier.publish(order.take_events());
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub client_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<OrderListParams>,
) -> Result<Json<PaginatedResponse<Order>>> {
    let list = super::ListParams { page: params.page, per_page: params.per_page };
    let client_filter = if actor.is_staff() { params.client_id } else { Some(actor.id) };
    let (data, total) = state.store.list_orders(list.page(), list.per_page(), client_filter).await?;
    Ok(Json(PaginatedResponse { data, total, page: list.page() }))
}

pub async fn get(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>> {
    let order = state.store.fetch_order(id).await?;
    require_access(&actor, &order)?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub items: Option<Vec<OrderItemInput>>,
    pub notes: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    // staff-only fields
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
    pub discount: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
}

impl UpdateOrderRequest {
    fn touches_staff_fields(&self) -> bool {
        self.priority.is_some()
            || self.assignee_id.is_some()
            || self.discount.is_some()
            || self.shipping_cost.is_some()
    }
}

/// Role-gated order update.
///
/// Client edits to line items, notes and addresses only take effect while
/// the order is a draft; afterwards they are ignored and the request still
/// succeeds. Priority, assignment and monetary adjustments are staff-only.
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<Order>> {
    let mut order = state.store.fetch_order(id).await?;
    if req.touches_staff_fields() && !actor.is_staff() {
        return Err(Error::Forbidden("only staff may change priority or assignment".into()));
    }

    let items = match req.items {
        Some(inputs) => {
            let mut resolved = Vec::with_capacity(inputs.len());
            for item in inputs {
                let service = state.store.fetch_service(item.service_id).await?;
                resolved.push(ResolvedItem {
                    service,
                    quantity: item.quantity,
                    options: item.options,
                    file_ids: item.file_ids,
                });
            }
            Some(resolved)
        }
        None => None,
    };
    order.apply_client_update(
        &actor,
        ClientOrderUpdate {
            items,
            notes: req.notes,
            shipping_address: req.shipping_address,
            billing_address: req.billing_address,
        },
    )?;
    if actor.is_staff() {
        order.apply_staff_update(
            &actor,
            StaffOrderUpdate {
                priority: req.priority,
                assignee_id: req.assignee_id,
                discount: req.discount,
                shipping_cost: req.shipping_cost,
            },
        )?;
    }
    state.store.update_order(&order).await?;
    state.notifier.publish(order.take_events());
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

pub async fn set_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Order>> {
    let mut order = state.store.fetch_order(id).await?;
    order.set_status(req.status, &actor)?;
    state.store.update_order(&order).await?;
    state.notifier.publish(order.take_events());
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    pub kind: InvoiceKind,
}

pub async fn create_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>)> {
    let order = state.store.fetch_order(id).await?;
    require_access(&actor, &order)?;
    if order.items().is_empty() {
        return Err(Error::InvalidState("cannot invoice an order without line items".into()));
    }

    let today = Utc::now().date_naive();
    let scope = format!("invoice:{}", req.kind.prefix());
    let seq = state.store.next_sequence(&scope, &today.format("%Y%m").to_string()).await?;
    let invoice = Invoice::from_order(req.kind, req.kind.number(today, seq), &order);
    state.store.insert_invoice(&invoice).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>> {
    let invoice = state.store.fetch_invoice(id).await?;
    let order = state.store.fetch_order(invoice.order_id).await?;
    require_access(&actor, &order)?;
    Ok(Json(invoice))
}

fn require_access(actor: &Actor, order: &Order) -> Result<()> {
    if !actor.is_staff() && !actor.owns(order.client_id()) {
        return Err(Error::Forbidden("this order belongs to another client".into()));
    }
    Ok(())
}
