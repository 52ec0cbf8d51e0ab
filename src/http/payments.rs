//! Payment endpoints, including the mobile-money provider callback.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{AppState, PaginatedResponse};
use crate::domain::aggregates::order::OrderPaymentStatus;
use crate::domain::aggregates::{Payment, PaymentMethod, PaymentStatus};
use crate::domain::value_objects::{payment_number, Actor, Money};
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    /// Defaults to the order total.
    pub amount: Option<Decimal>,
    pub method: PaymentMethod,
}

pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>)> {
    let order = state.store.fetch_order(req.order_id).await?;
    if !actor.is_staff() && !actor.owns(order.client_id()) {
        return Err(Error::Forbidden("this order belongs to another client".into()));
    }
    let amount = req.amount.unwrap_or(order.total().amount());
    if amount <= Decimal::ZERO {
        return Err(Error::Validation("payment amount must be positive".into()));
    }

    let today = Utc::now().date_naive();
    let seq = state.store.next_sequence("payment", &today.format("%Y%m%d").to_string()).await?;
    let mut payment = Payment::create(
        payment_number(today, seq),
        order.id(),
        order.client_id(),
        Money::new(amount, order.currency()),
        req.method,
    );
    state.store.insert_payment(&payment).await?;
    state.notifier.publish(payment.take_events());
    Ok((StatusCode::CREATED, Json(payment)))
}

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub order_id: Option<Uuid>,
}

pub async fn list(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<PaginatedResponse<Payment>>> {
    let list = super::ListParams { page: params.page, per_page: params.per_page };
    let client_filter = if actor.is_staff() { None } else { Some(actor.id) };
    let (data, total) = state
        .store
        .list_payments(list.page(), list.per_page(), params.order_id, client_filter)
        .await?;
    Ok(Json(PaginatedResponse { data, total, page: list.page() }))
}

pub async fn get(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Payment>> {
    let payment = state.store.fetch_payment(id).await?;
    if !actor.is_staff() && !actor.owns(payment.client_id()) {
        return Err(Error::Forbidden("this payment belongs to another client".into()));
    }
    Ok(Json(payment))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    /// Defaults to whatever remains of the payment amount.
    pub amount: Option<Decimal>,
    #[validate(length(min = 1, message = "a refund reason is required"))]
    pub reason: String,
}

pub async fn refund(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<Payment>> {
    require_staff(&actor)?;
    req.validate().map_err(|e| Error::Validation(e.to_string()))?;
    let mut payment = state.store.fetch_payment(id).await?;
    payment.refund(req.amount, req.reason, actor.id)?;
    state.store.update_payment(&payment).await?;
    sync_order_payment_status(&state, &payment).await?;
    state.notifier.publish(payment.take_events());
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
pub struct SetPaymentStatusRequest {
    pub status: PaymentStatus,
}

pub async fn set_status(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<SetPaymentStatusRequest>,
) -> Result<Json<Payment>> {
    require_staff(&actor)?;
    let mut payment = state.store.fetch_payment(id).await?;
    payment.set_status(req.status)?;
    state.store.update_payment(&payment).await?;
    sync_order_payment_status(&state, &payment).await?;
    state.notifier.publish(payment.take_events());
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOutcome {
    Completed,
    Failed,
}

/// Callback from the mobile-money provider. Request authentication is
/// handled by the gateway in front of this service.
#[derive(Debug, Deserialize)]
pub struct ProviderCallbackRequest {
    pub payment_number: String,
    pub outcome: ProviderOutcome,
    pub provider_reference: Option<String>,
}

pub async fn provider_callback(
    State(state): State<AppState>,
    Json(req): Json<ProviderCallbackRequest>,
) -> Result<Json<Payment>> {
    let mut payment = state.store.fetch_payment_by_number(&req.payment_number).await?;
    if payment.method() != PaymentMethod::MobileMoney {
        return Err(Error::InvalidState("payment is not a mobile-money payment".into()));
    }
    if let Some(reference) = req.provider_reference {
        payment.set_provider_reference(reference);
    }
    let status = match req.outcome {
        ProviderOutcome::Completed => PaymentStatus::Completed,
        ProviderOutcome::Failed => PaymentStatus::Failed,
    };
    payment.set_status(status)?;
    state.store.update_payment(&payment).await?;
    sync_order_payment_status(&state, &payment).await?;
    state.notifier.publish(payment.take_events());
    Ok(Json(payment))
}

/// Mirror the payment outcome onto the owning order.
async fn sync_order_payment_status(state: &AppState, payment: &Payment) -> Result<()> {
    let target = match payment.status() {
        PaymentStatus::Completed => OrderPaymentStatus::Paid,
        PaymentStatus::Failed => OrderPaymentStatus::Failed,
        PaymentStatus::Refunded => OrderPaymentStatus::Refunded,
        _ => return Ok(()),
    };
    let mut order = state.store.fetch_order(payment.order_id()).await?;
    if order.payment_status() != target {
        order.set_payment_status(target);
        state.store.update_order(&order).await?;
    }
    Ok(())
}

fn require_staff(actor: &Actor) -> Result<()> {
    if !actor.is_staff() {
        return Err(Error::Forbidden("only staff may change payment status".into()));
    }
    Ok(())
}
