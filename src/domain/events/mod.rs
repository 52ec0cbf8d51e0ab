//! Domain events raised by aggregates and drained by the transport layer,
//! which fans them out to the notification bus.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::order::OrderStatus;
use crate::domain::aggregates::payment::PaymentStatus;
use crate::domain::aggregates::print_file::QualityTier;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
    Payment(PaymentEvent),
    File(FileEvent),
}

impl DomainEvent {
    /// Bus subject the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            DomainEvent::Order(e) => match e {
                OrderEvent::Created { .. } => "printforge.order.created",
                OrderEvent::StatusChanged { .. } => "printforge.order.status_changed",
            },
            DomainEvent::Payment(e) => match e {
                PaymentEvent::Created { .. } => "printforge.payment.created",
                PaymentEvent::StatusChanged { .. } => "printforge.payment.status_changed",
                PaymentEvent::Refunded { .. } => "printforge.payment.refunded",
            },
            DomainEvent::File(e) => match e {
                FileEvent::Processed { .. } => "printforge.file.processed",
                FileEvent::Rejected { .. } => "printforge.file.rejected",
            },
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, order_number: String, client_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    Created { payment_id: Uuid, payment_number: String, order_id: Uuid, amount: Decimal },
    StatusChanged { payment_id: Uuid, from: PaymentStatus, to: PaymentStatus },
    Refunded { payment_id: Uuid, amount: Decimal, fully_refunded: bool },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FileEvent {
    Processed { file_id: Uuid, quality: Option<QualityTier> },
    Rejected { file_id: Uuid, reason: String },
}
