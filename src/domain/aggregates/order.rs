//! Order aggregate: line items, derived totals and the fulfillment
//! status machine.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::service::{Service, ServiceCategory};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Actor, Address, Money, TAX_RATE};
use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Quote,
    Pending,
    Confirmed,
    InProduction,
    Ready,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Quote => "quote",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::InProduction => "in_production",
            OrderStatus::Ready => "ready",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Immutable copy of the client captured at order creation, so historical
/// orders render correctly even after the live profile changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
}

/// Immutable copy of the catalog service taken when a line item is added,
/// preserving historical pricing and description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub category: ServiceCategory,
    pub base_price: Money,
    pub unit: String,
}

impl ServiceSnapshot {
    pub fn of(service: &Service) -> Self {
        Self {
            name: service.name.clone(),
            category: service.category,
            base_price: service.base_price.clone(),
            unit: service.unit.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub service_id: Uuid,
    pub service: ServiceSnapshot,
    pub quantity: u32,
    pub options: HashMap<String, serde_json::Value>,
    pub unit_price: Money,
    pub total_price: Money,
    #[serde(default)]
    pub file_ids: Vec<Uuid>,
}

/// A line item request with its catalog service already resolved.
#[derive(Clone, Debug)]
pub struct ResolvedItem {
    pub service: Service,
    pub quantity: u32,
    pub options: HashMap<String, serde_json::Value>,
    pub file_ids: Vec<Uuid>,
}

/// Fields the owning client may edit while the order is still a draft.
#[derive(Clone, Debug, Default)]
pub struct ClientOrderUpdate {
    pub items: Option<Vec<ResolvedItem>>,
    pub notes: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
}

/// Fields only staff may touch once an order exists.
#[derive(Clone, Debug, Default)]
pub struct StaffOrderUpdate {
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
    pub discount: Option<Decimal>,
    pub shipping_cost: Option<Decimal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    order_number: String,
    client_id: Uuid,
    client: ClientSnapshot,
    items: Vec<OrderLineItem>,
    status: OrderStatus,
    currency: String,
    subtotal: Money,
    tax: Money,
    discount: Money,
    shipping_cost: Money,
    total: Money,
    billing_address: Option<Address>,
    shipping_address: Option<Address>,
    payment_status: OrderPaymentStatus,
    priority: Priority,
    assignee_id: Option<Uuid>,
    notes: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    production_started_at: Option<DateTime<Utc>>,
    ready_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Order {
    /// New draft order. The order number is assigned exactly once here and
    /// never reassigned.
    pub fn create(order_number: String, client_id: Uuid, client: ClientSnapshot, currency: &str) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut order = Self {
            id,
            order_number: order_number.clone(),
            client_id,
            client,
            items: vec![],
            status: OrderStatus::Draft,
            currency: currency.to_string(),
            subtotal: Money::zero(currency),
            tax: Money::zero(currency),
            discount: Money::zero(currency),
            shipping_cost: Money::zero(currency),
            total: Money::zero(currency),
            billing_address: None,
            shipping_address: None,
            payment_status: OrderPaymentStatus::Pending,
            priority: Priority::Normal,
            assignee_id: None,
            notes: None,
            confirmed_at: None,
            production_started_at: None,
            ready_at: None,
            shipped_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        order.raise(DomainEvent::Order(OrderEvent::Created { order_id: id, order_number, client_id }));
        order
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn client(&self) -> &ClientSnapshot {
        &self.client
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> OrderPaymentStatus {
        self.payment_status
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn items(&self) -> &[OrderLineItem] {
        &self.items
    }

    pub fn subtotal(&self) -> &Money {
        &self.subtotal
    }

    pub fn tax(&self) -> &Money {
        &self.tax
    }

    pub fn total(&self) -> &Money {
        &self.total
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Price and append a line item. Quantity is validated against the
    /// service bounds at add time; the service is snapshotted.
    pub fn add_item(
        &mut self,
        service: &Service,
        quantity: u32,
        options: HashMap<String, serde_json::Value>,
        file_ids: Vec<Uuid>,
    ) -> Result<()> {
        if !service.active {
            return Err(Error::Validation(format!("service '{}' is not active", service.name)));
        }
        let quote = service.quote(quantity, &options)?;
        self.items.push(OrderLineItem {
            service_id: service.id,
            service: ServiceSnapshot::of(service),
            quantity,
            options,
            unit_price: quote.unit_price,
            total_price: quote.total_price,
            file_ids,
        });
        self.recalculate();
        Ok(())
    }

    /// Apply an update on behalf of the owning client.
    ///
    /// Only draft orders accept client edits. On any other status the
    /// update is silently ignored and `Ok(false)` is returned; the caller
    /// still reports success. This mirrors the documented lock-out
    /// behavior rather than rejecting with an error.
    pub fn apply_client_update(&mut self, actor: &Actor, update: ClientOrderUpdate) -> Result<bool> {
        if !actor.is_staff() && !actor.owns(self.client_id) {
            return Err(Error::Forbidden("only the owning client may edit this order".into()));
        }
        if self.status != OrderStatus::Draft {
            return Ok(false);
        }
        if let Some(items) = update.items {
            self.items.clear();
            for item in items {
                self.add_item(&item.service, item.quantity, item.options, item.file_ids)?;
            }
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        if let Some(addr) = update.shipping_address {
            self.shipping_address = Some(addr);
        }
        if let Some(addr) = update.billing_address {
            self.billing_address = Some(addr);
        }
        self.touch();
        Ok(true)
    }

    /// Staff-only mutation of priority, assignment and monetary adjustments.
    pub fn apply_staff_update(&mut self, actor: &Actor, update: StaffOrderUpdate) -> Result<()> {
        if !actor.is_staff() {
            return Err(Error::Forbidden("only staff may change priority or assignment".into()));
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(assignee) = update.assignee_id {
            self.assignee_id = Some(assignee);
        }
        if let Some(discount) = update.discount {
            self.discount = Money::new(discount, &self.currency);
        }
        if let Some(shipping) = update.shipping_cost {
            self.shipping_cost = Money::new(shipping, &self.currency);
        }
        self.recalculate();
        Ok(())
    }

    /// Move the order to a new status.
    ///
    /// Staff may set any status while the order is live; no forward path is
    /// enforced beyond freezing terminal states. Each milestone timestamp
    /// is stamped exactly once, on the first transition into that status.
    pub fn set_status(&mut self, new: OrderStatus, actor: &Actor) -> Result<()> {
        if !actor.is_staff() {
            return Err(Error::Forbidden("only staff may change order status".into()));
        }
        if self.status.is_terminal() && new != self.status {
            return Err(Error::InvalidState(format!(
                "order is {} and can no longer change status",
                self.status.as_str()
            )));
        }
        if new == self.status {
            return Ok(());
        }
        let from = self.status;
        self.status = new;
        self.stamp(new);
        self.touch();
        self.raise(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: new }));
        Ok(())
    }

    pub fn set_payment_status(&mut self, status: OrderPaymentStatus) {
        self.payment_status = status;
        self.touch();
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn stamp(&mut self, status: OrderStatus) {
        let now = Utc::now();
        match status {
            OrderStatus::Confirmed => {
                self.confirmed_at.get_or_insert(now);
            }
            OrderStatus::InProduction => {
                self.production_started_at.get_or_insert(now);
            }
            OrderStatus::Ready => {
                self.ready_at.get_or_insert(now);
            }
            OrderStatus::Shipped => {
                self.shipped_at.get_or_insert(now);
            }
            OrderStatus::Delivered => {
                self.delivered_at.get_or_insert(now);
            }
            _ => {}
        }
    }

    /// `total = subtotal + tax - discount + shipping`, recomputed on every
    /// mutation that touches line items or monetary adjustments.
    fn recalculate(&mut self) {
        let subtotal: Decimal = self.items.iter().map(|i| i.total_price.amount()).sum();
        let tax = subtotal * TAX_RATE;
        let total = subtotal + tax - self.discount.amount() + self.shipping_cost.amount();
        self.subtotal = Money::new(subtotal, &self.currency);
        self.tax = Money::new(tax, &self.currency);
        self.total = Money::new(total, &self.currency);
        self.touch();
    }

    fn raise(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Role;

    fn client() -> ClientSnapshot {
        ClientSnapshot {
            name: "Atelier Dupont".into(),
            email: "contact@dupont.example".into(),
            phone: None,
            company: Some("Dupont SARL".into()),
        }
    }

    fn flyers() -> Service {
        Service::new(
            "A5 Flyers",
            ServiceCategory::Flyers,
            Money::new(Decimal::new(50, 0), "EUR"),
            "per_100",
            100,
            10_000,
            vec![],
        )
        .unwrap()
    }

    fn staff() -> Actor {
        Actor { id: Uuid::new_v4(), role: Role::Admin }
    }

    fn draft_order() -> Order {
        Order::create("PP202403070001".into(), Uuid::new_v4(), client(), "EUR")
    }

    #[test]
    fn totals_identity_after_item_add() {
        let mut order = draft_order();
        order.add_item(&flyers(), 500, HashMap::new(), vec![]).unwrap();
        assert_eq!(order.subtotal().amount(), Decimal::new(25_000, 0));
        assert_eq!(order.tax().amount(), Decimal::new(5_000, 0));
        assert_eq!(order.total().amount(), Decimal::new(30_000, 0));
    }

    #[test]
    fn totals_identity_with_discount_and_shipping() {
        let mut order = draft_order();
        order.add_item(&flyers(), 100, HashMap::new(), vec![]).unwrap();
        order
            .apply_staff_update(
                &staff(),
                StaffOrderUpdate {
                    discount: Some(Decimal::new(500, 0)),
                    shipping_cost: Some(Decimal::new(120, 0)),
                    ..Default::default()
                },
            )
            .unwrap();
        // 5000 + 1000 - 500 + 120
        assert_eq!(order.total().amount(), Decimal::new(5_620, 0));
    }

    #[test]
    fn rejects_quantity_below_service_minimum() {
        let mut order = draft_order();
        let err = order.add_item(&flyers(), 50, HashMap::new(), vec![]).unwrap_err();
        assert!(matches!(err, Error::InvalidQuantity { got: 50, min: 100, .. }));
        assert!(order.items().is_empty());
    }

    #[test]
    fn status_timestamps_stamp_once() {
        let mut order = draft_order();
        let admin = staff();
        order.set_status(OrderStatus::Confirmed, &admin).unwrap();
        let first = order.confirmed_at().unwrap();
        order.set_status(OrderStatus::InProduction, &admin).unwrap();
        order.set_status(OrderStatus::Confirmed, &admin).unwrap();
        assert_eq!(order.confirmed_at().unwrap(), first);
    }

    #[test]
    fn non_staff_cannot_change_status() {
        let mut order = draft_order();
        let owner = Actor { id: order.client_id(), role: Role::Client };
        let err = order.set_status(OrderStatus::Confirmed, &owner).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert_eq!(order.status(), OrderStatus::Draft);
    }

    #[test]
    fn client_edit_on_non_draft_is_silently_ignored() {
        let mut order = draft_order();
        let admin = staff();
        let owner = Actor { id: order.client_id(), role: Role::Client };
        order.add_item(&flyers(), 100, HashMap::new(), vec![]).unwrap();
        order.set_status(OrderStatus::Pending, &admin).unwrap();

        let total_before = order.total().clone();
        let applied = order
            .apply_client_update(
                &owner,
                ClientOrderUpdate {
                    items: Some(vec![]),
                    notes: Some("please hurry".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!applied);
        assert_eq!(order.items().len(), 1);
        assert_eq!(order.total(), &total_before);
    }

    #[test]
    fn client_edit_on_draft_replaces_items() {
        let mut order = draft_order();
        let owner = Actor { id: order.client_id(), role: Role::Client };
        order.add_item(&flyers(), 100, HashMap::new(), vec![]).unwrap();
        let applied = order
            .apply_client_update(
                &owner,
                ClientOrderUpdate {
                    items: Some(vec![ResolvedItem {
                        service: flyers(),
                        quantity: 200,
                        options: HashMap::new(),
                        file_ids: vec![],
                    }]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(applied);
        assert_eq!(order.items()[0].quantity, 200);
        assert_eq!(order.subtotal().amount(), Decimal::new(10_000, 0));
    }

    #[test]
    fn foreign_client_cannot_edit() {
        let mut order = draft_order();
        let stranger = Actor { id: Uuid::new_v4(), role: Role::Client };
        let err = order.apply_client_update(&stranger, ClientOrderUpdate::default()).unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn terminal_orders_are_frozen() {
        let mut order = draft_order();
        let admin = staff();
        order.set_status(OrderStatus::Cancelled, &admin).unwrap();
        let err = order.set_status(OrderStatus::Pending, &admin).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn inactive_service_cannot_be_ordered() {
        let mut service = flyers();
        service.deactivate();
        let mut order = draft_order();
        let err = order.add_item(&service, 100, HashMap::new(), vec![]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
