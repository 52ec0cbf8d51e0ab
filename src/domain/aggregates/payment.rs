//! Payment record: fee breakdown, status and refunds.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{DomainEvent, PaymentEvent};
use crate::domain::value_objects::Money;
use crate::{Error, Result};

/// Processing fee for mobile-money payments: 2%.
const PROCESSING_RATE_MOBILE: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
/// Processing fee for every other method: 3%.
const PROCESSING_RATE_DEFAULT: Decimal = Decimal::from_parts(3, 0, 0, false, 2);
/// Platform fee: 1% regardless of method.
const PLATFORM_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    MobileMoney,
    Card,
    Transfer,
    Cash,
    Check,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub processing: Money,
    pub platform: Money,
    pub total: Money,
}

impl FeeBreakdown {
    pub fn compute(amount: &Money, method: PaymentMethod) -> Self {
        let rate = match method {
            PaymentMethod::MobileMoney => PROCESSING_RATE_MOBILE,
            _ => PROCESSING_RATE_DEFAULT,
        };
        let processing = amount.percent(rate);
        let platform = amount.percent(PLATFORM_RATE);
        let total = Money::new(processing.amount() + platform.amount(), amount.currency());
        Self { processing, platform, total }
    }
}

/// One accepted refund. The list on a payment is append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Refund {
    pub amount: Money,
    pub reason: String,
    pub refunded_by: Uuid,
    pub refunded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payment {
    id: Uuid,
    payment_number: String,
    order_id: Uuid,
    client_id: Uuid,
    amount: Money,
    method: PaymentMethod,
    status: PaymentStatus,
    fees: FeeBreakdown,
    refunds: Vec<Refund>,
    provider_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl Payment {
    pub fn create(
        payment_number: String,
        order_id: Uuid,
        client_id: Uuid,
        amount: Money,
        method: PaymentMethod,
    ) -> Self {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let fees = FeeBreakdown::compute(&amount, method);
        let mut payment = Self {
            id,
            payment_number: payment_number.clone(),
            order_id,
            client_id,
            amount: amount.clone(),
            method,
            status: PaymentStatus::Pending,
            fees,
            refunds: vec![],
            provider_reference: None,
            created_at: now,
            updated_at: now,
            events: vec![],
        };
        payment.raise(DomainEvent::Payment(PaymentEvent::Created {
            payment_id: id,
            payment_number,
            order_id,
            amount: amount.amount(),
        }));
        payment
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payment_number(&self) -> &str {
        &self.payment_number
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn amount(&self) -> &Money {
        &self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn fees(&self) -> &FeeBreakdown {
        &self.fees
    }

    pub fn refunds(&self) -> &[Refund] {
        &self.refunds
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn refunded_total(&self) -> Decimal {
        self.refunds.iter().map(|r| r.amount.amount()).sum()
    }

    pub fn set_provider_reference(&mut self, reference: impl Into<String>) {
        self.provider_reference = Some(reference.into());
        self.touch();
    }

    /// Refund part or all of a completed payment.
    ///
    /// `amount` defaults to whatever remains of the original amount. The
    /// cumulative refund total can never exceed the payment amount, and the
    /// status flips to `refunded` exactly when it reaches it.
    pub fn refund(&mut self, amount: Option<Decimal>, reason: impl Into<String>, refunded_by: Uuid) -> Result<()> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(Error::Validation("a refund reason is required".into()));
        }
        if self.status != PaymentStatus::Completed {
            return Err(Error::InvalidState(format!(
                "only completed payments can be refunded, payment is {}",
                self.status.as_str()
            )));
        }
        let already = self.refunded_total();
        let amount = amount.unwrap_or(self.amount.amount() - already);
        if amount <= Decimal::ZERO {
            return Err(Error::Validation("refund amount must be positive".into()));
        }
        if already + amount > self.amount.amount() {
            return Err(Error::InvalidState(format!(
                "refund of {} would exceed the payment amount {}",
                amount,
                self.amount.amount()
            )));
        }
        self.refunds.push(Refund {
            amount: Money::new(amount, self.amount.currency()),
            reason,
            refunded_by,
            refunded_at: Utc::now(),
        });
        let fully_refunded = self.refunded_total() >= self.amount.amount();
        if fully_refunded {
            self.status = PaymentStatus::Refunded;
        }
        self.touch();
        self.raise(DomainEvent::Payment(PaymentEvent::Refunded {
            payment_id: self.id,
            amount,
            fully_refunded,
        }));
        Ok(())
    }

    /// Administrative / callback status change. `refunded` is only reachable
    /// through [`Payment::refund`].
    pub fn set_status(&mut self, new: PaymentStatus) -> Result<()> {
        if new == PaymentStatus::Refunded {
            return Err(Error::InvalidState("refunded status is set by the refund operation".into()));
        }
        if self.status == PaymentStatus::Refunded {
            return Err(Error::InvalidState("a refunded payment can no longer change status".into()));
        }
        if new == self.status {
            return Ok(());
        }
        let from = self.status;
        self.status = new;
        self.touch();
        self.raise(DomainEvent::Payment(PaymentEvent::StatusChanged { payment_id: self.id, from, to: new }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
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

    fn payment(amount: i64, method: PaymentMethod) -> Payment {
        Payment::create(
            "PAY-20240307-0001".into(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::new(Decimal::new(amount, 0), "EUR"),
            method,
        )
    }

    #[test]
    fn card_fee_breakdown() {
        let p = payment(25_000, PaymentMethod::Card);
        assert_eq!(p.fees().processing.amount(), Decimal::new(750, 0));
        assert_eq!(p.fees().platform.amount(), Decimal::new(250, 0));
        assert_eq!(p.fees().total.amount(), Decimal::new(1_000, 0));
    }

    #[test]
    fn mobile_money_fee_breakdown() {
        let p = payment(10_000, PaymentMethod::MobileMoney);
        assert_eq!(p.fees().processing.amount(), Decimal::new(200, 0));
        assert_eq!(p.fees().platform.amount(), Decimal::new(100, 0));
        assert_eq!(p.fees().total.amount(), Decimal::new(300, 0));
    }

    #[test]
    fn refund_requires_completed_status() {
        let mut p = payment(1_000, PaymentMethod::Card);
        let err = p.refund(None, "customer complaint", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn partial_refund_keeps_status_completed() {
        let mut p = payment(25_000, PaymentMethod::Card);
        p.set_status(PaymentStatus::Completed).unwrap();
        p.refund(Some(Decimal::new(10_000, 0)), "misprinted batch", Uuid::new_v4()).unwrap();
        assert_eq!(p.status(), PaymentStatus::Completed);
        assert_eq!(p.refunded_total(), Decimal::new(10_000, 0));
    }

    #[test]
    fn full_refund_flips_status_exactly_at_total() {
        let mut p = payment(25_000, PaymentMethod::Card);
        p.set_status(PaymentStatus::Completed).unwrap();
        p.refund(Some(Decimal::new(10_000, 0)), "misprinted batch", Uuid::new_v4()).unwrap();
        p.refund(Some(Decimal::new(15_000, 0)), "order cancelled", Uuid::new_v4()).unwrap();
        assert_eq!(p.status(), PaymentStatus::Refunded);
        assert_eq!(p.refunded_total(), Decimal::new(25_000, 0));
    }

    #[test]
    fn refund_cannot_exceed_amount() {
        let mut p = payment(1_000, PaymentMethod::Card);
        p.set_status(PaymentStatus::Completed).unwrap();
        p.refund(Some(Decimal::new(800, 0)), "partial", Uuid::new_v4()).unwrap();
        let err = p.refund(Some(Decimal::new(300, 0)), "too much", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(p.refunded_total(), Decimal::new(800, 0));
    }

    #[test]
    fn default_refund_amount_is_the_remainder() {
        let mut p = payment(1_000, PaymentMethod::Card);
        p.set_status(PaymentStatus::Completed).unwrap();
        p.refund(Some(Decimal::new(400, 0)), "partial", Uuid::new_v4()).unwrap();
        p.refund(None, "rest", Uuid::new_v4()).unwrap();
        assert_eq!(p.status(), PaymentStatus::Refunded);
        assert_eq!(p.refunded_total(), Decimal::new(1_000, 0));
    }

    #[test]
    fn refund_requires_reason() {
        let mut p = payment(1_000, PaymentMethod::Card);
        p.set_status(PaymentStatus::Completed).unwrap();
        let err = p.refund(None, "  ", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn refunded_is_not_directly_settable() {
        let mut p = payment(1_000, PaymentMethod::Card);
        let err = p.set_status(PaymentStatus::Refunded).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
