//! Value objects shared across aggregates.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// VAT applied to order and invoice subtotals. Fixed at 20%.
pub const TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

/// Money value object. Amounts are exact decimals, never floats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }

    /// Fraction of this amount, e.g. `percent(TAX_RATE)` for the VAT share.
    pub fn percent(&self, rate: Decimal) -> Money {
        Money::new(self.amount * rate, &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("EUR")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

/// Postal address as captured on orders and invoices.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub company: Option<String>,
    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub zip: String,
    pub country: String,
    pub phone: Option<String>,
}

/// Caller role, derived from the auth layer upstream of this service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Employee,
    Admin,
}

impl Role {
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Employee | Role::Admin)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Authenticated caller identity attached to each request.
#[derive(Clone, Copy, Debug)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn owns(&self, client_id: Uuid) -> bool {
        self.id == client_id
    }
}

/// Order number: `PP{YYYY}{MM}{DD}{NNNN}` with a daily sequence.
pub fn order_number(date: NaiveDate, seq: i64) -> String {
    format!("PP{}{:04}", date.format("%Y%m%d"), seq)
}

/// Payment number: `PAY-{YYYY}{MM}{DD}-{NNNN}` with a daily sequence.
pub fn payment_number(date: NaiveDate, seq: i64) -> String {
    format!("PAY-{}-{:04}", date.format("%Y%m%d"), seq)
}

/// Invoice-style number: `{TYPE}-{YYYY}{MM}-{NNNN}` with a monthly sequence.
pub fn document_number(prefix: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m"), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn money_multiply() {
        let unit = Money::new(Decimal::new(50, 0), "EUR");
        assert_eq!(unit.multiply(500).amount(), Decimal::new(25000, 0));
    }

    #[test]
    fn money_percent() {
        let subtotal = Money::new(Decimal::new(1000, 0), "EUR");
        assert_eq!(subtotal.percent(TAX_RATE).amount(), Decimal::new(200, 0));
    }

    #[test]
    fn order_number_format() {
        assert_eq!(order_number(d(2024, 3, 7), 12), "PP202403070012");
    }

    #[test]
    fn payment_number_format() {
        assert_eq!(payment_number(d(2024, 12, 31), 3), "PAY-20241231-0003");
    }

    #[test]
    fn document_number_format() {
        assert_eq!(document_number("INVOICE", d(2024, 3, 7), 41), "INVOICE-202403-0041");
        assert_eq!(document_number("QUOTE", d(2024, 3, 7), 1), "QUOTE-202403-0001");
    }

    #[test]
    fn role_parsing() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert!("root".parse::<Role>().is_err());
        assert!(Role::Employee.is_staff());
        assert!(!Role::Client.is_staff());
    }
}
