//! Invoice / quote documents derived from orders.
//!
//! Only the numbering, line math and filename reference live here; PDF
//! rendering is a separate concern handled outside this service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::order::{ClientSnapshot, Order};
use crate::domain::value_objects::{document_number, Money, TAX_RATE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    Invoice,
    Quote,
    CreditNote,
    Proforma,
}

impl InvoiceKind {
    /// Number prefix, e.g. `INVOICE-202403-0001`.
    pub fn prefix(self) -> &'static str {
        match self {
            InvoiceKind::Invoice => "INVOICE",
            InvoiceKind::Quote => "QUOTE",
            InvoiceKind::CreditNote => "CREDIT_NOTE",
            InvoiceKind::Proforma => "PROFORMA",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceKind::Invoice => "invoice",
            InvoiceKind::Quote => "quote",
            InvoiceKind::CreditNote => "credit_note",
            InvoiceKind::Proforma => "proforma",
        }
    }

    pub fn number(self, date: NaiveDate, seq: i64) -> String {
        document_number(self.prefix(), date, seq)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub kind: InvoiceKind,
    pub order_id: Uuid,
    pub order_number: String,
    pub client: ClientSnapshot,
    pub lines: Vec<InvoiceLine>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    /// Reference to the rendered document, produced by the PDF collaborator.
    pub filename: String,
    pub issued_at: DateTime<Utc>,
}

impl Invoice {
    pub fn from_order(kind: InvoiceKind, number: String, order: &Order) -> Self {
        let currency = order.currency();
        let lines: Vec<InvoiceLine> = order
            .items()
            .iter()
            .map(|item| {
                let subtotal = item.total_price.clone();
                let tax = subtotal.percent(TAX_RATE);
                let total = Money::new(subtotal.amount() + tax.amount(), currency);
                InvoiceLine {
                    description: format!("{} ({} {})", item.service.name, item.quantity, item.service.unit),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    subtotal,
                    tax,
                    total,
                }
            })
            .collect();
        let subtotal = Money::new(lines.iter().map(|l| l.subtotal.amount()).sum(), currency);
        let tax = Money::new(lines.iter().map(|l| l.tax.amount()).sum(), currency);
        let total = Money::new(subtotal.amount() + tax.amount(), currency);
        let filename = format!("{number}.pdf");
        Self {
            id: Uuid::new_v4(),
            number,
            kind,
            order_id: order.id(),
            order_number: order.order_number().to_string(),
            client: order.client().clone(),
            lines,
            subtotal,
            tax,
            total,
            filename,
            issued_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::aggregates::service::{Service, ServiceCategory};

    fn order_with_items() -> Order {
        let service = Service::new(
            "Posters A2",
            ServiceCategory::Posters,
            Money::new(Decimal::new(8, 0), "EUR"),
            "piece",
            1,
            1_000,
            vec![],
        )
        .unwrap();
        let mut order = Order::create(
            "PP202403070001".into(),
            Uuid::new_v4(),
            ClientSnapshot {
                name: "Atelier Dupont".into(),
                email: "contact@dupont.example".into(),
                phone: None,
                company: None,
            },
            "EUR",
        );
        order.add_item(&service, 25, HashMap::new(), vec![]).unwrap();
        order
    }

    #[test]
    fn kind_prefixes() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(InvoiceKind::Invoice.number(d, 7), "INVOICE-202403-0007");
        assert_eq!(InvoiceKind::CreditNote.number(d, 1), "CREDIT_NOTE-202403-0001");
        assert_eq!(InvoiceKind::Proforma.number(d, 12), "PROFORMA-202403-0012");
    }

    #[test]
    fn lines_carry_twenty_percent_tax() {
        let order = order_with_items();
        let invoice = Invoice::from_order(InvoiceKind::Invoice, "INVOICE-202403-0001".into(), &order);
        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.lines[0].subtotal.amount(), Decimal::new(200, 0));
        assert_eq!(invoice.lines[0].tax.amount(), Decimal::new(40, 0));
        assert_eq!(invoice.subtotal.amount(), Decimal::new(200, 0));
        assert_eq!(invoice.total.amount(), Decimal::new(240, 0));
    }

    #[test]
    fn filename_references_the_number() {
        let order = order_with_items();
        let invoice = Invoice::from_order(InvoiceKind::Quote, "QUOTE-202403-0002".into(), &order);
        assert_eq!(invoice.filename, "QUOTE-202403-0002.pdf");
    }
}
