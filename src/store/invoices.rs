use serde_json::Value;
use uuid::Uuid;

use super::{conflict, Store};
use crate::domain::aggregates::Invoice;
use crate::{Error, Result};

impl Store {
    pub async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            "INSERT INTO invoices (id, number, kind, order_id, doc, issued_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(invoice.id)
        .bind(&invoice.number)
        .bind(invoice.kind.as_str())
        .bind(invoice.order_id)
        .bind(serde_json::to_value(invoice)?)
        .bind(invoice.issued_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict(e, "an invoice with this number"))?;
        Ok(())
    }

    pub async fn fetch_invoice(&self, id: Uuid) -> Result<Invoice> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT doc FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let (doc,) = row.ok_or(Error::NotFound("invoice"))?;
        Ok(serde_json::from_value(doc)?)
    }
}
