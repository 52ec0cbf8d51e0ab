use serde_json::Value;
use uuid::Uuid;

use super::{conflict, Store};
use crate::domain::aggregates::Payment;
use crate::{Error, Result};

impl Store {
    pub async fn insert_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            "INSERT INTO payments (id, payment_number, order_id, client_id, amount, status, doc, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(payment.id())
        .bind(payment.payment_number())
        .bind(payment.order_id())
        .bind(payment.client_id())
        .bind(payment.amount().amount())
        .bind(payment.status().as_str())
        .bind(serde_json::to_value(payment)?)
        .bind(payment.created_at())
        .bind(payment.updated_at())
        .execute(self.pool())
        .await
        .map_err(|e| conflict(e, "a payment with this number"))?;
        Ok(())
    }

    pub async fn update_payment(&self, payment: &Payment) -> Result<()> {
        let result = sqlx::query(
            "UPDATE payments SET status = $2, doc = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(payment.id())
        .bind(payment.status().as_str())
        .bind(serde_json::to_value(payment)?)
        .bind(payment.updated_at())
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("payment"));
        }
        Ok(())
    }

    pub async fn fetch_payment(&self, id: Uuid) -> Result<Payment> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT doc FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let (doc,) = row.ok_or(Error::NotFound("payment"))?;
        Ok(serde_json::from_value(doc)?)
    }

    /// Lookup used by the mobile-money callback, which only knows the
    /// human-readable payment number.
    pub async fn fetch_payment_by_number(&self, number: &str) -> Result<Payment> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT doc FROM payments WHERE payment_number = $1")
                .bind(number)
                .fetch_optional(self.pool())
                .await?;
        let (doc,) = row.ok_or(Error::NotFound("payment"))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn list_payments(
        &self,
        page: u32,
        per_page: u32,
        order_id: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> Result<(Vec<Payment>, i64)> {
        let rows: Vec<(Value,)> = sqlx::query_as(
            "SELECT doc FROM payments
             WHERE ($1::uuid IS NULL OR order_id = $1) AND ($2::uuid IS NULL OR client_id = $2)
             ORDER BY created_at DESC LIMIT $3 OFFSET $4",
        )
        .bind(order_id)
        .bind(client_id)
        .bind(i64::from(per_page))
        .bind(i64::from((page - 1) * per_page))
        .fetch_all(self.pool())
        .await?;
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM payments
             WHERE ($1::uuid IS NULL OR order_id = $1) AND ($2::uuid IS NULL OR client_id = $2)",
        )
        .bind(order_id)
        .bind(client_id)
        .fetch_one(self.pool())
        .await?;
        let payments = rows
            .into_iter()
            .map(|(doc,)| serde_json::from_value(doc).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        Ok((payments, total))
    }
}
