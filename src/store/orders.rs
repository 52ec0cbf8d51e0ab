use serde_json::Value;
use uuid::Uuid;

use super::{conflict, Store};
use crate::domain::aggregates::Order;
use crate::{Error, Result};

impl Store {
    pub async fn insert_order(&self, order: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, order_number, client_id, status, doc, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(order.id())
        .bind(order.order_number())
        .bind(order.client_id())
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order)?)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(self.pool())
        .await
        .map_err(|e| conflict(e, "an order with this number"))?;
        Ok(())
    }

    pub async fn update_order(&self, order: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, doc = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(order.id())
        .bind(order.status().as_str())
        .bind(serde_json::to_value(order)?)
        .bind(order.updated_at())
        .execute(self.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("order"));
        }
        Ok(())
    }

    pub async fn fetch_order(&self, id: Uuid) -> Result<Order> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT doc FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let (doc,) = row.ok_or(Error::NotFound("order"))?;
        Ok(serde_json::from_value(doc)?)
    }

    /// List orders, newest first. Clients only ever see their own.
    pub async fn list_orders(
        &self,
        page: u32,
        per_page: u32,
        client_id: Option<Uuid>,
    ) -> Result<(Vec<Order>, i64)> {
        let rows: Vec<(Value,)> = sqlx::query_as(
            "SELECT doc FROM orders WHERE ($1::uuid IS NULL OR client_id = $1)
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(client_id)
        .bind(i64::from(per_page))
        .bind(i64::from((page - 1) * per_page))
        .fetch_all(self.pool())
        .await?;
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR client_id = $1)")
                .bind(client_id)
                .fetch_one(self.pool())
                .await?;
        let orders = rows
            .into_iter()
            .map(|(doc,)| serde_json::from_value(doc).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        Ok((orders, total))
    }
}
