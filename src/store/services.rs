use serde_json::Value;
use uuid::Uuid;

use super::{conflict, Store};
use crate::domain::aggregates::Service;
use crate::{Error, Result};

impl Store {
    pub async fn insert_service(&self, service: &Service) -> Result<()> {
        sqlx::query(
            "INSERT INTO services (id, name, category, active, doc, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(service.category.as_str())
        .bind(service.active)
        .bind(serde_json::to_value(service)?)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict(e, "a service with this name"))?;
        Ok(())
    }

    pub async fn update_service(&self, service: &Service) -> Result<()> {
        let result = sqlx::query(
            "UPDATE services SET name = $2, category = $3, active = $4, doc = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(service.id)
        .bind(&service.name)
        .bind(service.category.as_str())
        .bind(service.active)
        .bind(serde_json::to_value(service)?)
        .bind(service.updated_at)
        .execute(self.pool())
        .await
        .map_err(|e| conflict(e, "a service with this name"))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("service"));
        }
        Ok(())
    }

    pub async fn fetch_service(&self, id: Uuid) -> Result<Service> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT doc FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let (doc,) = row.ok_or(Error::NotFound("service"))?;
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn list_services(
        &self,
        page: u32,
        per_page: u32,
        active_only: bool,
    ) -> Result<(Vec<Service>, i64)> {
        let rows: Vec<(Value,)> = sqlx::query_as(
            "SELECT doc FROM services WHERE ($1 = FALSE OR active) ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(active_only)
        .bind(i64::from(per_page))
        .bind(i64::from((page - 1) * per_page))
        .fetch_all(self.pool())
        .await?;
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM services WHERE ($1 = FALSE OR active)")
                .bind(active_only)
                .fetch_one(self.pool())
                .await?;
        let services = rows
            .into_iter()
            .map(|(doc,)| serde_json::from_value(doc).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        Ok((services, total))
    }
}
