use serde_json::Value;
use uuid::Uuid;

use super::Store;
use crate::domain::aggregates::PrintFile;
use crate::{Error, Result};

impl Store {
    pub async fn insert_file(&self, file: &PrintFile) -> Result<()> {
        sqlx::query(
            "INSERT INTO files (id, owner_id, status, doc, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(file.id)
        .bind(file.owner_id)
        .bind(file.status.as_str())
        .bind(serde_json::to_value(file)?)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn update_file(&self, file: &PrintFile) -> Result<()> {
        let result =
            sqlx::query("UPDATE files SET status = $2, doc = $3, updated_at = $4 WHERE id = $1")
                .bind(file.id)
                .bind(file.status.as_str())
                .bind(serde_json::to_value(file)?)
                .bind(file.updated_at)
                .execute(self.pool())
                .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("file"));
        }
        Ok(())
    }

    pub async fn fetch_file(&self, id: Uuid) -> Result<PrintFile> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT doc FROM files WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        let (doc,) = row.ok_or(Error::NotFound("file"))?;
        Ok(serde_json::from_value(doc)?)
    }
}
