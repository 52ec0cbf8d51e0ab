//! Persistence layer. One [`Store`] handle wraps the Postgres pool and is
//! constructor-injected wherever data access is needed; there is no global
//! database state.
//!
//! Aggregates cross the database boundary as JSONB documents next to the
//! scalar columns used for lookups and listings.

mod files;
mod invoices;
mod orders;
mod payments;
mod services;

use sqlx::PgPool;

use crate::{Error, Result};

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Next value of a per-period counter, atomically.
    ///
    /// A single upsert-with-increment means two concurrent callers can
    /// never observe the same value, so document numbers stay unique.
    pub async fn next_sequence(&self, scope: &str, period: &str) -> Result<i64> {
        let (value,): (i64,) = sqlx::query_as(
            "INSERT INTO sequences (scope, period, value) VALUES ($1, $2, 1)
             ON CONFLICT (scope, period) DO UPDATE SET value = sequences.value + 1
             RETURNING value",
        )
        .bind(scope)
        .bind(period)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}

/// Map unique-constraint violations to the `Conflict` category.
pub(crate) fn conflict(e: sqlx::Error, what: &str) -> Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return Error::Conflict(format!("{what} already exists"));
        }
    }
    Error::Storage(e)
}
