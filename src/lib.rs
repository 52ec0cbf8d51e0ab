//! PrintForge - Print-Shop Management Backend
//!
//! REST backend for a print-shop: a service catalog with price calculation,
//! order lifecycle, payments with refunds, invoicing, and an upload pipeline
//! that grades artwork for print quality.
//!
//! ## Features
//! - Service catalog with priced options and quantity bounds
//! - Order lifecycle with stamped status transitions and derived totals
//! - Payments with fee breakdowns, refunds and a mobile-money callback
//! - Invoice / quote generation with monthly document numbering
//! - File metadata extraction, validation and versioned conversions

use thiserror::Error;

pub mod domain;
pub mod http;
pub mod notify;
pub mod pipeline;
pub mod store;

/// Failure taxonomy surfaced to callers as structured responses.
///
/// Every fallible operation in the crate resolves to one of these
/// categories; the HTTP layer maps them to status codes.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("quantity {got} outside allowed range {min}..={max}")]
    InvalidQuantity { got: u32, min: u32, max: u32 },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
