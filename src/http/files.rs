//! Upload and file pipeline endpoints.
//!
//! The raw bytes are inspected in the background after the upload request
//! has been answered; binary storage itself is handled by the object-store
//! collaborator, this service keeps the metadata record.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::{FileFormat, FileValidation, PrintFile};
use crate::domain::value_objects::Actor;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub filename: String,
}

/// Register an upload and kick off background inspection. Returns 202:
/// metadata and quality grading arrive asynchronously.
pub async fn upload(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<PrintFile>)> {
    if params.filename.trim().is_empty() {
        return Err(Error::Validation("a filename is required".into()));
    }
    if body.is_empty() {
        return Err(Error::Validation("file body must not be empty".into()));
    }
    let file = PrintFile::new(actor.id, params.filename, body.len() as u64);
    state.store.insert_file(&file).await?;
    state.files.spawn(file.id, body.to_vec());
    Ok((StatusCode::ACCEPTED, Json(file)))
}

pub async fn get(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PrintFile>> {
    let file = state.store.fetch_file(id).await?;
    require_access(&actor, &file)?;
    Ok(Json(file))
}

pub async fn validation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<FileValidation>> {
    let file = state.store.fetch_file(id).await?;
    require_access(&actor, &file)?;
    Ok(Json(file.validate()))
}

#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    pub format: FileFormat,
}

/// Produce a converted copy as a new version of the file.
pub async fn convert(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(req): Json<ConvertRequest>,
) -> Result<Json<PrintFile>> {
    let mut file = state.store.fetch_file(id).await?;
    require_access(&actor, &file)?;
    file.convert_to(req.format, actor.id)?;
    state.store.update_file(&file).await?;
    Ok(Json(file))
}

/// Produce a print-optimized copy as a new version of the file.
pub async fn optimize(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PrintFile>> {
    let mut file = state.store.fetch_file(id).await?;
    require_access(&actor, &file)?;
    file.optimize_for_print(actor.id)?;
    state.store.update_file(&file).await?;
    Ok(Json(file))
}

fn require_access(actor: &Actor, file: &PrintFile) -> Result<()> {
    if !actor.is_staff() && !actor.owns(file.owner_id) {
        return Err(Error::Forbidden("this file belongs to another client".into()));
    }
    Ok(())
}
