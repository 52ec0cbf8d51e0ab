//! Background file processing.
//!
//! Uploads are inspected after the request has returned: at-most-once, no
//! retry. Failures mark the file `rejected` and are logged; they never
//! propagate to the uploader. The worker pool is bounded and each job runs
//! under a timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::domain::aggregates::print_file::{extract_metadata, FileFormat};
use crate::domain::events::{DomainEvent, FileEvent};
use crate::notify::Notifier;
use crate::store::Store;
use crate::Result;

const MAX_CONCURRENT_JOBS: usize = 4;
const JOB_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct FileProcessor {
    store: Store,
    notifier: Notifier,
    semaphore: Arc<Semaphore>,
}

impl FileProcessor {
    pub fn new(store: Store, notifier: Notifier) -> Self {
        Self { store, notifier, semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS)) }
    }

    /// Kick off inspection of an uploaded file. Fire-and-forget: the
    /// triggering request has already been answered when this runs.
    pub fn spawn(&self, file_id: Uuid, bytes: Vec<u8>) {
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let semaphore = self.semaphore.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // pool shut down
            };
            match tokio::time::timeout(JOB_TIMEOUT, process(&store, &notifier, file_id, &bytes)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(%file_id, error = %e, "file processing failed");
                    reject(&store, &notifier, file_id, "processing failed").await;
                }
                Err(_) => {
                    tracing::warn!(%file_id, "file processing timed out");
                    reject(&store, &notifier, file_id, "processing timed out").await;
                }
            }
        });
    }
}

async fn process(store: &Store, notifier: &Notifier, file_id: Uuid, bytes: &[u8]) -> Result<()> {
    let mut file = store.fetch_file(file_id).await?;
    file.mark_processing();
    store.update_file(&file).await?;

    match FileFormat::detect(bytes) {
        Some(format) => {
            let metadata = extract_metadata(bytes);
            file.apply_inspection(format, metadata);
            tracing::info!(%file_id, format = format.as_str(), quality = ?file.quality, "file processed");
            store.update_file(&file).await?;
            notifier.publish(vec![DomainEvent::File(FileEvent::Processed {
                file_id,
                quality: file.quality,
            })]);
        }
        None => {
            file.mark_rejected("unrecognized file format");
            tracing::info!(%file_id, "file rejected: unrecognized format");
            store.update_file(&file).await?;
            notifier.publish(vec![DomainEvent::File(FileEvent::Rejected {
                file_id,
                reason: "unrecognized file format".into(),
            })]);
        }
    }
    Ok(())
}

/// Best-effort rejection marker; a failure here is only logged.
async fn reject(store: &Store, notifier: &Notifier, file_id: Uuid, reason: &str) {
    let result = async {
        let mut file = store.fetch_file(file_id).await?;
        file.mark_rejected(reason);
        store.update_file(&file).await
    }
    .await;
    match result {
        Ok(()) => notifier.publish(vec![DomainEvent::File(FileEvent::Rejected {
            file_id,
            reason: reason.to_string(),
        })]),
        Err(e) => tracing::error!(%file_id, error = %e, "failed to mark file rejected"),
    }
}
