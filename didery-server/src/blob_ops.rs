//! Transport-independent operations on one-time-pad blobs.

use didery_common::signature::parse_signature_header;
use didery_common::{BlobRecord, Did, ValidationError};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::history_ops::log_rejection;
use crate::paging::{Page, PageRequest};
use crate::store::BlobStore;
use crate::validation::{self, blob};

#[derive(Debug, Serialize)]
pub struct DeletedBlob {
    pub deleted: BlobRecord,
}

fn not_found() -> AppError {
    ValidationError::NotFound("Resource not found.".into()).into()
}

pub async fn create_blob(
    store: &BlobStore,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<BlobRecord, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let otp_data = blob::validate_blob(raw, &signatures).inspect_err(|e| {
        log_rejection("create_blob", "-", e);
    })?;
    let did = Did::parse(&otp_data.id)?.bare();

    let _guard = store.lock(&did).await;
    if store.get(&did).await?.is_some() {
        return Err(ValidationError::AlreadyExists(format!(
            "Resource with did \"{did}\" already exists. Use PUT request."
        ))
        .into());
    }

    let record = BlobRecord {
        otp_data,
        signatures,
    };
    store.put(&did, &record).await?;

    info!(did = %did, "otp blob created");
    Ok(record)
}

pub async fn update_blob(
    store: &BlobStore,
    url_did: &str,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<BlobRecord, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let did = validation::url_did(Some(url_did))?.bare();

    let _guard = store.lock(&did).await;
    let stored = store.get(&did).await?;
    let otp_data = blob::validate_blob_update(Some(url_did), raw, &signatures, stored.as_ref())
        .inspect_err(|e| log_rejection("update_blob", &did, e))?;

    let record = BlobRecord {
        otp_data,
        signatures,
    };
    store.put(&did, &record).await?;

    info!(did = %did, "otp blob updated");
    Ok(record)
}

pub async fn get_blob(store: &BlobStore, did: &str) -> Result<BlobRecord, AppError> {
    let did = validation::url_did(Some(did))?.bare();
    store.get(&did).await?.ok_or_else(not_found)
}

pub async fn list_blobs(
    store: &BlobStore,
    page: PageRequest,
) -> Result<Page<BlobRecord>, AppError> {
    Ok(Page {
        data: store.page(page.offset, page.limit).await?,
        total: store.count().await?,
    })
}

pub async fn delete_blob(
    store: &BlobStore,
    url_did: &str,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<DeletedBlob, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let did = validation::url_did(Some(url_did))?.bare();

    let _guard = store.lock(&did).await;
    let Some(stored) = store.get(&did).await? else {
        return Err(not_found());
    };
    blob::validate_blob_deletion(Some(url_did), raw, &signatures, Some(&stored))
        .inspect_err(|e| log_rejection("delete_blob", &did, e))?;

    store.remove(&did).await?;

    info!(did = %did, "otp blob deleted");
    Ok(DeletedBlob { deleted: stored })
}
