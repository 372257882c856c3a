//! Transport-independent operations on rotation histories and event logs.
//!
//! The REST handlers delegate here so that locking, validation, conflict
//! resolution and logging live in one place.

use didery_common::signature::parse_signature_header;
use didery_common::{CurrentState, EventChain, EventLog, KeyEvent, Record, ValidationError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::paging::{Page, PageRequest};
use crate::store::{ConflictMode, HistoryStore};
use crate::validation::{self, history};

/// Response body of a deletion.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: Record,
}

/// Log a rejected request at a level matching how suspicious it is.
pub(crate) fn log_rejection(op: &str, did: &str, err: &ValidationError) {
    match err {
        ValidationError::HijackAttempt
        | ValidationError::ReplayedSignature
        | ValidationError::SequencingViolation(_) => {
            warn!(op, did = %did, kind = err.kind(), error = %err, "suspicious request rejected");
        }
        _ => debug!(op, did = %did, kind = err.kind(), error = %err, "request rejected"),
    }
}

fn not_found() -> AppError {
    ValidationError::NotFound("Resource not found.".into()).into()
}

/// Stored record a rotation must extend. Promiscuous mode follows the fork
/// that shares the event's root key.
fn select_for_rotation<'a>(
    mode: ConflictMode,
    current: Option<&'a CurrentState>,
    event: &KeyEvent,
) -> Option<&'a Record> {
    let current = current?;
    match mode {
        ConflictMode::Method | ConflictMode::Race => current.head(),
        ConflictMode::Promiscuous => current.select_by_root(event.root_key()?),
    }
}

// ---------------------------------------------------------------------------
// Create / rotate
// ---------------------------------------------------------------------------

/// Accept an inception event and start a rotation history.
pub async fn create_history(
    store: &HistoryStore,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<Record, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let event = history::validate_inception(raw, &signatures).inspect_err(|e| {
        log_rejection("create", "-", e);
    })?;
    let did = didery_common::did::bare_did(&event.id)?;

    let _guard = store.lock(&did).await;
    let current = store.current(&did).await?;

    // A root already on record never takes a second inception.
    let exists = match (store.mode(), current.as_ref()) {
        (_, None) => false,
        (ConflictMode::Method, Some(_)) => true,
        (ConflictMode::Race | ConflictMode::Promiscuous, Some(state)) => event
            .root_key()
            .is_some_and(|root| state.select_by_root(root).is_some()),
    };
    if exists {
        let err = ValidationError::AlreadyExists(format!(
            "Resource with did \"{did}\" already exists. Use PUT request."
        ));
        log_rejection("create", &did, &err);
        return Err(err.into());
    }

    let record = Record::new(event, signatures);
    store.save(&did, current, record.clone()).await?;

    info!(did = %did, mode = %store.mode(), "rotation history created");
    Ok(record)
}

/// Accept a rotation event for the DID named in the URL.
pub async fn rotate_history(
    store: &HistoryStore,
    url_did: &str,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<Record, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let did = validation::url_did(Some(url_did))?.bare();

    let _guard = store.lock(&did).await;
    let current = store.current(&did).await?;

    let event = history::validate_rotation(Some(url_did), raw, &signatures, |event| {
        select_for_rotation(store.mode(), current.as_ref(), event)
    })
    .inspect_err(|e| log_rejection("rotate", &did, e))?;

    let signer = event.signer;
    let revoked = event.is_revoked();
    let record = Record::new(event, signatures);
    store.save(&did, current, record.clone()).await?;

    info!(did = %did, signer, revoked, mode = %store.mode(), "key rotated");
    Ok(record)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn get_history(store: &HistoryStore, did: &str) -> Result<CurrentState, AppError> {
    let did = validation::url_did(Some(did))?.bare();
    store.current(&did).await?.ok_or_else(not_found)
}

pub async fn list_history(
    store: &HistoryStore,
    page: PageRequest,
) -> Result<Page<CurrentState>, AppError> {
    Ok(Page {
        data: store.current_page(page.offset, page.limit).await?,
        total: store.count().await?,
    })
}

pub async fn get_events(store: &HistoryStore, did: &str) -> Result<EventLog, AppError> {
    let did = validation::url_did(Some(did))?.bare();
    store.events(&did).await?.ok_or_else(not_found)
}

/// Event log, one chain of it, or one record of that chain.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EventsView {
    Log(EventLog),
    Chain(EventChain),
    Record(Record),
}

/// Read the event log narrowed to the chain started by `root` and, within it,
/// to the record `position` steps after inception.
pub async fn view_events(
    store: &HistoryStore,
    did: &str,
    root: Option<&str>,
    position: Option<usize>,
) -> Result<EventsView, AppError> {
    let log = get_events(store, did).await?;
    match (root, position) {
        (None, None) => Ok(EventsView::Log(log)),
        (None, Some(_)) => Err(ValidationError::MalformedField(
            "position requires a root key.".into(),
        )
        .into()),
        (Some(root), None) => log
            .chain_for_root(root)
            .cloned()
            .map(EventsView::Chain)
            .ok_or_else(not_found),
        (Some(root), Some(position)) => log
            .record_at(root, position)
            .cloned()
            .map(EventsView::Record)
            .ok_or_else(not_found),
    }
}

pub async fn list_events(
    store: &HistoryStore,
    page: PageRequest,
) -> Result<Page<EventLog>, AppError> {
    Ok(Page {
        data: store.events_page(page.offset, page.limit).await?,
        total: store.events_count().await?,
    })
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Delete the history at `url_did`. With `vk` only the fork whose active key
/// is `vk` goes; without it the most recently updated one does.
pub async fn delete_history(
    store: &HistoryStore,
    url_did: &str,
    vk: Option<&str>,
    raw: &[u8],
    signature_header: Option<&str>,
) -> Result<Deleted, AppError> {
    let signatures = parse_signature_header(signature_header)?;
    let did = validation::url_did(Some(url_did))?.bare();

    let _guard = store.lock(&did).await;
    let Some(current) = store.current(&did).await? else {
        return Err(not_found());
    };

    let selected = history::validate_deletion(Some(url_did), raw, &signatures, || {
        current.select(vk)
    })
    .inspect_err(|e| log_rejection("delete", &did, e))?
    .clone();

    let root = selected
        .root_key()
        .ok_or_else(|| ValidationError::MalformedField("signers field is missing keys.".into()))?
        .to_string();
    store.delete_chain(&did, current, &root).await?;

    info!(did = %did, root = %root, "rotation history deleted");
    Ok(Deleted { deleted: selected })
}
