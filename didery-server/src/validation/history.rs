//! Checks for inception, rotation and deletion of rotation histories.

use didery_common::event::parse_changed;
use didery_common::signature::{ROTATION, SIGNER};
use didery_common::{Did, KeyEvent, Record, SignatureSet, ValidationError};
use serde_json::{Map, Value};

use super::{
    Result, malformed, non_empty_str, parse_object, require_fields, require_same_did, url_did,
    verify_tag,
};

const EVENT_FIELDS: [&str; 4] = ["id", "changed", "signer", "signers"];

/// Parse and structurally check a key event body.
///
/// `allow_revocation` permits a `null` at index `signer`, the only place a
/// revoked key may appear.
fn parse_event(body: &Map<String, Value>, allow_revocation: bool) -> Result<KeyEvent> {
    let id = non_empty_str(body, "id")?;
    let changed = non_empty_str(body, "changed")?;
    parse_changed(changed)?;

    let signer = match body.get("signer") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| malformed("signer field must be a non-negative integer."))?,
        _ => return Err(malformed("signer field must be a non-negative integer.")),
    };

    let Some(Value::Array(raw_signers)) = body.get("signers") else {
        return Err(malformed("signers field must be a list."));
    };

    let mut signers = Vec::with_capacity(raw_signers.len());
    for (idx, key) in raw_signers.iter().enumerate() {
        match key {
            Value::String(s) if s.is_empty() => {
                return Err(malformed("signers keys cannot be empty."));
            }
            Value::String(s) => signers.push(Some(s.clone())),
            Value::Null if allow_revocation && idx as u64 == signer => signers.push(None),
            Value::Null => {
                return Err(malformed(
                    "signers keys cannot be null unless revoking a key.",
                ));
            }
            _ => return Err(malformed("signers keys must be strings.")),
        }
    }

    Ok(KeyEvent {
        id: id.to_string(),
        changed: changed.to_string(),
        signer,
        signers,
    })
}

fn key_at(event: &KeyEvent, idx: usize) -> Option<&str> {
    event.signers.get(idx).and_then(|k| k.as_deref())
}

// ---------------------------------------------------------------------------
// Inception
// ---------------------------------------------------------------------------

/// Validate a new rotation history. Returns the parsed event.
pub fn validate_inception(raw: &[u8], signatures: &SignatureSet) -> Result<KeyEvent> {
    let body = parse_object(raw)?;
    require_fields(&body, &EVENT_FIELDS)?;
    signatures.require(SIGNER)?;

    let event = parse_event(&body, false)?;
    let did = Did::parse(&event.id)?;

    if event.signer != 0 {
        return Err(malformed(
            "signer field must equal 0 on creation of new rotation history.",
        ));
    }
    if event.signers.len() < 2 {
        return Err(malformed(
            "signers field must contain at least the current public key and its first pre-rotation.",
        ));
    }

    let root = key_at(&event, 0).ok_or_else(|| malformed("signers field is missing keys."))?;
    if did.is_self_certifying() && !did.matches_key(root) {
        return Err(ValidationError::HijackAttempt);
    }

    let signature = signatures.require(SIGNER)?;
    signatures
        .scheme()
        .verify_signed_resource(SIGNER, signature, raw, root)?;

    Ok(event)
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Validate a rotation submitted against `url_did`.
///
/// `select` picks the stored record the event must extend, or `None` when
/// the DID has no history.
pub fn validate_rotation<'a>(
    url: Option<&str>,
    raw: &[u8],
    signatures: &SignatureSet,
    select: impl FnOnce(&KeyEvent) -> Option<&'a Record>,
) -> Result<KeyEvent> {
    let url = url_did(url)?;

    let body = parse_object(raw)?;
    require_fields(&body, &EVENT_FIELDS)?;
    signatures.require(SIGNER)?;
    signatures.require(ROTATION)?;

    let event = parse_event(&body, true)?;
    if event.signers.len() < 3 {
        return Err(malformed("signers field is missing keys."));
    }
    let did = Did::parse(&event.id)?;
    require_same_did(&url, &did)?;

    let stored = select(&event)
        .ok_or_else(|| ValidationError::NotFound("Resource not found.".into()))?;

    let len = event.signers.len();
    let signer = usize::try_from(event.signer).unwrap_or(usize::MAX);
    let revoking = event.is_revoked();

    // Signer must point at a committed slot that already has a successor,
    // unless that slot is being revoked.
    if signer == 0 || signer >= len || (signer == len - 1 && !revoking) {
        return Err(malformed(
            "\"signer\" cannot reference the first or last key in the \"signers\" field on PUT requests.",
        ));
    }
    if !revoking && len <= signer + 1 {
        return Err(malformed("Missing pre rotated key in the signers field."));
    }

    check_changed(&event, &stored.event)?;
    check_signers_prefix(&event, &stored.event, signer)?;
    check_sequence(&event, &stored.event, raw, signatures, signer)?;

    // Dual signature over the request itself.
    let index = if revoking { signer - 1 } else { signer };
    if index == 0 {
        return Err(malformed(
            "\"signer\" cannot reference the first or last key in the \"signers\" field on PUT requests.",
        ));
    }
    let scheme = signatures.scheme();
    let missing = || malformed("signers field is missing keys.");
    let current = key_at(&event, index - 1).ok_or_else(missing)?;
    let next = key_at(&event, index).ok_or_else(missing)?;
    verify_tag(scheme, signatures, SIGNER, raw, current)?;
    verify_tag(scheme, signatures, ROTATION, raw, next)?;

    Ok(event)
}

fn check_changed(event: &KeyEvent, stored: &KeyEvent) -> Result<()> {
    let new = event.changed_at()?;
    let previous = stored.changed_at()?;
    if new <= previous {
        return Err(ValidationError::StaleUpdate(
            "\"changed\" field not later than previous update.".into(),
        ));
    }
    Ok(())
}

/// Committed keys may not change. The one exception is revoking the slot
/// right after the stored signer, which may already hold a committed key.
fn check_signers_prefix(event: &KeyEvent, stored: &KeyEvent, signer: usize) -> Result<()> {
    if event.signers.len() < stored.signers.len() {
        return Err(ValidationError::StaleUpdate(
            "signers field is missing keys.".into(),
        ));
    }

    let in_place_revocation = stored.signer.checked_add(1) == Some(event.signer)
        && signer < stored.signers.len()
        && event.signers[signer].is_none()
        && stored.signers[signer].is_some();

    for (idx, (new, old)) in event.signers.iter().zip(&stored.signers).enumerate() {
        if new != old && !(in_place_revocation && idx == signer) {
            return Err(ValidationError::StaleUpdate(
                "signers field missing previously verified keys.".into(),
            ));
        }
    }

    if event.signers.len() == stored.signers.len() && !in_place_revocation {
        return Err(ValidationError::StaleUpdate(
            "signers field must add a pre-rotated key.".into(),
        ));
    }
    Ok(())
}

/// `signer` must advance by exactly one, except for a revocation that skips
/// ahead. That jump must be signed by the stored current and next keys.
fn check_sequence(
    event: &KeyEvent,
    stored: &KeyEvent,
    raw: &[u8],
    signatures: &SignatureSet,
    signer: usize,
) -> Result<()> {
    let violation = || {
        ValidationError::SequencingViolation(
            "signer field must be one greater than previous.".into(),
        )
    };

    if event.signer <= stored.signer {
        return Err(violation());
    }
    if stored.signer + 1 == event.signer {
        return Ok(());
    }
    if event.signers[signer].is_some() {
        return Err(violation());
    }

    let stored_signer = usize::try_from(stored.signer).map_err(|_| violation())?;
    let current = key_at(stored, stored_signer).ok_or_else(violation)?;
    let next = key_at(stored, stored_signer + 1).ok_or_else(violation)?;
    let scheme = signatures.scheme();
    verify_tag(scheme, signatures, SIGNER, raw, current)?;
    verify_tag(scheme, signatures, ROTATION, raw, next)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

/// Validate a deletion of the history at `url_did`.
///
/// `select` resolves the record being deleted. The request body `{"id"}`
/// must be signed by that record's active key. Returns the selected record.
pub fn validate_deletion<'a>(
    url: Option<&str>,
    raw: &[u8],
    signatures: &SignatureSet,
    select: impl FnOnce() -> Option<&'a Record>,
) -> Result<&'a Record> {
    let url = url_did(url)?;
    let signature = signatures.require(SIGNER)?;

    let stored = select().ok_or_else(|| ValidationError::NotFound("Resource not found.".into()))?;
    let verkey = stored
        .active_key()
        .ok_or_else(|| malformed("signers field is missing keys."))?;

    let body = signatures
        .scheme()
        .verify_signed_resource(SIGNER, signature, raw, verkey)?;
    let Value::Object(body) = body else {
        return Err(ValidationError::MalformedPayload(
            "Could not decode the request body. The JSON was incorrect.".into(),
        ));
    };
    require_fields(&body, &["id"])?;
    let did = Did::parse(non_empty_str(&body, "id")?)?;
    require_same_did(&url, &did)?;

    Ok(stored)
}
