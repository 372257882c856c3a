//! Checks for one-time-pad blobs. A blob has no rotation chain: every write
//! is signed directly by the key embedded in its DID.

use didery_common::event::parse_changed;
use didery_common::signature::SIGNER;
use didery_common::{BlobRecord, Did, OtpBlob, SignatureSet, ValidationError};
use serde_json::Value;

use super::{
    Result, non_empty_str, parse_object, require_fields, require_same_did, url_did, verify_tag,
};

const BLOB_FIELDS: [&str; 3] = ["id", "blob", "changed"];

/// Validate a blob body signed by its DID key.
pub fn validate_blob(raw: &[u8], signatures: &SignatureSet) -> Result<OtpBlob> {
    let body = parse_object(raw)?;
    require_fields(&body, &BLOB_FIELDS)?;
    signatures.require(SIGNER)?;

    let id = non_empty_str(&body, "id")?;
    let blob = non_empty_str(&body, "blob")?;
    let changed = non_empty_str(&body, "changed")?;
    parse_changed(changed)?;
    let did = Did::parse(id)?;

    verify_tag(signatures.scheme(), signatures, SIGNER, raw, &did.id_string)?;

    Ok(OtpBlob {
        id: id.to_string(),
        blob: blob.to_string(),
        changed: changed.to_string(),
    })
}

/// Validate an update of the blob stored at `url_did`.
pub fn validate_blob_update(
    url: Option<&str>,
    raw: &[u8],
    signatures: &SignatureSet,
    stored: Option<&BlobRecord>,
) -> Result<OtpBlob> {
    let url = url_did(url)?;
    let blob = validate_blob(raw, signatures)?;
    require_same_did(&url, &Did::parse(&blob.id)?)?;

    let stored = stored.ok_or_else(|| ValidationError::NotFound("Resource not found.".into()))?;
    if parse_changed(&blob.changed)? <= parse_changed(&stored.otp_data.changed)? {
        return Err(ValidationError::StaleUpdate(
            "\"changed\" field not later than previous update.".into(),
        ));
    }
    Ok(blob)
}

/// Validate deletion of the blob stored at `url_did`.
///
/// The signatures must differ from the stored ones so a previously served
/// read response cannot be replayed as a delete.
pub fn validate_blob_deletion(
    url: Option<&str>,
    raw: &[u8],
    signatures: &SignatureSet,
    stored: Option<&BlobRecord>,
) -> Result<()> {
    let url = url_did(url)?;
    let signature = signatures.require(SIGNER)?;
    let stored = stored.ok_or_else(|| ValidationError::NotFound("Resource not found.".into()))?;

    let body = signatures
        .scheme()
        .verify_signed_resource(SIGNER, signature, raw, &url.id_string)?;
    let Value::Object(body) = body else {
        return Err(ValidationError::MalformedPayload(
            "Could not decode the request body. The JSON was incorrect.".into(),
        ));
    };
    require_fields(&body, &["id"])?;
    require_same_did(&url, &Did::parse(non_empty_str(&body, "id")?)?)?;

    if *signatures == stored.signatures {
        return Err(ValidationError::ReplayedSignature);
    }
    Ok(())
}
