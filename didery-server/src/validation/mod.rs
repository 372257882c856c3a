//! Fail-fast request checks. Each function runs its checks in a fixed order
//! and returns the first failure; none of them touch the store.

pub mod blob;
pub mod history;

use didery_common::{Did, SignatureScheme, SignatureSet, ValidationError, crypto};
use serde_json::{Map, Value};

type Result<T> = std::result::Result<T, ValidationError>;

pub(crate) fn malformed(msg: impl Into<String>) -> ValidationError {
    ValidationError::MalformedField(msg.into())
}

/// Parse the raw body as a JSON object.
pub(crate) fn parse_object(raw: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ValidationError::MalformedPayload(
            "Could not decode the request body. The JSON was incorrect.".into(),
        )),
    }
}

pub(crate) fn require_fields(body: &Map<String, Value>, fields: &[&str]) -> Result<()> {
    match fields.iter().find(|f| !body.contains_key(**f)) {
        Some(missing) => Err(ValidationError::MissingField(missing.to_string())),
        None => Ok(()),
    }
}

/// A string field that must not be empty.
pub(crate) fn non_empty_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) | Some(Value::Null) => {
            Err(malformed(format!("{field} field cannot be empty.")))
        }
        Some(_) => Err(malformed(format!("{field} field must be a string."))),
        None => Err(ValidationError::MissingField(field.to_string())),
    }
}

/// DID from a URL path segment, rejecting a blank one.
pub(crate) fn url_did(url_did: Option<&str>) -> Result<Did> {
    match url_did.map(str::trim) {
        Some(did) if !did.is_empty() => Did::parse(did),
        _ => Err(ValidationError::MalformedDid(
            "DID value missing from url.".into(),
        )),
    }
}

pub(crate) fn require_same_did(url: &Did, body: &Did) -> Result<()> {
    if url.bare() != body.bare() {
        return Err(malformed("Url did must match id field did."));
    }
    Ok(())
}

/// Check the signature under `tag` against `verkey`.
pub(crate) fn verify_tag(
    scheme: SignatureScheme,
    signatures: &SignatureSet,
    tag: &str,
    raw: &[u8],
    verkey: &str,
) -> Result<()> {
    let signature = signatures.require(tag)?;
    match crypto::decode(verkey) {
        Ok(key) if key.len() == scheme.key_len() => {}
        _ => return Err(ValidationError::InvalidKey("Invalid key.".into())),
    }
    if !scheme.verify(signature, raw, verkey) {
        return Err(ValidationError::UnverifiableSignature(tag.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn parse_object_rejects_non_objects() {
        assert!(parse_object(br#"{"a":1}"#).is_ok());
        for raw in [&b"[1,2]"[..], b"\"s\"", b"{oops", b""] {
            assert!(matches!(
                parse_object(raw),
                Err(ValidationError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn first_missing_field_is_reported() {
        let body = obj(json!({"id": "x"}));
        assert_eq!(
            require_fields(&body, &["id", "changed", "signer"]),
            Err(ValidationError::MissingField("changed".into()))
        );
    }

    #[test]
    fn non_empty_str_kinds() {
        let body = obj(json!({"a": "v", "b": "", "c": 3, "d": null}));
        assert_eq!(non_empty_str(&body, "a"), Ok("v"));
        assert_eq!(
            non_empty_str(&body, "b"),
            Err(malformed("b field cannot be empty."))
        );
        assert_eq!(
            non_empty_str(&body, "c"),
            Err(malformed("c field must be a string."))
        );
        assert_eq!(
            non_empty_str(&body, "d"),
            Err(malformed("d field cannot be empty."))
        );
    }

    #[test]
    fn url_did_must_be_present() {
        assert!(matches!(url_did(None), Err(ValidationError::MalformedDid(_))));
        assert!(matches!(
            url_did(Some("  ")),
            Err(ValidationError::MalformedDid(_))
        ));
        assert!(url_did(Some("did:dad:abc")).is_ok());
    }
}
