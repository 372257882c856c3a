use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::SignatureScheme;
use crate::error::{Result, ValidationError};

/// Tag carrying the signature by the currently authorized key.
pub const SIGNER: &str = "signer";
/// Tag carrying the signature by the pre-rotated successor key.
pub const ROTATION: &str = "rotation";
/// Optional tag naming the signature scheme.
pub const NAME: &str = "name";

/// Tag → signature mapping parsed from a `Signature` header.
///
/// Backed by a `BTreeMap` so stored records serialize identically no matter
/// in which order the client listed the clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureSet(BTreeMap<String, String>);

impl SignatureSet {
    /// Parse `tag="value"; tag="value"` clauses. Clauses whose value is not
    /// double quoted are skipped; a repeated tag keeps its last value.
    pub fn parse(header: &str) -> Self {
        let mut set = BTreeMap::new();
        for clause in header.split(';') {
            let Some((tag, value)) = clause.trim().split_once('=') else {
                continue;
            };
            let value = value.trim();
            let Some(value) = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
            else {
                continue;
            };
            set.insert(tag.trim().to_string(), value.trim().to_string());
        }
        Self(set)
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    /// Signature under `tag`, failing with `MissingSignatureTag` when absent
    /// or empty.
    pub fn require(&self, tag: &str) -> Result<&str> {
        match self.get(tag) {
            Some(sig) if !sig.is_empty() => Ok(sig),
            _ => Err(ValidationError::MissingSignatureTag(tag.to_string())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME)
    }

    pub fn scheme(&self) -> SignatureScheme {
        SignatureScheme::from_name(self.name())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Parse an optional header value, rejecting absent or blank headers.
pub fn parse_signature_header(header: Option<&str>) -> Result<SignatureSet> {
    match header.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(SignatureSet::parse(value)),
        _ => Err(ValidationError::MissingSignatureHeader),
    }
}
