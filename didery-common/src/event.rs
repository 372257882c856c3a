//! Key events and the structures they are stored in.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::signature::SignatureSet;

/// One step of an identity's key history.
///
/// `signers[signer]` is the slot currently authorized to sign, or `None` once
/// that key has been revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub id: String,
    pub changed: String,
    pub signer: u64,
    pub signers: Vec<Option<String>>,
}

impl KeyEvent {
    /// Inception key, shared by every event of a chain.
    pub fn root_key(&self) -> Option<&str> {
        self.signers.first().and_then(|k| k.as_deref())
    }

    /// The key that currently speaks for the identity: `signers[signer]`, or
    /// the slot before it when the active slot has been revoked.
    pub fn active_key(&self) -> Option<&str> {
        let idx = usize::try_from(self.signer).ok()?;
        match self.signers.get(idx) {
            Some(Some(key)) => Some(key),
            Some(None) => idx
                .checked_sub(1)
                .and_then(|prev| self.signers.get(prev))
                .and_then(|k| k.as_deref()),
            None => None,
        }
    }

    pub fn is_revoked(&self) -> bool {
        usize::try_from(self.signer)
            .ok()
            .and_then(|idx| self.signers.get(idx))
            .is_some_and(Option::is_none)
    }

    pub fn changed_at(&self) -> Result<DateTime<FixedOffset>> {
        parse_changed(&self.changed)
    }
}

/// Parse an ISO-8601 timestamp with an explicit offset.
pub fn parse_changed(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|_| ValidationError::malformed("ISO datetime could not be parsed."))
}

/// A stored, validated event together with the signatures that authorized it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub event: KeyEvent,
    pub signatures: SignatureSet,
}

impl Record {
    pub fn new(event: KeyEvent, signatures: SignatureSet) -> Self {
        Self { event, signatures }
    }

    pub fn root_key(&self) -> Option<&str> {
        self.event.root_key()
    }

    pub fn active_key(&self) -> Option<&str> {
        self.event.active_key()
    }
}

/// Records sharing one root key, newest first.
pub type EventChain = Vec<Record>;

/// Root key of a chain, read from its earliest record.
pub fn chain_root(chain: &[Record]) -> Option<&str> {
    chain.last().and_then(Record::root_key)
}

/// Latest record(s) believed authoritative for a DID.
///
/// Method and race stores keep a single record; the promiscuous store keeps
/// one per fork, most recently updated first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurrentState {
    Single(Record),
    Forks(Vec<Record>),
}

impl CurrentState {
    pub fn records(&self) -> &[Record] {
        match self {
            Self::Single(record) => std::slice::from_ref(record),
            Self::Forks(records) => records,
        }
    }

    /// The most recently written record.
    pub fn head(&self) -> Option<&Record> {
        self.records().first()
    }
}

/// Full history of a DID: one chain per root key, most recently updated first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog(pub Vec<EventChain>);

impl EventLog {
    pub fn chains(&self) -> &[EventChain] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(signer: u64, signers: &[Option<&str>]) -> KeyEvent {
        KeyEvent {
            id: "did:dad:k0".into(),
            changed: "2000-01-01T00:00:00+00:00".into(),
            signer,
            signers: signers.iter().map(|k| k.map(str::to_string)).collect(),
        }
    }

    #[test]
    fn active_key_falls_back_on_revocation() {
        let e = event(1, &[Some("k0"), Some("k1"), Some("k2")]);
        assert_eq!(e.active_key(), Some("k1"));
        assert!(!e.is_revoked());

        let e = event(2, &[Some("k0"), Some("k1"), None]);
        assert_eq!(e.active_key(), Some("k1"));
        assert!(e.is_revoked());
        assert_eq!(e.root_key(), Some("k0"));
    }

    #[test]
    fn active_key_out_of_range() {
        assert_eq!(event(5, &[Some("k0")]).active_key(), None);
        assert_eq!(event(0, &[None]).active_key(), None);
    }

    #[test]
    fn changed_requires_offset() {
        assert!(parse_changed("2000-01-01T00:00:00+00:00").is_ok());
        assert!(parse_changed("2000-01-01T00:00:00Z").is_ok());
        assert!(parse_changed("2000-01-01").is_err());
        assert!(parse_changed("yesterday").is_err());
    }

    #[test]
    fn event_field_order_is_stable() {
        let e = event(0, &[Some("k0"), None]);
        assert_eq!(
            serde_json::to_string(&e).unwrap(),
            r#"{"id":"did:dad:k0","changed":"2000-01-01T00:00:00+00:00","signer":0,"signers":["k0",null]}"#
        );
    }

    #[test]
    fn current_state_shapes() {
        let record = Record::new(event(0, &[Some("k0"), Some("k1")]), SignatureSet::default());

        let single = CurrentState::Single(record.clone());
        let json = serde_json::to_value(&single).unwrap();
        assert!(json.is_object());
        let back: CurrentState = serde_json::from_value(json).unwrap();
        assert_eq!(back, single);

        let forks = CurrentState::Forks(vec![record.clone(), record]);
        let json = serde_json::to_value(&forks).unwrap();
        assert_eq!(json.as_array().map(Vec::len), Some(2));
        let back: CurrentState = serde_json::from_value(json).unwrap();
        assert_eq!(back.records().len(), 2);
    }

    #[test]
    fn chain_root_reads_earliest_record() {
        let newest = Record::new(
            event(1, &[Some("k0"), Some("k1"), Some("k2")]),
            SignatureSet::default(),
        );
        let oldest = Record::new(event(0, &[Some("k0"), Some("k1")]), SignatureSet::default());
        assert_eq!(chain_root(&[newest, oldest]), Some("k0"));
        assert_eq!(chain_root(&[]), None);
    }
}
