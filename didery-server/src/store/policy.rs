//! Conflict resolution between writers claiming the same DID.
//!
//! Merges are pure: they take the stored value and the accepted record and
//! return the value to write back.

use std::fmt;
use std::str::FromStr;

use didery_common::event::chain_root;
use didery_common::{CurrentState, EventChain, EventLog, Record};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ConflictMode {
    /// One chain per DID; continuity is enforced by rotation validation.
    #[default]
    Method,
    /// Last writer wins.
    Race,
    /// Every fork is kept, most recently updated first.
    Promiscuous,
}

impl ConflictMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Method => "method",
            Self::Race => "race",
            Self::Promiscuous => "promiscuous",
        }
    }
}

impl fmt::Display for ConflictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "method" => Ok(Self::Method),
            "race" => Ok(Self::Race),
            "promiscuous" => Ok(Self::Promiscuous),
            other => Err(format!(
                "unknown mode '{other}', expected 'method', 'race' or 'promiscuous'"
            )),
        }
    }
}

impl TryFrom<String> for ConflictMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Current state after accepting `record`.
pub fn merge_current(
    mode: ConflictMode,
    existing: Option<CurrentState>,
    record: Record,
) -> CurrentState {
    match mode {
        ConflictMode::Method | ConflictMode::Race => CurrentState::Single(record),
        ConflictMode::Promiscuous => {
            let root = record.root_key().map(str::to_string);
            let mut forks = vec![record];
            if let Some(existing) = existing {
                forks.extend(
                    existing
                        .records()
                        .iter()
                        .filter(|r| r.root_key() != root.as_deref())
                        .cloned(),
                );
            }
            CurrentState::Forks(forks)
        }
    }
}

/// Event log after accepting `record`.
///
/// The chain sharing the record's root keeps its earlier records behind the
/// new head. Under method and race a chain with a different root is
/// dropped; under promiscuous it is kept behind the updated chain.
pub fn merge_events(mode: ConflictMode, existing: Option<EventLog>, record: Record) -> EventLog {
    let root = record.root_key().map(str::to_string);
    let (matching, others): (Vec<EventChain>, Vec<EventChain>) = existing
        .map(|log| log.0)
        .unwrap_or_default()
        .into_iter()
        .partition(|chain| chain_root(chain) == root.as_deref());

    let mut chain = vec![record];
    chain.extend(matching.into_iter().flatten());

    let mut chains = vec![chain];
    if mode == ConflictMode::Promiscuous {
        chains.extend(others);
    }
    EventLog(chains)
}

/// Current state with the record rooted at `root` removed, or `None` when
/// nothing is left.
pub fn remove_current(existing: CurrentState, root: &str) -> Option<CurrentState> {
    match existing {
        CurrentState::Single(record) if record.root_key() == Some(root) => None,
        CurrentState::Single(record) => Some(CurrentState::Single(record)),
        CurrentState::Forks(records) => {
            let remaining: Vec<Record> = records
                .into_iter()
                .filter(|r| r.root_key() != Some(root))
                .collect();
            (!remaining.is_empty()).then_some(CurrentState::Forks(remaining))
        }
    }
}

/// Event log with the chain rooted at `root` removed, or `None` when no
/// chain is left.
pub fn remove_events(existing: EventLog, root: &str) -> Option<EventLog> {
    let remaining: Vec<EventChain> = existing
        .0
        .into_iter()
        .filter(|chain| chain_root(chain) != Some(root))
        .collect();
    (!remaining.is_empty()).then_some(EventLog(remaining))
}
