//! Read-side lookups over stored history.

use crate::event::{CurrentState, EventChain, EventLog, Record, chain_root};

impl CurrentState {
    /// Record whose chain was started by `root`.
    pub fn select_by_root(&self, root: &str) -> Option<&Record> {
        self.records().iter().find(|r| r.root_key() == Some(root))
    }

    /// Record whose resolved active key is `vk`.
    pub fn select_by_vk(&self, vk: &str) -> Option<&Record> {
        self.records().iter().find(|r| r.active_key() == Some(vk))
    }

    /// Record to authorize against: the one matching `vk` if given, else the
    /// head.
    pub fn select(&self, vk: Option<&str>) -> Option<&Record> {
        match vk {
            Some(vk) => self.select_by_vk(vk),
            None => self.head(),
        }
    }
}

impl EventLog {
    pub fn chain_for_root(&self, root: &str) -> Option<&EventChain> {
        self.0.iter().find(|c| chain_root(c) == Some(root))
    }

    /// Record at `position` counted from the inception event of the chain
    /// started by `root`.
    pub fn record_at(&self, root: &str, position: usize) -> Option<&Record> {
        let chain = self.chain_for_root(root)?;
        let idx = chain.len().checked_sub(position.checked_add(1)?)?;
        chain.get(idx)
    }
}
