use std::collections::HashMap;

use serde::Serialize;

use crate::entry::{Entry, Membership};
use crate::presenter::AlertKind;

/// A transfer waiting for its destination's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingTransfer {
    pub source_key: String,
    pub kind: AlertKind,
    /// Destination membership when the transfer was decided.
    pub membership: Membership,
    /// Reversed before completion; kept only to release prepared content.
    pub aborted: bool,
}

impl PendingTransfer {
    pub fn new(source_key: impl Into<String>, destination: &Entry, kind: AlertKind) -> Self {
        Self {
            source_key: source_key.into(),
            kind,
            membership: destination.membership(),
            aborted: false,
        }
    }

    /// Still describes a transfer for `destination` as it is now.
    pub fn is_valid_for(&self, destination: &Entry) -> bool {
        !self.aborted && self.membership.matches(destination)
    }
}

/// Pending transfers keyed by destination key. At most one per destination.
#[derive(Clone, Debug, Default)]
pub struct PendingTransfers {
    by_destination: HashMap<String, PendingTransfer>,
}

impl PendingTransfers {
    pub fn insert(&mut self, destination_key: impl Into<String>, transfer: PendingTransfer) {
        self.by_destination.insert(destination_key.into(), transfer);
    }

    pub fn get(&self, destination_key: &str) -> Option<&PendingTransfer> {
        self.by_destination.get(destination_key)
    }

    pub fn get_mut(&mut self, destination_key: &str) -> Option<&mut PendingTransfer> {
        self.by_destination.get_mut(destination_key)
    }

    pub fn remove(&mut self, destination_key: &str) -> Option<PendingTransfer> {
        self.by_destination.remove(destination_key)
    }

    /// True iff a live (not aborted) transfer targets `destination_key`.
    pub fn is_pending(&self, destination_key: &str) -> bool {
        self.get(destination_key).is_some_and(|t| !t.aborted)
    }

    /// Drop every record naming `key` as source or destination.
    /// Returns the destination keys that were dropped, sorted.
    pub fn discard_involving(&mut self, key: &str) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .by_destination
            .iter()
            .filter(|(dest, t)| dest.as_str() == key || t.source_key == key)
            .map(|(dest, _)| dest.clone())
            .collect();
        for dest in &dropped {
            self.by_destination.remove(dest);
        }
        dropped.sort();
        dropped
    }

    /// Drop every live (not aborted) record.
    /// Returns the destination keys that were dropped, sorted.
    pub fn discard_live(&mut self) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .by_destination
            .iter()
            .filter(|(_, t)| !t.aborted)
            .map(|(dest, _)| dest.clone())
            .collect();
        for dest in &dropped {
            self.by_destination.remove(dest);
        }
        dropped.sort();
        dropped
    }

    pub fn len(&self) -> usize {
        self.by_destination.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_destination.is_empty()
    }

    /// Deterministic ordering: sorted by destination key.
    pub fn sorted(&self) -> Vec<(String, PendingTransfer)> {
        let mut out: Vec<(String, PendingTransfer)> = self
            .by_destination
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}
