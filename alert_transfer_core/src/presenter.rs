use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::{ContentFlag, Entry};
use crate::event::AlertChange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    HeadsUp,
    AmbientPulse,
}

/// Something that actually shows transient alerts and owns the per-key
/// alerting flag.
///
/// Calls are synchronous: after `remove_notification` returns, `is_alerting`
/// must already report `false`.
pub trait AlertPresenter {
    fn show_notification(&mut self, entry: &Entry);

    /// Re-alert (or quietly refresh) an entry that is already alerting.
    fn update_notification(&mut self, key: &str, alert: bool);

    fn remove_notification(&mut self, key: &str);

    fn is_alerting(&self, key: &str) -> bool;

    /// Content variant the presenter needs before it can show an entry.
    fn content_flag(&self) -> ContentFlag;

    /// Drain alert changes since the last call, oldest first.
    fn take_changes(&mut self) -> Vec<AlertChange>;
}

/// Registered presenters, one per alert kind.
#[derive(Default)]
pub struct Presenters {
    by_kind: BTreeMap<AlertKind, Box<dyn AlertPresenter>>,
}

impl Presenters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a presenter, returning the one it replaces.
    pub fn insert(
        &mut self,
        kind: AlertKind,
        presenter: Box<dyn AlertPresenter>,
    ) -> Option<Box<dyn AlertPresenter>> {
        self.by_kind.insert(kind, presenter)
    }

    pub fn get(&self, kind: AlertKind) -> Option<&dyn AlertPresenter> {
        self.by_kind.get(&kind).map(|p| p.as_ref())
    }

    pub fn get_mut(&mut self, kind: AlertKind) -> Option<&mut (dyn AlertPresenter + 'static)> {
        self.by_kind.get_mut(&kind).map(|p| p.as_mut())
    }

    pub fn is_alerting(&self, kind: AlertKind, key: &str) -> bool {
        self.get(kind).is_some_and(|p| p.is_alerting(key))
    }

    /// First kind (in `AlertKind` order) on which `key` is alerting.
    pub fn alerting_kind(&self, key: &str) -> Option<AlertKind> {
        self.by_kind
            .iter()
            .find(|(_, p)| p.is_alerting(key))
            .map(|(k, _)| *k)
    }

    pub fn is_alerting_anywhere(&self, key: &str) -> bool {
        self.alerting_kind(key).is_some()
    }

    /// Drain every presenter's changes, grouped by kind in `AlertKind` order.
    pub fn take_changes(&mut self) -> Vec<(AlertKind, AlertChange)> {
        let mut out = Vec::new();
        for (kind, p) in self.by_kind.iter_mut() {
            out.extend(p.take_changes().into_iter().map(|c| (*kind, c)));
        }
        out
    }
}
