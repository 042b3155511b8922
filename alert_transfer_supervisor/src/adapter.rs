//! Reference adapters for the presentation side: an in-memory alert
//! presenter and a row whose content readiness is set by hand.
//!
//! Alerts stay up until something removes them and content is never
//! rendered; readiness flips only when the host says so. Hosts with a real
//! notification shade bring their own `AlertPresenter` and `ContentRow`.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};

use alert_transfer_core::{AlertChange, AlertPresenter, ContentFlag, ContentRow, Entry};

/// Conventional content flags for the two alert kinds.
pub const HEADS_UP_CONTENT: ContentFlag = ContentFlag(1 << 2);
pub const AMBIENT_PULSE_CONTENT: ContentFlag = ContentFlag(1 << 3);

/// Presenter that keeps the alerting set in memory and reports every change.
#[derive(Debug)]
pub struct BasicAlertPresenter {
    content_flag: ContentFlag,
    alerting: BTreeSet<String>,
    changes: Vec<AlertChange>,
    updates: usize,
}

impl BasicAlertPresenter {
    pub fn new(content_flag: ContentFlag) -> Self {
        Self {
            content_flag,
            alerting: BTreeSet::new(),
            changes: Vec::new(),
            updates: 0,
        }
    }

    pub fn heads_up() -> Self {
        Self::new(HEADS_UP_CONTENT)
    }

    pub fn ambient_pulse() -> Self {
        Self::new(AMBIENT_PULSE_CONTENT)
    }

    /// Alerting keys, sorted.
    pub fn alerting_keys(&self) -> Vec<&str> {
        self.alerting.iter().map(String::as_str).collect()
    }

    /// Number of re-alerts of already-alerting entries.
    pub fn update_count(&self) -> usize {
        self.updates
    }
}

impl AlertPresenter for BasicAlertPresenter {
    fn show_notification(&mut self, entry: &Entry) {
        if self.alerting.insert(entry.key.clone()) {
            self.changes.push(AlertChange::Added(entry.clone()));
        }
    }

    fn update_notification(&mut self, key: &str, alert: bool) {
        if alert && self.alerting.contains(key) {
            self.updates += 1;
        }
    }

    fn remove_notification(&mut self, key: &str) {
        if self.alerting.remove(key) {
            self.changes.push(AlertChange::Removed(key.to_string()));
        }
    }

    fn is_alerting(&self, key: &str) -> bool {
        self.alerting.contains(key)
    }

    fn content_flag(&self) -> ContentFlag {
        self.content_flag
    }

    fn take_changes(&mut self) -> Vec<AlertChange> {
        std::mem::take(&mut self.changes)
    }
}

/// Row whose readiness is driven by the host (or a test).
///
/// Requests and releases are recorded so callers can see what the transfer
/// machine asked for.
#[derive(Debug, Default)]
pub struct BasicRow {
    ready: RefCell<HashSet<ContentFlag>>,
    requested: RefCell<Vec<ContentFlag>>,
    released: RefCell<Vec<ContentFlag>>,
}

impl BasicRow {
    /// Row with every flag in `flags` already prepared.
    pub fn ready(flags: &[ContentFlag]) -> Self {
        let row = Self::default();
        row.ready.borrow_mut().extend(flags.iter().copied());
        row
    }

    pub fn set_ready(&self, flag: ContentFlag, ready: bool) {
        let mut set = self.ready.borrow_mut();
        if ready {
            set.insert(flag);
        } else {
            set.remove(&flag);
        }
    }

    pub fn requested(&self) -> Vec<ContentFlag> {
        self.requested.borrow().clone()
    }

    pub fn released(&self) -> Vec<ContentFlag> {
        self.released.borrow().clone()
    }
}

impl ContentRow for BasicRow {
    fn is_content_ready(&self, flag: ContentFlag) -> bool {
        self.ready.borrow().contains(&flag)
    }

    fn request_content(&self, flag: ContentFlag) {
        self.requested.borrow_mut().push(flag);
    }

    fn release_content(&self, flag: ContentFlag) {
        self.ready.borrow_mut().remove(&flag);
        self.released.borrow_mut().push(flag);
    }
}
