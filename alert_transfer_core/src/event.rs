use serde::{Deserialize, Serialize};

use crate::entry::{Entry, Membership};
use crate::presenter::AlertKind;

/// Lifecycle events for notification entries, delivered in arrival order.
#[derive(Clone, Debug)]
pub enum EntryEvent {
    /// Entry is known but its content is still being prepared; `Added` follows.
    PendingAdded(Entry),
    Added(Entry),
    Updated { entry: Entry, previous: Membership },
    Removed(Entry),
    /// Content for the entry (re)finished rendering.
    ContentReady(Entry),
}

impl EntryEvent {
    pub fn entry(&self) -> &Entry {
        match self {
            EntryEvent::PendingAdded(e)
            | EntryEvent::Added(e)
            | EntryEvent::Removed(e)
            | EntryEvent::ContentReady(e) => e,
            EntryEvent::Updated { entry, .. } => entry,
        }
    }
}

/// Group-level changes reported by a `GroupPolicy`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupEvent {
    Created { group_key: String },
    SuppressionChanged { group_key: String, suppressed: bool },
    Removed { group_key: String },
}

/// A change to a presenter's alerting set.
///
/// Presenters report every change, including the ones the state machine
/// caused itself; handling them is idempotent.
#[derive(Clone, Debug)]
pub enum AlertChange {
    Added(Entry),
    Removed(String),
}

/// Why a pending transfer was dropped without alerting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscardReason {
    EntryRemoved,
    Regrouped,
    QuietMode,
    SourceReclaimed,
}

/// Journal record of one transition. Returned by the supervisor so callers
/// can log or assert without re-deriving state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferAction {
    /// Alert moved from `from` to `to` right away.
    Transferred { from: String, to: String, kind: AlertKind },
    /// `from` was released; `to` waits for its content.
    Deferred { from: String, to: String, kind: AlertKind },
    /// A deferred transfer finished on content-ready.
    Completed { key: String, kind: AlertKind },
    /// A transfer was reversed; the summary alert waits for the group to grow.
    SummaryScheduled { group_key: String, kind: AlertKind },
    /// Transfer reversed before completion; prepared content was released.
    Aborted { key: String },
    Discarded { key: String, reason: DiscardReason },
}
