use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Identifies one prepared content variant on a row (heads-up view, pulsing view, ...).
///
/// Each presenter reports the flag it needs via `AlertPresenter::content_flag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentFlag(pub u32);

/// Narrow capability over the row that renders an entry.
///
/// The state machine never sees the view itself; it only asks whether the
/// content for a flag is ready, asks for it to be prepared, and releases it
/// once a transfer is abandoned.
pub trait ContentRow: fmt::Debug {
    fn is_content_ready(&self, flag: ContentFlag) -> bool;

    /// Ask the rendering pipeline to prepare content for `flag`.
    /// A `ContentReady` entry event follows once it is done.
    fn request_content(&self, flag: ContentFlag);

    /// Tear down content prepared for `flag`. Must be idempotent.
    fn release_content(&self, flag: ContentFlag);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Summary,
    Child,
}

/// Which member of a group is allowed to alert on behalf of the group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupAlertBehavior {
    /// Summary and children alert as they arrive.
    #[default]
    All,
    /// Only the summary alerts for the group.
    Summary,
    /// Only children alert; the summary stays quiet.
    Children,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Whether the notification may alert at all.
    pub can_alert: bool,
    pub group_alert: GroupAlertBehavior,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            can_alert: true,
            group_alert: GroupAlertBehavior::All,
        }
    }
}

impl AlertPolicy {
    pub fn new(group_alert: GroupAlertBehavior) -> Self {
        Self {
            can_alert: true,
            group_alert,
        }
    }

    pub fn silent() -> Self {
        Self {
            can_alert: false,
            group_alert: GroupAlertBehavior::All,
        }
    }

    /// The group's alert normally goes out through the summary.
    #[inline]
    pub fn routes_through_summary(&self) -> bool {
        self.can_alert && self.group_alert != GroupAlertBehavior::Children
    }

    #[inline]
    pub fn only_summary_alerts(&self) -> bool {
        self.can_alert && self.group_alert == GroupAlertBehavior::Summary
    }
}

/// An observed notification entry.
///
/// Entries are created and destroyed by the entry event source; everything
/// here is a cheap clone (the row is shared).
#[derive(Clone, Debug)]
pub struct Entry {
    pub key: String,
    pub group_key: String,
    pub role: Role,
    pub alert_policy: AlertPolicy,
    pub row: Rc<dyn ContentRow>,
}

impl Entry {
    pub fn new(
        key: impl Into<String>,
        group_key: impl Into<String>,
        role: Role,
        alert_policy: AlertPolicy,
        row: Rc<dyn ContentRow>,
    ) -> Self {
        Entry {
            key: key.into(),
            group_key: group_key.into(),
            role,
            alert_policy,
            row,
        }
    }

    #[inline]
    pub fn is_summary(&self) -> bool {
        self.role == Role::Summary
    }

    pub fn membership(&self) -> Membership {
        Membership {
            group_key: self.group_key.clone(),
            role: self.role,
        }
    }
}

/// Group key and role of an entry at some point in time.
///
/// Carried by `EntryEvent::Updated` as the previous state, and recorded on a
/// pending transfer to detect regrouping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Membership {
    pub group_key: String,
    pub role: Role,
}

impl Membership {
    pub fn matches(&self, entry: &Entry) -> bool {
        self.group_key == entry.group_key && self.role == entry.role
    }
}
