use std::time::{Duration, Instant};

use serde::Serialize;

use crate::presenter::AlertKind;

/// A summary alert postponed until the group grows, and the child it was
/// taken from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledAlert {
    pub kind: AlertKind,
    pub source_key: String,
}

/// Per-group transfer bookkeeping that outlives a single event.
#[derive(Clone, Debug, Default)]
pub struct GroupAlertState {
    /// When the summary last handed its alert to a summary-only child.
    pub last_transfer_at: Option<Instant>,
    /// Summary alert postponed until the group actually grows.
    pub alert_summary_on_next_addition: Option<ScheduledAlert>,
}

impl GroupAlertState {
    #[inline]
    pub fn reset(&mut self) {
        self.last_transfer_at = None;
        self.alert_summary_on_next_addition = None;
    }

    /// Whether a back-transfer is still allowed at `now`.
    pub fn within_window(&self, window: Option<Duration>, now: Instant) -> bool {
        match window {
            None => true,
            Some(w) => self
                .last_transfer_at
                .is_some_and(|t| now.saturating_duration_since(t) < w),
        }
    }
}
