//! Alert-ownership transfer between a group summary and its children.
//!
//! Exactly one member of a group should be alerting, and it should be the
//! one that matches the group's current suppression state. The machine moves
//! the alert when suppression flips, defers the move while the destination's
//! content is still rendering, and freezes all new moves in quiet mode.
//!
//! All calls happen on one control thread; collaborators are borrowed per
//! call through [`Collaborators`].

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::cfg::{Clock, SystemClock, TransferCfg};
use crate::entry::{Entry, Membership, Role};
use crate::event::{AlertChange, DiscardReason, EntryEvent, GroupEvent, TransferAction};
use crate::groups::GroupPolicy;
use crate::pending::{PendingTransfer, PendingTransfers};
use crate::presenter::{AlertKind, Presenters};
use crate::state::{GroupAlertState, ScheduledAlert};

/// Borrowed view of the external collaborators for one call.
pub struct Collaborators<'a> {
    pub groups: &'a dyn GroupPolicy,
    pub presenters: &'a mut Presenters,
}

/// Outcome of trying to alert an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Delivery {
    Shown,
    Deferred,
    NoPresenter,
}

pub struct TransferStateMachine {
    cfg: TransferCfg,
    clock: Box<dyn Clock>,
    quiet: bool,
    pending: PendingTransfers,
    group_states: HashMap<String, GroupAlertState>,
    /// Entries reported as pending-added but not yet added.
    inflating: HashMap<String, Entry>,
    journal: Vec<TransferAction>,
}

impl Default for TransferStateMachine {
    fn default() -> Self {
        Self::new(TransferCfg::default())
    }
}

impl TransferStateMachine {
    pub fn new(cfg: TransferCfg) -> Self {
        Self::with_clock(cfg, SystemClock)
    }

    pub fn with_clock(cfg: TransferCfg, clock: impl Clock + 'static) -> Self {
        Self {
            cfg,
            clock: Box::new(clock),
            quiet: false,
            pending: PendingTransfers::default(),
            group_states: HashMap::new(),
            inflating: HashMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn cfg(&self) -> &TransferCfg {
        &self.cfg
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// True iff a live transfer names `entry_key` as its destination.
    pub fn is_alert_transfer_pending(&self, entry_key: &str) -> bool {
        self.pending.is_pending(entry_key)
    }

    pub fn pending(&self) -> &PendingTransfers {
        &self.pending
    }

    pub fn group_state(&self, group_key: &str) -> Option<&GroupAlertState> {
        self.group_states.get(group_key)
    }

    /// Group states sorted by group key.
    pub fn group_states_sorted(&self) -> Vec<(String, GroupAlertState)> {
        let mut out: Vec<(String, GroupAlertState)> = self
            .group_states
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Drain the transitions recorded since the last call.
    pub fn take_actions(&mut self) -> Vec<TransferAction> {
        std::mem::take(&mut self.journal)
    }

    /// Quiet mode gates future decisions; nothing already shown moves.
    /// Entering it voids every live transfer. Reversed ones are kept so
    /// their prepared content is still released.
    pub fn on_dozing_changed(&mut self, dozing: bool) {
        if self.quiet != dozing {
            for state in self.group_states.values_mut() {
                state.reset();
            }
            debug!(dozing, "quiet mode changed");
        }
        self.quiet = dozing;
        if dozing {
            for dest in self.pending.discard_live() {
                self.discarded(&dest, DiscardReason::QuietMode);
            }
        }
    }

    pub fn on_entry_event(&mut self, event: &EntryEvent, ctx: &mut Collaborators<'_>) {
        match event {
            EntryEvent::PendingAdded(entry) => {
                self.inflating.insert(entry.key.clone(), entry.clone());
                if entry.role == Role::Child {
                    self.check_should_transfer_back(&entry.group_key, ctx);
                }
            }
            EntryEvent::Added(entry) => {
                self.inflating.remove(&entry.key);
            }
            EntryEvent::Updated { entry, previous } => {
                if let Some(inflating) = self.inflating.get_mut(&entry.key) {
                    *inflating = entry.clone();
                }
                if !previous.matches(entry) {
                    self.on_entry_group_changed(entry, previous);
                }
            }
            EntryEvent::Removed(entry) => self.on_entry_removed(entry),
            EntryEvent::ContentReady(entry) => self.on_entry_content_ready(entry, ctx),
        }
    }

    pub fn on_group_event(&mut self, event: &GroupEvent, ctx: &mut Collaborators<'_>) {
        match event {
            GroupEvent::Created { group_key } => {
                self.group_states.entry(group_key.clone()).or_default();
            }
            GroupEvent::Removed { group_key } => {
                self.group_states.remove(group_key);
            }
            GroupEvent::SuppressionChanged {
                group_key,
                suppressed,
            } => self.on_group_suppression_changed(group_key, *suppressed, ctx),
        }
    }

    pub fn on_alert_changed(
        &mut self,
        kind: AlertKind,
        change: &AlertChange,
        ctx: &mut Collaborators<'_>,
    ) {
        match change {
            AlertChange::Added(entry) => {
                let groups = ctx.groups;
                if !entry.is_summary() || !groups.is_group_suppressed(&entry.group_key) {
                    return;
                }
                if let Some(summary) = groups
                    .group_summary(&entry.group_key)
                    .filter(|s| s.key == entry.key)
                {
                    self.handle_suppressed_summary_alerted(summary, kind, ctx);
                }
            }
            AlertChange::Removed(key) => {
                trace!(key = %key, ?kind, "alert removed");
            }
        }
    }

    pub fn on_group_suppression_changed(
        &mut self,
        group_key: &str,
        suppressed: bool,
        ctx: &mut Collaborators<'_>,
    ) {
        let groups = ctx.groups;
        // No summary: the group lost it, nothing can move.
        let Some(summary) = groups.group_summary(group_key) else {
            trace!(group_key, "suppression changed for group without summary");
            return;
        };

        if suppressed {
            if let Some(kind) = ctx.presenters.alerting_kind(&summary.key) {
                self.handle_suppressed_summary_alerted(summary, kind, ctx);
            }
            return;
        }

        if self.quiet {
            trace!(group_key, "quiet mode, summary keeps its state");
            return;
        }

        let scheduled = self
            .group_states
            .get_mut(group_key)
            .and_then(|s| s.alert_summary_on_next_addition.take());
        match scheduled {
            Some(ScheduledAlert { kind, source_key }) => {
                if !ctx.presenters.is_alerting(kind, &summary.key) {
                    let delivery = self.alert_when_possible(summary, &source_key, kind, ctx);
                    self.record_delivery(delivery, &source_key, &summary.key, kind);
                }
            }
            None => self.check_should_transfer_back(group_key, ctx),
        }
    }

    pub fn on_entry_content_ready(&mut self, entry: &Entry, ctx: &mut Collaborators<'_>) {
        let Some(transfer) = self.pending.remove(&entry.key) else {
            trace!(key = %entry.key, "content ready, no transfer pending");
            return;
        };
        let flag = ctx
            .presenters
            .get(transfer.kind)
            .map(|p| p.content_flag());
        let release = |entry: &Entry| {
            if let Some(flag) = flag {
                entry.row.release_content(flag);
            }
        };

        if transfer.aborted {
            release(entry);
            debug!(key = %entry.key, "reversed transfer, released prepared content");
            self.journal.push(TransferAction::Aborted {
                key: entry.key.clone(),
            });
            return;
        }
        if !transfer.is_valid_for(entry) {
            release(entry);
            self.discarded(&entry.key, DiscardReason::Regrouped);
            return;
        }
        if self.quiet {
            self.discarded(&entry.key, DiscardReason::QuietMode);
            return;
        }
        if ctx
            .presenters
            .is_alerting(transfer.kind, &transfer.source_key)
        {
            release(entry);
            self.discarded(&entry.key, DiscardReason::SourceReclaimed);
            return;
        }

        match self.alert_when_possible(entry, &transfer.source_key, transfer.kind, ctx) {
            Delivery::Shown => {
                debug!(key = %entry.key, kind = ?transfer.kind, "deferred transfer completed");
                self.journal.push(TransferAction::Completed {
                    key: entry.key.clone(),
                    kind: transfer.kind,
                });
            }
            Delivery::Deferred => {
                trace!(key = %entry.key, "content still not ready, transfer stays pending");
            }
            Delivery::NoPresenter => {}
        }
    }

    pub fn on_entry_removed(&mut self, entry: &Entry) {
        self.inflating.remove(&entry.key);
        for dest in self.pending.discard_involving(&entry.key) {
            self.discarded(&dest, DiscardReason::EntryRemoved);
        }
    }

    /// A transfer decided for the old grouping is void once membership moves.
    pub fn on_entry_group_changed(&mut self, entry: &Entry, previous: &Membership) {
        let dropped = self.pending.discard_involving(&entry.key);
        if !dropped.is_empty() {
            debug!(
                key = %entry.key,
                from = %previous.group_key,
                to = %entry.group_key,
                "membership changed"
            );
        }
        for dest in dropped {
            self.discarded(&dest, DiscardReason::Regrouped);
        }
    }

    fn handle_suppressed_summary_alerted(
        &mut self,
        summary: &Entry,
        kind: AlertKind,
        ctx: &mut Collaborators<'_>,
    ) {
        if self.quiet {
            trace!(key = %summary.key, "quiet mode, summary keeps its alert");
            return;
        }
        let groups = ctx.groups;
        let group_key = summary.group_key.as_str();
        if !groups.is_group_suppressed(group_key) || !ctx.presenters.is_alerting(kind, &summary.key)
        {
            return;
        }
        if self.pending_children_will_join(group_key, groups) {
            debug!(group_key, "children still inflating, summary keeps its alert");
            return;
        }
        let Some(child) = groups
            .group_children(group_key)
            .into_iter()
            .find(|c| c.alert_policy.routes_through_summary())
        else {
            return;
        };

        if !ctx.presenters.is_alerting(kind, &child.key) && summary.alert_policy.only_summary_alerts()
        {
            let now = self.clock.now();
            self.group_states
                .entry(group_key.to_string())
                .or_default()
                .last_transfer_at = Some(now);
        }

        // Source is released before the destination is touched.
        if let Some(presenter) = ctx.presenters.get_mut(kind) {
            presenter.remove_notification(&summary.key);
        }
        let delivery = self.alert_when_possible(child, &summary.key, kind, ctx);
        self.record_delivery(delivery, &summary.key, &child.key, kind);
    }

    fn check_should_transfer_back(&mut self, group_key: &str, ctx: &mut Collaborators<'_>) {
        if self.quiet {
            trace!(group_key, "quiet mode, no transfer back");
            return;
        }
        let groups = ctx.groups;
        let Some(summary) = groups.group_summary(group_key) else {
            return;
        };
        if !summary.alert_policy.only_summary_alerts() {
            return;
        }
        let window = self.cfg.transfer_back_window();
        let within = match self.group_states.get(group_key) {
            Some(state) => state.within_window(window, self.clock.now()),
            None => window.is_none(),
        };
        if !within {
            trace!(group_key, "outside transfer-back window");
            return;
        }

        let children = groups.group_children(group_key);
        let pending_children = self.pending_children_not_alerting(group_key, &children, ctx.presenters);
        if children.len() + pending_children <= 1 {
            return;
        }

        let mut released: Option<(AlertKind, String)> = None;
        for child in &children {
            if child.alert_policy.only_summary_alerts() {
                if let Some(kind) = ctx.presenters.alerting_kind(&child.key) {
                    if let Some(presenter) = ctx.presenters.get_mut(kind) {
                        presenter.remove_notification(&child.key);
                    }
                    released = Some((kind, child.key.clone()));
                }
            }
            if let Some(transfer) = self.pending.get_mut(&child.key).filter(|t| !t.aborted) {
                // The child that would have alerted once inflated.
                transfer.aborted = true;
                debug!(key = %child.key, "pending transfer aborted");
                released = Some((transfer.kind, child.key.clone()));
            }
        }

        let Some((kind, source_key)) = released else {
            return;
        };
        if ctx.presenters.is_alerting(kind, &summary.key) {
            return;
        }

        let notify_now = children.len() > 1;
        {
            let state = self.group_states.entry(group_key.to_string()).or_default();
            state.last_transfer_at = None;
            if !notify_now {
                state.alert_summary_on_next_addition = Some(ScheduledAlert {
                    kind,
                    source_key: source_key.clone(),
                });
            }
        }

        if notify_now {
            let delivery = self.alert_when_possible(summary, &source_key, kind, ctx);
            self.record_delivery(delivery, &source_key, &summary.key, kind);
        } else {
            debug!(group_key, "summary alert waits for the group to grow");
            self.journal.push(TransferAction::SummaryScheduled {
                group_key: group_key.to_string(),
                kind,
            });
        }
    }

    /// Show `entry` on `kind` now, or record a pending transfer and ask for
    /// its content.
    fn alert_when_possible(
        &mut self,
        entry: &Entry,
        source_key: &str,
        kind: AlertKind,
        ctx: &mut Collaborators<'_>,
    ) -> Delivery {
        let Some(presenter) = ctx.presenters.get_mut(kind) else {
            trace!(?kind, "no presenter registered");
            return Delivery::NoPresenter;
        };
        let flag = presenter.content_flag();
        if !entry.row.is_content_ready(flag) {
            self.pending
                .insert(entry.key.clone(), PendingTransfer::new(source_key, entry, kind));
            if self.cfg.request_content_on_defer {
                entry.row.request_content(flag);
            }
            return Delivery::Deferred;
        }
        if presenter.is_alerting(&entry.key) {
            presenter.update_notification(&entry.key, true);
        } else {
            presenter.show_notification(entry);
        }
        // Any earlier record for this destination is settled now.
        self.pending.remove(&entry.key);
        Delivery::Shown
    }

    fn record_delivery(&mut self, delivery: Delivery, from: &str, to: &str, kind: AlertKind) {
        let (from, to) = (from.to_string(), to.to_string());
        match delivery {
            Delivery::Shown => {
                debug!(%from, %to, ?kind, "alert transferred");
                self.journal
                    .push(TransferAction::Transferred { from, to, kind });
            }
            Delivery::Deferred => {
                debug!(%from, %to, ?kind, "alert transfer deferred until content is ready");
                self.journal.push(TransferAction::Deferred { from, to, kind });
            }
            Delivery::NoPresenter => {}
        }
    }

    fn discarded(&mut self, key: &str, reason: DiscardReason) {
        debug!(key, ?reason, "pending transfer discarded");
        self.journal.push(TransferAction::Discarded {
            key: key.to_string(),
            reason,
        });
    }

    fn inflating_children<'e>(
        &'e self,
        group_key: &'e str,
        known: &'e [&'e Entry],
    ) -> impl Iterator<Item = &'e Entry> + 'e {
        self.inflating.values().filter(move |e| {
            e.role == Role::Child
                && e.group_key == group_key
                && !known.iter().any(|k| k.key == e.key)
        })
    }

    fn pending_children_will_join(&self, group_key: &str, groups: &dyn GroupPolicy) -> bool {
        let children = groups.group_children(group_key);
        let joining = self.inflating_children(group_key, &children).next().is_some();
        joining
    }

    fn pending_children_not_alerting(
        &self,
        group_key: &str,
        children: &[&Entry],
        presenters: &Presenters,
    ) -> usize {
        self.inflating_children(group_key, children)
            .filter(|e| !presenters.is_alerting_anywhere(&e.key))
            .count()
    }
}
