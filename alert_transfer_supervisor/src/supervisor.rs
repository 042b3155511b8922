//! Composition root around `TransferStateMachine`.
//!
//! - owns the presenters (one per alert kind) and the group policy
//! - drains the entry event channel in arrival order
//! - feeds group changes and presenter changes back into the machine until
//!   nothing else moves
//!
//! No IO. No async. Everything runs on the caller's thread.

use std::sync::mpsc::{Receiver, TryRecvError};

use alert_transfer_core::{
    AlertKind, AlertPresenter, Collaborators, EntryEvent, GroupPolicy, PendingTransfer,
    Presenters, ScheduledAlert, TransferAction, TransferCfg, TransferError, TransferStateMachine,
};
use tracing::{debug, trace, warn};

/// Per-group view in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct GroupSnapshot {
    pub group_key: String,
    /// A forward transfer happened and may still be reversed.
    pub transfer_recent: bool,
    pub scheduled_summary: Option<ScheduledAlert>,
}

/// Debug view of the transfer bookkeeping.
///
/// Pure data: callers decide where (and whether) to dump it.
/// Deterministic ordering: pending transfers by destination key, groups by key.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TransferSnapshot {
    pub quiet: bool,
    pub pending: Vec<(String, PendingTransfer)>,
    pub groups: Vec<GroupSnapshot>,
}

struct Binding {
    events: Receiver<EntryEvent>,
    groups: Box<dyn GroupPolicy>,
}

pub struct TransferSupervisor {
    machine: TransferStateMachine,
    presenters: Presenters,
    binding: Option<Binding>,
}

impl Default for TransferSupervisor {
    fn default() -> Self {
        Self::new(TransferCfg::default())
    }
}

impl TransferSupervisor {
    pub fn new(cfg: TransferCfg) -> Self {
        Self::with_machine(TransferStateMachine::new(cfg))
    }

    pub fn with_machine(machine: TransferStateMachine) -> Self {
        Self {
            machine,
            presenters: Presenters::new(),
            binding: None,
        }
    }

    /// Register the presenter for `kind`, returning the one it replaces.
    pub fn set_alert_presenter(
        &mut self,
        kind: AlertKind,
        presenter: impl AlertPresenter + 'static,
    ) -> Option<Box<dyn AlertPresenter>> {
        self.presenters.insert(kind, Box::new(presenter))
    }

    /// Wire the entry event stream and the group policy. Exactly once.
    pub fn bind(
        &mut self,
        events: Receiver<EntryEvent>,
        groups: impl GroupPolicy + 'static,
    ) -> Result<(), TransferError> {
        if self.binding.is_some() {
            warn!("bind called twice");
            return Err(TransferError::AlreadyBound);
        }
        self.binding = Some(Binding {
            events,
            groups: Box::new(groups),
        });
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn on_dozing_changed(&mut self, dozing: bool) {
        self.machine.on_dozing_changed(dozing);
    }

    pub fn is_alert_transfer_pending(&self, entry_key: &str) -> bool {
        self.machine.is_alert_transfer_pending(entry_key)
    }

    pub fn presenter(&self, kind: AlertKind) -> Option<&dyn AlertPresenter> {
        self.presenters.get(kind)
    }

    /// Direct access for hosts that show or dismiss alerts themselves.
    /// Changes made here are picked up by the next `pump`.
    pub fn presenter_mut(&mut self, kind: AlertKind) -> Option<&mut (dyn AlertPresenter + 'static)> {
        self.presenters.get_mut(kind)
    }

    pub fn group_policy(&self) -> Option<&dyn GroupPolicy> {
        self.binding.as_ref().map(|b| b.groups.as_ref())
    }

    pub fn machine(&self) -> &TransferStateMachine {
        &self.machine
    }

    /// Process everything queued so far and return the transitions taken.
    ///
    /// Deterministic for a given event order: each entry event is handled to
    /// quiescence before the next one is read.
    pub fn pump(&mut self) -> Result<Vec<TransferAction>, TransferError> {
        let Self {
            machine,
            presenters,
            binding,
        } = self;
        let Some(binding) = binding.as_mut() else {
            warn!("pump called before bind");
            return Err(TransferError::NotBound);
        };

        // Alerts shown or dismissed by the host since the last pump.
        settle_alerts(machine, presenters, binding.groups.as_ref());

        loop {
            let event = match binding.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("entry event source disconnected");
                    break;
                }
            };
            process_entry_event(machine, presenters, binding.groups.as_mut(), &event);
        }

        Ok(machine.take_actions())
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            quiet: self.machine.is_quiet(),
            pending: self.machine.pending().sorted(),
            groups: self
                .machine
                .group_states_sorted()
                .into_iter()
                .map(|(group_key, state)| GroupSnapshot {
                    group_key,
                    transfer_recent: state.last_transfer_at.is_some(),
                    scheduled_summary: state.alert_summary_on_next_addition,
                })
                .collect(),
        }
    }
}

/// Entry event first reaches the machine (bookkeeping), then the group
/// policy; the group changes it causes are replayed one by one.
fn process_entry_event(
    machine: &mut TransferStateMachine,
    presenters: &mut Presenters,
    groups: &mut dyn GroupPolicy,
    event: &EntryEvent,
) {
    trace!(key = %event.entry().key, "entry event");
    machine.on_entry_event(
        event,
        &mut Collaborators {
            groups: &*groups,
            presenters: &mut *presenters,
        },
    );
    settle_alerts(machine, presenters, &*groups);

    let group_events = groups.observe(event);
    for group_event in &group_events {
        machine.on_group_event(
            group_event,
            &mut Collaborators {
                groups: &*groups,
                presenters: &mut *presenters,
            },
        );
        settle_alerts(machine, presenters, &*groups);
    }
}

/// Feed presenter changes back until none are left.
fn settle_alerts(
    machine: &mut TransferStateMachine,
    presenters: &mut Presenters,
    groups: &dyn GroupPolicy,
) {
    loop {
        let changes = presenters.take_changes();
        if changes.is_empty() {
            break;
        }
        for (kind, change) in &changes {
            machine.on_alert_changed(
                *kind,
                change,
                &mut Collaborators {
                    groups,
                    presenters: &mut *presenters,
                },
            );
        }
    }
}
