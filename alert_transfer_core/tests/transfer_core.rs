use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Duration;

use alert_transfer_core::*;

const FLAG: ContentFlag = ContentFlag(4);

#[derive(Debug, Default)]
struct Row {
    ready: Cell<bool>,
    requests: Cell<u32>,
    releases: Cell<u32>,
}

impl ContentRow for Row {
    fn is_content_ready(&self, _flag: ContentFlag) -> bool {
        self.ready.get()
    }
    fn request_content(&self, _flag: ContentFlag) {
        self.requests.set(self.requests.get() + 1);
    }
    fn release_content(&self, _flag: ContentFlag) {
        self.releases.set(self.releases.get() + 1);
    }
}

#[derive(Default)]
struct Presenter {
    alerting: BTreeSet<String>,
    updates: Rc<Cell<u32>>,
}

impl AlertPresenter for Presenter {
    fn show_notification(&mut self, entry: &Entry) {
        self.alerting.insert(entry.key.clone());
    }
    fn update_notification(&mut self, _key: &str, _alert: bool) {
        self.updates.set(self.updates.get() + 1);
    }
    fn remove_notification(&mut self, key: &str) {
        self.alerting.remove(key);
    }
    fn is_alerting(&self, key: &str) -> bool {
        self.alerting.contains(key)
    }
    fn content_flag(&self) -> ContentFlag {
        FLAG
    }
    fn take_changes(&mut self) -> Vec<AlertChange> {
        Vec::new()
    }
}

/// One fixed group: a summary and whatever children the test sets.
struct FixedGroup {
    summary: Entry,
    children: Vec<Entry>,
    suppressed: bool,
}

impl GroupPolicy for FixedGroup {
    fn observe(&mut self, _event: &EntryEvent) -> Vec<GroupEvent> {
        Vec::new()
    }
    fn is_group_suppressed(&self, group_key: &str) -> bool {
        group_key == self.summary.group_key && self.suppressed
    }
    fn group_summary(&self, group_key: &str) -> Option<&Entry> {
        (group_key == self.summary.group_key).then_some(&self.summary)
    }
    fn group_children(&self, group_key: &str) -> Vec<&Entry> {
        if group_key == self.summary.group_key {
            self.children.iter().collect()
        } else {
            Vec::new()
        }
    }
}

fn entry(key: &str, role: Role, behavior: GroupAlertBehavior, row: &Rc<Row>) -> Entry {
    Entry::new(key, "g", role, AlertPolicy::new(behavior), row.clone())
}

fn ready_row() -> Rc<Row> {
    let row = Rc::new(Row::default());
    row.ready.set(true);
    row
}

fn presenters_with_alert(key: &str) -> Presenters {
    let mut p = Presenter::default();
    p.alerting.insert(key.to_string());
    let mut presenters = Presenters::new();
    presenters.insert(AlertKind::HeadsUp, Box::new(p));
    presenters
}

#[test]
fn alert_policy_routing() {
    assert!(AlertPolicy::default().routes_through_summary());
    assert!(!AlertPolicy::default().only_summary_alerts());
    assert!(AlertPolicy::new(GroupAlertBehavior::Summary).only_summary_alerts());
    assert!(!AlertPolicy::new(GroupAlertBehavior::Children).routes_through_summary());
    assert!(!AlertPolicy::silent().routes_through_summary());
}

#[test]
fn pending_transfers_discard_by_source_or_destination() {
    let row = ready_row();
    let a = entry("a", Role::Child, GroupAlertBehavior::All, &row);
    let b = entry("b", Role::Child, GroupAlertBehavior::All, &row);

    let mut pending = PendingTransfers::default();
    pending.insert("a", PendingTransfer::new("summary", &a, AlertKind::HeadsUp));
    pending.insert("b", PendingTransfer::new("a", &b, AlertKind::HeadsUp));
    assert_eq!(pending.len(), 2);

    assert_eq!(pending.discard_involving("a"), vec!["a".to_string(), "b".to_string()]);
    assert!(pending.is_empty());
    assert!(pending.discard_involving("missing").is_empty());
}

#[test]
fn aborted_transfer_is_not_reported_pending() {
    let row = ready_row();
    let a = entry("a", Role::Child, GroupAlertBehavior::All, &row);
    let mut pending = PendingTransfers::default();
    pending.insert("a", PendingTransfer::new("s", &a, AlertKind::HeadsUp));
    assert!(pending.is_pending("a"));

    if let Some(t) = pending.get_mut("a") {
        t.aborted = true;
    }
    assert!(!pending.is_pending("a"));
    assert!(pending.get("a").is_some());
}

#[test]
fn transfer_validity_tracks_membership() {
    let row = ready_row();
    let a = entry("a", Role::Child, GroupAlertBehavior::All, &row);
    let t = PendingTransfer::new("s", &a, AlertKind::HeadsUp);
    assert!(t.is_valid_for(&a));

    let mut moved = a.clone();
    moved.group_key = "other".to_string();
    assert!(!t.is_valid_for(&moved));

    let mut promoted = a.clone();
    promoted.role = Role::Summary;
    assert!(!t.is_valid_for(&promoted));
}

#[test]
fn transfer_back_window() {
    let clock = ManualClock::new();
    let mut state = GroupAlertState::default();
    assert!(state.within_window(None, clock.now()));
    assert!(!state.within_window(Some(Duration::from_millis(300)), clock.now()));

    state.last_transfer_at = Some(clock.now());
    clock.advance(Duration::from_millis(299));
    assert!(state.within_window(Some(Duration::from_millis(300)), clock.now()));
    clock.advance(Duration::from_millis(1));
    assert!(!state.within_window(Some(Duration::from_millis(300)), clock.now()));

    state.reset();
    assert!(state.last_transfer_at.is_none());
}

#[test]
fn cfg_defaults_and_partial_json() {
    let cfg = TransferCfg::default();
    assert_eq!(cfg.transfer_back_window(), None);
    assert!(cfg.request_content_on_defer);

    let cfg: TransferCfg = serde_json::from_str(r#"{"transfer_back_window_ms": 300}"#).unwrap();
    assert_eq!(cfg.transfer_back_window(), Some(Duration::from_millis(300)));
    assert!(cfg.request_content_on_defer);
}

#[test]
fn suppressed_summary_moves_to_ready_child() {
    let row = ready_row();
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::All, &row),
        children: vec![entry("c", Role::Child, GroupAlertBehavior::All, &row)],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert_eq!(
        machine.take_actions(),
        vec![TransferAction::Transferred {
            from: "s".to_string(),
            to: "c".to_string(),
            kind: AlertKind::HeadsUp,
        }]
    );
}

#[test]
fn deferred_transfer_requests_content_once() {
    let ready = ready_row();
    let child_row = Rc::new(Row::default());
    let child = Entry::new("c", "g", Role::Child, AlertPolicy::default(), child_row.clone());
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::All, &ready),
        children: vec![child.clone()],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(machine.is_alert_transfer_pending("c"));
    assert_eq!(child_row.requests.get(), 1);

    child_row.ready.set(true);
    machine.on_entry_content_ready(
        &child,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );
    assert!(presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(!machine.is_alert_transfer_pending("c"));
    assert_eq!(child_row.releases.get(), 0);
}

#[test]
fn content_ready_without_pending_transfer_is_noop() {
    let row = ready_row();
    let child = entry("c", Role::Child, GroupAlertBehavior::All, &row);
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::All, &row),
        children: vec![child.clone()],
        suppressed: false,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();

    machine.on_entry_content_ready(
        &child,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(machine.take_actions().is_empty());
    assert_eq!(row.releases.get(), 0);
}

#[test]
fn quiet_mode_freezes_forward_transfer() {
    let row = ready_row();
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::All, &row),
        children: vec![entry("c", Role::Child, GroupAlertBehavior::All, &row)],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();
    machine.on_dozing_changed(true);
    assert!(machine.is_quiet());

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(machine.take_actions().is_empty());
}

#[test]
fn children_only_child_is_not_a_transfer_target() {
    let row = ready_row();
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::All, &row),
        children: vec![entry("c", Role::Child, GroupAlertBehavior::Children, &row)],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "c"));
}

#[test]
fn summary_only_transfer_starts_window() {
    let row = ready_row();
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::Summary, &row),
        children: vec![entry("c", Role::Child, GroupAlertBehavior::Summary, &row)],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::with_clock(TransferCfg::default(), ManualClock::new());
    assert_eq!(machine.cfg().transfer_back_window(), None);
    assert!(machine.group_state("g").is_none());

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(machine
        .group_state("g")
        .is_some_and(|state| state.last_transfer_at.is_some()));
}

#[test]
fn already_alerting_child_is_updated_not_shown_again() {
    let row = ready_row();
    let groups = FixedGroup {
        summary: entry("s", Role::Summary, GroupAlertBehavior::Summary, &row),
        children: vec![entry("c", Role::Child, GroupAlertBehavior::Summary, &row)],
        suppressed: true,
    };
    let updates = Rc::new(Cell::new(0));
    let mut presenter = Presenter {
        updates: updates.clone(),
        ..Presenter::default()
    };
    presenter.alerting.insert("s".to_string());
    presenter.alerting.insert("c".to_string());
    let mut presenters = Presenters::new();
    presenters.insert(AlertKind::HeadsUp, Box::new(presenter));
    let mut machine = TransferStateMachine::default();

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert_eq!(updates.get(), 1);
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(presenters.is_alerting(AlertKind::HeadsUp, "c"));
    // The child was already alerting, so no window starts.
    assert!(machine
        .group_state("g")
        .map_or(true, |state| state.last_transfer_at.is_none()));
    assert_eq!(
        machine.take_actions(),
        vec![TransferAction::Transferred {
            from: "s".to_string(),
            to: "c".to_string(),
            kind: AlertKind::HeadsUp,
        }]
    );
}

#[test]
fn summary_shown_again_before_content_ready_releases_child() {
    let ready = ready_row();
    let child_row = Rc::new(Row::default());
    let summary = entry("s", Role::Summary, GroupAlertBehavior::All, &ready);
    let child = Entry::new("c", "g", Role::Child, AlertPolicy::default(), child_row.clone());
    let groups = FixedGroup {
        summary: summary.clone(),
        children: vec![child.clone()],
        suppressed: true,
    };
    let mut presenters = presenters_with_alert("s");
    let mut machine = TransferStateMachine::default();

    machine.on_group_suppression_changed(
        "g",
        true,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );
    assert!(machine.is_alert_transfer_pending("c"));
    machine.take_actions();

    if let Some(presenter) = presenters.get_mut(AlertKind::HeadsUp) {
        presenter.show_notification(&summary);
    }
    child_row.ready.set(true);
    machine.on_entry_content_ready(
        &child,
        &mut Collaborators { groups: &groups, presenters: &mut presenters },
    );

    assert!(presenters.is_alerting(AlertKind::HeadsUp, "s"));
    assert!(!presenters.is_alerting(AlertKind::HeadsUp, "c"));
    assert!(!machine.is_alert_transfer_pending("c"));
    assert_eq!(child_row.releases.get(), 1);
    assert_eq!(
        machine.take_actions(),
        vec![TransferAction::Discarded {
            key: "c".to_string(),
            reason: DiscardReason::SourceReclaimed,
        }]
    );
}

#[test]
fn quiet_mode_keeps_reversed_transfers_for_release() {
    let row = ready_row();
    let a = entry("a", Role::Child, GroupAlertBehavior::All, &row);
    let b = entry("b", Role::Child, GroupAlertBehavior::All, &row);
    let mut pending = PendingTransfers::default();
    pending.insert("a", PendingTransfer::new("s", &a, AlertKind::HeadsUp));
    pending.insert("b", PendingTransfer::new("s", &b, AlertKind::HeadsUp));
    if let Some(t) = pending.get_mut("b") {
        t.aborted = true;
    }

    assert_eq!(pending.discard_live(), vec!["a".to_string()]);
    assert!(pending.get("a").is_none());
    assert!(pending.get("b").is_some());
}
