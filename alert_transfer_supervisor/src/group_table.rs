//! Reference `GroupPolicy`: in-memory membership with the plain
//! "summary plus exactly one child" suppression rule.
//!
//! Hosts with real grouping policy implement `GroupPolicy` themselves; this
//! one is enough to drive the transfer machine end to end.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use alert_transfer_core::{Entry, EntryEvent, GroupEvent, GroupPolicy, Role};

#[derive(Debug, Default)]
struct GroupMembers {
    summary: Option<String>,
    children: BTreeSet<String>,
    /// Last verdict reported to observers.
    suppressed: bool,
}

impl GroupMembers {
    fn verdict(&self) -> bool {
        self.summary.is_some() && self.children.len() == 1
    }

    fn is_empty(&self) -> bool {
        self.summary.is_none() && self.children.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct GroupTable {
    entries: HashMap<String, Entry>,
    groups: BTreeMap<String, GroupMembers>,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    fn detach(&mut self, key: &str, touched: &mut Vec<String>) {
        let Some(old) = self.entries.remove(key) else {
            return;
        };
        if let Some(members) = self.groups.get_mut(&old.group_key) {
            if members.summary.as_deref() == Some(key) {
                members.summary = None;
            }
            members.children.remove(key);
        }
        touched.push(old.group_key);
    }

    fn attach(&mut self, entry: &Entry, touched: &mut Vec<String>, out: &mut Vec<GroupEvent>) {
        let members = self
            .groups
            .entry(entry.group_key.clone())
            .or_insert_with(|| {
                out.push(GroupEvent::Created {
                    group_key: entry.group_key.clone(),
                });
                GroupMembers::default()
            });
        match entry.role {
            // A newer summary for the same group replaces the old one.
            Role::Summary => members.summary = Some(entry.key.clone()),
            Role::Child => {
                members.children.insert(entry.key.clone());
            }
        }
        self.entries.insert(entry.key.clone(), entry.clone());
        touched.push(entry.group_key.clone());
    }

    /// Recompute verdicts for touched groups, in first-touched order.
    fn settle(&mut self, touched: Vec<String>, out: &mut Vec<GroupEvent>) {
        let mut seen = BTreeSet::new();
        for group_key in touched {
            if !seen.insert(group_key.clone()) {
                continue;
            }
            let Some(members) = self.groups.get_mut(&group_key) else {
                continue;
            };
            let verdict = members.verdict();
            if verdict != members.suppressed {
                members.suppressed = verdict;
                out.push(GroupEvent::SuppressionChanged {
                    group_key: group_key.clone(),
                    suppressed: verdict,
                });
            }
            if members.is_empty() {
                self.groups.remove(&group_key);
                out.push(GroupEvent::Removed { group_key });
            }
        }
    }
}

impl GroupPolicy for GroupTable {
    fn observe(&mut self, event: &EntryEvent) -> Vec<GroupEvent> {
        let mut out = Vec::new();
        let mut touched = Vec::new();
        match event {
            EntryEvent::Added(entry) | EntryEvent::Updated { entry, .. } => {
                self.detach(&entry.key, &mut touched);
                self.attach(entry, &mut touched, &mut out);
            }
            EntryEvent::Removed(entry) => self.detach(&entry.key, &mut touched),
            EntryEvent::PendingAdded(_) | EntryEvent::ContentReady(_) => {}
        }
        self.settle(touched, &mut out);
        out
    }

    fn is_group_suppressed(&self, group_key: &str) -> bool {
        self.groups.get(group_key).is_some_and(|m| m.suppressed)
    }

    fn group_summary(&self, group_key: &str) -> Option<&Entry> {
        self.groups
            .get(group_key)?
            .summary
            .as_ref()
            .and_then(|k| self.entries.get(k))
    }

    fn group_children(&self, group_key: &str) -> Vec<&Entry> {
        match self.groups.get(group_key) {
            Some(members) => members
                .children
                .iter()
                .filter_map(|k| self.entries.get(k))
                .collect(),
            None => Vec::new(),
        }
    }
}
