use crate::entry::Entry;
use crate::event::{EntryEvent, GroupEvent};

/// Owner of grouping and suppression decisions.
///
/// The state machine only queries it; how suppression is computed is up to
/// the implementation.
pub trait GroupPolicy {
    /// Apply an entry lifecycle event to membership and return the group
    /// changes it caused, in order.
    fn observe(&mut self, event: &EntryEvent) -> Vec<GroupEvent>;

    /// True when the group is policy-equivalent to its single visible child.
    fn is_group_suppressed(&self, group_key: &str) -> bool;

    fn group_summary(&self, group_key: &str) -> Option<&Entry>;

    /// Children in a stable order. Empty for unknown groups.
    fn group_children(&self, group_key: &str) -> Vec<&Entry>;
}
