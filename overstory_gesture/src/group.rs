// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recognizer composition: the group tree and its aggregation rules.
//!
//! ## Overview
//!
//! Groups are recognizers holding an ordered child list and a
//! [`GroupMode`](crate::types::GroupMode). A group presents itself to the
//! referee as a single participant; this module owns the structural helpers
//! the arbitration path relies on:
//!
//! - the ancestor walk used by the blocking check (a pending member never
//!   blocks its own enclosing group),
//! - derived group state, computed on demand from child states,
//! - contact-event routing (`Sequence` groups gate later children on the
//!   predecessor's success),
//! - subtree reset, with the deferred-reset rule for members whose ancestor
//!   group is still resolving other contacts.

use alloc::vec::Vec;

use crate::store::{Kind, RecognizerId, Store};
use crate::types::{Disposal, GroupMode, RefereeState};

/// Walk `id`'s enclosing-group chain upward; true if `ancestor` appears.
///
/// Stale links end the walk, so a torn-down group simply stops exempting its
/// descendants.
pub(crate) fn is_ancestor(store: &Store, ancestor: RecognizerId, id: RecognizerId) -> bool {
    let mut cur = store.get(id).and_then(|r| r.group);
    while let Some(g) = cur {
        if g == ancestor {
            return true;
        }
        cur = store.get(g).and_then(|r| r.group);
    }
    false
}

/// Attach `children` to `group`, setting their back-references.
///
/// A child that is stale, already attached to a group, or is the group itself
/// is skipped; composition stays a tree.
pub(crate) fn attach_children(store: &mut Store, group: RecognizerId, children: &[RecognizerId]) {
    for &child in children {
        if child == group || !store.is_alive(child) {
            continue;
        }
        if store.get(child).is_some_and(|r| r.group.is_some()) {
            continue;
        }
        if is_ancestor(store, child, group) {
            // Attaching an ancestor as a child would close a cycle.
            continue;
        }
        if let Some(Kind::Group { children: list, .. }) =
            store.get_mut(group).map(|r| &mut r.kind)
        {
            if !list.contains(&child) {
                list.push(child);
            }
        } else {
            return;
        }
        if let Some(r) = store.get_mut(child) {
            r.group = Some(group);
        }
    }
}

/// Detach `child` from its enclosing group, if any.
pub(crate) fn detach_child(store: &mut Store, child: RecognizerId) {
    let Some(parent) = store.get(child).and_then(|r| r.group) else {
        return;
    };
    if let Some(Kind::Group {
        children, active, ..
    }) = store.get_mut(parent).map(|r| &mut r.kind)
    {
        children.retain(|c| *c != child);
        if *active == Some(child) {
            *active = None;
        }
    }
    if let Some(r) = store.get_mut(child) {
        r.group = None;
    }
}

/// Live children of `id`, in declared order. Empty for leaves.
pub(crate) fn live_children(store: &Store, id: RecognizerId) -> Vec<RecognizerId> {
    match store.get(id).map(|r| &r.kind) {
        Some(Kind::Group { children, .. }) => children
            .iter()
            .copied()
            .filter(|c| store.is_alive(*c))
            .collect(),
        _ => Vec::new(),
    }
}

/// The group's composition mode, if `id` is a live group.
pub(crate) fn mode(store: &Store, id: RecognizerId) -> Option<GroupMode> {
    match store.get(id).map(|r| &r.kind) {
        Some(Kind::Group { mode, .. }) => Some(*mode),
        _ => None,
    }
}

/// The child whose claim the group is currently escalating.
pub(crate) fn active_child(store: &Store, id: RecognizerId) -> Option<RecognizerId> {
    match store.get(id).map(|r| &r.kind) {
        Some(Kind::Group { active, .. }) => *active,
        _ => None,
    }
}

pub(crate) fn set_active_child(store: &mut Store, id: RecognizerId, child: Option<RecognizerId>) {
    if let Some(Kind::Group { active, .. }) = store.get_mut(id).map(|r| &mut r.kind) {
        *active = child;
    }
}

/// The children a contact event should be delivered to.
///
/// `Exclusive` and `Parallel` groups forward to every live child. A
/// `Sequence` group forwards only to its active child: the first child that
/// has not yet succeeded. Later children stay in `Ready` until their
/// predecessor resolves.
pub(crate) fn event_targets(store: &Store, id: RecognizerId) -> Vec<RecognizerId> {
    match mode(store, id) {
        Some(GroupMode::Exclusive) | Some(GroupMode::Parallel) => live_children(store, id),
        Some(GroupMode::Sequence) => sequence_cursor(store, id).into_iter().collect(),
        None => Vec::new(),
    }
}

/// First child of a `Sequence` group that has not succeeded yet.
pub(crate) fn sequence_cursor(store: &Store, id: RecognizerId) -> Option<RecognizerId> {
    live_children(store, id)
        .into_iter()
        .find(|c| store.state(*c) != Some(RefereeState::Succeed))
}

/// Group state derived from child states.
///
/// The stored protocol state on the group record is what the scope algorithm
/// reads (blocked-ness is assigned by the outer scope and is not derivable
/// from children); this function gives diagnostics and composition logic the
/// aggregate view. For leaves it is simply the stored state.
pub(crate) fn derived_state(store: &Store, id: RecognizerId) -> Option<RefereeState> {
    let record = store.get(id)?;
    let Kind::Group { mode, .. } = &record.kind else {
        return Some(record.state);
    };
    let children = live_children(store, id);
    if children.is_empty() {
        return Some(record.state);
    }
    let states: Vec<RefereeState> = children
        .iter()
        .filter_map(|c| derived_state(store, *c))
        .collect();

    let any = |s: RefereeState| states.iter().any(|x| *x == s);
    let all = |s: RefereeState| states.iter().all(|x| *x == s);

    let derived = match mode {
        GroupMode::Exclusive | GroupMode::Parallel => {
            if any(RefereeState::Succeed) {
                RefereeState::Succeed
            } else if all(RefereeState::Fail) {
                RefereeState::Fail
            } else if any(RefereeState::SucceedBlocked) {
                RefereeState::SucceedBlocked
            } else if any(RefereeState::Pending) {
                RefereeState::Pending
            } else if any(RefereeState::PendingBlocked) {
                RefereeState::PendingBlocked
            } else if any(RefereeState::Detecting) {
                RefereeState::Detecting
            } else {
                RefereeState::Ready
            }
        }
        GroupMode::Sequence => {
            if any(RefereeState::Fail) {
                RefereeState::Fail
            } else if states.last() == Some(&RefereeState::Succeed) {
                RefereeState::Succeed
            } else if any(RefereeState::SucceedBlocked) {
                RefereeState::SucceedBlocked
            } else if any(RefereeState::Pending) {
                RefereeState::Pending
            } else if any(RefereeState::PendingBlocked) {
                RefereeState::PendingBlocked
            } else if any(RefereeState::Detecting) || any(RefereeState::Succeed) {
                RefereeState::Detecting
            } else {
                RefereeState::Ready
            }
        }
    };
    Some(derived)
}

/// True if `id` must not reset yet because a structural ancestor is still
/// resolving: the ancestor tracks live contacts or sits in a non-terminal,
/// non-ready state. The ancestor will reset this record when it resolves.
pub(crate) fn needs_defer_reset(store: &Store, id: RecognizerId) -> bool {
    let mut cur = store.get(id).and_then(|r| r.group);
    while let Some(g) = cur {
        let Some(record) = store.get(g) else {
            break;
        };
        if !record.tracker.is_empty() {
            return true;
        }
        if matches!(
            record.state,
            RefereeState::Detecting
                | RefereeState::Pending
                | RefereeState::PendingBlocked
                | RefereeState::SucceedBlocked
        ) {
            return true;
        }
        cur = record.group;
    }
    false
}

/// Reset `id` and every descendant to `Ready`, clearing trackers, disposals,
/// and active-child cursors. Resetting an already-`Ready` subtree is a no-op
/// in effect.
pub(crate) fn reset_subtree(store: &mut Store, id: RecognizerId) {
    if !store.is_alive(id) {
        return;
    }
    if let Some(r) = store.get_mut(id) {
        r.state = RefereeState::Ready;
        r.disposal = Disposal::None;
        r.tracker.clear();
        if let Kind::Group { active, .. } = &mut r.kind {
            *active = None;
        }
    }
    for child in live_children(store, id) {
        reset_subtree(store, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Kind;
    use crate::types::{PolicyMask, Priority};

    fn leaf(store: &mut Store) -> RecognizerId {
        store.insert(Priority::Low, PolicyMask::empty(), Kind::Leaf)
    }

    fn group(store: &mut Store, mode: GroupMode, children: &[RecognizerId]) -> RecognizerId {
        let g = store.insert(
            Priority::Low,
            PolicyMask::empty(),
            Kind::Group {
                mode,
                children: Vec::new(),
                active: None,
            },
        );
        attach_children(store, g, children);
        g
    }

    #[test]
    fn ancestor_walk_spans_nesting() {
        let mut store = Store::new();
        let a = leaf(&mut store);
        let inner = group(&mut store, GroupMode::Exclusive, &[a]);
        let outer = group(&mut store, GroupMode::Exclusive, &[inner]);

        assert!(is_ancestor(&store, inner, a));
        assert!(is_ancestor(&store, outer, a));
        assert!(is_ancestor(&store, outer, inner));
        assert!(!is_ancestor(&store, a, outer));
        assert!(!is_ancestor(&store, inner, outer));
    }

    #[test]
    fn double_attach_is_ignored() {
        let mut store = Store::new();
        let a = leaf(&mut store);
        let g1 = group(&mut store, GroupMode::Parallel, &[a]);
        let g2 = group(&mut store, GroupMode::Parallel, &[a]);

        assert_eq!(store.get(a).unwrap().group, Some(g1));
        assert!(live_children(&store, g2).is_empty());
    }

    #[test]
    fn self_and_cycle_attach_are_ignored() {
        let mut store = Store::new();
        let inner = group(&mut store, GroupMode::Exclusive, &[]);
        let outer = group(&mut store, GroupMode::Exclusive, &[inner]);
        // Attaching the outer group under its own descendant must not cycle.
        attach_children(&mut store, inner, &[outer, inner]);
        assert!(live_children(&store, inner).is_empty());
        assert_eq!(store.get(outer).unwrap().group, None);
    }

    #[test]
    fn sequence_routes_to_first_unresolved_child() {
        let mut store = Store::new();
        let c1 = leaf(&mut store);
        let c2 = leaf(&mut store);
        let g = group(&mut store, GroupMode::Sequence, &[c1, c2]);

        assert_eq!(event_targets(&store, g), alloc::vec![c1]);
        store.set_state(c1, RefereeState::Succeed);
        assert_eq!(event_targets(&store, g), alloc::vec![c2]);
    }

    #[test]
    fn parallel_routes_to_all_children() {
        let mut store = Store::new();
        let c1 = leaf(&mut store);
        let c2 = leaf(&mut store);
        let g = group(&mut store, GroupMode::Parallel, &[c1, c2]);
        assert_eq!(event_targets(&store, g), alloc::vec![c1, c2]);
    }

    #[test]
    fn derived_state_exclusive() {
        let mut store = Store::new();
        let c1 = leaf(&mut store);
        let c2 = leaf(&mut store);
        let g = group(&mut store, GroupMode::Exclusive, &[c1, c2]);

        assert_eq!(derived_state(&store, g), Some(RefereeState::Ready));
        store.set_state(c1, RefereeState::Detecting);
        assert_eq!(derived_state(&store, g), Some(RefereeState::Detecting));
        store.set_state(c2, RefereeState::Succeed);
        assert_eq!(derived_state(&store, g), Some(RefereeState::Succeed));
        store.set_state(c2, RefereeState::Fail);
        store.set_state(c1, RefereeState::Fail);
        assert_eq!(derived_state(&store, g), Some(RefereeState::Fail));
    }

    #[test]
    fn derived_state_sequence_requires_last_child() {
        let mut store = Store::new();
        let c1 = leaf(&mut store);
        let c2 = leaf(&mut store);
        let g = group(&mut store, GroupMode::Sequence, &[c1, c2]);

        store.set_state(c1, RefereeState::Succeed);
        // First child done, second not started: the sequence is mid-flight.
        assert_eq!(derived_state(&store, g), Some(RefereeState::Detecting));
        store.set_state(c2, RefereeState::Succeed);
        assert_eq!(derived_state(&store, g), Some(RefereeState::Succeed));
    }

    #[test]
    fn defer_reset_while_ancestor_unresolved() {
        let mut store = Store::new();
        let c = leaf(&mut store);
        let g = group(&mut store, GroupMode::Exclusive, &[c]);

        assert!(!needs_defer_reset(&store, c));
        store.set_state(g, RefereeState::Pending);
        assert!(needs_defer_reset(&store, c));
        store.set_state(g, RefereeState::Succeed);
        assert!(!needs_defer_reset(&store, c));
    }

    #[test]
    fn reset_subtree_clears_states_and_cursors() {
        let mut store = Store::new();
        let c1 = leaf(&mut store);
        let c2 = leaf(&mut store);
        let g = group(&mut store, GroupMode::Exclusive, &[c1, c2]);
        store.set_state(c1, RefereeState::Fail);
        store.set_state(c2, RefereeState::Succeed);
        store.set_state(g, RefereeState::Succeed);
        set_active_child(&mut store, g, Some(c2));

        reset_subtree(&mut store, g);
        assert_eq!(store.state(g), Some(RefereeState::Ready));
        assert_eq!(store.state(c1), Some(RefereeState::Ready));
        assert_eq!(store.state(c2), Some(RefereeState::Ready));
        assert_eq!(active_child(&store, g), None);

        // Idempotent.
        reset_subtree(&mut store, g);
        assert_eq!(store.state(g), Some(RefereeState::Ready));
    }

    #[test]
    fn detach_clears_backref_and_cursor() {
        let mut store = Store::new();
        let c = leaf(&mut store);
        let g = group(&mut store, GroupMode::Exclusive, &[c]);
        set_active_child(&mut store, g, Some(c));

        detach_child(&mut store, c);
        assert_eq!(store.get(c).unwrap().group, None);
        assert!(live_children(&store, g).is_empty());
        assert_eq!(active_child(&store, g), None);
    }
}
