// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Gesture scopes: the set of recognizers competing over one contact.
//!
//! ## Overview
//!
//! A scope exists per contact-sequence id and owns the blocking rules for
//! that sequence. Members are kept in registration order — `High`-priority
//! members ahead of `Low` — and registration order is blocking precedence:
//! the first pending member that is not an ancestor of a candidate blocks
//! that candidate.
//!
//! Scopes hold handles, not owning references; stale members are skipped
//! during every walk. Closing a scope is deferred while a member is still
//! pending (see [`Scope::set_delay_close`]), which is what keeps a
//! long-press-style claim alive after the physical contact lifted.

use alloc::vec::Vec;

use overstory_contact::ContactId;

use crate::group::{is_ancestor, needs_defer_reset, reset_subtree};
use crate::store::{RecognizerId, Store};
use crate::types::{Notice, PolicyMask, RefereeState, Verdict};

/// The competitors for one contact sequence.
#[derive(Debug)]
pub(crate) struct Scope {
    contact: ContactId,
    members: Vec<RecognizerId>,
    delay_close: bool,
    has_accepted: bool,
}

impl Scope {
    pub(crate) fn new(contact: ContactId) -> Self {
        Self {
            contact,
            members: Vec::new(),
            delay_close: false,
            has_accepted: false,
        }
    }

    pub(crate) fn contact(&self) -> ContactId {
        self.contact
    }

    pub(crate) fn members(&self) -> &[RecognizerId] {
        &self.members
    }

    /// True if `id` is already registered in this scope.
    pub(crate) fn existed(&self, id: RecognizerId) -> bool {
        self.members.contains(&id)
    }

    /// Register a member, keeping `High`-priority members ahead of `Low`.
    ///
    /// Within a priority class, registration order (most-specific first, as
    /// supplied by hit-testing) is preserved. Re-adding is a no-op.
    pub(crate) fn add_member(&mut self, store: &Store, id: RecognizerId) {
        if !store.is_alive(id) || self.existed(id) {
            return;
        }
        let priority = match store.get(id) {
            Some(r) => r.priority,
            None => return,
        };
        let pos = self
            .members
            .iter()
            .position(|m| store.get(*m).is_none_or(|r| r.priority < priority));
        match pos {
            Some(p) => self.members.insert(p, id),
            None => self.members.push(id),
        }
    }

    pub(crate) fn remove_member(&mut self, id: RecognizerId) {
        self.members.retain(|m| *m != id);
    }

    /// True if any live member is currently `Pending`.
    pub(crate) fn is_pending(&self, store: &Store) -> bool {
        self.members
            .iter()
            .any(|m| store.state(*m) == Some(RefereeState::Pending))
    }

    /// True if at least one member handle still resolves.
    pub(crate) fn has_live_members(&self, store: &Store) -> bool {
        self.members.iter().any(|m| store.is_alive(*m))
    }

    pub(crate) fn set_delay_close(&mut self, delay: bool) {
        self.delay_close = delay;
    }

    pub(crate) fn delay_close(&self) -> bool {
        self.delay_close
    }

    pub(crate) fn set_accepted(&mut self) {
        self.has_accepted = true;
    }

    pub(crate) fn has_accepted(&self) -> bool {
        self.has_accepted
    }

    /// Would granting `candidate` now leave an earlier pending claim hanging?
    ///
    /// Walks members in registration order and stops on reaching the
    /// candidate itself: only members registered ahead of it can block it,
    /// which is how `High` priority wins ties. A member blocks the candidate
    /// when it is `Pending`, does not carry
    /// [`PolicyMask::ALWAYS_YIELD`], and the candidate is not one of its
    /// enclosing groups (a pending member always yields to its own
    /// container). Candidates carrying [`PolicyMask::NEVER_BLOCKED`] skip the
    /// check entirely.
    pub(crate) fn check_need_blocked(&self, store: &Store, candidate: RecognizerId) -> bool {
        if store
            .get(candidate)
            .is_some_and(|r| r.mask.contains(PolicyMask::NEVER_BLOCKED))
        {
            return false;
        }
        for &member in &self.members {
            if member == candidate {
                return false;
            }
            let Some(record) = store.get(member) else {
                continue;
            };
            if record.state != RefereeState::Pending {
                continue;
            }
            if record.mask.contains(PolicyMask::ALWAYS_YIELD) {
                continue;
            }
            if is_ancestor(store, candidate, member) {
                continue;
            }
            return true;
        }
        false
    }

    /// First member queued behind a blocker, in registration order.
    pub(crate) fn pick_blocked(&self, store: &Store) -> Option<RecognizerId> {
        self.members
            .iter()
            .copied()
            .find(|m| store.state(*m).is_some_and(RefereeState::is_blocked))
    }

    /// True if every live member has resolved: nothing detecting, pending,
    /// or queued.
    pub(crate) fn query_all_done(&self, store: &Store) -> bool {
        self.members.iter().all(|m| {
            store.state(*m).is_none_or(|s| {
                matches!(
                    s,
                    RefereeState::Ready | RefereeState::Succeed | RefereeState::Fail
                )
            })
        })
    }

    /// Close the scope: finish every live member.
    ///
    /// Non-winning members reset to `Ready`. A committed winner closing
    /// because of a cancellation (forced clean, surface teardown) is told to
    /// cancel its in-flight action first. Members whose contacts are still
    /// down elsewhere, or whose ancestor group is still resolving, keep their
    /// state for that resolution — unless the close is a cancellation, which
    /// is immediate and unconditional.
    pub(crate) fn close(&self, store: &mut Store, cancelled: bool, out: &mut Vec<Notice>) {
        for &member in &self.members {
            let Some(record) = store.get(member) else {
                continue;
            };
            if cancelled {
                if record.state == RefereeState::Succeed {
                    out.push(Notice::new(member, Verdict::SucceedCanceled));
                }
                reset_subtree(store, member);
                continue;
            }
            if record.tracker.is_empty() && !needs_defer_reset(store, member) {
                reset_subtree(store, member);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::attach_children;
    use crate::store::Kind;
    use crate::types::{GroupMode, Priority};

    fn leaf(store: &mut Store, priority: Priority, mask: PolicyMask) -> RecognizerId {
        store.insert(priority, mask, Kind::Leaf)
    }

    fn scope_with(store: &Store, members: &[RecognizerId]) -> Scope {
        let mut s = Scope::new(ContactId(0));
        for &m in members {
            s.add_member(store, m);
        }
        s
    }

    #[test]
    fn candidate_is_not_blocked_by_itself() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        store.set_state(a, RefereeState::Pending);
        let scope = scope_with(&store, &[a]);
        assert!(!scope.check_need_blocked(&store, a));
    }

    #[test]
    fn pending_member_blocks_a_newcomer() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let b = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = scope_with(&store, &[a]);

        assert!(!scope.check_need_blocked(&store, b));
        store.set_state(a, RefereeState::Pending);
        assert!(scope.check_need_blocked(&store, b));
    }

    #[test]
    fn pending_blocked_member_does_not_block() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let b = leaf(&mut store, Priority::Low, PolicyMask::empty());
        store.set_state(a, RefereeState::PendingBlocked);
        let scope = scope_with(&store, &[a]);
        assert!(!scope.check_need_blocked(&store, b));
    }

    #[test]
    fn empty_scope_blocks_nothing() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = Scope::new(ContactId(0));
        assert!(!scope.check_need_blocked(&store, a));
    }

    #[test]
    fn ancestor_group_is_exempt_from_descendant_block() {
        let mut store = Store::new();
        let child = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let g = store.insert(
            Priority::Low,
            PolicyMask::empty(),
            Kind::Group {
                mode: GroupMode::Exclusive,
                children: alloc::vec::Vec::new(),
                active: None,
            },
        );
        attach_children(&mut store, g, &[child]);
        store.set_state(child, RefereeState::Pending);

        let stranger = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = scope_with(&store, &[child, g, stranger]);

        // The group subsumes its own pending descendant...
        assert!(!scope.check_need_blocked(&store, g));
        // ...but an unrelated candidate is blocked by it.
        assert!(scope.check_need_blocked(&store, stranger));
    }

    #[test]
    fn policy_mask_overrides() {
        let mut store = Store::new();
        let yielding = leaf(&mut store, Priority::Low, PolicyMask::ALWAYS_YIELD);
        let armored = leaf(&mut store, Priority::Low, PolicyMask::NEVER_BLOCKED);
        let normal = leaf(&mut store, Priority::Low, PolicyMask::empty());
        store.set_state(yielding, RefereeState::Pending);
        let scope = scope_with(&store, &[yielding, normal, armored]);

        assert!(!scope.check_need_blocked(&store, normal));
        store.set_state(normal, RefereeState::Pending);
        assert!(!scope.check_need_blocked(&store, armored));
    }

    #[test]
    fn high_priority_members_register_first() {
        let mut store = Store::new();
        let low1 = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let low2 = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let high = leaf(&mut store, Priority::High, PolicyMask::empty());
        let mut scope = Scope::new(ContactId(0));
        scope.add_member(&store, low1);
        scope.add_member(&store, low2);
        scope.add_member(&store, high);
        assert_eq!(scope.members(), &[high, low1, low2]);
    }

    #[test]
    fn add_member_dedupes() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let mut scope = Scope::new(ContactId(0));
        scope.add_member(&store, a);
        scope.add_member(&store, a);
        assert_eq!(scope.members().len(), 1);
        assert!(scope.existed(a));
    }

    #[test]
    fn pick_blocked_prefers_registration_order() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let b = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = scope_with(&store, &[a, b]);

        assert_eq!(scope.pick_blocked(&store), None);
        store.set_state(b, RefereeState::SucceedBlocked);
        assert_eq!(scope.pick_blocked(&store), Some(b));
        store.set_state(a, RefereeState::PendingBlocked);
        assert_eq!(scope.pick_blocked(&store), Some(a));
    }

    #[test]
    fn stale_members_are_skipped() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let b = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = scope_with(&store, &[a, b]);
        store.set_state(a, RefereeState::Pending);
        store.remove(a);

        assert!(!scope.check_need_blocked(&store, b));
        assert!(!scope.is_pending(&store));
        assert!(scope.has_live_members(&store));
        assert!(scope.query_all_done(&store));
    }

    #[test]
    fn query_all_done_tracks_resolution() {
        let mut store = Store::new();
        let a = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let b = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let scope = scope_with(&store, &[a, b]);

        assert!(scope.query_all_done(&store));
        store.set_state(a, RefereeState::Detecting);
        assert!(!scope.query_all_done(&store));
        store.set_state(a, RefereeState::Succeed);
        assert!(scope.query_all_done(&store));
        store.set_state(b, RefereeState::PendingBlocked);
        assert!(!scope.query_all_done(&store));
        store.set_state(b, RefereeState::Fail);
        assert!(scope.query_all_done(&store));
    }

    #[test]
    fn cancelled_close_revokes_the_winner() {
        let mut store = Store::new();
        let winner = leaf(&mut store, Priority::Low, PolicyMask::empty());
        let loser = leaf(&mut store, Priority::Low, PolicyMask::empty());
        store.set_state(winner, RefereeState::Succeed);
        store.set_state(loser, RefereeState::Fail);
        let scope = scope_with(&store, &[winner, loser]);

        let mut out = Vec::new();
        scope.close(&mut store, true, &mut out);
        assert_eq!(out, alloc::vec![Notice::new(winner, Verdict::SucceedCanceled)]);
        assert_eq!(store.state(winner), Some(RefereeState::Ready));
        assert_eq!(store.state(loser), Some(RefereeState::Ready));
    }

    #[test]
    fn natural_close_resets_without_cancel() {
        let mut store = Store::new();
        let winner = leaf(&mut store, Priority::Low, PolicyMask::empty());
        store.set_state(winner, RefereeState::Succeed);
        let scope = scope_with(&store, &[winner]);

        let mut out = Vec::new();
        scope.close(&mut store, false, &mut out);
        assert!(out.is_empty());
        assert_eq!(store.state(winner), Some(RefereeState::Ready));
    }
}
