// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only diagnostics over the arbitration state.
//!
//! External tooling (inspectors, observers) queries scope and recognizer
//! snapshots through `&self` accessors; nothing here mutates arbitration
//! state. The snapshots are plain data and can outlive the referee borrow.

use alloc::vec::Vec;

use overstory_contact::ContactId;

use crate::referee::Referee;
use crate::store::{Kind, RecognizerId};
use crate::types::{Disposal, GroupMode, PolicyMask, Priority, RefereeState};

/// Point-in-time view of one scope member.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemberSnapshot {
    /// The member's handle.
    pub id: RecognizerId,
    /// Stored protocol state.
    pub state: RefereeState,
    /// Last disposal the member requested.
    pub disposal: Disposal,
    /// Registration priority.
    pub priority: Priority,
    /// Arbitration policy bits.
    pub mask: PolicyMask,
    /// Whether the member is in bridge mode.
    pub bridged: bool,
}

/// Point-in-time view of one gesture scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeSnapshot {
    /// The contact sequence this scope arbitrates.
    pub contact: ContactId,
    /// Whether a close was requested and deferred behind a pending member.
    pub delay_close: bool,
    /// Whether a winner has committed.
    pub has_winner: bool,
    /// Members in registration (blocking-precedence) order; stale handles
    /// are omitted.
    pub members: Vec<MemberSnapshot>,
}

/// Point-in-time view of one recognizer, including composition facts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecognizerSnapshot {
    /// The recognizer's handle.
    pub id: RecognizerId,
    /// Stored protocol state.
    pub state: RefereeState,
    /// State derived from children (equals `state` for leaves).
    pub derived_state: RefereeState,
    /// Group composition mode, if this is a group.
    pub group_mode: Option<GroupMode>,
    /// Live children, in declared order.
    pub children: Vec<RecognizerId>,
    /// Enclosing group, if attached to one.
    pub group: Option<RecognizerId>,
    /// Number of contacts currently tracked.
    pub active_contacts: usize,
}

impl Referee {
    /// Snapshot the scope arbitrating `contact`, if one exists.
    pub fn scope_snapshot(&self, contact: ContactId) -> Option<ScopeSnapshot> {
        let scope = self.scopes.get(&contact)?;
        let members = scope
            .members()
            .iter()
            .filter_map(|&id| {
                let r = self.store.get(id)?;
                Some(MemberSnapshot {
                    id,
                    state: r.state,
                    disposal: r.disposal,
                    priority: r.priority,
                    mask: r.mask,
                    bridged: r.bridged,
                })
            })
            .collect();
        Some(ScopeSnapshot {
            contact: scope.contact(),
            delay_close: scope.delay_close(),
            has_winner: scope.has_accepted(),
            members,
        })
    }

    /// Snapshot every active scope, in ascending contact order.
    pub fn scope_snapshots(&self) -> Vec<ScopeSnapshot> {
        self.scopes
            .keys()
            .filter_map(|c| self.scope_snapshot(*c))
            .collect()
    }

    /// Snapshot every live recognizer, in slot order.
    pub fn recognizer_snapshots(&self) -> Vec<RecognizerSnapshot> {
        self.store
            .ids()
            .filter_map(|id| self.recognizer_snapshot(id))
            .collect()
    }

    /// Snapshot one recognizer, if the handle is live.
    pub fn recognizer_snapshot(&self, id: RecognizerId) -> Option<RecognizerSnapshot> {
        let r = self.store.get(id)?;
        let (group_mode, children) = match &r.kind {
            Kind::Leaf => (None, Vec::new()),
            Kind::Group { mode, children, .. } => (
                Some(*mode),
                children
                    .iter()
                    .copied()
                    .filter(|c| self.store.is_alive(*c))
                    .collect(),
            ),
        };
        Some(RecognizerSnapshot {
            id,
            state: r.state,
            derived_state: crate::group::derived_state(&self.store, id)
                .unwrap_or(RefereeState::Ready),
            group_mode,
            children,
            group: r.group,
            active_contacts: r.tracker.len(),
        })
    }
}
