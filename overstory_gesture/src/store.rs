// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recognizer storage: a generational arena of recognizer records.
//!
//! Scopes and groups hold [`RecognizerId`] handles, never owning references;
//! a stale handle (its owning node was torn down mid-gesture) fails the
//! liveness check and is silently skipped wherever scopes iterate members.

use alloc::vec::Vec;

use overstory_contact::ContactTracker;

use crate::types::{BridgePeer, Disposal, GroupMode, PolicyMask, Priority, RefereeState};

/// Identifier for a recognizer record.
///
/// A small, copyable handle that stays stable across updates but becomes
/// invalid when the underlying slot is reused. It consists of a slot index
/// and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `RecognizerId` that pointed
///   to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a
///   new, distinct `RecognizerId`.
///
/// Stale ids never alias a different live recognizer because the generation
/// must match. Use [`Store::is_alive`] to check liveness.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct RecognizerId(pub(crate) u32, pub(crate) u32);

impl RecognizerId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of recognizer shapes.
///
/// Ancestor walks and composition logic match on this exhaustively; there is
/// no runtime downcast anywhere in the arbitration path.
#[derive(Clone, Debug)]
pub(crate) enum Kind {
    /// A leaf detector. Its geometric logic lives outside this crate; only
    /// the arbitration contract is represented here.
    Leaf,
    /// A composite recognizer over an ordered child list.
    Group {
        mode: GroupMode,
        children: Vec<RecognizerId>,
        /// The child whose claim the group is currently escalating.
        active: Option<RecognizerId>,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Record {
    pub(crate) generation: u32,
    pub(crate) state: RefereeState,
    pub(crate) disposal: Disposal,
    pub(crate) priority: Priority,
    pub(crate) mask: PolicyMask,
    /// Enclosing group, if this recognizer was attached to one.
    pub(crate) group: Option<RecognizerId>,
    pub(crate) kind: Kind,
    pub(crate) tracker: ContactTracker,
    pub(crate) bridged: bool,
    pub(crate) bridge_peers: Vec<BridgePeer>,
}

impl Record {
    fn new(generation: u32, priority: Priority, mask: PolicyMask, kind: Kind) -> Self {
        Self {
            generation,
            state: RefereeState::Ready,
            disposal: Disposal::None,
            priority,
            mask,
            group: None,
            kind,
            tracker: ContactTracker::new(),
            bridged: false,
            bridge_peers: Vec::new(),
        }
    }
}

/// Arena of recognizer records.
#[derive(Default)]
pub(crate) struct Store {
    slots: Vec<Option<Record>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.slots.len();
        let alive = self.slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Store")
            .field("slots_total", &total)
            .field("slots_alive", &alive)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, priority: Priority, mask: PolicyMask, kind: Kind) -> RecognizerId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.slots[idx] = Some(Record::new(generation, priority, mask, kind));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RecognizerId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.slots
                .push(Some(Record::new(generation, priority, mask, kind)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "RecognizerId uses 32-bit indices by design."
            )]
            ((self.slots.len() - 1) as u32, generation)
        };
        RecognizerId::new(idx, generation)
    }

    pub(crate) fn remove(&mut self, id: RecognizerId) {
        if !self.is_alive(id) {
            return;
        }
        self.slots[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Returns true if `id` refers to a live record.
    pub(crate) fn is_alive(&self, id: RecognizerId) -> bool {
        self.slots
            .get(id.idx())
            .and_then(|s| s.as_ref())
            .map(|r| r.generation == id.1)
            .unwrap_or(false)
    }

    pub(crate) fn get(&self, id: RecognizerId) -> Option<&Record> {
        let r = self.slots.get(id.idx())?.as_ref()?;
        if r.generation != id.1 {
            return None;
        }
        Some(r)
    }

    pub(crate) fn get_mut(&mut self, id: RecognizerId) -> Option<&mut Record> {
        let r = self.slots.get_mut(id.idx())?.as_mut()?;
        if r.generation != id.1 {
            return None;
        }
        Some(r)
    }

    pub(crate) fn state(&self, id: RecognizerId) -> Option<RefereeState> {
        self.get(id).map(|r| r.state)
    }

    pub(crate) fn set_state(&mut self, id: RecognizerId, state: RefereeState) {
        if let Some(r) = self.get_mut(id) {
            r.state = state;
        }
    }

    /// Iterate all live ids.
    pub(crate) fn ids(&self) -> impl Iterator<Item = RecognizerId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.as_ref().map(|r| {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "RecognizerId uses 32-bit indices by design."
                )]
                RecognizerId::new(i as u32, r.generation)
            })
        })
    }
}
