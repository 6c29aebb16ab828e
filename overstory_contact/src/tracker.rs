// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-participant contact bookkeeping.
//!
//! ## Overview
//!
//! A [`ContactTracker`] records which contacts a gesture participant is
//! currently following: which ids are down and their last known positions.
//! Feeding it a [`ContactEvent`] yields a [`TrackerChange`] describing what
//! the event meant for this participant — in particular whether it was the
//! first contact down ([`TrackerChange::Began`]) or emptied the tracker
//! ([`TrackerChange::Emptied`]), the two edges the gesture state machine
//! cares about.
//!
//! The set is expected to stay tiny (a handful of fingers), so storage is a
//! flat vector with linear scans.

use alloc::vec::Vec;

use kurbo::Point;

use crate::types::{ContactEvent, ContactId, ContactPhase};

/// What applying one event meant for a tracker.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrackerChange {
    /// The first contact went down; the tracker was empty before.
    Began,
    /// A contact was added or its position refreshed.
    Updated,
    /// A contact was released; others remain down.
    Released,
    /// The last contact was released; the tracker is now empty.
    Emptied,
    /// The event referenced a contact this tracker never registered; no-op.
    Ignored,
}

/// Tracks the active contacts of one gesture participant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactTracker {
    contacts: Vec<(ContactId, Point)>,
}

impl ContactTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            contacts: Vec::new(),
        }
    }

    /// Number of contacts currently down.
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Returns true if no contact is down.
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Returns true if `id` is currently tracked.
    pub fn contains(&self, id: ContactId) -> bool {
        self.contacts.iter().any(|(c, _)| *c == id)
    }

    /// Last known position of `id`, if tracked.
    pub fn position(&self, id: ContactId) -> Option<Point> {
        self.contacts
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, p)| *p)
    }

    /// Iterate the tracked contact ids in down order.
    pub fn ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.contacts.iter().map(|(c, _)| *c)
    }

    /// Apply one event and report what it changed.
    ///
    /// `Down` inserts (or refreshes) the contact under the event's
    /// [routing id](ContactEvent::routing_id); `Move` refreshes the position;
    /// `Up`/`Cancel` remove it. Release events for contacts this tracker
    /// never saw are ignored rather than treated as errors, since a
    /// participant may legitimately start following a sequence mid-stream.
    pub fn apply(&mut self, event: &ContactEvent) -> TrackerChange {
        let id = event.routing_id();
        if event.phase.releases() {
            let before = self.contacts.len();
            self.contacts.retain(|(c, _)| *c != id);
            return if self.contacts.len() == before {
                TrackerChange::Ignored
            } else if self.contacts.is_empty() {
                TrackerChange::Emptied
            } else {
                TrackerChange::Released
            };
        }
        match event.phase {
            ContactPhase::Down => {
                if let Some(slot) = self.contacts.iter_mut().find(|(c, _)| *c == id) {
                    slot.1 = event.position;
                    TrackerChange::Updated
                } else {
                    let was_empty = self.contacts.is_empty();
                    self.contacts.push((id, event.position));
                    if was_empty {
                        TrackerChange::Began
                    } else {
                        TrackerChange::Updated
                    }
                }
            }
            ContactPhase::Move => match self.contacts.iter_mut().find(|(c, _)| *c == id) {
                Some(slot) => {
                    slot.1 = event.position;
                    TrackerChange::Updated
                }
                None => TrackerChange::Ignored,
            },
            // Releases handled above.
            ContactPhase::Up | ContactPhase::Cancel => TrackerChange::Ignored,
        }
    }

    /// Drop all contacts. Idempotent: clearing an empty tracker is a no-op.
    pub fn clear(&mut self) {
        self.contacts.clear();
    }
}
