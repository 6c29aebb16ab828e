// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Referee implementation.
//!
//! ## Overview
//!
//! The referee is the single entry point of the arbitration protocol: it owns
//! the recognizer arena and the per-contact [scopes](crate::scope), and every
//! disposal request flows through [`Referee::adjudicate`]. Operations return
//! an ordered [`Notice`] batch; dispatching the batch in order reproduces the
//! callback ordering the protocol guarantees.
//!
//! ## Protocol
//!
//! - Hit-testing registers the competitors for a fresh contact with
//!   [`Referee::add_to_scope`], most-specific first. `High`-priority members
//!   are placed ahead of `Low` ones; list position is blocking precedence.
//! - Detectors feed every contact sample to [`Referee::handle_event`] *after*
//!   making any disposal request for that sample, and ask for verdicts with
//!   [`Referee::adjudicate`].
//! - `Accept` commits immediately unless an earlier pending member blocks the
//!   candidate, in which case the win is banked (`SucceedBlocked`). A commit
//!   rejects every other non-bridged member of every scope the winner is in.
//! - `Pending` parks a claim; later claimants queue behind it
//!   (`PendingBlocked`).
//! - `Reject` of a pending member promotes exactly one queued member (the
//!   first in registration order, scanning scopes in ascending contact
//!   order). The cascade is iterative, never recursive.
//! - The input pipeline ends a sequence with [`Referee::clean_scope`], which
//!   defers while a member is still pending, and tears everything down with
//!   [`Referee::clean_all`].
//!
//! ## Winner precedence
//!
//! A later unconditional `Accept` evicts a committed winner: the previous
//! winner receives [`Verdict::SucceedCanceled`] then [`Verdict::Rejected`]
//! and the challenger takes the sequence. Last accept wins; this is the one
//! deliberate exception to the rule that requests on a failed recognizer are
//! no-ops.
//!
//! ## See Also
//!
//! [`inspect`](crate::inspect) for the read-only diagnostics surface.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use overstory_contact::{ContactEvent, ContactId, DeviceKind, TrackerChange};

use crate::group::{
    active_child, attach_children, detach_child, event_targets, live_children, mode,
    needs_defer_reset, reset_subtree, set_active_child,
};
use crate::scope::Scope;
use crate::store::{Kind, RecognizerId, Store};
use crate::types::{Disposal, GroupMode, Notice, PolicyMask, Priority, RefereeState, Verdict};

pub(crate) type ScopeMap = BTreeMap<ContactId, Scope>;

/// Per-surface gesture referee.
///
/// Owns the recognizer arena and the contact-id → scope registry. All calls
/// are expected on one logical input thread; none of them block, yield, or
/// call back into the caller — results are returned as [`Notice`] batches.
pub struct Referee {
    pub(crate) store: Store,
    pub(crate) scopes: ScopeMap,
    pub(crate) last_source: Option<DeviceKind>,
}

impl Default for Referee {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Referee {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Referee")
            .field("store", &self.store)
            .field("scopes", &self.scopes.len())
            .field("last_source", &self.last_source)
            .finish_non_exhaustive()
    }
}

impl Referee {
    /// Create an empty referee.
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            scopes: BTreeMap::new(),
            last_source: None,
        }
    }

    // --- recognizer management ---

    /// Register a leaf recognizer and return its handle.
    ///
    /// The leaf's geometric detection logic lives with the caller; the handle
    /// is its standing in the arbitration protocol.
    pub fn insert_leaf(&mut self, priority: Priority, mask: PolicyMask) -> RecognizerId {
        self.store.insert(priority, mask, Kind::Leaf)
    }

    /// Register a recognizer group over `children` and return its handle.
    ///
    /// Children that are stale or already attached to another group are
    /// skipped; composition always stays a tree. The group presents itself to
    /// scopes as a single participant with its own priority.
    pub fn insert_group(
        &mut self,
        mode: GroupMode,
        priority: Priority,
        mask: PolicyMask,
        children: &[RecognizerId],
    ) -> RecognizerId {
        let group = self.store.insert(
            priority,
            mask,
            Kind::Group {
                mode,
                children: Vec::new(),
                active: None,
            },
        );
        attach_children(&mut self.store, group, children);
        group
    }

    /// Remove a recognizer whose owning node is being torn down.
    ///
    /// The recognizer is detached from its group, its children (if any) are
    /// released to stand alone, and it is proactively removed from every
    /// scope — scopes never keep a recognizer alive. Stale ids are a no-op.
    pub fn remove_recognizer(&mut self, id: RecognizerId) {
        if !self.store.is_alive(id) {
            return;
        }
        detach_child(&mut self.store, id);
        for child in live_children(&self.store, id) {
            detach_child(&mut self.store, child);
        }
        self.store.remove(id);
        let Self { store, scopes, .. } = self;
        for scope in scopes.values_mut() {
            scope.remove_member(id);
        }
        scopes.retain(|_, s| s.has_live_members(store));
    }

    /// Put a recognizer in bridge mode.
    ///
    /// A bridged member is a pure listener: it is skipped when a winner
    /// rejects the rest of its scope, and its own verdicts are mirrored to
    /// its peers.
    pub fn set_bridged(&mut self, id: RecognizerId, bridged: bool) {
        if let Some(r) = self.store.get_mut(id) {
            r.bridged = bridged;
        }
    }

    /// Add a forwarding peer for a bridged recognizer.
    pub fn add_bridge_peer(&mut self, id: RecognizerId, peer: crate::types::BridgePeer) {
        if let Some(r) = self.store.get_mut(id) {
            if !r.bridge_peers.contains(&peer) {
                r.bridge_peers.push(peer);
            }
        }
    }

    /// Returns true if `id` refers to a live recognizer.
    pub fn is_alive(&self, id: RecognizerId) -> bool {
        self.store.is_alive(id)
    }

    /// Current protocol state, if the handle is live.
    pub fn state(&self, id: RecognizerId) -> Option<RefereeState> {
        self.store.state(id)
    }

    /// Group state derived from child states (the reporting aggregation).
    /// For leaves this is the stored state.
    pub fn derived_state(&self, id: RecognizerId) -> Option<RefereeState> {
        crate::group::derived_state(&self.store, id)
    }

    /// The last disposal this recognizer requested.
    pub fn requested_disposal(&self, id: RecognizerId) -> Option<Disposal> {
        self.store.get(id).map(|r| r.disposal)
    }

    // --- scope registration ---

    /// Register the competitors for a contact, most-specific first.
    ///
    /// Creates the scope lazily on first registration. Re-adding a member is
    /// a no-op; `High`-priority members are inserted ahead of `Low` ones.
    pub fn add_to_scope(&mut self, contact: ContactId, members: &[RecognizerId]) {
        let Self { store, scopes, .. } = self;
        let scope = scopes.entry(contact).or_insert_with(|| Scope::new(contact));
        for &m in members {
            scope.add_member(store, m);
        }
    }

    /// Record a device-kind observation; returns true when it differs from
    /// the kind of the sequences already in flight, in which case the caller
    /// should [`clean_all`](Self::clean_all) before registering new scopes.
    pub fn check_source_change(&mut self, kind: DeviceKind) -> bool {
        let changed = self.last_source.is_some_and(|k| k != kind) && !self.scopes.is_empty();
        self.last_source = Some(kind);
        changed
    }

    // --- event bookkeeping ---

    /// Record one contact sample for a recognizer (and, for groups, for the
    /// children the group routes events to).
    ///
    /// Call this after the detector has made any disposal request for the
    /// sample: a tap detector accepts on the release it is about to record.
    /// The first contact down moves a `Ready` recognizer to `Detecting`; the
    /// last contact up resets a still-`Detecting` recognizer to `Ready`,
    /// unless an enclosing group is still resolving (the group resets it
    /// later). Standing claims — pending, blocked, or committed — survive
    /// contact release and resolve through the scope instead.
    pub fn handle_event(&mut self, id: RecognizerId, event: &ContactEvent) {
        apply_event(&mut self.store, id, event);
    }

    // --- arbitration ---

    /// Request a verdict for a recognizer. The single arbitration entry
    /// point; see the [module docs](self) for the protocol.
    ///
    /// Requests from a recognizer inside a group are mediated by the group
    /// chain: the outermost group is the scope participant, and child
    /// verdicts are derived from the group's own. All returned notices are in
    /// delivery order.
    pub fn adjudicate(&mut self, id: RecognizerId, disposal: Disposal) -> Vec<Notice> {
        let mut out = Vec::new();
        let Self { store, scopes, .. } = self;
        dispatch(store, scopes, id, disposal, &mut out);
        out
    }

    // --- sequence lifecycle ---

    /// Close the scope for a contact whose sequence has ended.
    ///
    /// If a member still holds a pending claim the close is deferred until
    /// that claim resolves; the scope stays in the registry meanwhile.
    pub fn clean_scope(&mut self, contact: ContactId) -> Vec<Notice> {
        let mut out = Vec::new();
        let Self { store, scopes, .. } = self;
        let deferred = match scopes.get_mut(&contact) {
            Some(scope) if scope.is_pending(store) => {
                scope.set_delay_close(true);
                true
            }
            Some(_) => false,
            None => return out,
        };
        if !deferred {
            if let Some(scope) = scopes.remove(&contact) {
                scope.close(store, false, &mut out);
            }
        }
        out
    }

    /// Unconditional teardown: every member of every scope is reset, a
    /// committed winner is cancelled, and the registry is cleared. Used on
    /// surface teardown and window deactivation.
    pub fn clean_all(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        let scopes = core::mem::take(&mut self.scopes);
        for scope in scopes.into_values() {
            scope.close(&mut self.store, true, &mut out);
        }
        self.last_source = None;
        out
    }

    /// True if the scope for `contact` has committed a winner.
    pub fn has_winner(&self, contact: ContactId) -> bool {
        self.scopes
            .get(&contact)
            .is_some_and(|s| s.has_accepted())
    }

    /// True if every member of the contact's scope has resolved (vacuously
    /// true when no scope exists).
    pub fn query_all_done(&self, contact: ContactId) -> bool {
        self.scopes
            .get(&contact)
            .is_none_or(|s| s.query_all_done(&self.store))
    }
}

// --- engine internals ---

fn apply_event(store: &mut Store, id: RecognizerId, event: &ContactEvent) {
    let change = match store.get_mut(id) {
        Some(record) => record.tracker.apply(event),
        None => return,
    };
    match change {
        TrackerChange::Began => {
            if store.state(id) == Some(RefereeState::Ready) {
                store.set_state(id, RefereeState::Detecting);
            }
        }
        TrackerChange::Emptied => {
            if store.state(id) == Some(RefereeState::Detecting) && !needs_defer_reset(store, id) {
                reset_subtree(store, id);
            }
        }
        TrackerChange::Updated | TrackerChange::Released | TrackerChange::Ignored => {}
    }
    for child in event_targets(store, id) {
        apply_event(store, child, event);
    }
}

fn dispatch(
    store: &mut Store,
    scopes: &mut ScopeMap,
    id: RecognizerId,
    disposal: Disposal,
    out: &mut Vec<Notice>,
) {
    if !store.is_alive(id) || disposal == Disposal::None {
        return;
    }
    if let Some(r) = store.get_mut(id) {
        r.disposal = disposal;
    }
    let parent = store
        .get(id)
        .and_then(|r| r.group)
        .filter(|p| store.is_alive(*p));
    match parent {
        Some(group) => group_mediate(store, scopes, group, id, disposal, out),
        None => match disposal {
            Disposal::Accept => handle_accept(store, scopes, id, out),
            Disposal::Pending => handle_pending(store, scopes, id, out),
            Disposal::Reject => handle_reject(store, scopes, id, out),
            Disposal::None => {}
        },
    }
}

/// A group mediates its children's disposal requests: the group is the scope
/// participant, and child verdicts are derived from the group's.
fn group_mediate(
    store: &mut Store,
    scopes: &mut ScopeMap,
    group: RecognizerId,
    child: RecognizerId,
    disposal: Disposal,
    out: &mut Vec<Notice>,
) {
    let Some(group_mode) = mode(store, group) else {
        return;
    };
    match (group_mode, disposal) {
        (_, Disposal::None) => {}

        (GroupMode::Exclusive, Disposal::Accept) => {
            set_active_child(store, group, Some(child));
            dispatch(store, scopes, group, Disposal::Accept, out);
        }
        (GroupMode::Exclusive, Disposal::Pending) => {
            set_active_child(store, group, Some(child));
            dispatch(store, scopes, group, Disposal::Pending, out);
            mirror_pending(store, group, child, out);
        }
        (GroupMode::Exclusive, Disposal::Reject) => {
            let was_active = active_child(store, group) == Some(child);
            reject_member(store, child, out);
            if was_active || all_live_children_failed(store, group) {
                dispatch(store, scopes, group, Disposal::Reject, out);
            }
        }

        (GroupMode::Parallel, Disposal::Accept) => {
            if store.state(group) == Some(RefereeState::Succeed) {
                // The group already holds the sequence; later children win
                // independently without re-arbitrating.
                accept_locally(store, child, out);
                descend_accept(store, child, out);
            } else {
                set_active_child(store, group, Some(child));
                dispatch(store, scopes, group, Disposal::Accept, out);
            }
        }
        (GroupMode::Parallel, Disposal::Pending) => match store.state(group) {
            Some(RefereeState::Pending) | Some(RefereeState::Succeed) => {
                if store.state(child) != Some(RefereeState::Pending) {
                    store.set_state(child, RefereeState::Pending);
                    out.push(Notice::new(child, Verdict::Pending));
                }
            }
            _ => {
                dispatch(store, scopes, group, Disposal::Pending, out);
                mirror_pending(store, group, child, out);
            }
        },
        (GroupMode::Parallel, Disposal::Reject) => {
            reject_member(store, child, out);
            if all_live_children_failed(store, group) {
                dispatch(store, scopes, group, Disposal::Reject, out);
            }
        }

        (GroupMode::Sequence, Disposal::Accept) => {
            let last = live_children(store, group).last().copied();
            if last == Some(child) {
                set_active_child(store, group, Some(child));
                dispatch(store, scopes, group, Disposal::Accept, out);
            } else {
                // An intermediate phase completed; the sequence itself keeps
                // detecting.
                accept_locally(store, child, out);
                descend_accept(store, child, out);
            }
        }
        (GroupMode::Sequence, Disposal::Pending) => {
            dispatch(store, scopes, group, Disposal::Pending, out);
            mirror_pending(store, group, child, out);
        }
        (GroupMode::Sequence, Disposal::Reject) => {
            // A broken link fails the whole chain.
            reject_member(store, child, out);
            dispatch(store, scopes, group, Disposal::Reject, out);
        }
    }
}

fn mirror_pending(
    store: &mut Store,
    group: RecognizerId,
    child: RecognizerId,
    out: &mut Vec<Notice>,
) {
    match store.state(group) {
        Some(RefereeState::Pending) => {
            if store.state(child) != Some(RefereeState::Pending) {
                store.set_state(child, RefereeState::Pending);
                out.push(Notice::new(child, Verdict::Pending));
            }
        }
        Some(RefereeState::PendingBlocked) => {
            if store.state(child) != Some(RefereeState::PendingBlocked) {
                store.set_state(child, RefereeState::PendingBlocked);
                out.push(Notice::new(child, Verdict::Blocked));
            }
        }
        _ => {}
    }
}

fn all_live_children_failed(store: &Store, group: RecognizerId) -> bool {
    let children = live_children(store, group);
    !children.is_empty()
        && children
            .iter()
            .all(|c| store.state(*c) == Some(RefereeState::Fail))
}

fn handle_accept(
    store: &mut Store,
    scopes: &mut ScopeMap,
    id: RecognizerId,
    out: &mut Vec<Notice>,
) {
    let prev = store.state(id);
    if prev == Some(RefereeState::Succeed) {
        return;
    }
    let containing: Vec<ContactId> = scopes
        .iter()
        .filter(|(_, s)| s.existed(id))
        .map(|(c, _)| *c)
        .collect();
    if containing.is_empty() {
        // Never registered for any contact; nothing to win.
        return;
    }
    let blocked = containing
        .iter()
        .any(|c| scopes[c].check_need_blocked(store, id));
    if blocked {
        if prev != Some(RefereeState::SucceedBlocked) {
            store.set_state(id, RefereeState::SucceedBlocked);
            out.push(Notice::new(id, Verdict::Blocked));
        }
        return;
    }
    commit_accept(store, scopes, id, out);
    // A pending claim that resolved by winning may have been the member a
    // deferred close was waiting for.
    if prev == Some(RefereeState::Pending) {
        close_delayed(store, scopes, out);
    }
}

/// The commit step: performed once per winning decision and irreversible for
/// the losers.
fn commit_accept(
    store: &mut Store,
    scopes: &mut ScopeMap,
    id: RecognizerId,
    out: &mut Vec<Notice>,
) {
    accept_locally(store, id, out);
    descend_accept(store, id, out);

    let mut rejected_pending = false;
    let containing: Vec<ContactId> = scopes
        .iter()
        .filter(|(_, s)| s.existed(id))
        .map(|(c, _)| *c)
        .collect();
    for contact in containing {
        let Some(scope) = scopes.get_mut(&contact) else {
            continue;
        };
        scope.set_accepted();
        let members: Vec<RecognizerId> = scope.members().to_vec();
        for member in members {
            if member == id {
                continue;
            }
            let Some(record) = store.get(member) else {
                continue;
            };
            if record.bridged {
                // Bridged members are pure listeners; a local winner does not
                // reject them.
                continue;
            }
            if record.state == RefereeState::Pending {
                rejected_pending = true;
            }
            reject_member(store, member, out);
        }
    }
    if rejected_pending {
        unblock_cascade(store, scopes, out);
        close_delayed(store, scopes, out);
    }
}

/// Mark `id` as the winner and forward the accept to its bridge peers.
fn accept_locally(store: &mut Store, id: RecognizerId, out: &mut Vec<Notice>) {
    if store.state(id) == Some(RefereeState::Succeed) {
        return;
    }
    store.set_state(id, RefereeState::Succeed);
    out.push(Notice::new(id, Verdict::Accepted));
    push_bridge(store, id, out, true);
}

/// Propagate a committed group win to the child whose claim it escalated:
/// exclusive groups force-reject the remaining siblings, parallel and
/// sequence groups touch only the winning child.
fn descend_accept(store: &mut Store, id: RecognizerId, out: &mut Vec<Notice>) {
    let Some(group_mode) = mode(store, id) else {
        return;
    };
    let Some(child) = active_child(store, id) else {
        return;
    };
    accept_locally(store, child, out);
    if group_mode == GroupMode::Exclusive {
        for sibling in live_children(store, id) {
            if sibling != child {
                reject_member(store, sibling, out);
            }
        }
    }
    descend_accept(store, child, out);
}

fn handle_pending(
    store: &mut Store,
    scopes: &mut ScopeMap,
    id: RecognizerId,
    out: &mut Vec<Notice>,
) {
    match store.state(id) {
        Some(RefereeState::Ready) | Some(RefereeState::Detecting) => {}
        // Standing claims and terminal states keep their standing.
        _ => return,
    }
    let containing: Vec<ContactId> = scopes
        .iter()
        .filter(|(_, s)| s.existed(id))
        .map(|(c, _)| *c)
        .collect();
    if containing.is_empty() {
        return;
    }
    let blocked = containing
        .iter()
        .any(|c| scopes[c].check_need_blocked(store, id));
    if blocked {
        store.set_state(id, RefereeState::PendingBlocked);
        out.push(Notice::new(id, Verdict::Blocked));
    } else {
        store.set_state(id, RefereeState::Pending);
        out.push(Notice::new(id, Verdict::Pending));
    }
}

fn handle_reject(
    store: &mut Store,
    scopes: &mut ScopeMap,
    id: RecognizerId,
    out: &mut Vec<Notice>,
) {
    let Some(prev) = store.state(id) else {
        return;
    };
    if prev == RefereeState::Fail {
        return;
    }
    reject_member(store, id, out);
    if prev == RefereeState::Pending {
        unblock_cascade(store, scopes, out);
        close_delayed(store, scopes, out);
    }
}

/// Fail a recognizer: cancel a committed win, notify, forward to bridge
/// peers, and fail every non-terminal descendant the same way.
fn reject_member(store: &mut Store, id: RecognizerId, out: &mut Vec<Notice>) {
    let Some(prev) = store.state(id) else {
        return;
    };
    if prev == RefereeState::Fail {
        return;
    }
    if prev == RefereeState::Succeed {
        out.push(Notice::new(id, Verdict::SucceedCanceled));
    }
    store.set_state(id, RefereeState::Fail);
    out.push(Notice::new(id, Verdict::Rejected));
    push_bridge(store, id, out, false);
    for child in live_children(store, id) {
        reject_descendant(store, child, out);
    }
}

fn reject_descendant(store: &mut Store, id: RecognizerId, out: &mut Vec<Notice>) {
    match store.state(id) {
        None | Some(RefereeState::Fail) | Some(RefereeState::Ready) => {}
        Some(prev) => {
            if prev == RefereeState::Succeed {
                out.push(Notice::new(id, Verdict::SucceedCanceled));
            }
            store.set_state(id, RefereeState::Fail);
            out.push(Notice::new(id, Verdict::Rejected));
            push_bridge(store, id, out, false);
        }
    }
    for child in live_children(store, id) {
        reject_descendant(store, child, out);
    }
}

fn push_bridge(store: &Store, id: RecognizerId, out: &mut Vec<Notice>, accepted: bool) {
    let Some(record) = store.get(id) else {
        return;
    };
    if !record.bridged {
        return;
    }
    for &peer in &record.bridge_peers {
        let verdict = if accepted {
            Verdict::BridgeAccepted(peer)
        } else {
            Verdict::BridgeRejected(peer)
        };
        out.push(Notice::new(id, verdict));
    }
}

/// Promote at most one queued member after a pending claim resolved.
///
/// Scopes are scanned in ascending contact order, members in registration
/// order; the first queued member found is the promotion candidate. A
/// `PendingBlocked` member re-enters the pending queue (and may stay queued
/// if a different member still blocks it); a `SucceedBlocked` member commits
/// through the accept path. Performed iteratively — the accept path never
/// re-enters the cascade for the same reject.
fn unblock_cascade(store: &mut Store, scopes: &mut ScopeMap, out: &mut Vec<Notice>) {
    let pick: Option<(ContactId, RecognizerId)> = scopes
        .iter()
        .find_map(|(c, s)| s.pick_blocked(store).map(|m| (*c, m)));
    let Some((contact, member)) = pick else {
        return;
    };
    let still_blocked = scopes
        .get(&contact)
        .is_some_and(|s| s.check_need_blocked(store, member));
    if still_blocked {
        return;
    }
    match store.state(member) {
        Some(RefereeState::PendingBlocked) => {
            store.set_state(member, RefereeState::Pending);
            out.push(Notice::new(member, Verdict::Pending));
        }
        Some(RefereeState::SucceedBlocked) => {
            commit_accept(store, scopes, member, out);
        }
        _ => {}
    }
}

/// Close scopes whose deferred close became possible: the pending member that
/// held them open has resolved.
fn close_delayed(store: &mut Store, scopes: &mut ScopeMap, out: &mut Vec<Notice>) {
    let ready: Vec<ContactId> = scopes
        .iter()
        .filter(|(_, s)| s.delay_close() && !s.is_pending(store))
        .map(|(c, _)| *c)
        .collect();
    for contact in ready {
        if let Some(scope) = scopes.remove(&contact) {
            scope.close(store, false, out);
        }
    }
}
