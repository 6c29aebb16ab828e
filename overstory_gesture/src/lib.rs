// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=overstory_gesture --heading-base-level=0

//! Overstory Gesture: a deterministic arbitration core for competing gesture
//! recognizers.
//!
//! ## Overview
//!
//! When several gesture detectors watch overlapping regions, at most one of
//! them may win a given touch sequence. This crate provides the machinery
//! that decides which: the per-recognizer state machine, composable
//! recognizer groups (exclusive / parallel / sequence), per-contact gesture
//! scopes with deterministic blocking rules, and the
//! [`Referee`](crate::referee::Referee) that mediates every claim.
//!
//! It does not detect gestures. Leaf detectors — the code that decides
//! whether a drag crossed its threshold or a tap stayed put — live with the
//! caller; this crate is the contract they plug into.
//!
//! ## Inputs
//!
//! - Hit-testing supplies the competitors for a fresh contact via
//!   [`Referee::add_to_scope`](crate::referee::Referee::add_to_scope),
//!   most-specific first.
//! - The event source feeds normalized
//!   [`ContactEvent`](overstory_contact::ContactEvent) samples to
//!   [`Referee::handle_event`](crate::referee::Referee::handle_event).
//! - Detectors request verdicts — `Accept`, `Pending`, or `Reject` — through
//!   the single entry point
//!   [`Referee::adjudicate`](crate::referee::Referee::adjudicate).
//!
//! ## Outputs
//!
//! Every arbitration operation returns an ordered batch of
//! [`Notice`](crate::types::Notice) values. The embedding toolkit maps them
//! onto its own callbacks: `Accepted` unlocks the detector's action
//! callbacks, `Rejected` cancels it, `Pending`/`Blocked` report queueing, and
//! the bridge verdicts forward outcomes to peers on other surfaces. Nothing
//! in this crate calls back into the caller; the batch *is* the callback
//! sequence, in delivery order.
//!
//! ## Guarantees
//!
//! - At most one member of a scope holds `Succeed` at any time.
//! - A blocked claim stays blocked until its blocker resolves; each
//!   resolution promotes at most one queued member, iteratively.
//! - Every operation is total: requests on stale handles, unregistered
//!   contacts, or already-terminal recognizers degrade to no-ops, never
//!   errors.
//!
//! ## Workflow
//!
//! 1) Register recognizers (and groups) once, when their owning scene nodes
//!    are built.
//! 2) On a fresh contact, hit-test and call `add_to_scope` with the result.
//! 3) For each sample: let detectors adjudicate, then record the sample with
//!    `handle_event`, and dispatch the returned notices.
//! 4) When the sequence ends, call
//!    [`clean_scope`](crate::referee::Referee::clean_scope); it defers behind
//!    pending claims automatically. Call
//!    [`clean_all`](crate::referee::Referee::clean_all) on surface teardown.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod group;
mod scope;

pub mod inspect;
pub mod referee;
pub mod store;
pub mod types;

pub use inspect::{MemberSnapshot, RecognizerSnapshot, ScopeSnapshot};
pub use referee::Referee;
pub use store::RecognizerId;
pub use types::{
    BridgePeer, Disposal, GroupMode, Notice, PolicyMask, Priority, RefereeState, Verdict,
};
