// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for gesture arbitration: states, disposals, priorities,
//! composition modes, and the notice batch the referee emits.
//!
//! ## Overview
//!
//! These types describe the arbitration protocol. A recognizer asks the
//! referee for a [`Disposal`]; the referee answers by appending [`Notice`]s
//! to the batch returned from
//! [`Referee::adjudicate`](crate::referee::Referee::adjudicate), which the
//! embedding toolkit dispatches as its own callbacks.

use crate::store::RecognizerId;

/// Lifecycle state of a recognizer within the arbitration protocol.
///
/// Transitions are driven by contact events and by referee verdicts; see the
/// [referee](crate::referee) docs for the full table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RefereeState {
    /// Initial / reset state; no active contact.
    Ready,
    /// At least one contact is down and no verdict has been requested yet.
    Detecting,
    /// Wants to win but waits for the scope to resolve.
    Pending,
    /// Asked to be pending while an earlier claimant occupies the scope.
    PendingBlocked,
    /// Internally complete, but the win is withheld until unblocked.
    SucceedBlocked,
    /// Won the sequence; sole active handler until it ends.
    Succeed,
    /// Lost or self-rejected. Terminal until reset.
    Fail,
}

impl RefereeState {
    /// Returns true for the two terminal states.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeed | Self::Fail)
    }

    /// Returns true for the two queued-behind-a-blocker states.
    pub const fn is_blocked(self) -> bool {
        matches!(self, Self::PendingBlocked | Self::SucceedBlocked)
    }
}

/// Verdict a recognizer requests from the referee.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Disposal {
    /// No request made yet.
    None,
    /// Claim the sequence outright.
    Accept,
    /// Claim the sequence, but yield to earlier claimants until they resolve.
    Pending,
    /// Give up on the sequence.
    Reject,
}

/// Ordinal priority used to order members within a scope.
///
/// `High` members are registered ahead of `Low` members, which gives them
/// blocking precedence (scope order is registration order).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Priority {
    /// Default precedence.
    Low,
    /// Registered ahead of `Low` members in every scope.
    High,
}

bitflags::bitflags! {
    /// Per-recognizer arbitration policy bits.
    ///
    /// Empty is the normal policy: the recognizer both blocks and can be
    /// blocked like any other member.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PolicyMask: u8 {
        /// The recognizer is never blocked by pending members.
        const NEVER_BLOCKED = 0b0000_0001;
        /// The recognizer never blocks other members while pending.
        const ALWAYS_YIELD  = 0b0000_0010;
    }
}

/// Composition mode of a recognizer group.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GroupMode {
    /// Only one child may win; the group force-rejects the siblings of the
    /// winning child before claiming the sequence itself.
    Exclusive,
    /// Children resolve independently; the group only aggregates for
    /// reporting.
    Parallel,
    /// Children must succeed in declared order; a child only sees contact
    /// events once its predecessor has succeeded.
    Sequence,
}

/// Opaque token naming a bridged peer outside the local arbitration domain.
///
/// The embedding surface allocates these and routes
/// [`Verdict::BridgeAccepted`] / [`Verdict::BridgeRejected`] notices to the
/// peer they name. Peers never participate in blocking.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct BridgePeer(pub u64);

/// The verdict carried by one [`Notice`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The recognizer won the sequence. Maps onto the toolkit's
    /// `on_accepted`; action callbacks may fire from here on.
    Accepted,
    /// The recognizer lost the sequence. Maps onto `on_rejected`.
    Rejected,
    /// The pending claim was registered. Maps onto `on_pending`.
    Pending,
    /// The request was queued behind an earlier claimant. Maps onto
    /// `on_blocked`.
    Blocked,
    /// A committed winner was revoked (evicted by a later accept, or
    /// cancelled by a forced clean) and must cancel its in-flight action.
    SucceedCanceled,
    /// Forward an accept to the named bridged peer.
    BridgeAccepted(BridgePeer),
    /// Forward a reject to the named bridged peer.
    BridgeRejected(BridgePeer),
}

/// One referee-to-recognizer notification.
///
/// Batches of notices are returned in delivery order from every arbitration
/// operation; dispatching them in order reproduces the callback ordering the
/// protocol guarantees.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    /// The recognizer the verdict is addressed to.
    pub target: RecognizerId,
    /// The verdict.
    pub verdict: Verdict,
}

impl Notice {
    pub(crate) const fn new(target: RecognizerId, verdict: Verdict) -> Self {
        Self { target, verdict }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(RefereeState::Succeed.is_terminal());
        assert!(RefereeState::Fail.is_terminal());
        assert!(!RefereeState::Pending.is_terminal());
        assert!(!RefereeState::SucceedBlocked.is_terminal());
    }

    #[test]
    fn blocked_states() {
        assert!(RefereeState::PendingBlocked.is_blocked());
        assert!(RefereeState::SucceedBlocked.is_blocked());
        assert!(!RefereeState::Pending.is_blocked());
        assert!(!RefereeState::Succeed.is_blocked());
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::High > Priority::Low);
    }

    #[test]
    fn policy_mask_default_is_normal() {
        assert_eq!(PolicyMask::default(), PolicyMask::empty());
        assert!(!PolicyMask::default().contains(PolicyMask::NEVER_BLOCKED));
    }
}
