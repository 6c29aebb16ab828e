// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Contact: normalized contact events and per-participant bookkeeping.
//!
//! ## Overview
//!
//! This crate is the input vocabulary shared by the gesture layer:
//!
//! - [`ContactEvent`](crate::types::ContactEvent) is the normalized record an
//!   event source produces for one touch/pointer sample: a stable
//!   [`ContactId`](crate::types::ContactId), a position, a
//!   [`ContactPhase`](crate::types::ContactPhase), a
//!   [`DeviceKind`](crate::types::DeviceKind), and a timestamp.
//! - [`ContactTracker`](crate::tracker::ContactTracker) is the per-participant
//!   bookkeeping of which contacts are currently down and where they last
//!   were. Gesture recognizers use it to know when they have reached zero
//!   active contacts and may reset.
//!
//! ## Synthetic contacts
//!
//! Non-contact devices (wheel, hover) reuse the same contact map through a
//! reserved synthetic id per device kind, so higher layers stay
//! device-agnostic. See [`DeviceKind::synthetic_contact`](crate::types::DeviceKind::synthetic_contact)
//! and [`ContactEvent::routing_id`](crate::types::ContactEvent::routing_id).
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod tracker;
pub mod types;

pub use tracker::{ContactTracker, TrackerChange};
pub use types::{ContactEvent, ContactId, ContactPhase, DeviceKind};
