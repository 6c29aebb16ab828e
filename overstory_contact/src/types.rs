// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for contact input: ids, phases, device kinds, and event records.

use kurbo::Point;

/// Identifier for one continuous contact (pointer-down to pointer-up).
///
/// The id is assigned by the event source and stays stable for the lifetime
/// of the contact. Touch ids are small integers; non-contact devices use the
/// reserved synthetic ids near the top of the range (see
/// [`DeviceKind::synthetic_contact`]).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ContactId(pub u32);

impl ContactId {
    /// Synthetic id carrying mouse events without an active button contact.
    pub const MOUSE: Self = Self(u32::MAX);
    /// Synthetic id carrying wheel/scroll axis events.
    pub const AXIS: Self = Self(u32::MAX - 1);
    /// Synthetic id carrying hover (proximity) events.
    pub const HOVER: Self = Self(u32::MAX - 2);

    /// Returns true if this is one of the reserved synthetic ids.
    pub const fn is_synthetic(self) -> bool {
        self.0 >= Self::HOVER.0
    }
}

/// Phase of a contact sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContactPhase {
    /// The contact begins (finger down, button press, axis engage).
    Down,
    /// The contact moved while down.
    Move,
    /// The contact ended normally.
    Up,
    /// The contact was aborted by the platform (palm rejection, window loss).
    Cancel,
}

impl ContactPhase {
    /// Returns true for `Up` and `Cancel`, the phases that release a contact.
    pub const fn releases(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }
}

/// Kind of input device a contact sample originated from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeviceKind {
    /// Direct touch.
    Touch,
    /// Mouse pointer.
    Mouse,
    /// Stylus/pen.
    Pen,
    /// Axis device (wheel/scroll); has no physical contact point.
    Axis,
    /// Hover/proximity; has no physical contact point.
    Hover,
}

impl DeviceKind {
    /// The reserved contact id used when this device kind has no physical
    /// contact of its own.
    ///
    /// Touch and pen contacts carry real ids from the event source and return
    /// `None` here.
    pub const fn synthetic_contact(self) -> Option<ContactId> {
        match self {
            Self::Touch | Self::Pen => None,
            Self::Mouse => Some(ContactId::MOUSE),
            Self::Axis => Some(ContactId::AXIS),
            Self::Hover => Some(ContactId::HOVER),
        }
    }
}

/// A normalized contact sample, one per input event.
///
/// Produced by the embedding event source and consumed by gesture
/// recognizers via [`ContactTracker`](crate::tracker::ContactTracker).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactEvent {
    /// Source-assigned contact id. Ignored for devices with a synthetic id.
    pub id: ContactId,
    /// Position in surface coordinates.
    pub position: Point,
    /// Phase of this sample.
    pub phase: ContactPhase,
    /// Originating device kind.
    pub device: DeviceKind,
    /// Monotonic timestamp in microseconds.
    pub timestamp_us: u64,
}

impl ContactEvent {
    /// The contact id this event should be tracked and arbitrated under.
    ///
    /// Devices without a physical contact point (wheel, hover, plain mouse
    /// moves) are folded onto their reserved synthetic id so the arbitration
    /// protocol stays device-agnostic.
    pub fn routing_id(&self) -> ContactId {
        self.device.synthetic_contact().unwrap_or(self.id)
    }
}
