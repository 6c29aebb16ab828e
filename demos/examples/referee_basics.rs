// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Referee basics.
//!
//! Two detectors compete for one contact: a "long press" that parks a
//! pending claim, and a "tap" that tries to accept on release and queues
//! behind it. When the long press gives up, the banked tap win commits
//! through the cascade.
//!
//! Run:
//! - `cargo run -p overstory_demos --example referee_basics`

use kurbo::Point;
use overstory_contact::{ContactEvent, ContactId, ContactPhase, DeviceKind};
use overstory_gesture::{Disposal, Notice, PolicyMask, Priority, Referee};

fn sample(contact: ContactId, phase: ContactPhase, t: u64) -> ContactEvent {
    ContactEvent {
        id: contact,
        position: Point::new(120.0, 80.0),
        phase,
        device: DeviceKind::Touch,
        timestamp_us: t,
    }
}

fn report(label: &str, batch: &[Notice]) {
    if batch.is_empty() {
        println!("  {label}: (no notices)");
        return;
    }
    println!("  {label}:");
    for n in batch {
        println!("    {:?} -> {:?}", n.target, n.verdict);
    }
}

fn main() {
    let mut referee = Referee::new();
    let long_press = referee.insert_leaf(Priority::Low, PolicyMask::empty());
    let tap = referee.insert_leaf(Priority::Low, PolicyMask::empty());

    // Hit-testing found both detectors under the finger; register them for
    // the fresh contact, most-specific first.
    let contact = ContactId(1);
    referee.add_to_scope(contact, &[long_press, tap]);
    referee.handle_event(long_press, &sample(contact, ContactPhase::Down, 0));
    referee.handle_event(tap, &sample(contact, ContactPhase::Down, 0));

    println!("== long press parks a pending claim ==");
    let batch = referee.adjudicate(long_press, Disposal::Pending);
    report("pending", &batch);

    println!("== tap accepts on release, but queues behind the claim ==");
    let batch = referee.adjudicate(tap, Disposal::Accept);
    report("accept", &batch);
    referee.handle_event(long_press, &sample(contact, ContactPhase::Up, 90_000));
    referee.handle_event(tap, &sample(contact, ContactPhase::Up, 90_000));

    println!("== the long press gives up; the banked win commits ==");
    let batch = referee.adjudicate(long_press, Disposal::Reject);
    report("reject", &batch);

    println!("== sequence ends ==");
    let batch = referee.clean_scope(contact);
    report("clean", &batch);
    println!(
        "  final states: long_press={:?} tap={:?}",
        referee.state(long_press),
        referee.state(tap)
    );
}
