// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recognizer groups.
//!
//! An exclusive group arbitrates three sibling detectors as one scope
//! participant: the first child to accept wins the whole group, and the
//! group force-rejects the other two before committing. A second part shows
//! a sequence group gating its later child on the earlier one.
//!
//! Run:
//! - `cargo run -p overstory_demos --example gesture_groups`

use kurbo::Point;
use overstory_contact::{ContactEvent, ContactId, ContactPhase, DeviceKind};
use overstory_gesture::{Disposal, GroupMode, Notice, PolicyMask, Priority, Referee};

fn down(contact: ContactId) -> ContactEvent {
    ContactEvent {
        id: contact,
        position: Point::new(50.0, 50.0),
        phase: ContactPhase::Down,
        device: DeviceKind::Touch,
        timestamp_us: 0,
    }
}

fn report(label: &str, batch: &[Notice]) {
    println!("  {label}:");
    for n in batch {
        println!("    {:?} -> {:?}", n.target, n.verdict);
    }
}

fn main() {
    println!("== exclusive: first child to accept evicts its siblings ==");
    {
        let mut referee = Referee::new();
        let tap = referee.insert_leaf(Priority::Low, PolicyMask::empty());
        let double_tap = referee.insert_leaf(Priority::Low, PolicyMask::empty());
        let pan = referee.insert_leaf(Priority::Low, PolicyMask::empty());
        let group = referee.insert_group(
            GroupMode::Exclusive,
            Priority::Low,
            PolicyMask::empty(),
            &[tap, double_tap, pan],
        );

        let contact = ContactId(1);
        referee.add_to_scope(contact, &[group]);
        referee.handle_event(group, &down(contact));

        let batch = referee.adjudicate(pan, Disposal::Accept);
        report("pan accepts", &batch);
        println!(
            "  group derived state: {:?}",
            referee.derived_state(group).unwrap()
        );
        let _ = referee.clean_scope(contact);
    }

    println!("== sequence: the drag child waits for the press child ==");
    {
        let mut referee = Referee::new();
        let press = referee.insert_leaf(Priority::Low, PolicyMask::empty());
        let drag = referee.insert_leaf(Priority::Low, PolicyMask::empty());
        let group = referee.insert_group(
            GroupMode::Sequence,
            Priority::Low,
            PolicyMask::empty(),
            &[press, drag],
        );

        let contact = ContactId(2);
        referee.add_to_scope(contact, &[group]);
        referee.handle_event(group, &down(contact));
        println!(
            "  after down: press={:?} drag={:?}",
            referee.state(press).unwrap(),
            referee.state(drag).unwrap()
        );

        let batch = referee.adjudicate(press, Disposal::Accept);
        report("press phase completes", &batch);

        // Now the drag child starts receiving contact samples.
        referee.handle_event(group, &down(contact));
        println!(
            "  after next sample: drag={:?}",
            referee.state(drag).unwrap()
        );

        let batch = referee.adjudicate(drag, Disposal::Accept);
        report("drag phase completes", &batch);
        println!(
            "  group derived state: {:?}",
            referee.derived_state(group).unwrap()
        );
    }
}
