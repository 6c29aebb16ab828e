// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Point;
use overstory_contact::{ContactEvent, ContactId, ContactPhase, DeviceKind};
use overstory_gesture::{Disposal, GroupMode, PolicyMask, Priority, Referee, RecognizerId};

fn down(contact: ContactId) -> ContactEvent {
    ContactEvent {
        id: contact,
        position: Point::new(100.0, 100.0),
        phase: ContactPhase::Down,
        device: DeviceKind::Touch,
        timestamp_us: 0,
    }
}

fn build_flat(n: usize) -> (Referee, Vec<RecognizerId>) {
    let mut referee = Referee::new();
    let ids: Vec<RecognizerId> = (0..n)
        .map(|_| referee.insert_leaf(Priority::Low, PolicyMask::empty()))
        .collect();
    (referee, ids)
}

fn build_grouped(groups: usize, per_group: usize) -> (Referee, Vec<RecognizerId>, Vec<RecognizerId>) {
    let mut referee = Referee::new();
    let mut group_ids = Vec::with_capacity(groups);
    let mut first_children = Vec::with_capacity(groups);
    for _ in 0..groups {
        let children: Vec<RecognizerId> = (0..per_group)
            .map(|_| referee.insert_leaf(Priority::Low, PolicyMask::empty()))
            .collect();
        first_children.push(children[0]);
        group_ids.push(referee.insert_group(
            GroupMode::Exclusive,
            Priority::Low,
            PolicyMask::empty(),
            &children,
        ));
    }
    (referee, group_ids, first_children)
}

fn bench_register_and_clean(c: &mut Criterion) {
    let mut g = c.benchmark_group("scope_register_clean");
    for &n in &[4_usize, 16, 64] {
        g.throughput(Throughput::Elements(n as u64));
        g.bench_function(format!("members_{n}"), |b| {
            b.iter_batched(
                || build_flat(n),
                |(mut referee, ids)| {
                    let contact = ContactId(1);
                    referee.add_to_scope(contact, &ids);
                    for &id in &ids {
                        referee.handle_event(id, &down(contact));
                    }
                    let batch = referee.clean_scope(contact);
                    black_box(batch);
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

fn bench_accept_commit(c: &mut Criterion) {
    let mut g = c.benchmark_group("accept_commit");
    for &n in &[4_usize, 16, 64] {
        g.throughput(Throughput::Elements(n as u64));
        g.bench_function(format!("losers_{n}"), |b| {
            b.iter_batched(
                || {
                    let (mut referee, ids) = build_flat(n);
                    let contact = ContactId(1);
                    referee.add_to_scope(contact, &ids);
                    for &id in &ids {
                        referee.handle_event(id, &down(contact));
                    }
                    (referee, ids)
                },
                |(mut referee, ids)| {
                    let batch = referee.adjudicate(ids[0], Disposal::Accept);
                    black_box(batch);
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

fn bench_pending_reject_cascade(c: &mut Criterion) {
    let mut g = c.benchmark_group("reject_cascade");
    for &n in &[4_usize, 16, 64] {
        g.throughput(Throughput::Elements(n as u64));
        g.bench_function(format!("queued_{n}"), |b| {
            b.iter_batched(
                || {
                    let (mut referee, ids) = build_flat(n);
                    let contact = ContactId(1);
                    referee.add_to_scope(contact, &ids);
                    for &id in &ids {
                        referee.handle_event(id, &down(contact));
                    }
                    // First member pends; the rest queue behind it.
                    for &id in &ids {
                        let _ = referee.adjudicate(id, Disposal::Pending);
                    }
                    (referee, ids)
                },
                |(mut referee, ids)| {
                    let batch = referee.adjudicate(ids[0], Disposal::Reject);
                    black_box(batch);
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

fn bench_group_escalation(c: &mut Criterion) {
    let mut g = c.benchmark_group("group_escalation");
    for &(groups, per_group) in &[(4_usize, 4_usize), (16, 4)] {
        g.throughput(Throughput::Elements((groups * per_group) as u64));
        g.bench_function(format!("groups_{groups}x{per_group}"), |b| {
            b.iter_batched(
                || {
                    let (mut referee, group_ids, first_children) =
                        build_grouped(groups, per_group);
                    let contact = ContactId(1);
                    referee.add_to_scope(contact, &group_ids);
                    for &id in &group_ids {
                        referee.handle_event(id, &down(contact));
                    }
                    (referee, first_children)
                },
                |(mut referee, first_children)| {
                    let batch = referee.adjudicate(first_children[0], Disposal::Accept);
                    black_box(batch);
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_register_and_clean,
    bench_accept_commit,
    bench_pending_reject_cascade,
    bench_group_escalation
);
criterion_main!(benches);
