use std::hint::black_box;

use ausleihe::assignment::{AssignmentRef, Availability};
use ausleihe::resolver::{authorized_sets, sort_sets};
use ausleihe::types::{Role, Set, User};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

const MANUFACTURERS: [&str; 6] = ["Bosch", "Fluke", "Makita", "Ölflex", "apple", "Übertragungstechnik"];

/// A catalog where every third set is free and the rest are spread over `groups`.
fn catalog(size: usize, groups: &[Uuid]) -> Vec<Set> {
    (0..size)
        .map(|i| {
            let availability = if i % 3 == 0 {
                Availability::Free
            } else {
                Availability::Restricted(vec![AssignmentRef::Group(groups[i % groups.len()])])
            };
            Set {
                id: Uuid::new_v4(),
                manufacturer_id: Uuid::new_v4(),
                manufacturer_name: MANUFACTURERS[i % MANUFACTURERS.len()].to_string(),
                set_name_id: Uuid::new_v4(),
                set_name: format!("Set {}", size - i),
                category_id: None,
                set_number: i.to_string(),
                state_id: None,
                availability,
                version: 0,
            }
        })
        .collect()
}

fn benchmark_authorized_sets(c: &mut Criterion) {
    let groups: Vec<Uuid> = (0..20).map(|_| Uuid::new_v4()).collect();
    let user = User {
        id: Uuid::new_v4(),
        username: "ausleiher".to_string(),
        role: Role::User,
        set_assignments: groups.iter().take(3).copied().map(AssignmentRef::Group).collect(),
        version: 0,
    };

    let mut group = c.benchmark_group("authorized_sets");
    for size in [100usize, 1_000, 10_000] {
        let sets = catalog(size, &groups);
        group.bench_with_input(BenchmarkId::from_parameter(size), &sets, |b, sets| {
            b.iter(|| black_box(authorized_sets(&user, sets)))
        });
    }
    group.finish();
}

fn benchmark_sort(c: &mut Criterion) {
    let groups = [Uuid::new_v4()];
    let sets = catalog(5_000, &groups);

    c.bench_function("sort_sets_5000", |b| {
        b.iter(|| {
            let mut sets = sets.clone();
            sort_sets(&mut sets);
            black_box(sets)
        })
    });
}

criterion_group!(benches, benchmark_authorized_sets, benchmark_sort);
criterion_main!(benches);
