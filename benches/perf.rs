use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use hoops_career::Store;
use hoops_career::features::derive_table;
use hoops_career::similarity::{SimilaritySpace, SpaceKind};
use hoops_career::synthetic::{self, SyntheticRoster};

const SEASON: i32 = 2025;

fn roster() -> SyntheticRoster {
    synthetic::generate(1_500, SEASON, 2024)
}

fn bench_derive_table(c: &mut Criterion) {
    let roster = roster();
    c.bench_function("derive_table", |b| {
        b.iter(|| {
            let rows = derive_table(black_box(roster.seasons.clone()));
            black_box(rows.len());
        })
    });
}

fn bench_store_build(c: &mut Criterion) {
    let roster = roster();
    c.bench_function("store_build", |b| {
        b.iter(|| {
            let store = Store::from_raw(roster.seasons.clone(), &roster.bio, SEASON);
            black_box(store.players().len());
        })
    });
}

fn bench_counting_space_build(c: &mut Criterion) {
    let rows = derive_table(roster().seasons);
    c.bench_function("counting_space_build", |b| {
        b.iter(|| {
            let space = SimilaritySpace::build(SpaceKind::CountingGeometry, black_box(&rows), SEASON);
            black_box(space.map(|s| s.len()).unwrap_or(0));
        })
    });
}

fn bench_comps(c: &mut Criterion) {
    let roster = roster();
    let store = Store::from_raw(roster.seasons, &roster.bio, SEASON);
    let ids = store
        .players()
        .iter()
        .filter(|p| p.qualifying_seasons >= 3)
        .map(|p| p.player_id)
        .take(50)
        .collect::<Vec<_>>();
    c.bench_function("comps_k3_x50", |b| {
        b.iter(|| {
            for pid in &ids {
                let set = store.comps(black_box(*pid), 3).map(|s| s.comps.len());
                black_box(set.unwrap_or(0));
            }
        })
    });
}

fn bench_label_summary(c: &mut Criterion) {
    let roster = roster();
    c.bench_function("label_summary_cold", |b| {
        b.iter(|| {
            let store = Store::from_raw(roster.seasons.clone(), &roster.bio, SEASON);
            black_box(store.label_summary().total_players);
        })
    });
}

criterion_group!(
    benches,
    bench_derive_table,
    bench_store_build,
    bench_counting_space_build,
    bench_comps,
    bench_label_summary
);
criterion_main!(benches);
