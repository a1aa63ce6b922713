use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mentormatch::{
    CacheConfig, CandidateProfile, Capacity, InMemoryProfileStore, InMemorySnapshotStore,
    MatchCache, ScoreEngine, SubjectProfile,
};

const DOMAINS: &[&str] = &["AI", "Web", "Data", "Cloud", "Security", "Mobile", "Design"];
const SKILLS: &[&str] = &[
    "rust", "python", "sql", "go", "react", "kubernetes", "terraform", "swift", "figma",
];
const TITLES: &[&str] = &[
    "Staff Engineer",
    "Product Manager",
    "Data Scientist",
    "Security Analyst",
    "Designer",
];

fn subject() -> SubjectProfile {
    SubjectProfile {
        id: "bench-student".into(),
        skills: vec!["Rust".into(), "SQL".into(), "Kubernetes".into()],
        domains: vec!["Cloud".into(), "Data".into()],
        career_goals: Some("grow into a staff engineer on data platforms".into()),
    }
}

/// Deterministic pool with a spread of overlaps and eligibility.
fn pool(size: usize) -> Vec<CandidateProfile> {
    (0..size)
        .map(|i| CandidateProfile {
            id: format!("mentor-{i:05}"),
            name: None,
            skills: (0..3)
                .map(|j| SKILLS[(i + j * 2) % SKILLS.len()].to_string())
                .collect(),
            domains: (0..2)
                .map(|j| DOMAINS[(i + j * 3) % DOMAINS.len()].to_string())
                .collect(),
            job_title: Some(TITLES[i % TITLES.len()].to_string()),
            company: Some(format!("Company {}", i % 13)),
            years_of_experience: (i % 15) as u32,
            is_available: i % 7 != 0,
            capacity: Capacity {
                current: (i % 4) as u32,
                max: 3,
            },
        })
        .collect()
}

fn bench_score_pair(c: &mut Criterion) {
    let engine = ScoreEngine::default();
    let student = subject();
    let candidates = pool(1);
    let mentor = &candidates[0];

    c.bench_function("score_pair", |b| {
        b.iter(|| black_box(engine.score(black_box(&student), black_box(mentor))))
    });
}

fn bench_rank_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_pool");
    let engine = ScoreEngine::default();
    let student = subject();

    for size in [100usize, 1_000, 10_000] {
        let candidates = pool(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, input| {
            b.iter(|| black_box(engine.rank_pool(&student, input.clone())))
        });
    }

    group.finish();
}

fn bench_cache_paths(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");

    let profiles = Arc::new(InMemoryProfileStore::new());
    profiles.upsert_subject(subject());
    for candidate in pool(1_000) {
        profiles.upsert_candidate(candidate);
    }

    let cache = MatchCache::new(
        profiles,
        Arc::new(InMemorySnapshotStore::new()),
        ScoreEngine::default(),
        CacheConfig::default(),
    );
    rt.block_on(cache.get_matches("bench-student", 10, false))
        .expect("warm-up");

    let mut group = c.benchmark_group("match_cache");
    group.bench_function("hit", |b| {
        b.iter(|| {
            rt.block_on(cache.get_matches(black_box("bench-student"), 10, false))
                .expect("hit")
        })
    });
    group.bench_function("recompute_1000", |b| {
        b.iter(|| {
            rt.block_on(cache.get_matches(black_box("bench-student"), 10, true))
                .expect("recompute")
        })
    });
    group.finish();
}

criterion_group!(benches, bench_score_pair, bench_rank_pool, bench_cache_paths);
criterion_main!(benches);
