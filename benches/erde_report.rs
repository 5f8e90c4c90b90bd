use criterion::{criterion_group, criterion_main, Criterion};
use erisk_eval::{
    erde_report, evaluate_erisk_conf, EriskConfigBuilder, GroundTruthStore, PostRecord,
    ScoredSubject, ScoredTriple, SymptomTag,
};
use pprof::criterion::{Output, PProfProfiler};

const SUBJECTS: usize = 2_000;
const POSTS_PER_SUBJECT: usize = 100;

/// Deterministic synthetic stream: posts are interleaved across subjects and every post carries
/// up to two tags picked from the subject and post indices.
fn build_stream() -> (GroundTruthStore, Vec<PostRecord>) {
    let tags: Vec<SymptomTag> = enum_iterator::all::<SymptomTag>().collect();
    let text = "a".repeat(400);
    let golden: GroundTruthStore = (0..SUBJECTS)
        .map(|s| (format!("subject{}", s), s % 7 == 0))
        .collect();
    let mut records = Vec::with_capacity(SUBJECTS * POSTS_PER_SUBJECT);
    for post in 0..POSTS_PER_SUBJECT {
        for subject in 0..SUBJECTS {
            let first = tags[(subject * 31 + post * 17) % tags.len()];
            let second = tags[(subject + post * post) % tags.len()];
            records.push(PostRecord::new(
                &format!("subject{}", subject),
                &text,
                [first.as_str(), second.as_str()],
            ));
        }
    }
    (golden, records)
}

fn build_scored_subjects(n: usize) -> Vec<ScoredSubject> {
    (0..n)
        .map(|i| ScoredSubject {
            subject: format!("subject{}", i),
            triple: ScoredTriple {
                gold: i % 7 == 0,
                decision: i % 5 == 0,
                delay: i % 200 + 1,
            },
            evidence: Default::default(),
        })
        .collect()
}

fn benchmark_full_stream(c: &mut Criterion) {
    let (golden, records) = build_stream();
    c.bench_function("full_stream_report", |b| {
        b.iter(|| {
            let config = EriskConfigBuilder::default().build();
            evaluate_erisk_conf(&golden, &records, config).unwrap()
        })
    });
}

fn benchmark_scoring_sequential(c: &mut Criterion) {
    let subjects = build_scored_subjects(500_000);
    c.bench_function("erde_report_sequential", |b| {
        b.iter(|| erde_report(&subjects, &[5.0, 50.0], false).unwrap())
    });
}

fn benchmark_scoring_parallel(c: &mut Criterion) {
    let subjects = build_scored_subjects(500_000);
    c.bench_function("erde_report_parallel", |b| {
        b.iter(|| erde_report(&subjects, &[5.0, 50.0], true).unwrap())
    });
}

criterion_group!(
    name=erde_benches;
    config = Criterion::default().sample_size(20).with_profiler(PProfProfiler::new(3000, Output::Flamegraph(None)));
    targets =
    benchmark_full_stream,
    benchmark_scoring_sequential,
    benchmark_scoring_parallel,
);
criterion_main!(erde_benches);
