//! Benchmarks for offset estimation and timestamp repair.
//!
//! Run with: cargo bench -p remuxer-av

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use remuxer_av::pipeline::{correct, normalize, OffsetState, StreamLedger};

/// Presentation timestamps of a video stream with an IPBB cadence.
fn reordered_video(len: usize) -> Vec<Option<i64>> {
    (0..len as i64)
        .map(|i| {
            let gop = i / 4 * 160;
            Some(match i % 4 {
                0 => gop,
                1 => gop + 120,
                2 => gop + 40,
                _ => gop + 80,
            })
        })
        .collect()
}

/// Presentation timestamps of an audio stream with a steady frame size.
fn steady_audio(len: usize) -> Vec<Option<i64>> {
    (0..len as i64).map(|i| Some(i * 21 + 5)).collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for lookahead in [16usize, 100, 1000] {
        let window = vec![reordered_video(lookahead / 2), steady_audio(lookahead / 2)];
        group.throughput(Throughput::Elements(lookahead as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(lookahead),
            &window,
            |b, window| b.iter(|| normalize(black_box(window))),
        );
    }

    group.finish();
}

fn bench_correct(c: &mut Criterion) {
    let pts: Vec<i64> = reordered_video(1000).into_iter().flatten().collect();
    let mut group = c.benchmark_group("correct");
    group.throughput(Throughput::Elements(pts.len() as u64));

    group.bench_function("reordered_1000", |b| {
        b.iter(|| {
            let mut ledger = StreamLedger::default();
            for &p in &pts {
                ledger.push(p);
            }
            let mut offsets = OffsetState {
                dts_offset: -40,
                average_delta: 40,
                ..Default::default()
            };
            for &p in &pts {
                black_box(correct(p, &mut ledger, &mut offsets));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_normalize, bench_correct);
criterion_main!(benches);
