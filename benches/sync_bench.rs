//! Performance benchmarks for frame synchronization

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frame_sync::alignment::drift::detect_drift;
use frame_sync::alignment::needleman_wunsch::align_banded;
use frame_sync::{synchronize, SyncConfig};

/// Pseudo-random binary levels (xorshift), deterministic across runs
fn levels(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 1) as u8
        })
        .collect()
}

/// Reference with a frame dropped every `every` frames
fn with_drops(reference: &[u8], every: usize) -> Vec<u8> {
    reference
        .iter()
        .enumerate()
        .filter(|(i, _)| i % every != every / 2)
        .map(|(_, &l)| l)
        .collect()
}

fn bench_alignment(c: &mut Criterion) {
    let reference = levels(36_000, 0x9E37_79B9);
    let detected = with_drops(&reference, 5_000);

    c.bench_function("align_banded_36k", |b| {
        b.iter(|| {
            let _ = align_banded(black_box(&detected), black_box(&reference), 20, -10, -10);
        });
    });

    c.bench_function("detect_drift_36k", |b| {
        b.iter(|| {
            let _ = detect_drift(black_box(&detected), black_box(&reference), 5, 20, 0.5, 10_000);
        });
    });
}

fn bench_synchronize(c: &mut Criterion) {
    // 10 minutes of 60 Hz frames at 6 kHz sampling
    let reference = levels(36_000, 0x2545_F491);
    let shown = with_drops(&reference, 5_000);
    let increment = 100;

    let mut samples = vec![0.0f32; 50 + (shown.len() + 1) * increment];
    for (k, &level) in shown.iter().enumerate() {
        let onset = 50 + k * increment;
        let amplitude = if level == 1 { 1.0 } else { 0.5 };
        for s in &mut samples[onset..onset + 30] {
            *s = amplitude;
        }
    }

    let config = SyncConfig {
        increment,
        ..Default::default()
    };

    c.bench_function("synchronize_36k_frames", |b| {
        b.iter(|| {
            let _ = synchronize(black_box(&samples), black_box(&reference), black_box(&config));
        });
    });
}

criterion_group!(benches, bench_alignment, bench_synchronize);
criterion_main!(benches);
