//! Example: Synchronize a synthetic recording
//!
//! Builds a sync trace from a reference sequence with a few dropped and repeated
//! frames, runs the pipeline and prints what it found.
//!
//! Usage:
//!   RUST_LOG=debug cargo run --example align_synthetic -- [--conv] [--json]

use frame_sync::analysis::report::render_match;
use frame_sync::{compute_quality, synchronize, AlignStrategy, SyncConfig};
use std::env;

const INCREMENT: usize = 100;

fn reference_levels(len: usize) -> Vec<u8> {
    // Sparse-ish pattern with irregular runs
    (0..len).map(|i| u8::from((i * 7 + i / 11) % 5 < 2)).collect()
}

fn render_trace(levels: &[u8]) -> Vec<f32> {
    let mut samples = vec![0.0f32; 50 + (levels.len() + 1) * INCREMENT];
    for (k, &level) in levels.iter().enumerate() {
        let onset = 50 + k * INCREMENT;
        let amplitude = if level == 1 { 1.0 } else { 0.5 };
        for s in &mut samples[onset..onset + 30] {
            *s = amplitude;
        }
    }
    samples
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");
    let strategy = if args.iter().any(|a| a == "--conv") {
        AlignStrategy::Convolution
    } else {
        AlignStrategy::Banded
    };

    let reference = reference_levels(2_000);
    let mut shown = reference.clone();
    shown.remove(1_500);
    shown.remove(900);
    shown.insert(400, shown[399]);

    let samples = render_trace(&shown);
    let config = SyncConfig {
        increment: INCREMENT,
        strategy,
        ..Default::default()
    };

    let result = synchronize(&samples, &reference, &config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let quality = compute_quality(&result, &reference);

    println!("Synchronization Results:");
    println!("  Frames detected: {}", result.metadata.detected_frames);
    println!("  Strategy: {:?}", result.metadata.strategy_used);
    for op in &result.edits {
        println!("    {:?} at {}", op.kind, op.position);
    }
    println!("  Replacements: {}", result.replacements.len());
    println!("  Quality: {:.3}", quality.overall);
    for warning in result.diagnostics.iter() {
        println!("  Warning: {}", warning);
    }
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);
    println!();
    print!(
        "{}",
        render_match(
            result.start_frame,
            &reference,
            Some(shown.as_slice()),
            Some(result.channels.marker.as_slice()),
            50
        )
    );

    Ok(())
}
