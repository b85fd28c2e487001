//! Example: Synchronize multiple recorded sync traces in parallel
//!
//! Usage:
//!   cargo run --release --example align_batch -- --reference levels.txt \
//!       [--increment N] [--jobs N] [--json] <trace1.wav> <trace2.wav> ...
//!
//! Notes:
//! - The reference file holds one level per frame, whitespace separated.
//! - Parallelism is across recordings. Each recording is processed single-threaded.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use frame_sync::{compute_quality, synchronize, SyncConfig};
use rayon::prelude::*;
use serde::Serialize;
use std::env;
use std::time::Instant;

/// Load a mono sync trace from a WAV file
fn load_trace(path: &str) -> Result<(Vec<f32>, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    // The sync trace is expected on the first channel
    let channels = spec.channels.max(1) as usize;
    let trace = samples.iter().step_by(channels).copied().collect();

    Ok((trace, spec.sample_rate))
}

fn load_reference(path: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let levels = text
        .split_whitespace()
        .map(|t| t.parse::<u8>())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(levels)
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

#[derive(Serialize)]
struct ItemOut {
    path: String,
    ok: bool,
    sample_rate: u32,
    start_frame: usize,
    insertions: usize,
    deletions: usize,
    replacements: usize,
    unresolved: usize,
    quality: f32,
    processing_ms: f32,
    error: Option<String>,
}

impl ItemOut {
    fn failed(path: String, error: String) -> Self {
        Self {
            path,
            ok: false,
            sample_rate: 0,
            start_frame: 0,
            insertions: 0,
            deletions: 0,
            replacements: 0,
            unresolved: 0,
            quality: 0.0,
            processing_ms: 0.0,
            error: Some(error),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut increment: usize = 60;
    let mut reference_path: Option<String> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--increment" => {
                increment = args
                    .first()
                    .ok_or("--increment requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
            }
            "--reference" => {
                reference_path = Some(args.first().ok_or("--reference requires a path")?.clone());
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: align_batch --reference levels.txt [--increment N] [--jobs N] [--json] <trace1.wav> ...\n\
                     \n\
                     --reference  Reference levels, one per frame\n\
                     --increment  Samples per frame (default: 60)\n\
                     --jobs N     Parallel workers (default: CPU-1)\n\
                     --json       Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    let reference_path = reference_path.ok_or("--reference is required")?;
    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one WAV sync trace. Use --help for usage.");
        std::process::exit(2);
    }

    let reference = load_reference(&reference_path)?;
    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!(
        "Batch: {} recordings, {} reference frames, jobs={}",
        paths.len(),
        reference.len(),
        jobs
    );

    let config = SyncConfig {
        increment,
        ..Default::default()
    };

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;

    let outs: Vec<ItemOut> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| match load_trace(path) {
                Ok((samples, sample_rate)) => match synchronize(&samples, &reference, &config) {
                    Ok(res) => {
                        let quality = compute_quality(&res, &reference);
                        ItemOut {
                            path: path.clone(),
                            ok: true,
                            sample_rate,
                            start_frame: res.start_frame,
                            insertions: res.edits.insertions(),
                            deletions: res.edits.deletions(),
                            replacements: res.replacements.len(),
                            unresolved: quality.unresolved,
                            quality: quality.overall,
                            processing_ms: res.metadata.processing_time_ms,
                            error: None,
                        }
                    }
                    Err(e) => ItemOut::failed(path.clone(), format!("synchronization failed: {e}")),
                },
                Err(e) => ItemOut::failed(path.clone(), format!("load failed: {e}")),
            })
            .collect()
    });

    let wall_s = t0.elapsed().as_secs_f32();

    for out in &outs {
        if json {
            println!("{}", serde_json::to_string(out)?);
        } else if out.ok {
            println!(
                "{}: start={} +{} -{} replaced={} unresolved={} quality={:.3} ({:.1} ms)",
                out.path,
                out.start_frame,
                out.insertions,
                out.deletions,
                out.replacements,
                out.unresolved,
                out.quality,
                out.processing_ms
            );
        } else {
            println!("{}: {}", out.path, out.error.as_deref().unwrap_or("failed"));
        }
    }

    let ok = outs.iter().filter(|o| o.ok).count();
    eprintln!(
        "Done: {}/{} succeeded in {:.2} s",
        ok,
        outs.len(),
        wall_s
    );

    Ok(())
}
