//! Benchmark suite for the chunk extractor.
//!
//! Measures the greedy cover and the duplicate scans over synthetic frame
//! sets of increasing size.
//!
//! Run with: cargo bench --manifest-path benches/Cargo.toml

use chunkcel_benches::{generate_frames, sizes};
use chunkcel_types::object::extract::{ExtractSettings, ScanOrder, extract};
use chunkcel_types::object::{CHUNK_SIZES, TILE_SIZE};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn settings(intra: bool, inter: bool) -> ExtractSettings {
	ExtractSettings {
		min_density: 0.5,
		sizes: CHUNK_SIZES.to_vec(),
		intra_scan: intra,
		inter_scan: inter,
		order: ScanOrder::LargestFirst,
	}
}

/// Greedy cover only, no duplicate scans.
fn bench_cover(c: &mut Criterion) {
	let mut group = c.benchmark_group("extract_cover");

	for (name, (tiles_x, tiles_y)) in
		[("small", sizes::SMALL), ("medium", sizes::MEDIUM), ("large", sizes::LARGE)]
	{
		let frames = generate_frames(4, tiles_x, tiles_y);
		let pixels = 4 * (tiles_x * TILE_SIZE) as u64 * (tiles_y * TILE_SIZE) as u64;
		group.throughput(Throughput::Bytes(pixels));
		group.bench_with_input(BenchmarkId::from_parameter(name), &frames, |b, frames| {
			b.iter(|| extract(black_box(frames), &settings(false, false)).unwrap());
		});
	}

	group.finish();
}

/// Full pipeline with both duplicate scans enabled.
fn bench_dedup_scans(c: &mut Criterion) {
	let mut group = c.benchmark_group("extract_dedup");

	let frames = generate_frames(8, sizes::MEDIUM.0, sizes::MEDIUM.1);
	group.bench_function("intra_and_inter", |b| {
		b.iter(|| extract(black_box(&frames), &settings(true, true)).unwrap());
	});
	group.bench_function("inter_only", |b| {
		b.iter(|| extract(black_box(&frames), &settings(false, true)).unwrap());
	});

	group.finish();
}

criterion_group!(benches, bench_cover, bench_dedup_scans);
criterion_main!(benches);
