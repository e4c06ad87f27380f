//! Benchmarks for activation computation
//!
//! Tests performance of:
//! - Base-level activation (ACT-R decay function)
//! - The closed-form optimized-learning approximation
//! - Logistic noise generation
//! - Retrieval-probability softmax

#![allow(clippy::expect_used)] // Fine in benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ibl_core::{base_level, base_level_optimized, logistic_noise, retrieval_probabilities};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate realistic occurrence histories
fn generate_histories(count: usize, current_time: u64) -> Vec<Vec<u64>> {
	let mut rng = StdRng::seed_from_u64(17);
	(0..count)
		.map(|_| {
			let occurrences = rng.gen_range(1..20);
			let mut times: Vec<u64> = (0..occurrences)
				.map(|_| rng.gen_range(0..current_time))
				.collect();
			times.sort_unstable();
			times
		})
		.collect()
}

fn bench_base_level(c: &mut Criterion) {
	let mut group = c.benchmark_group("base_level");
	let now = 10_000;

	for occurrence_count in &[5, 10, 20, 50, 100] {
		let mut rng = StdRng::seed_from_u64(17);
		let mut occurrences: Vec<u64> = (0..*occurrence_count)
			.map(|_| rng.gen_range(0..now))
			.collect();
		occurrences.sort_unstable();

		let _ = group.bench_with_input(
			BenchmarkId::new("occurrences", occurrence_count),
			occurrence_count,
			|bench, _| {
				bench.iter(|| base_level(black_box(&occurrences), black_box(now), 0.5));
			},
		);
	}

	group.finish();
}

fn bench_base_level_optimized(c: &mut Criterion) {
	let mut group = c.benchmark_group("base_level_optimized");
	let now = 10_000;

	// The approximation is O(1) in occurrence count; the contrast with the
	// full sum is the point of the benchmark.
	for count in &[5_u32, 100, 10_000] {
		let _ = group.bench_with_input(BenchmarkId::new("count", count), count, |bench, &count| {
			bench.iter(|| base_level_optimized(black_box(count), 0, black_box(now), 0.5));
		});
	}

	group.finish();
}

fn bench_logistic_noise(c: &mut Criterion) {
	let mut rng = StdRng::seed_from_u64(17);
	let _ = c.bench_function("logistic_noise", |bench| {
		bench.iter(|| logistic_noise(black_box(0.25), &mut rng));
	});
}

fn bench_retrieval_probabilities(c: &mut Criterion) {
	let mut group = c.benchmark_group("retrieval_probabilities");

	for count in &[10, 100, 1000] {
		let mut rng = StdRng::seed_from_u64(17);
		let activations: Vec<f64> = (0..*count)
			.map(|_| rng.gen::<f64>().mul_add(5.0, -2.0))
			.collect();

		#[allow(clippy::cast_sign_loss)]
		let throughput = *count as u64;
		let _ = group.throughput(Throughput::Elements(throughput));
		let _ = group.bench_with_input(BenchmarkId::new("instances", count), count, |bench, _| {
			bench.iter(|| retrieval_probabilities(black_box(&activations), 1.0));
		});
	}

	group.finish();
}

fn bench_full_activation_pass(c: &mut Criterion) {
	let mut group = c.benchmark_group("full_activation_pass");
	let now = 10_000;

	for count in &[100, 500, 1000] {
		let histories = generate_histories(*count, now);

		#[allow(clippy::cast_sign_loss)]
		let throughput = *count as u64;
		let _ = group.throughput(Throughput::Elements(throughput));
		let _ = group.bench_with_input(BenchmarkId::new("instances", count), count, |bench, _| {
			bench.iter(|| {
				let activations: Vec<f64> = histories
					.iter()
					.map(|history| base_level(black_box(history), now, 0.5))
					.collect();
				retrieval_probabilities(&activations, 1.0)
			});
		});
	}

	group.finish();
}

criterion_group!(
	benches,
	bench_base_level,
	bench_base_level_optimized,
	bench_logistic_noise,
	bench_retrieval_probabilities,
	bench_full_activation_pass,
);

criterion_main!(benches);
