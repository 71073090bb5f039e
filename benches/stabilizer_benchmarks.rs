//! Benchmarks for head stabilization and depth pre-filters

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parallax_diorama::{
    filters::{
        exponential::ExponentialFilter, median::MedianFilter, moving_average::MovingAverageFilter, DepthFilter,
        NoFilter,
    },
    stabilizer::{stabilize, CalibrationOffset, HeadSample, StabilizedHead, Stabilizer, StabilizerParams},
};

/// Noisy head path: slow sway with occasional depth spikes
fn generate_samples(num_samples: usize) -> Vec<HeadSample> {
    (0..num_samples)
        .filter_map(|i| {
            let t = i as f64 * 0.016;
            let jitter = 0.004 * (rand::random::<f64>() - 0.5);
            let spike = if rand::random::<f64>() < 0.05 { -0.5 } else { 0.0 };
            HeadSample::new(
                0.12f64.mul_add(t.sin(), 0.5) + jitter,
                0.06f64.mul_add((0.7 * t).cos(), 0.5) + jitter,
                -0.05 * (1.0 - t.cos()) + spike,
            )
            .ok()
        })
        .collect()
}

fn benchmark_stabilize(c: &mut Criterion) {
    let mut group = c.benchmark_group("stabilize");
    let samples = generate_samples(600);
    let params = StabilizerParams::default();
    let offset = CalibrationOffset::default();

    group.bench_function("single_sample", |b| {
        b.iter(|| black_box(stabilize(black_box(&samples[0]), &offset, black_box(-0.02), &params)));
    });

    group.bench_with_input(BenchmarkId::new("sequence", samples.len()), &samples, |b, data| {
        b.iter(|| {
            let mut previous = 0.0;
            for sample in data {
                let head = stabilize(sample, &offset, previous, &params);
                previous = head.smoothed_depth;
                black_box(head);
            }
        });
    });

    group.finish();
}

fn benchmark_prefilters(c: &mut Criterion) {
    let mut group = c.benchmark_group("depth_prefilter");
    let samples = generate_samples(600);
    let offset = CalibrationOffset::default();

    let prefilters = vec![
        ("none", Box::new(NoFilter) as Box<dyn DepthFilter>),
        ("moving_average_5", Box::new(MovingAverageFilter::try_new(5).unwrap())),
        ("median_5", Box::new(MedianFilter::try_new(5).unwrap())),
        ("median_9", Box::new(MedianFilter::try_new(9).unwrap())),
        ("exponential_0.5", Box::new(ExponentialFilter::try_new(0.5).unwrap())),
    ];

    for (name, prefilter) in prefilters {
        let mut stabilizer = Stabilizer::with_prefilter(StabilizerParams::default(), prefilter).unwrap();
        group.bench_with_input(BenchmarkId::new("sequence_600", name), &samples, |b, data| {
            b.iter(|| {
                stabilizer.reset();
                let mut head = StabilizedHead::centered(2.0);
                for sample in data {
                    head = stabilizer.update(sample, &offset, &head);
                }
                black_box(head)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_stabilize, benchmark_prefilters);
criterion_main!(benches);
