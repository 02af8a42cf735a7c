use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mcma::cluster::KMeans;
use mcma::pareto::{achievement_hypervolume, pareto_front_indices};
use mcma::{Analysis, AnalysisConfig, Sense, models};

fn bench_tiny_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("tiny_analysis");
    group.sample_size(10);

    for max_iter in [20, 60] {
        group.bench_with_input(BenchmarkId::new("max_iter", max_iter), &max_iter, |b, &n| {
            b.iter(|| {
                let mut config = AnalysisConfig::new("tiny", models::tiny_criteria());
                config.maxIter = n;
                config.neutral = true;
                Analysis::builder(config).build().unwrap().run().unwrap()
            });
        });
    }
    group.finish();
}

fn bench_simplex4_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("simplex4_analysis");
    group.sample_size(10);
    group.bench_function("max_iter_30", |b| {
        b.iter(|| {
            let mut config = AnalysisConfig::new("simplex4", models::simplex4_criteria());
            config.maxIter = 30;
            Analysis::builder(config).build().unwrap().run().unwrap()
        });
    });
    group.finish();
}

fn points(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.f64() * 100.0).collect())
        .collect()
}

fn bench_front_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("front_metrics");

    for n in [50, 200] {
        let data = points(n, 3, 42);
        let senses = vec![Sense::Maximize; 3];
        group.bench_with_input(BenchmarkId::new("pareto_front", n), &data, |b, data| {
            b.iter(|| pareto_front_indices(data, &senses));
        });
        let front: Vec<Vec<f64>> = pareto_front_indices(&data, &senses)
            .into_iter()
            .map(|i| data[i].clone())
            .collect();
        group.bench_with_input(BenchmarkId::new("hypervolume", n), &front, |b, front| {
            b.iter(|| achievement_hypervolume(front));
        });
        group.bench_with_input(BenchmarkId::new("kmeans_4", n), &data, |b, data| {
            b.iter(|| KMeans::new(4, 7).fit(data));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tiny_analysis,
    bench_simplex4_analysis,
    bench_front_metrics
);
criterion_main!(benches);
