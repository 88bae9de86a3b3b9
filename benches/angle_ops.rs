//! Benchmarks for probability math, angle generation, and a full iteration.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use angle_exhaust::angle::{Angle, AngleCategory, AngleResult};
use angle_exhaust::config::EngineConfig;
use angle_exhaust::engine::{DiscoveryEngine, DiscoveryRequest};
use angle_exhaust::generator::{AngleGenerator, DefaultAngleGenerator};
use angle_exhaust::knowledge::KnowledgeGraph;
use angle_exhaust::probability::{angles_needed, breakthrough_probability};

fn bench_angles_needed(c: &mut Criterion) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let inputs: Vec<(f64, f64)> = (0..256)
        .map(|_| (rng.gen_range(0.001..0.5), rng.gen_range(0.5..0.999)))
        .collect();

    c.bench_function("angles_needed_256", |bench| {
        bench.iter(|| {
            for &(p, target) in &inputs {
                let n = angles_needed(p, target).unwrap();
                black_box(breakthrough_probability(p, n).unwrap());
            }
        })
    });
}

fn bench_generate(c: &mut Criterion) {
    let kg = KnowledgeGraph::new();
    c.bench_function("generate_173", |bench| {
        bench.iter(|| black_box(DefaultAngleGenerator.generate("Decode the archive", &kg, 173, None)))
    });
}

fn bench_branch(c: &mut Criterion) {
    let result = AngleResult::signal(Angle::new(AngleCategory::Structural, "Examine format"), 0.8);
    c.bench_function("branch_18", |bench| {
        bench.iter(|| black_box(DefaultAngleGenerator.branch_on_discovery(&result, 18)))
    });
}

fn bench_iteration(c: &mut Criterion) {
    c.bench_function("silent_iteration", |bench| {
        bench.iter(|| {
            let mut engine = DiscoveryEngine::new(EngineConfig {
                max_iterations: 1,
                ..Default::default()
            });
            black_box(engine.run(DiscoveryRequest::new("p")).unwrap())
        })
    });
}

criterion_group!(benches, bench_angles_needed, bench_generate, bench_branch, bench_iteration);
criterion_main!(benches);
