//! Scheduler Benchmarks
//!
//! Full PageRank and connected-components runs on generated rings, across
//! graph sizes and worker counts.
//!
//! ## Usage
//! ```bash
//! cargo bench --bench scheduler_benchmark
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::time::Duration;

use signal_collect::vertices::{components, pagerank};
use signal_collect::{ComponentVertex, EngineConfig, Graph, PageRankVertex, Scheduler};

const SIZES: &[usize] = &[1_000, 10_000];
const WORKERS: &[usize] = &[1, 4];

/// Ring where every vertex also links 7 positions ahead
fn pagerank_ring(n: usize) -> Graph<f64, f64> {
    let mut graph = Graph::new();
    for i in 0..n {
        graph
            .add_vertex(PageRankVertex::new(i as u64, 0.15).boxed())
            .expect("Failed to add vertex");
    }
    for i in 0..n {
        for target in [(i + 1) % n, (i + 7) % n] {
            graph
                .add_edge(pagerank::link(i as u64, target as u64, 2).expect("Invalid link"))
                .expect("Failed to add edge");
        }
    }
    graph
}

/// Undirected ring with descending labels, the slowest case for label propagation
fn component_ring(n: usize) -> Graph<u64, u64> {
    let mut graph = Graph::new();
    for i in 0..n {
        graph
            .add_vertex(ComponentVertex::new(i as u64, (n - i) as u64).boxed())
            .expect("Failed to add vertex");
    }
    for i in 0..n {
        for edge in components::connect(i as u64, ((i + 1) % n) as u64) {
            graph.add_edge(edge).expect("Failed to add edge");
        }
    }
    graph
}

fn config(workers: usize) -> EngineConfig {
    EngineConfig::default()
        .with_parallelism(workers)
        .with_convergence_epsilon(1e-4)
        .with_max_rounds(200)
}

fn bench_pagerank(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let mut group = c.benchmark_group("pagerank_ring");
    group.sample_size(10).measurement_time(Duration::from_secs(10));

    for &workers in WORKERS {
        let scheduler = Scheduler::new(config(workers));
        let scheduler = &scheduler;
        for &size in SIZES {
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{}", workers), size),
                &size,
                |b, &n| {
                    b.to_async(&runtime).iter_batched(
                        || pagerank_ring(n),
                        |mut graph| async move {
                            scheduler.run(&mut graph).await.expect("Run failed")
                        },
                        BatchSize::LargeInput,
                    )
                },
            );
        }
    }

    group.finish();
}

fn bench_components(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let mut group = c.benchmark_group("component_ring");
    group.sample_size(10);

    for &workers in WORKERS {
        let scheduler = Scheduler::new(config(workers).with_max_rounds(1_000));
        let scheduler = &scheduler;
        group.bench_with_input(
            BenchmarkId::new(format!("workers_{}", workers), 500),
            &500usize,
            |b, &n| {
                b.to_async(&runtime).iter_batched(
                    || component_ring(n),
                    |mut graph| async move {
                        scheduler.run(&mut graph).await.expect("Run failed")
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pagerank, bench_components);
criterion_main!(benches);
