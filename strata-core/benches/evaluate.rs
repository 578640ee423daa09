//! Build and evaluate a wide aggregate hierarchy.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use strata_core::graph::GraphBuilder;
use strata_core::recalc::{Aggregate, AggregateBuilder, AggregateRef, Stats};

/// Root with `sections` children of `leaves` leaves each.
fn hierarchy(sections: usize, leaves: usize) -> AggregateRef {
    let root = Aggregate::group("root");
    for s in 0..sections {
        let section = Aggregate::group(format!("section-{s}"));
        Aggregate::attach(&root, &section);
        for l in 0..leaves {
            let leaf = Aggregate::leaf(format!("leaf-{s}-{l}"), Stats::new(1, l as f64));
            Aggregate::attach(&section, &leaf);
        }
    }
    root
}

fn bench_evaluate(c: &mut Criterion) {
    let root = hierarchy(64, 32);

    c.bench_function("build_64x32", |b| {
        b.iter(|| {
            let mut builder = GraphBuilder::new();
            builder.add_with_dependencies(root.clone(), &AggregateBuilder::new(1));
            black_box(builder.build())
        })
    });

    let mut builder = GraphBuilder::new();
    builder.add_with_dependencies(root.clone(), &AggregateBuilder::new(1));
    let graph = builder.build();

    c.bench_function("evaluate_64x32", |b| {
        b.iter(|| graph.evaluate().expect("acyclic hierarchy"))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
