//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use evidenceflow::pipeline::PipelineBuilder;
use evidenceflow::testing::{ExampleStage, SecondExampleStage};
use serde_json::json;

fn pipeline_benchmark(c: &mut Criterion) {
    let pipeline = PipelineBuilder::new()
        .add(ExampleStage::new())
        .add(SecondExampleStage::new())
        .build()
        .unwrap();

    c.bench_function("process", |b| {
        b.iter(|| {
            let mut ctx = pipeline.create_context();
            ctx.evidence_mut().set("header.user-agent", json!("bench-agent"));
            ctx.process().unwrap();
            black_box(ctx)
        });
    });

    c.bench_function("metadata_query", |b| {
        let mut ctx = pipeline.create_context();
        ctx.evidence_mut().set("header.user-agent", json!("bench-agent"));
        ctx.process().unwrap();
        b.iter(|| black_box(ctx.get_by_metadata("type", "int")));
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
