//! Benchmarks for hook dispatch and full pipeline runs.

use chameleon::hooks::{ParallelHook, SeriesHook, WaterfallHook};
use chameleon::pipeline::Pipeline;
use chameleon::plugins::AdapterBridgePlugin;
use chameleon::testing::{mount, test_request, MockAdapter, RecordingPlugin};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

fn hook_benchmark(c: &mut Criterion) {
    let rt = runtime();

    let series = SeriesHook::<u64>::new("series");
    let waterfall = WaterfallHook::<u64>::new("waterfall");
    let parallel = ParallelHook::<u64>::new("parallel");
    for i in 0..8 {
        series.tap(format!("tap-{i}"), |_| Ok(()));
        waterfall.tap(format!("tap-{i}"), |n| Ok(Some(n + 1)));
        parallel.tap(format!("tap-{i}"), |_| Ok(()));
    }

    c.bench_function("series_8_taps", |b| {
        b.iter(|| rt.block_on(series.call(black_box(1))))
    });
    c.bench_function("waterfall_8_taps", |b| {
        b.iter(|| rt.block_on(waterfall.call(black_box(1))))
    });
    c.bench_function("parallel_8_taps", |b| {
        b.iter(|| rt.block_on(parallel.call(black_box(1))))
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let pipeline = Pipeline::new(Arc::new(MockAdapter::new()));
    pipeline
        .use_plugin(&AdapterBridgePlugin::new())
        .use_plugin(&RecordingPlugin::new("rec"));

    c.bench_function("full_run", |b| {
        b.iter(|| rt.block_on(pipeline.run(mount(), test_request())))
    });
}

criterion_group!(benches, hook_benchmark, pipeline_benchmark);
criterion_main!(benches);
