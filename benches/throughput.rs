use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;
use stream_stages::{to_stream, Emitter, MapStage, ReduceStage, ShuffleStage};

fn benchmark_single_stage_throughput(c: &mut Criterion) {
    c.bench_function("map_10k_items", |b| {
        b.iter(|| {
            let output = to_stream(0..10_000i64)
                .pipe(MapStage::new("double", |x: i64, out: &mut Emitter<i64>| {
                    out.emit(black_box(x * 2));
                    Ok(())
                }))
                .wait();
            output.expect("pipeline failed");
        });
    });
}

fn benchmark_three_stage_throughput(c: &mut Criterion) {
    c.bench_function("map_shuffle_reduce_10k_items", |b| {
        b.iter(|| {
            let output = to_stream(0..10_000i64)
                .pipe(MapStage::new("double", |x: i64, out: &mut Emitter<i64>| {
                    out.emit(x * 2);
                    Ok(())
                }))
                .pipe(ShuffleStage::new(64))
                .pipe(ReduceStage::new("sum", 0i64, |acc: &i64, x: i64| {
                    Ok(Some(acc + x))
                }))
                .finish();
            black_box(output.expect("pipeline failed"));
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = benchmark_single_stage_throughput, benchmark_three_stage_throughput
);
criterion_main!(benches);
