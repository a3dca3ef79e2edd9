//! Conversion benchmarks
//!
//! Measures vector conversion in both directions and cell collapse.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use numbridge::{
    ConvertOptions, GuestArray, GuestToHost, GuestValue, HostToGuest, HostValue, Record,
};

fn real_vector(len: usize) -> HostValue {
    HostValue::real((0..len).map(|i| i as f64 * 0.5).collect())
}

fn bench_to_guest(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_guest");
    let converter = HostToGuest::new(ConvertOptions::default());

    for size in [16, 1024, 65536].iter() {
        let value = real_vector(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &value, |b, value| {
            b.iter(|| converter.convert(black_box(value)))
        });
    }

    group.finish();
}

fn bench_to_host(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_host");
    let converter = GuestToHost::new(ConvertOptions::default());

    for size in [16, 1024, 65536].iter() {
        let value = GuestValue::column((0..*size).map(|i| i as f64).collect());
        group.bench_with_input(BenchmarkId::from_parameter(size), &value, |b, value| {
            b.iter(|| converter.convert(black_box(value)))
        });
    }

    group.finish();
}

fn bench_cell_collapse(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_collapse");
    let converter = GuestToHost::new(ConvertOptions::default());

    for size in [10, 100, 1000].iter() {
        let homogeneous = GuestValue::Cell(GuestArray::row(
            (0..*size).map(|i| GuestValue::scalar(i as f64)).collect(),
        ));
        group.bench_with_input(BenchmarkId::new("scalars", size), &homogeneous, |b, value| {
            b.iter(|| converter.convert(black_box(value)))
        });

        let mut items: Vec<GuestValue> = (0..*size).map(|i| GuestValue::scalar(i as f64)).collect();
        items.push(GuestValue::row(vec![1.0, 2.0]));
        let mixed = GuestValue::Cell(GuestArray::row(items));
        group.bench_with_input(BenchmarkId::new("mixed", size), &mixed, |b, value| {
            b.iter(|| converter.convert(black_box(value)))
        });
    }

    group.finish();
}

fn bench_record(c: &mut Criterion) {
    let converter = HostToGuest::new(ConvertOptions::default());
    let record = Record::from_fields((0..32).map(|i| (format!("field.{}", i), real_vector(8))))
        .map(HostValue::Record)
        .unwrap();

    c.bench_function("record_to_struct", |b| {
        b.iter(|| converter.convert(black_box(&record)))
    });
}

criterion_group!(benches, bench_to_guest, bench_to_host, bench_cell_collapse, bench_record);
criterion_main!(benches);
