//! Criterion benchmarks for the sensor ingest hot path.
//!
//! `ingest` runs on the thread that delivers sensor callbacks, so it has to stay cheap:
//! rate gating, one ring write, and an occasional window snapshot.
//!
//! Key metrics:
//! - Per-event cost of the sample clock
//! - Per-sample cost of windowing, including the snapshot on each stride
//! - Cost of flattening a window for the model
//!
//! Run with: cargo bench --bench ingest

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use handedness_sense::clock::{sampling_interval_ns, SampleClock};
use handedness_sense::sensor::{Sample, SensorEvent};
use handedness_sense::window::WindowedClassifier;

/// Interleaved accel/gyro events at 100/200 Hz.
fn events(count: usize) -> Vec<SensorEvent> {
    (0..count)
        .map(|i| {
            let t = i as i64 * 5_000_000;
            let v = i as f32 * 0.01;
            if i % 3 == 0 {
                SensorEvent::accel([v, -v, 9.81], t)
            } else {
                SensorEvent::gyro([v, v, -v], t)
            }
        })
        .collect()
}

fn clock_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_clock");
    let stream = events(3_000);

    for rate in [30.0, 60.0, 200.0] {
        group.throughput(Throughput::Elements(stream.len() as u64));
        group.bench_with_input(BenchmarkId::new("observe", rate), &rate, |b, &rate| {
            b.iter(|| {
                let mut clock = SampleClock::with_interval_ns(sampling_interval_ns(rate));
                for event in &stream {
                    black_box(clock.observe(black_box(event)));
                }
                clock.commits()
            });
        });
    }
    group.finish();
}

fn window_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("windowed_classifier");
    let samples: Vec<Sample> = (0..1_200).map(|i| [i as f32; 6]).collect();

    for (window, stride) in [(120, 60), (120, 1), (600, 300)] {
        group.throughput(Throughput::Elements(samples.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("ingest", format!("{window}x{stride}")),
            &(window, stride),
            |b, &(window, stride)| {
                b.iter(|| {
                    let mut windows = WindowedClassifier::new(window, stride);
                    let mut emitted = 0;
                    for sample in &samples {
                        if windows.ingest(black_box(*sample)).is_some() {
                            emitted += 1;
                        }
                    }
                    emitted
                });
            },
        );
    }
    group.finish();
}

fn window_flatten(c: &mut Criterion) {
    let mut windows = WindowedClassifier::new(120, 120);
    let mut window = None;
    for i in 0..120 {
        window = windows.ingest([i as f32; 6]);
    }
    let Some(window) = window else {
        panic!("window not emitted");
    };

    c.bench_function("window_to_flat", |b| {
        b.iter(|| black_box(window.to_flat()));
    });
}

criterion_group!(benches, clock_observe, window_ingest, window_flatten);
criterion_main!(benches);
