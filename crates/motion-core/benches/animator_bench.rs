use criterion::{black_box, criterion_group, criterion_main, Criterion};
use motion_core::animatable::{Animator, KeyframeCursor};
use motion_data::model::{EasingHandle, Keyframe, Property, Value};

fn keyframed_property(count: usize) -> Property<f32> {
    let keyframes = (0..count)
        .map(|i| Keyframe {
            t: i as f32 * 10.0,
            s: Some(i as f32),
            e: None,
            i: Some(EasingHandle {
                x: vec![0.58],
                y: vec![1.0],
            }),
            o: Some(EasingHandle {
                x: vec![0.42],
                y: vec![0.0],
            }),
            to: None,
            ti: None,
            h: None,
        })
        .collect();
    Property {
        a: 1,
        k: Value::Animated(keyframes),
        ix: None,
    }
}

fn bench_resolve(c: &mut Criterion) {
    let prop = keyframed_property(100);
    let span = 99.0 * 10.0;

    c.bench_function("resolve_binary_search_sweep", |b| {
        b.iter(|| {
            let mut acc = 0.0f32;
            for i in 0..1000 {
                let frame = (i as f32 / 1000.0) * span;
                acc += Animator::resolve(black_box(&prop), frame, |v| *v, 0.0);
            }
            acc
        })
    });

    c.bench_function("resolve_cursor_sweep", |b| {
        b.iter(|| {
            let mut cursor = KeyframeCursor::default();
            let mut acc = 0.0f32;
            for i in 0..1000 {
                let frame = (i as f32 / 1000.0) * span;
                acc += Animator::resolve_cached(black_box(&prop), frame, |v| *v, 0.0, &mut cursor);
            }
            acc
        })
    });

    c.bench_function("resolve_random_access", |b| {
        // Deterministic scatter; exercises the cursor miss path.
        b.iter(|| {
            let mut cursor = KeyframeCursor::default();
            let mut acc = 0.0f32;
            let mut state = 0x9e3779b9u32;
            for _ in 0..1000 {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let frame = (state % 1000) as f32 / 1000.0 * span;
                acc += Animator::resolve_cached(black_box(&prop), frame, |v| *v, 0.0, &mut cursor);
            }
            acc
        })
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
