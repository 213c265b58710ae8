use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lottie_core::{Animator, Engine, EngineOptions, SceneGraph};
use lottie_data::model::{Animation, Keyframe, Property};
use serde_json::json;

fn keyframed_scalar(count: usize) -> Property<f32> {
    Property::animated(
        (0..count)
            .map(|i| {
                Keyframe::new(i as f32 * 10.0, (i % 7) as f32 * 12.5)
                    .with_easing([0.33, 0.0], [0.67, 1.0])
            })
            .collect(),
    )
}

fn bench_sample(c: &mut Criterion) {
    let prop = keyframed_scalar(256);
    c.bench_function("animator_sample_256_keyframes", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame = (frame + 3.7) % 2560.0;
            black_box(Animator::sample(&prop, black_box(frame), 0.0))
        })
    });
}

fn bench_render_frame(c: &mut Criterion) {
    let layers: Vec<_> = (1..=50)
        .map(|ind| {
            json!({
                "ty": 4, "ind": ind, "ip": 0, "op": 120,
                "ks": { "r": { "a": 1, "k": [{ "t": 0, "s": [0] }, { "t": 120, "s": [360] }] } },
                "shapes": [
                    { "ty": "el", "s": { "k": [40, 40] }, "p": { "k": [50, 50] } },
                    { "ty": "st", "c": { "k": [0, 0, 0, 1] }, "w": { "k": 2 } },
                    { "ty": "tm", "s": { "k": 0 }, "e": { "a": 1, "k": [{ "t": 0, "s": [0] }, { "t": 120, "s": [100] }] } }
                ]
            })
        })
        .collect();
    let animation = Animation::from_value(json!({
        "fr": 60, "ip": 0, "op": 120, "w": 100, "h": 100, "layers": layers
    }))
    .unwrap();
    let scene = SceneGraph::with_container(100, 100, "stage");
    let mut engine = Engine::mount(animation, scene, "stage", EngineOptions::default()).unwrap();

    c.bench_function("render_frame_50_trimmed_layers", |b| {
        let mut frame = 0.0f32;
        b.iter(|| {
            frame = (frame + 1.0) % 120.0;
            engine.render_frame(black_box(frame));
        })
    });
}

criterion_group!(benches, bench_sample, bench_render_frame);
criterion_main!(benches);
