use crate::debug;
use crate::easing::CubicBezier;
use glam::Vec2;
use lottie_data::model::{BezierPath, Keyframe, Property, Value};

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }
}

// Vectors, colors and gradient stop lists.
impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // Components the end value lacks keep the start component.
        self.iter()
            .enumerate()
            .map(|(i, a)| match other.get(i) {
                Some(b) => a + (b - a) * t,
                None => *a,
            })
            .collect()
    }
}

impl Interpolatable for BezierPath {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return self.clone();
        }
        if t >= 1.0 && self.v.len() == other.v.len() {
            return BezierPath {
                c: self.c,
                ..other.clone()
            };
        }

        let count = self.v.len().min(other.v.len());
        if count == 0 {
            return self.clone();
        }

        let mix = |a: [f32; 2], b: [f32; 2]| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];
        let zero = [0.0, 0.0];

        let mut v = Vec::with_capacity(count);
        let mut i = Vec::with_capacity(count);
        let mut o = Vec::with_capacity(count);
        for idx in 0..count {
            v.push(mix(self.v[idx], other.v[idx]));
            i.push(mix(
                self.i.get(idx).copied().unwrap_or(zero),
                other.i.get(idx).copied().unwrap_or(zero),
            ));
            o.push(mix(
                self.o.get(idx).copied().unwrap_or(zero),
                other.o.get(idx).copied().unwrap_or(zero),
            ));
        }

        BezierPath { c: self.c, i, o, v }
    }
}

/// Easing curve of the segment that starts at `kf`. Both handles of a
/// segment live on its first keyframe.
fn segment_easing<T>(kf: &Keyframe<T>) -> CubicBezier {
    let [x1, y1] = kf
        .o
        .as_ref()
        .map(|o| o.first_or([0.0, 0.0]))
        .unwrap_or([0.0, 0.0]);
    let [x2, y2] = kf
        .i
        .as_ref()
        .map(|i| i.first_or([1.0, 1.0]))
        .unwrap_or([1.0, 1.0]);
    CubicBezier::new(x1, y1, x2, y2)
}

pub struct Animator;

impl Animator {
    /// Value of `prop` at `frame`, converted into the caller's unit.
    ///
    /// Frames before the first keyframe and after the last clamp to the edge
    /// values; `default` stands in for missing values.
    pub fn resolve<T, U>(
        prop: &Property<T>,
        frame: f32,
        converter: impl Fn(&T) -> U,
        default: U,
    ) -> U
    where
        U: Interpolatable,
    {
        match &prop.k {
            Value::Default => default,
            Value::Static(v) => converter(v),
            Value::Animated(keyframes) => {
                if keyframes.is_empty() {
                    return default;
                }

                // First keyframe strictly after `frame`; the active segment is [idx-1, idx].
                let idx = keyframes.partition_point(|kf| kf.t <= frame);

                if idx == 0 {
                    return keyframes[0].s.as_ref().map(&converter).unwrap_or(default);
                }

                let len = keyframes.len();
                if idx >= len {
                    let last = &keyframes[len - 1];
                    if let Some(e) = &last.e {
                        return converter(e);
                    }
                    if let Some(s) = &last.s {
                        return converter(s);
                    }
                    // Some exporters close a list with a bare `{ "t": .. }`.
                    if len >= 2 {
                        let previous = &keyframes[len - 2];
                        if let Some(v) = previous.e.as_ref().or(previous.s.as_ref()) {
                            return converter(v);
                        }
                    }
                    return default;
                }

                let kf_start = &keyframes[idx - 1];
                let kf_end = &keyframes[idx];

                let start_val = kf_start
                    .s
                    .as_ref()
                    .map(&converter)
                    .unwrap_or_else(|| default.clone());

                if kf_start.is_hold() {
                    return start_val;
                }

                let end_val = kf_start
                    .e
                    .as_ref()
                    .or(kf_end.s.as_ref())
                    .map(&converter)
                    .unwrap_or_else(|| start_val.clone());

                let duration = kf_end.t - kf_start.t;
                if duration <= 0.0 {
                    return start_val;
                }

                let local_t = (frame - kf_start.t) / duration;
                let eased = segment_easing(kf_start).evaluate(local_t);

                if debug::is_enabled() {
                    tracing::trace!(
                        target: "lottie::interpolate",
                        frame,
                        segment = idx - 1,
                        local_t,
                        eased,
                        "keyframe segment"
                    );
                }

                start_val.lerp(&end_val, eased)
            }
        }
    }

    pub fn sample<T>(prop: &Property<T>, frame: f32, default: T) -> T
    where
        T: Interpolatable,
    {
        Self::resolve(prop, frame, T::clone, default)
    }

    /// Path shape at `frame`; vertices and handles morph point by point.
    pub fn sample_path(prop: &Property<BezierPath>, frame: f32) -> BezierPath {
        let path = Self::resolve(prop, frame, BezierPath::clone, BezierPath::default());
        if debug::is_enabled() {
            tracing::trace!(
                target: "lottie::path",
                frame,
                vertices = path.v.len(),
                closed = path.c,
                "sampled path"
            );
        }
        path
    }
}
