use crate::animatable::Animator;
use crate::builder::SceneModel;
use crate::debug;
use crate::geometry::{format_number, sample_vec2};
use glam::{Mat3, Vec2, Vec3};
use lottie_data::model as data;

/// World transform and opacity of a layer, relative to its scope's container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveTransform {
    pub matrix: Mat3,
    pub opacity: f32,
}

impl EffectiveTransform {
    pub fn svg_matrix(&self) -> String {
        svg_matrix(&self.matrix)
    }
}

/// `matrix(a,b,c,d,e,f)` for a 2D affine stored in a `Mat3`.
pub fn svg_matrix(m: &Mat3) -> String {
    let n = |v: f32| format_number(v as f64);
    format!(
        "matrix({},{},{},{},{},{})",
        n(m.x_axis.x),
        n(m.x_axis.y),
        n(m.y_axis.x),
        n(m.y_axis.y),
        n(m.z_axis.x),
        n(m.z_axis.y)
    )
}

pub struct TransformComposer;

impl TransformComposer {
    /// `T(position) * R(rotation) * Skew * S(scale) * T(-anchor)`.
    pub fn local_matrix(ks: &data::Transform, frame: f32) -> Mat3 {
        let anchor = sample_vec2(&ks.a, frame, Vec2::ZERO);

        let pos = match &ks.p {
            data::PositionProperty::Unified(p) => sample_vec2(p, frame, Vec2::ZERO),
            data::PositionProperty::Split { x, y } => Vec2::new(
                Animator::sample(x, frame, 0.0),
                Animator::sample(y, frame, 0.0),
            ),
        };

        let scale = sample_vec2(&ks.s, frame, Vec2::splat(100.0)) / 100.0;
        let r = Animator::sample(&ks.r, frame, 0.0).to_radians();
        let skew = Animator::sample(&ks.sk, frame, 0.0).to_radians();
        let skew_axis = Animator::sample(&ks.sa, frame, 0.0).to_radians();

        let mat_t = Mat3::from_translation(pos);
        // Rotation is clockwise on screen; with y pointing down that is glam's
        // positive direction.
        let mat_r = Mat3::from_rotation_z(r);

        let mat_skew = if skew.abs() < f32::EPSILON {
            Mat3::IDENTITY
        } else {
            let shear = Mat3::from_cols(
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(-skew.tan(), 1.0, 0.0),
                Vec3::new(0.0, 0.0, 1.0),
            );
            Mat3::from_rotation_z(skew_axis) * shear * Mat3::from_rotation_z(-skew_axis)
        };

        let mat_s = Mat3::from_scale(scale);
        let mat_a = Mat3::from_translation(-anchor);

        mat_t * mat_r * mat_skew * mat_s * mat_a
    }

    pub fn local_opacity(ks: &data::Transform, frame: f32) -> f32 {
        (Animator::sample(&ks.o, frame, 100.0) / 100.0).clamp(0.0, 1.0)
    }

    /// Composes the layer in `slot` with its resolvable ancestors.
    ///
    /// A parent reference that does not resolve ends the chain at the last
    /// resolved ancestor. Null parents move their children without dimming
    /// them.
    pub fn resolve(model: &SceneModel, slot: usize, frame: f32) -> EffectiveTransform {
        let Some(layer) = model.slots.get(slot) else {
            return EffectiveTransform {
                matrix: Mat3::IDENTITY,
                opacity: 1.0,
            };
        };

        let mut matrix = Self::local_matrix(&layer.layer.ks, frame);
        let mut opacity = Self::local_opacity(&layer.layer.ks, frame);

        let mut current = slot;
        let mut depth = 0;
        loop {
            let Some(parent_key) = model.slots[current].parent_key() else {
                break;
            };
            let Some(parent) = model.slot_by_key(&parent_key) else {
                tracing::debug!(
                    layer = layer.layer.name(),
                    parent = %parent_key,
                    "parent not found, chain ends here"
                );
                break;
            };
            depth += 1;
            if depth > model.slots.len() {
                tracing::warn!(layer = layer.layer.name(), "parent chain forms a cycle");
                break;
            }
            let parent_slot = &model.slots[parent];
            matrix = Self::local_matrix(&parent_slot.layer.ks, frame) * matrix;
            if parent_slot.kind().contributes_opacity() {
                opacity *= Self::local_opacity(&parent_slot.layer.ks, frame);
            }
            current = parent;
        }

        if !matrix.is_finite() {
            matrix = Mat3::IDENTITY;
        }

        if debug::is_enabled() {
            tracing::trace!(
                target: "lottie::transform",
                key = %layer.key,
                frame,
                depth,
                opacity,
                "resolved transform"
            );
        }

        EffectiveTransform { matrix, opacity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;
    use crate::scene::SceneGraph;
    use crate::style::IdAllocator;
    use serde_json::json;

    fn model(layers: serde_json::Value) -> SceneModel {
        let animation = data::Animation::from_value(json!({
            "fr": 30, "ip": 0, "op": 30, "w": 100, "h": 100, "layers": layers
        }))
        .unwrap();
        let mut scene = SceneGraph::with_container(100, 100, "stage");
        let container = scene.find_by_id("stage").unwrap();
        let mut ids = IdAllocator::new("t");
        SceneBuilder::new(&animation, &mut scene, &mut ids, container).build()
    }

    fn apply(m: Mat3, p: Vec2) -> Vec2 {
        m.transform_point2(p)
    }

    #[test]
    fn local_transform_order() {
        let ks: data::Transform = serde_json::from_value(json!({
            "a": { "k": [5, 5] },
            "p": { "k": [100, 50] },
            "s": { "k": [200, 200] },
            "r": { "k": 0 }
        }))
        .unwrap();
        let m = TransformComposer::local_matrix(&ks, 0.0);
        // Anchor lands on position; other points scale around it.
        assert!(apply(m, Vec2::new(5.0, 5.0)).abs_diff_eq(Vec2::new(100.0, 50.0), 1e-4));
        assert!(apply(m, Vec2::new(6.0, 5.0)).abs_diff_eq(Vec2::new(102.0, 50.0), 1e-4));
    }

    #[test]
    fn rotation_is_clockwise_on_screen() {
        let ks: data::Transform = serde_json::from_value(json!({ "r": { "k": 90 } })).unwrap();
        let m = TransformComposer::local_matrix(&ks, 0.0);
        assert!(apply(m, Vec2::new(10.0, 0.0)).abs_diff_eq(Vec2::new(0.0, 10.0), 1e-4));
    }

    #[test]
    fn three_level_chain_composes() {
        let model = model(json!([
            { "ty": 3, "ind": 1, "ip": 0, "op": 30, "ks": { "r": { "k": 90 } } },
            { "ty": 3, "ind": 2, "parent": 1, "ip": 0, "op": 30, "ks": { "s": { "k": [200, 200] } } },
            { "ty": 4, "ind": 3, "parent": 2, "ip": 0, "op": 30, "ks": { "p": { "k": [10, 0] } }, "shapes": [] }
        ]));
        let child = model.slot_by_key("3").unwrap();
        let resolved = TransformComposer::resolve(&model, child, 0.0);
        let origin = apply(resolved.matrix, Vec2::ZERO);
        assert!(origin.abs_diff_eq(Vec2::new(0.0, 20.0), 1e-4), "got {origin}");
    }

    #[test]
    fn null_parents_do_not_dim() {
        let model = model(json!([
            { "ty": 3, "ind": 1, "ip": 0, "op": 30, "ks": { "o": { "k": 10 } } },
            { "ty": 4, "ind": 2, "ip": 0, "op": 30, "ks": { "o": { "k": 50 } }, "shapes": [] },
            { "ty": 4, "ind": 3, "parent": 1, "ip": 0, "op": 30, "ks": { "o": { "k": 80 } }, "shapes": [] },
            { "ty": 4, "ind": 4, "parent": 2, "ip": 0, "op": 30, "ks": { "o": { "k": 80 } }, "shapes": [] }
        ]));
        let under_null = TransformComposer::resolve(&model, model.slot_by_key("3").unwrap(), 0.0);
        assert!((under_null.opacity - 0.8).abs() < 1e-6);
        let under_shape = TransformComposer::resolve(&model, model.slot_by_key("4").unwrap(), 0.0);
        assert!((under_shape.opacity - 0.4).abs() < 1e-6);
    }

    #[test]
    fn light_parents_do_not_dim() {
        let model = model(json!([
            { "ty": 14, "ind": 1, "ip": 0, "op": 30, "ks": { "o": { "k": 10 }, "p": { "k": [5, 0] } } },
            { "ty": 4, "ind": 2, "parent": 1, "ip": 0, "op": 30, "ks": { "o": { "k": 80 } }, "shapes": [] }
        ]));
        let child = TransformComposer::resolve(&model, model.slot_by_key("2").unwrap(), 0.0);
        assert!((child.opacity - 0.8).abs() < 1e-6, "got {}", child.opacity);
        // Lights still carry their children's transform.
        assert!(apply(child.matrix, Vec2::ZERO).abs_diff_eq(Vec2::new(5.0, 0.0), 1e-4));
    }

    #[test]
    fn dangling_parent_uses_local_transform() {
        let model = model(json!([
            { "ty": 4, "ind": 1, "parent": 42, "ip": 0, "op": 30, "ks": { "p": { "k": [3, 4] } }, "shapes": [] }
        ]));
        let resolved = TransformComposer::resolve(&model, 0, 0.0);
        assert_eq!(resolved.matrix, Mat3::from_translation(Vec2::new(3.0, 4.0)));
        assert_eq!(resolved.svg_matrix(), "matrix(1,0,0,1,3,4)");
        assert!(!resolved.svg_matrix().contains("NaN"));
    }

    #[test]
    fn parent_cycles_terminate() {
        let model = model(json!([
            { "ty": 3, "ind": 1, "parent": 2, "ip": 0, "op": 30, "ks": { "p": { "k": [1, 0] } } },
            { "ty": 3, "ind": 2, "parent": 1, "ip": 0, "op": 30, "ks": { "p": { "k": [1, 0] } } }
        ]));
        let resolved = TransformComposer::resolve(&model, 0, 0.0);
        assert!(resolved.matrix.is_finite());
    }

    #[test]
    fn split_position_and_skew() {
        let ks: data::Transform = serde_json::from_value(json!({
            "p": { "s": true, "x": { "k": 7 }, "y": { "k": 9 } },
            "sk": { "k": 45 }, "sa": { "k": 0 }
        }))
        .unwrap();
        let m = TransformComposer::local_matrix(&ks, 0.0);
        assert!(apply(m, Vec2::ZERO).abs_diff_eq(Vec2::new(7.0, 9.0), 1e-4));
        // Skewing along x moves points horizontally in proportion to y.
        let moved = apply(m, Vec2::new(0.0, 10.0));
        assert!((moved.y - 19.0).abs() < 1e-4);
        assert!((moved.x - 7.0).abs() > 1.0);
    }
}
