use crate::builder::{SceneModel, StyleRole};
use crate::debug;
use crate::geometry::{format_number, path_length, sample_merged, svg_path_data};
use crate::scene::SceneGraph;
use crate::style::{FillStyle, StrokeStyle, TrimWindow};
use crate::transform::{svg_matrix, TransformComposer};

/// Re-evaluates every layer and drawable of a built scene for one frame.
///
/// Keeps the per-layer time and visibility of the last frame so drawables
/// and group transforms can look them up by slot.
#[derive(Debug, Default)]
pub struct FrameRenderer {
    times: Vec<f32>,
    visible: Vec<bool>,
}

impl FrameRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time of `slot` on its own composition's timeline during the last frame.
    pub fn layer_time(&self, slot: usize) -> Option<f32> {
        self.times.get(slot).copied()
    }

    pub fn is_visible(&self, slot: usize) -> bool {
        self.visible.get(slot).copied().unwrap_or(false)
    }

    pub fn render_frame(&mut self, scene: &mut SceneGraph, model: &SceneModel, frame: f32) {
        self.update_layers(scene, model, frame);
        self.update_group_transforms(scene, model);
        self.update_drawables(scene, model);

        if debug::is_enabled() {
            tracing::debug!(
                frame,
                visible = self.visible.iter().filter(|v| **v).count(),
                layers = model.slots.len(),
                "frame rendered"
            );
        }
    }

    fn update_layers(&mut self, scene: &mut SceneGraph, model: &SceneModel, frame: f32) {
        self.times.clear();
        self.visible.clear();

        // Precomposition slots precede the layers they own.
        for (idx, slot) in model.slots.iter().enumerate() {
            let (time, owner_visible) = match slot.owner {
                None => (frame, true),
                Some(owner) => {
                    let host = &model.slots[owner].layer;
                    let stretch = if host.sr.abs() > f32::EPSILON { host.sr } else { 1.0 };
                    ((self.times[owner] - host.st) / stretch, self.visible[owner])
                }
            };
            let visible = owner_visible && !slot.layer.is_hidden() && slot.layer.is_active_at(time);
            self.times.push(time);
            self.visible.push(visible);

            if !visible {
                scene.set_attr(slot.node, "display", "none");
                continue;
            }
            scene.remove_attr(slot.node, "display");

            let effective = TransformComposer::resolve(model, idx, time);
            scene.set_attr(slot.node, "transform", effective.svg_matrix());
            scene.set_attr(slot.node, "opacity", format_number(effective.opacity as f64));
        }
    }

    fn update_group_transforms(&self, scene: &mut SceneGraph, model: &SceneModel) {
        for group in &model.group_transforms {
            if !self.is_visible(group.slot) {
                continue;
            }
            let time = self.times[group.slot];
            let matrix = TransformComposer::local_matrix(&group.transform, time);
            let opacity = TransformComposer::local_opacity(&group.transform, time);
            scene.set_attr(group.node, "transform", svg_matrix(&matrix));
            scene.set_attr(group.node, "opacity", format_number(opacity as f64));
        }
    }

    fn update_drawables(&self, scene: &mut SceneGraph, model: &SceneModel) {
        for drawable in &model.drawables {
            if !self.is_visible(drawable.slot) {
                continue;
            }
            let time = self.times[drawable.slot];
            let path = sample_merged(&drawable.sources, time);
            scene.set_attr(drawable.node, "d", svg_path_data(&path));

            match &drawable.role {
                StyleRole::Fill(fill) => FillStyle::resolve(fill, time).apply(scene, drawable.node),
                StyleRole::Gradient { shape, resource } => {
                    resource.update(scene, shape, time);
                    resource.apply_fill(scene, drawable.node, shape, time);
                }
                StyleRole::Stroke(stroke) => {
                    StrokeStyle::resolve(stroke, time).apply(
                        scene,
                        drawable.node,
                        drawable.trim.is_some(),
                    );
                }
            }

            if let Some(trim) = &drawable.trim {
                let window = TrimWindow::resolve(trim, time);
                window.apply(scene, drawable.node, path_length(&path));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SceneBuilder;
    use crate::style::IdAllocator;
    use lottie_data::model::Animation;
    use serde_json::json;

    struct Fixture {
        scene: SceneGraph,
        model: SceneModel,
        renderer: FrameRenderer,
    }

    impl Fixture {
        fn new(doc: serde_json::Value) -> Self {
            let animation = Animation::from_value(doc).unwrap();
            let mut scene = SceneGraph::with_container(100, 100, "stage");
            let container = scene.find_by_id("stage").unwrap();
            let mut ids = IdAllocator::new("r");
            let model =
                SceneBuilder::new(&animation, &mut scene, &mut ids, container).build();
            Self {
                scene,
                model,
                renderer: FrameRenderer::new(),
            }
        }

        fn render(&mut self, frame: f32) {
            self.renderer.render_frame(&mut self.scene, &self.model, frame);
        }

        fn layer_attr(&self, key: &str, name: &str) -> Option<&str> {
            let slot = &self.model.slots[self.model.slot_by_key(key).unwrap()];
            self.scene.attr(slot.node, name)
        }
    }

    fn line_layer(ind: u32, ip: f32, op: f32, extra: serde_json::Value) -> serde_json::Value {
        let mut shapes = vec![json!({ "ty": "sh", "ks": { "k": {
            "c": false, "v": [[0, 0], [100, 0]], "i": [[0, 0], [0, 0]], "o": [[0, 0], [0, 0]]
        } } })];
        if let Some(items) = extra.as_array() {
            shapes.extend(items.iter().cloned());
        }
        json!({ "ty": 4, "ind": ind, "ip": ip, "op": op, "ks": {}, "shapes": shapes })
    }

    fn doc(layers: serde_json::Value, assets: serde_json::Value) -> serde_json::Value {
        json!({ "fr": 30, "ip": 0, "op": 60, "w": 100, "h": 100, "layers": layers, "assets": assets })
    }

    #[test]
    fn layers_outside_their_window_are_hidden() {
        let mut fx = Fixture::new(doc(json!([line_layer(1, 10.0, 20.0, json!([]))]), json!([])));
        fx.render(5.0);
        assert_eq!(fx.layer_attr("1", "display"), Some("none"));
        fx.render(10.0);
        assert_eq!(fx.layer_attr("1", "display"), None);
        assert_eq!(fx.layer_attr("1", "transform"), Some("matrix(1,0,0,1,0,0)"));
        fx.render(20.0);
        assert_eq!(fx.layer_attr("1", "display"), Some("none"));
    }

    #[test]
    fn fills_and_strokes_are_written() {
        let mut fx = Fixture::new(doc(
            json!([line_layer(
                1,
                0.0,
                60.0,
                json!([
                    { "ty": "fl", "c": { "k": [0, 1, 0, 1] }, "o": { "k": 100 } },
                    { "ty": "st", "c": { "k": [1, 0, 0, 1] }, "w": { "k": 4 }, "o": { "k": 50 }, "lc": 1, "lj": 2 }
                ])
            )]),
            json!([]),
        ));
        fx.render(0.0);
        let fill = fx.model.drawables[0].node;
        let stroke = fx.model.drawables[1].node;
        assert_eq!(fx.scene.attr(fill, "fill"), Some("rgb(0,255,0)"));
        assert_eq!(fx.scene.attr(fill, "d"), Some("M0,0 C0,0 100,0 100,0"));
        assert_eq!(fx.scene.attr(stroke, "stroke"), Some("rgb(255,0,0)"));
        assert_eq!(fx.scene.attr(stroke, "stroke-opacity"), Some("0.5"));
        assert_eq!(fx.scene.attr(stroke, "stroke-linejoin"), Some("round"));
        assert_eq!(fx.scene.attr(stroke, "fill"), Some("none"));
    }

    #[test]
    fn trim_writes_dash_against_arc_length() {
        let mut fx = Fixture::new(doc(
            json!([line_layer(
                1,
                0.0,
                60.0,
                json!([
                    { "ty": "st", "c": { "k": [1, 1, 1, 1] }, "w": { "k": 1 }, "o": { "k": 100 } },
                    { "ty": "tm", "s": { "k": 25 }, "e": { "k": 75 }, "o": { "k": 0 } }
                ])
            )]),
            json!([]),
        ));
        fx.render(0.0);
        let node = fx.model.drawables[0].node;
        assert_eq!(fx.scene.attr(node, "stroke-dasharray"), Some("50 50"));
        assert_eq!(fx.scene.attr(node, "stroke-dashoffset"), Some("-25"));
    }

    #[test]
    fn group_transform_applies_to_its_group() {
        let mut fx = Fixture::new(doc(
            json!([line_layer(
                1,
                0.0,
                60.0,
                json!([
                    { "ty": "fl", "c": { "k": [0, 0, 0, 1] } },
                    { "ty": "tr", "p": { "k": [10, 20] }, "o": { "k": 40 } }
                ])
            )]),
            json!([]),
        ));
        fx.render(0.0);
        let group = &fx.model.group_transforms[0];
        assert_eq!(fx.scene.attr(group.node, "transform"), Some("matrix(1,0,0,1,10,20)"));
        assert_eq!(fx.scene.attr(group.node, "opacity"), Some("0.4"));
        assert_eq!(group.node, fx.model.drawables[0].group);
    }

    #[test]
    fn precomposition_remaps_time() {
        let mut fx = Fixture::new(doc(
            json!([{ "ty": 0, "ind": 1, "ip": 0, "op": 60, "st": 10, "sr": 2, "ks": {}, "refId": "comp" }]),
            json!([{ "id": "comp", "layers": [line_layer(1, 0.0, 5.0, json!([]))] }]),
        ));
        // (frame - st) / sr: frame 18 maps to 4, frame 20 maps to 5.
        fx.render(18.0);
        let inner = fx.model.slot_by_key("1/1").unwrap();
        assert_eq!(fx.renderer.layer_time(inner), Some(4.0));
        assert_eq!(fx.layer_attr("1/1", "display"), None);
        fx.render(20.0);
        assert_eq!(fx.layer_attr("1/1", "display"), Some("none"));
    }

    #[test]
    fn hidden_precomposition_hides_its_layers() {
        let mut fx = Fixture::new(doc(
            json!([{ "ty": 0, "ind": 1, "ip": 0, "op": 10, "ks": {}, "refId": "comp" }]),
            json!([{ "id": "comp", "layers": [line_layer(1, 0.0, 60.0, json!([]))] }]),
        ));
        fx.render(30.0);
        assert_eq!(fx.layer_attr("1", "display"), Some("none"));
        let inner = fx.model.slot_by_key("1/1").unwrap();
        assert!(!fx.renderer.is_visible(inner));
    }
}
