//! One-time construction of the retained scene from an animation.
//!
//! Every layer gets a slot in an arena plus a `<g>` element. Slots are keyed
//! by `"{prefix}{ind}"`, where the prefix names the chain of precomposition
//! layers that instantiated them, so the same asset mounted twice yields two
//! independent sets of keys. Parent links are looked up through that registry
//! at render time rather than stored as references.

use crate::geometry::PathSource;
use crate::scene::{ElementKind, NodeId, SceneGraph};
use crate::style::{GradientResource, IdAllocator};
use lottie_data::model::{self as data, LayerKind};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub struct LayerSlot {
    pub key: String,
    pub prefix: String,
    pub layer: data::Layer,
    pub node: NodeId,
    /// Precomposition slot whose timeline this layer runs on.
    pub owner: Option<usize>,
}

impl LayerSlot {
    pub fn kind(&self) -> LayerKind {
        self.layer.kind()
    }

    pub fn parent_key(&self) -> Option<String> {
        self.layer.parent.map(|p| format!("{}{p}", self.prefix))
    }
}

/// A `tr` item applied to the `<g>` of its shape group.
#[derive(Debug, Clone)]
pub struct GroupTransform {
    pub slot: usize,
    pub node: NodeId,
    pub transform: data::Transform,
}

#[derive(Debug, Clone)]
pub enum StyleRole {
    Fill(data::FillShape),
    Gradient {
        shape: data::GradientFillShape,
        resource: GradientResource,
    },
    Stroke(data::StrokeShape),
}

impl StyleRole {
    pub fn is_stroke(&self) -> bool {
        matches!(self, StyleRole::Stroke(_))
    }
}

/// One `<path>` element: one or more path sources painted with one role.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub slot: usize,
    pub group: NodeId,
    pub node: NodeId,
    pub sources: Vec<PathSource>,
    pub role: StyleRole,
    pub trim: Option<data::TrimShape>,
}

impl Drawable {
    pub fn is_merged(&self) -> bool {
        self.sources.len() > 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneModel {
    pub slots: Vec<LayerSlot>,
    pub registry: HashMap<String, usize>,
    pub group_transforms: Vec<GroupTransform>,
    pub drawables: Vec<Drawable>,
}

impl SceneModel {
    pub fn slot_by_key(&self, key: &str) -> Option<usize> {
        self.registry.get(key).copied()
    }

    /// Slot of the layer's parent, if the reference resolves in its scope.
    pub fn parent_of(&self, slot: usize) -> Option<usize> {
        let key = self.slots.get(slot)?.parent_key()?;
        self.slot_by_key(&key)
    }
}

/// Style items a scope paints with, in authored order.
#[derive(Debug, Clone, Default)]
struct ScopeStyles {
    fills: Vec<data::ShapeItem>,
    strokes: Vec<data::ShapeItem>,
    trim: Option<data::TrimShape>,
}

pub struct SceneBuilder<'a> {
    animation: &'a data::Animation,
    scene: &'a mut SceneGraph,
    ids: &'a mut IdAllocator,
    container: NodeId,
    defs: NodeId,
    model: SceneModel,
    reported_layer_types: HashSet<u8>,
}

impl<'a> SceneBuilder<'a> {
    pub fn new(
        animation: &'a data::Animation,
        scene: &'a mut SceneGraph,
        ids: &'a mut IdAllocator,
        container: NodeId,
    ) -> Self {
        let defs = scene.create(ElementKind::Defs);
        scene.append_child(container, defs);
        Self {
            animation,
            scene,
            ids,
            container,
            defs,
            model: SceneModel::default(),
            reported_layer_types: HashSet::new(),
        }
    }

    pub fn build(mut self) -> SceneModel {
        let animation = self.animation;
        let container = self.container;
        self.build_layers(&animation.layers, container, "", None, 0);
        tracing::debug!(
            layers = self.model.slots.len(),
            drawables = self.model.drawables.len(),
            "scene built"
        );
        self.model
    }

    fn build_layers(
        &mut self,
        layers: &[data::Layer],
        container: NodeId,
        prefix: &str,
        owner: Option<usize>,
        depth: usize,
    ) {
        // Reverse order so the first authored layer is appended last and paints on top.
        for (position, layer) in layers.iter().enumerate().rev() {
            let key = match layer.ind {
                Some(ind) => format!("{prefix}{ind}"),
                None => format!("{prefix}#{position}"),
            };

            let node = self.scene.create(ElementKind::Group);
            self.scene.set_attr(node, "data-layer", key.as_str());
            self.scene.append_child(container, node);

            let slot = self.model.slots.len();
            self.model.slots.push(LayerSlot {
                key: key.clone(),
                prefix: prefix.to_string(),
                layer: layer.clone(),
                node,
                owner,
            });
            if self.model.registry.contains_key(&key) {
                tracing::warn!(key = %key, layer = layer.name(), "duplicate layer index");
            } else {
                self.model.registry.insert(key.clone(), slot);
            }

            match layer.kind() {
                LayerKind::Shape => {
                    if let Some(shapes) = &layer.shapes {
                        self.build_scope(slot, node, shapes, &ScopeStyles::default());
                    }
                }
                LayerKind::Precomposition => {
                    self.build_precomposition(slot, node, layer, &key, depth);
                }
                LayerKind::Null | LayerKind::Light => {}
                LayerKind::Other(ty) => {
                    if self.reported_layer_types.insert(ty) {
                        tracing::warn!(ty, layer = layer.name(), "layer type is parsed but not rendered");
                    }
                }
            }
        }
    }

    fn build_precomposition(
        &mut self,
        slot: usize,
        node: NodeId,
        layer: &data::Layer,
        key: &str,
        depth: usize,
    ) {
        let animation = self.animation;
        let asset = layer.ref_id.as_deref().and_then(|id| animation.asset(id));
        let Some(layers) = asset.and_then(|a| a.layers.as_ref()) else {
            tracing::warn!(
                layer = layer.name(),
                ref_id = layer.ref_id.as_deref().unwrap_or(""),
                "precomposition asset not found, layer renders nothing"
            );
            return;
        };
        // An asset that instantiates itself would never terminate.
        if depth >= animation.assets.len() {
            tracing::warn!(layer = layer.name(), "precomposition nesting too deep");
            return;
        }

        if let (Some(w), Some(h)) = (layer.w, layer.h) {
            let clip_id = self.ids.next_id("clip");
            let clip = self.scene.create(ElementKind::ClipPath);
            self.scene.set_attr(clip, "id", clip_id.as_str());
            let rect = self.scene.create(ElementKind::Rect);
            self.scene.set_attr(rect, "width", w.to_string());
            self.scene.set_attr(rect, "height", h.to_string());
            self.scene.append_child(clip, rect);
            self.scene.append_child(self.defs, clip);
            self.scene
                .set_attr(node, "clip-path", format!("url(#{clip_id})"));
        }

        let prefix = format!("{key}/");
        self.build_layers(layers, node, &prefix, Some(slot), depth + 1);
    }

    fn build_scope(
        &mut self,
        slot: usize,
        parent: NodeId,
        items: &[data::ShapeItem],
        inherited: &ScopeStyles,
    ) {
        let group = self.scene.create(ElementKind::Group);
        self.scene.append_child(parent, group);

        let mut local = ScopeStyles::default();
        let mut paths = Vec::new();
        let mut groups = Vec::new();
        let mut merge = false;
        // Authored order of the scope's own roles.
        let mut roles = Vec::new();

        for item in items.iter().filter(|item| !item.is_hidden()) {
            match item {
                data::ShapeItem::Path(_) | data::ShapeItem::Rect(_) | data::ShapeItem::Ellipse(_) => {
                    paths.extend(PathSource::from_item(item));
                }
                data::ShapeItem::Fill(_) | data::ShapeItem::GradientFill(_) => {
                    local.fills.push(item.clone());
                    roles.push(item.clone());
                }
                data::ShapeItem::Stroke(_) => {
                    local.strokes.push(item.clone());
                    roles.push(item.clone());
                }
                data::ShapeItem::Trim(t) => local.trim = Some(t.clone()),
                data::ShapeItem::Merge(_) => merge = true,
                data::ShapeItem::Transform(t) => self.model.group_transforms.push(GroupTransform {
                    slot,
                    node: group,
                    transform: t.t.clone(),
                }),
                data::ShapeItem::Group(g) => groups.push(g),
                data::ShapeItem::Unknown => {}
            }
        }

        let effective = ScopeStyles {
            fills: if local.fills.is_empty() {
                inherited.fills.clone()
            } else {
                local.fills.clone()
            },
            strokes: if local.strokes.is_empty() {
                inherited.strokes.clone()
            } else {
                local.strokes.clone()
            },
            trim: local.trim.clone().or_else(|| inherited.trim.clone()),
        };

        let mut ordered = Vec::new();
        if local.fills.is_empty() {
            ordered.extend(inherited.fills.iter().cloned());
        }
        if local.strokes.is_empty() {
            ordered.extend(inherited.strokes.iter().cloned());
        }
        ordered.extend(roles);

        if !paths.is_empty() {
            for item in &ordered {
                if merge && paths.len() >= 2 {
                    self.push_drawable(slot, group, paths.clone(), item, effective.trim.as_ref());
                } else {
                    for path in &paths {
                        self.push_drawable(slot, group, vec![path.clone()], item, effective.trim.as_ref());
                    }
                }
            }
        }

        for child in groups.into_iter().rev() {
            self.build_scope(slot, group, &child.it, &effective);
        }
    }

    fn push_drawable(
        &mut self,
        slot: usize,
        group: NodeId,
        sources: Vec<PathSource>,
        item: &data::ShapeItem,
        trim: Option<&data::TrimShape>,
    ) {
        let role = match item {
            data::ShapeItem::Fill(f) => StyleRole::Fill(f.clone()),
            data::ShapeItem::GradientFill(g) => StyleRole::Gradient {
                shape: g.clone(),
                resource: GradientResource::create(self.scene, self.defs, self.ids, g),
            },
            data::ShapeItem::Stroke(s) => StyleRole::Stroke(s.clone()),
            _ => return,
        };
        let node = self.scene.create(ElementKind::Path);
        self.scene.append_child(group, node);
        let trim = if role.is_stroke() { trim.cloned() } else { None };
        self.model.drawables.push(Drawable {
            slot,
            group,
            node,
            sources,
            role,
            trim,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(doc: serde_json::Value) -> (SceneGraph, SceneModel) {
        let animation = data::Animation::from_value(doc).unwrap();
        let mut scene = SceneGraph::with_container(animation.w, animation.h, "stage");
        let container = scene.find_by_id("stage").unwrap();
        let mut ids = IdAllocator::new("t");
        let model = SceneBuilder::new(&animation, &mut scene, &mut ids, container).build();
        (scene, model)
    }

    fn square(x: f32) -> serde_json::Value {
        json!({ "ty": "sh", "ks": { "k": {
            "c": true,
            "v": [[x, 0], [x + 10.0, 0], [x + 10.0, 10], [x, 10]],
            "i": [[0, 0], [0, 0], [0, 0], [0, 0]],
            "o": [[0, 0], [0, 0], [0, 0], [0, 0]]
        } } })
    }

    fn fill() -> serde_json::Value {
        json!({ "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } })
    }

    fn stroke() -> serde_json::Value {
        json!({ "ty": "st", "c": { "k": [0, 0, 1, 1] }, "w": { "k": 2 }, "o": { "k": 100 } })
    }

    fn shape_layer(ind: u32, shapes: serde_json::Value) -> serde_json::Value {
        json!({ "ty": 4, "ind": ind, "ip": 0, "op": 10, "ks": {}, "shapes": shapes })
    }

    fn doc(layers: serde_json::Value) -> serde_json::Value {
        json!({ "fr": 30, "ip": 0, "op": 10, "w": 100, "h": 100, "layers": layers, "assets": [] })
    }

    #[test]
    fn first_authored_layer_paints_last() {
        let (scene, model) = build(doc(json!([
            shape_layer(1, json!([square(0.0), fill()])),
            shape_layer(2, json!([square(0.0), fill()]))
        ])));
        let stage = scene.find_by_id("stage").unwrap();
        let children = scene.children(stage);
        // defs, then layer 2, then layer 1
        assert_eq!(children.len(), 3);
        assert_eq!(scene.attr(children[1], "data-layer"), Some("2"));
        assert_eq!(scene.attr(children[2], "data-layer"), Some("1"));
        assert_eq!(model.slot_by_key("1"), Some(1));
    }

    #[test]
    fn stroke_before_fill_follows_authored_order() {
        let (_, model) = build(doc(json!([shape_layer(1, json!([square(0.0), stroke(), fill()]))])));
        assert_eq!(model.drawables.len(), 2);
        assert!(matches!(model.drawables[0].role, StyleRole::Stroke(_)));
        assert!(matches!(model.drawables[1].role, StyleRole::Fill(_)));
    }

    #[test]
    fn merge_builds_one_drawable_per_role() {
        let (_, merged) = build(doc(json!([shape_layer(
            1,
            json!([square(0.0), square(20.0), { "ty": "mm", "mm": 1 }, fill(), stroke()])
        )])));
        assert_eq!(merged.drawables.len(), 2);
        assert!(merged.drawables.iter().all(Drawable::is_merged));

        let (_, separate) = build(doc(json!([shape_layer(
            1,
            json!([square(0.0), square(20.0), fill(), stroke()])
        )])));
        assert_eq!(separate.drawables.len(), 4);
    }

    #[test]
    fn groups_inherit_missing_styles() {
        let (_, model) = build(doc(json!([shape_layer(
            1,
            json!([
                { "ty": "gr", "it": [square(0.0), stroke()] },
                fill(),
                { "ty": "tm", "s": { "k": 0 }, "e": { "k": 50 }, "o": { "k": 0 } }
            ])
        )])));
        // Root scope has no paths; the group paints the inherited fill first.
        assert_eq!(model.drawables.len(), 2);
        assert!(matches!(model.drawables[0].role, StyleRole::Fill(_)));
        assert!(model.drawables[0].trim.is_none());
        assert!(matches!(model.drawables[1].role, StyleRole::Stroke(_)));
        assert!(model.drawables[1].trim.is_some());
    }

    #[test]
    fn hidden_items_are_skipped() {
        let (_, model) = build(doc(json!([shape_layer(
            1,
            json!([
                square(0.0),
                { "ty": "sh", "hd": true, "ks": { "k": {
                    "c": false, "v": [[0, 0], [5, 5]], "i": [[0, 0], [0, 0]], "o": [[0, 0], [0, 0]]
                } } },
                { "ty": "fl", "hd": true, "c": { "k": [0, 1, 0, 1] } },
                stroke(),
                { "ty": "tm", "hd": true, "s": { "k": 0 }, "e": { "k": 50 } },
                { "ty": "gr", "hd": true, "it": [square(20.0), fill()] }
            ])
        )])));
        assert_eq!(model.drawables.len(), 1);
        assert!(matches!(model.drawables[0].role, StyleRole::Stroke(_)));
        assert_eq!(model.drawables[0].sources.len(), 1);
        assert!(model.drawables[0].trim.is_none());
    }

    #[test]
    fn scope_without_paths_builds_nothing() {
        let (_, model) = build(doc(json!([shape_layer(1, json!([fill(), stroke()]))])));
        assert!(model.drawables.is_empty());
    }

    #[test]
    fn gradient_fill_owns_a_resource() {
        let (scene, model) = build(doc(json!([shape_layer(
            1,
            json!([square(0.0), {
                "ty": "gf", "s": { "k": [0, 0] }, "e": { "k": [10, 0] }, "t": 1,
                "g": { "p": 3, "k": { "k": [0, 1, 0, 0, 0.5, 0, 1, 0, 1, 0, 0, 1] } },
                "o": { "k": 100 }
            }, fill()])
        )])));
        assert_eq!(model.drawables.len(), 2);
        match &model.drawables[0].role {
            StyleRole::Gradient { resource, .. } => {
                assert_eq!(resource.id, "t-gradient-0");
                assert_eq!(resource.stops.len(), 3);
                assert!(scene.find_by_id("t-gradient-0").is_some());
            }
            other => panic!("expected gradient role, got {other:?}"),
        }
    }

    #[test]
    fn precompositions_prefix_keys_and_clip() {
        let mut document = doc(json!([
            { "ty": 0, "ind": 1, "ip": 0, "op": 10, "ks": {}, "refId": "comp", "w": 50, "h": 40 },
            { "ty": 0, "ind": 2, "ip": 0, "op": 10, "ks": {}, "refId": "comp" },
            { "ty": 0, "ind": 3, "ip": 0, "op": 10, "ks": {}, "refId": "missing" }
        ]));
        document["assets"] = json!([{ "id": "comp", "layers": [
            shape_layer(1, json!([square(0.0), fill()])),
            { "ty": 3, "ind": 2, "ip": 0, "op": 10, "ks": {} }
        ] }]);
        let (scene, model) = build(document);

        assert!(model.slot_by_key("1/1").is_some());
        assert!(model.slot_by_key("2/1").is_some());
        assert!(model.slot_by_key("1/2").is_some());
        assert!(model.slot_by_key("3/1").is_none());
        assert_eq!(model.drawables.len(), 2);

        let first = &model.slots[model.slot_by_key("1").unwrap()];
        assert_eq!(scene.attr(first.node, "clip-path"), Some("url(#t-clip-0)"));
        let inner = &model.slots[model.slot_by_key("1/1").unwrap()];
        assert_eq!(inner.owner, model.slot_by_key("1"));
    }

    #[test]
    fn parents_resolve_within_their_scope() {
        let (_, model) = build(doc(json!([
            { "ty": 3, "ind": 1, "ip": 0, "op": 10, "ks": {} },
            { "ty": 4, "ind": 2, "parent": 1, "ip": 0, "op": 10, "ks": {}, "shapes": [] },
            { "ty": 4, "ind": 3, "parent": 9, "ip": 0, "op": 10, "ks": {}, "shapes": [] }
        ])));
        let child = model.slot_by_key("2").unwrap();
        assert_eq!(model.parent_of(child), model.slot_by_key("1"));
        let orphan = model.slot_by_key("3").unwrap();
        assert_eq!(model.parent_of(orphan), None);
    }
}
