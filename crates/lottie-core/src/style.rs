//! Paint attributes for drawables: fills, strokes, gradients and trims.

use crate::animatable::Animator;
use crate::geometry::{format_number, sample_vec2};
use crate::scene::{ElementKind, NodeId, SceneGraph};
use glam::Vec2;
use lottie_data::model as data;

/// Generates document-unique ids from a caller namespace and a counter.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    namespace: String,
    next: u64,
}

impl IdAllocator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            next: 0,
        }
    }

    pub fn next_id(&mut self, kind: &str) -> String {
        let id = format!("{}-{kind}-{}", self.namespace, self.next);
        self.next += 1;
        id
    }
}

/// `rgb(r,g,b)` from 0..1 channels.
pub fn rgb_string(c: &[f32]) -> String {
    let channel = |i: usize| {
        let v = c.get(i).copied().unwrap_or(0.0);
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    format!("rgb({},{},{})", channel(0), channel(1), channel(2))
}

fn percent(prop: &data::Property<f32>, frame: f32) -> f32 {
    (Animator::sample(prop, frame, 100.0) / 100.0).clamp(0.0, 1.0)
}

fn fill_rule(r: Option<u8>) -> &'static str {
    match r {
        Some(2) => "evenodd",
        _ => "nonzero",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillStyle {
    pub color: String,
    pub opacity: f32,
    pub rule: &'static str,
}

impl FillStyle {
    pub fn resolve(fill: &data::FillShape, frame: f32) -> Self {
        let color = Animator::sample(&fill.c, frame, vec![0.0, 0.0, 0.0, 1.0]);
        Self {
            color: rgb_string(&color),
            opacity: percent(&fill.o, frame),
            rule: fill_rule(fill.r),
        }
    }

    pub fn apply(&self, scene: &mut SceneGraph, node: NodeId) {
        scene.set_attr(node, "fill", self.color.as_str());
        scene.set_attr(node, "fill-opacity", format_number(self.opacity as f64));
        scene.set_attr(node, "fill-rule", self.rule);
        scene.set_attr(node, "stroke", "none");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    pub array: Vec<f32>,
    pub offset: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: String,
    pub opacity: f32,
    pub width: f32,
    pub linecap: &'static str,
    pub linejoin: &'static str,
    pub miter_limit: f32,
    pub dash: Option<DashPattern>,
}

impl StrokeStyle {
    pub fn resolve(stroke: &data::StrokeShape, frame: f32) -> Self {
        let color = Animator::sample(&stroke.c, frame, vec![0.0, 0.0, 0.0, 1.0]);
        let linecap = match stroke.lc {
            2 => "round",
            3 => "square",
            _ => "butt",
        };
        let linejoin = match stroke.lj {
            2 => "round",
            3 => "bevel",
            _ => "miter",
        };
        Self {
            color: rgb_string(&color),
            opacity: percent(&stroke.o, frame),
            width: Animator::sample(&stroke.w, frame, 1.0).max(0.0),
            linecap,
            linejoin,
            miter_limit: stroke.ml.unwrap_or(4.0),
            dash: resolve_dash(&stroke.d, frame),
        }
    }

    /// Writes the stroke attributes. Authored dashes are only written when no
    /// trim owns the dash attributes.
    pub fn apply(&self, scene: &mut SceneGraph, node: NodeId, trimmed: bool) {
        scene.set_attr(node, "fill", "none");
        scene.set_attr(node, "stroke", self.color.as_str());
        scene.set_attr(node, "stroke-opacity", format_number(self.opacity as f64));
        scene.set_attr(node, "stroke-width", format_number(self.width as f64));
        scene.set_attr(node, "stroke-linecap", self.linecap);
        scene.set_attr(node, "stroke-linejoin", self.linejoin);
        scene.set_attr(
            node,
            "stroke-miterlimit",
            format_number(self.miter_limit as f64),
        );
        if trimmed {
            return;
        }
        match &self.dash {
            Some(dash) => {
                let array = dash
                    .array
                    .iter()
                    .map(|v| format_number(*v as f64))
                    .collect::<Vec<_>>()
                    .join(" ");
                scene.set_attr(node, "stroke-dasharray", array);
                scene.set_attr(
                    node,
                    "stroke-dashoffset",
                    format_number(dash.offset as f64),
                );
            }
            None => {
                scene.remove_attr(node, "stroke-dasharray");
                scene.remove_attr(node, "stroke-dashoffset");
            }
        }
    }
}

fn resolve_dash(props: &[data::DashProperty], frame: f32) -> Option<DashPattern> {
    if props.is_empty() {
        return None;
    }
    let mut array = Vec::new();
    let mut offset = 0.0;
    for prop in props {
        match prop.n.as_deref() {
            Some("o") => offset = Animator::sample(&prop.v, frame, 0.0),
            Some("d") | Some("v") | Some("g") => {
                array.push(Animator::sample(&prop.v, frame, 0.0).max(0.0))
            }
            _ => {}
        }
    }
    if array.is_empty() {
        return None;
    }
    if array.len() % 2 != 0 {
        let clone = array.clone();
        array.extend(clone);
    }
    let total: f32 = array.iter().sum();
    if total <= 0.0 {
        return None;
    }
    offset = (offset % total + total) % total;
    Some(DashPattern { array, offset })
}

/// Visible sub-range of a path, as fractions of its arc length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    pub start: f32,
    pub end: f32,
}

impl TrimWindow {
    pub fn resolve(trim: &data::TrimShape, frame: f32) -> Self {
        let s = Animator::sample(&trim.s, frame, 0.0);
        let e = Animator::sample(&trim.e, frame, 100.0);
        let o = Animator::sample(&trim.o, frame, 0.0);
        Self::from_percentages(s, e, o)
    }

    /// Start and end in percent, offset in degrees.
    pub fn from_percentages(start: f32, end: f32, offset_degrees: f32) -> Self {
        let offset = offset_degrees.rem_euclid(360.0) / 360.0;
        let mut start = (start / 100.0).clamp(0.0, 1.0) + offset;
        let mut end = (end / 100.0).clamp(0.0, 1.0) + offset;
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        let round = |v: f32| (v * 10_000.0).round() / 10_000.0;
        let mut start = round(start);
        let mut end = round(end);
        if start >= 1.0 {
            start -= 1.0;
            end -= 1.0;
        }
        Self { start, end }
    }

    pub fn span(&self) -> f32 {
        self.end - self.start
    }

    pub fn is_full(&self) -> bool {
        self.span() >= 1.0
    }

    /// Dash array and offset revealing this window on a path of `length`, or
    /// `None` when the whole path is visible.
    pub fn dash(&self, length: f64) -> Option<(String, String)> {
        if self.is_full() {
            return None;
        }
        let visible = (self.span().max(0.0) as f64) * length;
        let gap = length - visible;
        Some((
            format!("{} {}", format_number(visible), format_number(gap)),
            format_number(-(self.start as f64) * length),
        ))
    }

    pub fn apply(&self, scene: &mut SceneGraph, node: NodeId, length: f64) {
        match self.dash(length) {
            Some((array, offset)) => {
                scene.set_attr(node, "stroke-dasharray", array);
                scene.set_attr(node, "stroke-dashoffset", offset);
            }
            None => {
                scene.remove_attr(node, "stroke-dasharray");
                scene.remove_attr(node, "stroke-dashoffset");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub color: [f32; 3],
    pub opacity: f32,
}

struct AlphaStop {
    t: f32,
    a: f32,
}

/// Exactly `color_count` stops from the raw `[t, r, g, b]*n [t, a]*m` layout;
/// opacity is interpolated from the alpha stops at each color stop offset.
pub fn parse_gradient_stops(raw: &[f32], color_count: usize) -> Vec<GradientStop> {
    let color_data_len = color_count * 4;
    let alpha_stops: Vec<AlphaStop> = raw
        .get(color_data_len..)
        .unwrap_or(&[])
        .chunks_exact(2)
        .map(|c| AlphaStop { t: c[0], a: c[1] })
        .collect();

    let mut stops = Vec::with_capacity(color_count);
    for i in 0..color_count {
        let stop = match raw.get(i * 4..i * 4 + 4) {
            Some(c) => GradientStop {
                offset: c[0],
                color: [c[1], c[2], c[3]],
                opacity: interpolate_alpha(&alpha_stops, c[0]),
            },
            // Keyframes occasionally carry fewer stops; repeat the last one.
            None => stops.last().copied().unwrap_or(GradientStop {
                offset: 1.0,
                color: [1.0, 1.0, 1.0],
                opacity: 1.0,
            }),
        };
        stops.push(stop);
    }
    stops
}

fn interpolate_alpha(stops: &[AlphaStop], t: f32) -> f32 {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return 1.0;
    };
    if t <= first.t {
        return first.a;
    }
    if t >= last.t {
        return last.a;
    }
    for pair in stops.windows(2) {
        let (s1, s2) = (&pair[0], &pair[1]);
        if t >= s1.t && t <= s2.t {
            let range = s2.t - s1.t;
            let ratio = if range == 0.0 {
                0.0
            } else {
                (t - s1.t) / range
            };
            return s1.a + (s2.a - s1.a) * ratio;
        }
    }
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

/// A gradient element in `<defs>` owned by one drawable. Its stop elements are
/// created once; frames only rewrite their attributes.
#[derive(Debug, Clone)]
pub struct GradientResource {
    pub id: String,
    pub kind: GradientKind,
    pub element: NodeId,
    pub stops: Vec<NodeId>,
}

impl GradientResource {
    pub fn create(
        scene: &mut SceneGraph,
        defs: NodeId,
        ids: &mut IdAllocator,
        shape: &data::GradientFillShape,
    ) -> Self {
        let kind = if shape.t == 2 {
            GradientKind::Radial
        } else {
            GradientKind::Linear
        };
        let id = ids.next_id("gradient");
        let element = scene.create(match kind {
            GradientKind::Linear => ElementKind::LinearGradient,
            GradientKind::Radial => ElementKind::RadialGradient,
        });
        scene.set_attr(element, "id", id.as_str());
        scene.set_attr(element, "gradientUnits", "userSpaceOnUse");
        scene.append_child(defs, element);

        let stops = (0..shape.g.p)
            .map(|_| {
                let stop = scene.create(ElementKind::Stop);
                scene.append_child(element, stop);
                stop
            })
            .collect();

        Self {
            id,
            kind,
            element,
            stops,
        }
    }

    pub fn paint(&self) -> String {
        format!("url(#{})", self.id)
    }

    pub fn update(&self, scene: &mut SceneGraph, shape: &data::GradientFillShape, frame: f32) {
        let start = sample_vec2(&shape.s, frame, Vec2::ZERO);
        let end = sample_vec2(&shape.e, frame, Vec2::ZERO);
        let num = |v: f32| format_number(v as f64);

        match self.kind {
            GradientKind::Linear => {
                scene.set_attr(self.element, "x1", num(start.x));
                scene.set_attr(self.element, "y1", num(start.y));
                scene.set_attr(self.element, "x2", num(end.x));
                scene.set_attr(self.element, "y2", num(end.y));
            }
            GradientKind::Radial => {
                let radius = start.distance(end);
                let highlight = shape
                    .h
                    .as_ref()
                    .map(|h| Animator::sample(h, frame, 0.0) / 100.0)
                    .unwrap_or(0.0)
                    .clamp(-0.99, 0.99);
                let angle = shape
                    .a
                    .as_ref()
                    .map(|a| Animator::sample(a, frame, 0.0))
                    .unwrap_or(0.0)
                    .to_radians()
                    + (end.y - start.y).atan2(end.x - start.x);
                let focal = start + Vec2::new(angle.cos(), angle.sin()) * radius * highlight;

                scene.set_attr(self.element, "cx", num(start.x));
                scene.set_attr(self.element, "cy", num(start.y));
                scene.set_attr(self.element, "r", num(radius));
                scene.set_attr(self.element, "fx", num(focal.x));
                scene.set_attr(self.element, "fy", num(focal.y));
            }
        }

        let raw = Animator::sample(&shape.g.k, frame, Vec::new());
        let stops = parse_gradient_stops(&raw, self.stops.len());
        for (node, stop) in self.stops.iter().zip(&stops) {
            scene.set_attr(*node, "offset", num(stop.offset.clamp(0.0, 1.0)));
            scene.set_attr(*node, "stop-color", rgb_string(&stop.color));
            scene.set_attr(*node, "stop-opacity", num(stop.opacity.clamp(0.0, 1.0)));
        }
    }

    /// Points `node`'s fill at this gradient with the shape's opacity and rule.
    pub fn apply_fill(
        &self,
        scene: &mut SceneGraph,
        node: NodeId,
        shape: &data::GradientFillShape,
        frame: f32,
    ) {
        let opacity = percent(&shape.o, frame);
        scene.set_attr(node, "fill", self.paint());
        scene.set_attr(node, "fill-opacity", format_number(opacity as f64));
        scene.set_attr(node, "fill-rule", fill_rule(shape.r));
        scene.set_attr(node, "stroke", "none");
    }
}
