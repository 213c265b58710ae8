use crate::animatable::Animator;
use glam::Vec2;
use kurbo::{BezPath, PathEl, Point, Shape as _};
use lottie_data::model as data;
use std::fmt::Write as _;

/// Flattening tolerance for primitives converted to curves.
const CURVE_TOLERANCE: f64 = 0.1;
/// Accuracy of arc length measurement, in user units.
const LENGTH_ACCURACY: f64 = 1e-3;

/// Anything that yields path geometry for a frame.
#[derive(Debug, Clone)]
pub enum PathSource {
    Path(data::PathShape),
    Rect(data::RectShape),
    Ellipse(data::EllipseShape),
}

impl PathSource {
    pub fn from_item(item: &data::ShapeItem) -> Option<Self> {
        match item {
            data::ShapeItem::Path(p) => Some(PathSource::Path(p.clone())),
            data::ShapeItem::Rect(r) => Some(PathSource::Rect(r.clone())),
            data::ShapeItem::Ellipse(e) => Some(PathSource::Ellipse(e.clone())),
            _ => None,
        }
    }

    pub fn sample(&self, frame: f32) -> BezPath {
        match self {
            PathSource::Path(p) => convert_bezier_path(&Animator::sample_path(&p.ks, frame)),
            PathSource::Rect(r) => {
                let size = sample_vec2(&r.s, frame, Vec2::ZERO);
                let pos = sample_vec2(&r.p, frame, Vec2::ZERO);
                let radius = Animator::sample(&r.r, frame, 0.0);
                rect_path(size, pos, radius)
            }
            PathSource::Ellipse(e) => {
                let size = sample_vec2(&e.s, frame, Vec2::ZERO);
                let pos = sample_vec2(&e.p, frame, Vec2::ZERO);
                ellipse_path(size, pos)
            }
        }
    }
}

pub(crate) fn sample_vec2(prop: &data::Property<Vec<f32>>, frame: f32, default: Vec2) -> Vec2 {
    Animator::resolve(
        prop,
        frame,
        |v| {
            Vec2::new(
                v.first().copied().unwrap_or(default.x),
                v.get(1).copied().unwrap_or(default.y),
            )
        },
        default,
    )
}

/// Concatenation of every source's geometry at `frame`.
pub fn sample_merged(sources: &[PathSource], frame: f32) -> BezPath {
    let mut merged = BezPath::new();
    for source in sources {
        merged.extend(source.sample(frame).elements().iter().copied());
    }
    merged
}

/// Cubic path through the vertices; handles are offsets from their vertex.
pub fn convert_bezier_path(path_data: &data::BezierPath) -> BezPath {
    let mut bp = BezPath::new();
    if path_data.v.is_empty() {
        return bp;
    }
    let start = path_data.v[0];
    bp.move_to(Point::new(start[0] as f64, start[1] as f64));
    for i in 0..path_data.v.len() {
        let next_idx = (i + 1) % path_data.v.len();
        if next_idx == 0 && !path_data.c {
            break;
        }
        let p0 = path_data.v[i];
        let p1 = path_data.v[next_idx];
        let o = path_data.o.get(i).copied().unwrap_or([0.0, 0.0]);
        let in_ = path_data.i.get(next_idx).copied().unwrap_or([0.0, 0.0]);
        bp.curve_to(
            Point::new((p0[0] + o[0]) as f64, (p0[1] + o[1]) as f64),
            Point::new((p1[0] + in_[0]) as f64, (p1[1] + in_[1]) as f64),
            Point::new(p1[0] as f64, p1[1] as f64),
        );
    }
    if path_data.c {
        bp.close_path();
    }
    bp
}

pub fn rect_path(size: Vec2, pos: Vec2, radius: f32) -> BezPath {
    let half = size / 2.0;
    let rect = kurbo::Rect::new(
        (pos.x - half.x) as f64,
        (pos.y - half.y) as f64,
        (pos.x + half.x) as f64,
        (pos.y + half.y) as f64,
    );
    let radius = radius.min(half.x.abs()).min(half.y.abs());
    if radius > 0.0 {
        closed(rect.to_rounded_rect(radius as f64).to_path(CURVE_TOLERANCE))
    } else {
        closed(rect.to_path(CURVE_TOLERANCE))
    }
}

pub fn ellipse_path(size: Vec2, pos: Vec2) -> BezPath {
    let half = size / 2.0;
    let path = kurbo::Ellipse::new(
        (pos.x as f64, pos.y as f64),
        (half.x as f64, half.y as f64),
        0.0,
    )
    .to_path(CURVE_TOLERANCE);
    closed(path)
}

/// Primitives are closed outlines; strokes must join at the seam.
fn closed(mut path: BezPath) -> BezPath {
    let ends_closed = matches!(path.elements().last(), Some(PathEl::ClosePath));
    if !ends_closed && !path.elements().is_empty() {
        path.close_path();
    }
    path
}

/// Total arc length, closing segments included.
pub fn path_length(path: &BezPath) -> f64 {
    path.perimeter(LENGTH_ACCURACY)
}

/// Formats a coordinate for SVG output, rounded to four decimals.
pub fn format_number(v: f64) -> String {
    let rounded = (v * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 || !rounded.is_finite() {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

/// SVG path data for `path`.
pub fn svg_path_data(path: &BezPath) -> String {
    let mut out = String::new();
    let point = |out: &mut String, p: Point| {
        let _ = write!(out, "{},{}", format_number(p.x), format_number(p.y));
    };
    for el in path.elements() {
        if !out.is_empty() {
            out.push(' ');
        }
        match *el {
            PathEl::MoveTo(p) => {
                out.push('M');
                point(&mut out, p);
            }
            PathEl::LineTo(p) => {
                out.push('L');
                point(&mut out, p);
            }
            PathEl::QuadTo(p1, p2) => {
                out.push('Q');
                point(&mut out, p1);
                out.push(' ');
                point(&mut out, p2);
            }
            PathEl::CurveTo(p1, p2, p3) => {
                out.push('C');
                point(&mut out, p1);
                out.push(' ');
                point(&mut out, p2);
                out.push(' ');
                point(&mut out, p3);
            }
            PathEl::ClosePath => out.push('Z'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;
    use serde_json::json;

    fn line(points: &[[f32; 2]], closed: bool) -> data::BezierPath {
        data::BezierPath::polyline(points, closed)
    }

    #[test]
    fn open_path_has_no_closing_segment() {
        let bp = convert_bezier_path(&line(&[[0.0, 0.0], [100.0, 0.0]], false));
        assert_eq!(bp.elements().len(), 2);
        assert!((path_length(&bp) - 100.0).abs() < 1e-3);
    }

    #[test]
    fn closed_path_length_includes_return_segment() {
        let bp = convert_bezier_path(&line(&[[0.0, 0.0], [30.0, 0.0], [30.0, 40.0]], true));
        assert!(matches!(bp.elements().last(), Some(PathEl::ClosePath)));
        assert!((path_length(&bp) - 120.0).abs() < 1e-2);
    }

    #[test]
    fn empty_path_is_empty() {
        let bp = convert_bezier_path(&data::BezierPath::default());
        assert!(bp.elements().is_empty());
        assert_eq!(svg_path_data(&bp), "");
        assert_eq!(path_length(&bp), 0.0);
    }

    #[test]
    fn path_data_rounds_coordinates() {
        let bp = convert_bezier_path(&line(&[[0.123456, -0.00001], [10.0, 2.5]], false));
        assert_eq!(svg_path_data(&bp), "M0.1235,0 C0.1235,0 10,2.5 10,2.5");
    }

    #[test]
    fn rect_and_ellipse_sources() {
        let items: Vec<data::ShapeItem> = serde_json::from_value(json!([
            { "ty": "rc", "s": { "k": [20, 10] }, "p": { "k": [0, 0] }, "r": { "k": 0 } },
            { "ty": "el", "s": { "k": [20, 20] }, "p": { "k": [5, 5] } },
            { "ty": "fl", "c": { "k": [1, 1, 1, 1] } }
        ]))
        .unwrap();
        let sources: Vec<PathSource> = items.iter().filter_map(PathSource::from_item).collect();
        assert_eq!(sources.len(), 2);

        let rect = sources[0].sample(0.0);
        assert!((path_length(&rect) - 60.0).abs() < 1e-2);
        let bounds = rect.bounding_box();
        assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (-10.0, -5.0, 10.0, 5.0));

        let circle = sources[1].sample(0.0);
        assert!(matches!(circle.elements().last(), Some(PathEl::ClosePath)));
        assert!(svg_path_data(&circle).ends_with('Z'));
        let circumference = 2.0 * std::f64::consts::PI * 10.0;
        assert!((path_length(&circle) - circumference).abs() < 0.1);
    }

    #[test]
    fn merged_sources_concatenate() {
        let a = PathSource::Path(data::PathShape {
            nm: None,
            hd: None,
            ks: data::Property::fixed(line(&[[0.0, 0.0], [10.0, 0.0]], false)),
        });
        let b = PathSource::Path(data::PathShape {
            nm: None,
            hd: None,
            ks: data::Property::fixed(line(&[[0.0, 5.0], [10.0, 5.0]], false)),
        });
        let merged = sample_merged(&[a, b], 0.0);
        let moves = merged
            .elements()
            .iter()
            .filter(|el| matches!(el, PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 2);
        assert!((path_length(&merged) - 20.0).abs() < 1e-3);
    }
}
