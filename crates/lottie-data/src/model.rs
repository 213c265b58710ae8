use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

/// Root of an authored animation document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Animation {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Animation {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Number of frames in one loop, never below one.
    pub fn total_frames(&self) -> f32 {
        (self.op - self.ip).max(1.0)
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }
}

impl std::str::FromStr for Animation {
    type Err = serde_json::Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Precomposition,
    Null,
    Shape,
    Light,
    /// Parsed but never rendered (solids, images, text, cameras, ...).
    Other(u8),
}

impl LayerKind {
    pub fn from_code(ty: u8) -> Self {
        match ty {
            0 => LayerKind::Precomposition,
            3 => LayerKind::Null,
            4 => LayerKind::Shape,
            14 => LayerKind::Light,
            other => LayerKind::Other(other),
        }
    }

    /// Nulls and lights parent other layers without dimming them.
    pub fn contributes_opacity(self) -> bool {
        !matches!(self, LayerKind::Null | LayerKind::Light)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32, // Start time offset for precomposition sources
    #[serde(default = "default_one")]
    pub sr: f32, // Time stretch (1.0 = normal)
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub ks: Transform,

    // Precomposition
    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,

    // Shape layer
    #[serde(default)]
    pub shapes: Option<Vec<ShapeItem>>,
}

fn default_one() -> f32 {
    1.0
}

impl Layer {
    pub fn kind(&self) -> LayerKind {
        LayerKind::from_code(self.ty)
    }

    pub fn is_hidden(&self) -> bool {
        self.hd == Some(true)
    }

    pub fn is_active_at(&self, frame: f32) -> bool {
        frame >= self.ip && frame < self.op
    }

    pub fn name(&self) -> &str {
        self.nm.as_deref().unwrap_or("unnamed")
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub layers: Option<Vec<Layer>>,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum ShapeItem {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "gf")]
    GradientFill(GradientFillShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "mm")]
    Merge(MergeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(other)]
    Unknown,
}

impl ShapeItem {
    /// Items authored with `hd: true` are skipped entirely.
    pub fn is_hidden(&self) -> bool {
        let hd = match self {
            ShapeItem::Group(g) => g.hd,
            ShapeItem::Path(p) => p.hd,
            ShapeItem::Rect(r) => r.hd,
            ShapeItem::Ellipse(e) => e.hd,
            ShapeItem::Fill(f) => f.hd,
            ShapeItem::Stroke(s) => s.hd,
            ShapeItem::GradientFill(g) => g.hd,
            ShapeItem::Trim(t) => t.hd,
            ShapeItem::Merge(m) => m.hd,
            ShapeItem::Transform(t) => t.hd,
            ShapeItem::Unknown => None,
        };
        hd == Some(true)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub it: Vec<ShapeItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
    #[serde(default)]
    pub r: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub c: Property<Vec<f32>>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>, // Fill rule: 1 = nonzero, 2 = evenodd
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    pub c: Property<Vec<f32>>,
    #[serde(default)]
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashProperty {
    #[serde(default)]
    pub n: Option<String>, // "d" dash, "g" gap, "o" offset
    pub v: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub o: Property<f32>,
    pub s: Property<Vec<f32>>,
    pub e: Property<Vec<f32>>,
    #[serde(default = "default_linear")]
    pub t: u8, // 1 = linear, 2 = radial
    pub g: GradientColors,
    #[serde(default)]
    pub h: Option<Property<f32>>, // Highlight length (radial)
    #[serde(default)]
    pub a: Option<Property<f32>>, // Highlight angle (radial)
    #[serde(default)]
    pub r: Option<u8>,
}

fn default_linear() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GradientColors {
    /// Number of color stops; fixes the stop count of the rendered gradient.
    pub p: u32,
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub s: Property<f32>,
    #[serde(default)]
    pub e: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub m: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MergeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub mm: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec<f32>>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec<f32>>, // Scale in percent
    #[serde(default, alias = "rz")]
    pub r: Property<f32>, // Rotation in degrees, clockwise
    #[serde(default)]
    pub o: Property<f32>, // Opacity in percent
    #[serde(default)]
    pub sk: Property<f32>, // Skew in degrees
    #[serde(default)]
    pub sa: Property<f32>, // Skew axis in degrees
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec<f32>>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            a: 0,
            k: Value::Static(value),
        }
    }

    pub fn animated(keyframes: Vec<Keyframe<T>>) -> Self {
        Property {
            a: 1,
            k: Value::Animated(keyframes),
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.k, Value::Animated(_))
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        // Keyframe lists are arrays of objects carrying a "t"; plain numeric
        // arrays are static vectors.
        let looks_keyframed = v
            .as_array()
            .and_then(|arr| arr.first())
            .is_some_and(|first| first.get("t").is_some());
        if looks_keyframed {
            if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
                return Ok(Value::Animated(keyframes));
            }
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    pub fn new(t: f32, s: T) -> Self {
        Keyframe {
            t,
            s: Some(s),
            e: None,
            i: None,
            o: None,
            h: None,
        }
    }

    pub fn with_easing(mut self, out_handle: [f32; 2], in_handle: [f32; 2]) -> Self {
        self.o = Some(BezierTangent::point(out_handle));
        self.i = Some(BezierTangent::point(in_handle));
        self
    }

    pub fn is_hold(&self) -> bool {
        self.h == Some(1)
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    // Scalars and shapes are commonly wrapped in a one-element array.
    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

/// Easing handle of a keyframe, `{"x": [0.33], "y": [1]}` or `{"x": 0.33, "y": 1}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_scalar_or_list")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "deserialize_scalar_or_list")]
    pub y: Vec<f32>,
}

impl BezierTangent {
    pub fn point([x, y]: [f32; 2]) -> Self {
        BezierTangent {
            x: vec![x],
            y: vec![y],
        }
    }

    /// First component of the handle, or `fallback` when the lists are empty.
    pub fn first_or(&self, fallback: [f32; 2]) -> [f32; 2] {
        [
            self.x.first().copied().unwrap_or(fallback[0]),
            self.y.first().copied().unwrap_or(fallback[1]),
        ]
    }
}

fn deserialize_scalar_or_list<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ScalarOrList {
        Scalar(f32),
        List(Vec<f32>),
    }

    Ok(match ScalarOrList::deserialize(deserializer)? {
        ScalarOrList::Scalar(v) => vec![v],
        ScalarOrList::List(v) => v,
    })
}

pub type Vec2 = [f32; 2];

/// Bezier path: vertices plus in/out handles stored relative to each vertex.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

impl BezierPath {
    pub fn polyline(points: &[Vec2], closed: bool) -> Self {
        BezierPath {
            c: closed,
            i: vec![[0.0, 0.0]; points.len()],
            o: vec![[0.0, 0.0]; points.len()],
            v: points.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }
}
