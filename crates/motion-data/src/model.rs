//! Serde model of the Lottie/Bodymovin JSON document.
//!
//! Field names follow the wire format (`fr`, `ip`, `op`, ...); unrecognized
//! fields are ignored so newer documents still load. Values that the format
//! encodes loosely (scalar-or-array, static-or-keyframed) are normalized
//! here so the engine above never sees the ambiguity.

use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Layer type codes (`ty`).
pub mod layer_type {
    pub const PRECOMP: u8 = 0;
    pub const SOLID: u8 = 1;
    pub const IMAGE: u8 = 2;
    pub const NULL: u8 = 3;
    pub const SHAPE: u8 = 4;
    pub const TEXT: u8 = 5;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Animation {
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub markers: Vec<Marker>,
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
    pub st: f32, // Start time offset in composition frames
    #[serde(default = "default_one")]
    pub sr: f32, // Time stretch (1.0 = normal)
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub tm: Option<Property<f32>>, // Time remap, seconds of source time
    #[serde(default)]
    pub hd: Option<bool>, // Hidden
    #[serde(default)]
    pub bm: Option<u8>, // Blend mode
    #[serde(default, rename = "masksProperties")]
    pub masks: Option<Vec<Mask>>,
    #[serde(default)]
    pub tt: Option<u8>, // Matte mode consuming the layer above
    #[serde(default)]
    pub td: Option<u8>, // Set when this layer is a matte source

    // Type specific
    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>, // Precomp, image
    #[serde(default)]
    pub w: Option<u32>, // Precomp viewport
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default, rename = "sc")]
    pub solid_color: Option<String>, // "#rrggbb"
    #[serde(default)]
    pub sw: Option<u32>,
    #[serde(default)]
    pub sh: Option<u32>,
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,
    #[serde(default)]
    pub t: Option<TextData>,
}

fn default_one() -> f32 {
    1.0
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Mask {
    #[serde(default)]
    pub inv: bool,
    #[serde(default)]
    pub mode: Option<String>, // "a", "s", "i", "l", "d", "f", "n"
    pub pt: Property<BezierPath>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub nm: Option<String>,
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
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
    #[serde(rename = "gs")]
    GradientStroke(GradientStrokeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec2>,
    pub p: Property<Vec2>,
    pub r: Property<f32>, // Corner radius
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec2>,
    pub p: Property<Vec2>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Vec4>,
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>, // Fill rule: 1 = non-zero, 2 = even-odd
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Vec4>,
    pub w: Property<f32>,
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8, // Line cap: 1 butt, 2 round, 3 square
    #[serde(default)]
    pub lj: u8, // Line join: 1 miter, 2 round, 3 bevel
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashEntry {
    pub n: Option<String>, // "d" dash, "g" gap, "o" offset
    pub v: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub o: Property<f32>,
    pub s: Property<Vec2>, // Start point
    pub e: Property<Vec2>, // End point
    pub t: u8,             // 1 linear, 2 radial
    pub g: GradientStops,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientStrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub o: Property<f32>,
    pub w: Property<f32>,
    pub s: Property<Vec2>,
    pub e: Property<Vec2>,
    pub t: u8,
    pub g: GradientStops,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashEntry>,
}

/// Flat gradient stop data: `p` is the stop count, `k` holds
/// `[offset, r, g, b]` quads, optionally followed by `[offset, alpha]` pairs.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GradientStops {
    pub p: u32,
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<f32>, // Start percent
    pub e: Property<f32>, // End percent
    pub o: Property<f32>, // Offset in degrees (360 = one full length)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<SpatialVec>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<ScaleVec>, // Percent, 100 = identity
    #[serde(default, alias = "rz")]
    pub r: Property<f32>, // Rotation in degrees
    #[serde(default)]
    pub sk: Property<f32>, // Skew amount in degrees
    #[serde(default)]
    pub sa: Property<f32>, // Skew axis in degrees
    #[serde(default)]
    pub o: Property<f32>, // Opacity percent
}

/// Position is either one animated vector or split per-axis tracks.
/// Split comes first: the unified form's fields are all optional, so it
/// would otherwise swallow split-position objects.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<SpatialVec>),
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
    #[serde(default)]
    pub ix: Option<u32>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
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

        // Keyframe list first: a bare value can also be an array of numbers,
        // so the more structured interpretation has to win.
        if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
            return Ok(Value::Animated(keyframes));
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        // Some exporters wrap static scalars in a single-element array.
        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "coerce_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "coerce_keyframe_value")]
    pub e: Option<T>, // Legacy end value; absent means the next keyframe's `s`
    pub i: Option<EasingHandle>,
    pub o: Option<EasingHandle>,
    pub to: Option<Vec<f32>>, // Spatial out-tangent
    pub ti: Option<Vec<f32>>, // Spatial in-tangent
    pub h: Option<u8>,        // 1 = hold
}

fn coerce_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
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

    // Scalar keyframe values come wrapped in one-element arrays.
    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];
pub type Vec4 = [f32; 4];

/// Bezier easing control handle. The wire format writes `{"x": [..], "y": [..]}`
/// with one entry per animated component, or a bare number for scalars.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EasingHandle {
    #[serde(deserialize_with = "one_or_many")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "one_or_many")]
    pub y: Vec<f32>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(f32),
        Many(Vec<f32>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

/// Anchor/position vector: 2 or 3 floats on the wire, z defaults to 0.
#[derive(Debug, Clone, Serialize, Default)]
pub struct SpatialVec(pub Vec3);

impl<'de> Deserialize<'de> for SpatialVec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SpatialVisitor;
        impl<'de> serde::de::Visitor<'de> for SpatialVisitor {
            type Value = SpatialVec;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(0.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(SpatialVec([x, y, z]))
            }
        }
        deserializer.deserialize_seq(SpatialVisitor)
    }
}

/// Scale vector: z defaults to 100 (percent identity).
#[derive(Debug, Clone, Serialize)]
pub struct ScaleVec(pub Vec3);

impl Default for ScaleVec {
    fn default() -> Self {
        ScaleVec([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for ScaleVec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScaleVisitor;
        impl<'de> serde::de::Visitor<'de> for ScaleVisitor {
            type Value = ScaleVec;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(100.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(ScaleVec([x, y, z]))
            }
        }
        deserializer.deserialize_seq(ScaleVisitor)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>, // In-tangents, relative to vertices
    #[serde(default)]
    pub o: Vec<Vec2>, // Out-tangents, relative to vertices
    #[serde(default)]
    pub v: Vec<Vec2>, // Vertices
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub layers: Option<Vec<Layer>>, // Present for precompositions
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub u: Option<String>, // Image directory
    #[serde(default)]
    pub p: Option<String>, // Image path or data: URI
    #[serde(default)]
    pub e: Option<u8>, // 1 = payload embedded in `p`
    #[serde(default)]
    pub fr: Option<f32>, // Asset-local frame rate
}

impl Asset {
    pub fn is_precomp(&self) -> bool {
        self.layers.is_some()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Marker {
    #[serde(default)]
    pub cm: Option<String>,
    #[serde(default)]
    pub tm: Option<f32>,
    #[serde(default)]
    pub dr: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TextData {
    pub d: Property<TextDocument>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TextDocument {
    #[serde(default)]
    pub t: String, // Text, lines separated by \r
    #[serde(default)]
    pub f: String, // Font family
    #[serde(default)]
    pub s: f32, // Size
    #[serde(default)]
    pub j: u8, // Justification: 0 left, 1 right, 2 center
    #[serde(default)]
    pub tr: f32, // Tracking
    #[serde(default)]
    pub lh: f32, // Line height
    #[serde(default)]
    pub fc: Vec4, // Fill color
    #[serde(default)]
    pub sc: Option<Vec4>, // Stroke color
    #[serde(default)]
    pub sw: Option<f32>, // Stroke width
}
