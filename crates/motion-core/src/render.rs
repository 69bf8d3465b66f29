//! Resolved render-tree types.
//!
//! Everything here is the evaluator's output for one instant: keyframes
//! collapsed to concrete values, transforms flattened to world space,
//! geometry baked into `kurbo` paths. A drawing backend consumes the tree
//! and discards it; nodes are created fresh per evaluation.

use crate::decode::ImageSource;
use glam::{Mat3, Vec2, Vec4};
use kurbo::BezPath;

#[derive(Debug)]
pub struct RenderTree {
    pub width: f32,
    pub height: f32,
    pub root: RenderNode,
}

#[derive(Debug)]
pub struct RenderNode {
    /// World transform: this node's local matrix concatenated with every
    /// ancestor up to the composition root.
    pub transform: Mat3,
    /// Own opacity multiplied by all containment ancestors.
    pub alpha: f32,
    pub blend_mode: BlendMode,
    pub content: NodeContent,
    pub masks: Vec<MaskShape>,
    pub matte: Option<Box<Matte>>,
    pub name: Option<String>,
}

impl RenderNode {
    pub(crate) fn group(children: Vec<RenderNode>) -> Self {
        RenderNode {
            transform: Mat3::IDENTITY,
            alpha: 1.0,
            blend_mode: BlendMode::Normal,
            content: NodeContent::Group(children),
            masks: Vec::new(),
            matte: None,
            name: None,
        }
    }

    /// Number of nodes in this subtree, excluding group containers.
    pub fn drawable_count(&self) -> usize {
        match &self.content {
            NodeContent::Group(children) => {
                children.iter().map(RenderNode::drawable_count).sum()
            }
            _ => 1,
        }
    }
}

#[derive(Debug)]
pub enum NodeContent {
    Group(Vec<RenderNode>),
    Shape(ShapeNode),
    Image(ImageNode),
    Text(TextNode),
}

/// One paintable geometry: trim already applied, group transforms baked in.
#[derive(Debug)]
pub struct ShapeNode {
    pub geometry: BezPath,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

#[derive(Debug, Clone)]
pub struct Fill {
    pub paint: Paint,
    pub opacity: f32,
    pub rule: FillRule,
}

#[derive(Debug, Clone)]
pub struct Stroke {
    pub paint: Paint,
    pub width: f32,
    pub opacity: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: Option<f32>,
    pub dash: Option<DashPattern>,
}

#[derive(Debug, Clone)]
pub struct DashPattern {
    pub array: Vec<f32>,
    pub offset: f32,
}

/// Colors are premultiplication-agnostic linear RGBA in 0..=1.
#[derive(Debug, Clone)]
pub enum Paint {
    Solid(Vec4),
    Gradient(Gradient),
}

#[derive(Debug, Clone)]
pub struct Gradient {
    pub kind: GradientKind,
    pub start: Vec2,
    pub end: Vec2,
    pub stops: Vec<GradientStop>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientKind {
    Linear,
    Radial,
}

#[derive(Debug, Clone, Copy)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Vec4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
    Add,
}

impl BlendMode {
    pub(crate) fn from_code(code: Option<u8>) -> Self {
        match code.unwrap_or(0) {
            1 => BlendMode::Multiply,
            2 => BlendMode::Screen,
            3 => BlendMode::Overlay,
            4 => BlendMode::Darken,
            5 => BlendMode::Lighten,
            6 => BlendMode::ColorDodge,
            7 => BlendMode::ColorBurn,
            8 => BlendMode::HardLight,
            9 => BlendMode::SoftLight,
            10 => BlendMode::Difference,
            11 => BlendMode::Exclusion,
            12 => BlendMode::Hue,
            13 => BlendMode::Saturation,
            14 => BlendMode::Color,
            15 => BlendMode::Luminosity,
            16 => BlendMode::Add,
            _ => BlendMode::Normal,
        }
    }
}

/// Layer mask resolved to a concrete path for this frame.
#[derive(Debug)]
pub struct MaskShape {
    pub mode: MaskMode,
    pub path: BezPath,
    pub opacity: f32,
    pub inverted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    Add,
    Subtract,
    Intersect,
    Lighten,
    Darken,
    Difference,
    None,
}

impl MaskMode {
    pub(crate) fn from_code(mode: Option<&str>) -> Self {
        match mode {
            Some("a") => MaskMode::Add,
            Some("s") => MaskMode::Subtract,
            Some("i") => MaskMode::Intersect,
            Some("l") => MaskMode::Lighten,
            Some("d") => MaskMode::Darken,
            Some("f") => MaskMode::Difference,
            Some("n") => MaskMode::None,
            _ => MaskMode::Add,
        }
    }
}

/// Track matte: the source layer evaluated into its own node, applied to
/// the owning node's alpha or luma.
#[derive(Debug)]
pub struct Matte {
    pub mode: MatteMode,
    pub node: RenderNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatteMode {
    Alpha,
    AlphaInverted,
    Luma,
    LumaInverted,
}

impl MatteMode {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            2 => MatteMode::AlphaInverted,
            3 => MatteMode::Luma,
            4 => MatteMode::LumaInverted,
            _ => MatteMode::Alpha,
        }
    }
}

#[derive(Debug)]
pub struct ImageNode {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub source: Option<ImageSource>,
}

#[derive(Debug)]
pub struct TextNode {
    pub text: String,
    pub font_family: String,
    pub size: f32,
    pub justify: Justification,
    pub tracking: f32,
    pub line_height: f32,
    pub fill: Vec4,
    pub stroke: Option<TextStroke>,
}

#[derive(Debug, Clone, Copy)]
pub struct TextStroke {
    pub color: Vec4,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Right,
    Center,
}

impl Justification {
    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => Justification::Right,
            2 => Justification::Center,
            _ => Justification::Left,
        }
    }
}
