//! Timeline evaluation: scene graph + frame -> render tree.
//!
//! Pure function of its inputs. The same immutable [`SceneGraph`] can be
//! evaluated concurrently at different frames; every call builds a fresh
//! [`RenderTree`]. [`evaluate_with_cache`] is the single-driver variant
//! that reuses keyframe bracket cursors between frames and produces
//! output identical to [`evaluate`].

use crate::animatable::{Angle, Animator, Interpolatable, KeyframeCursor};
use crate::graph::SceneGraph;
use crate::render::{
    BlendMode, DashPattern, Fill, FillRule, Gradient, GradientKind, GradientStop, ImageNode,
    Justification, LineCap, LineJoin, MaskMode, MaskShape, Matte, MatteMode, NodeContent, Paint,
    RenderNode, RenderTree, ShapeNode, Stroke, TextNode, TextStroke,
};
use crate::trim::trim_path;
use glam::{Mat3, Vec2, Vec3, Vec4};
use kurbo::{Affine, BezPath, Shape as _};
use motion_data::model::{self as data, layer_type, PositionProperty, Property};
use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

/// Per-node keyframe cursors for the transform-and-timing hot path.
/// Owned by a single driver (the playback controller); never shared.
pub struct EvalCache {
    nodes: Vec<NodeCursors>,
}

#[derive(Default, Clone)]
struct NodeCursors {
    anchor: KeyframeCursor,
    position: KeyframeCursor,
    position_x: KeyframeCursor,
    position_y: KeyframeCursor,
    scale: KeyframeCursor,
    rotation: KeyframeCursor,
    skew: KeyframeCursor,
    skew_axis: KeyframeCursor,
    opacity: KeyframeCursor,
    time_remap: KeyframeCursor,
}

impl EvalCache {
    pub fn new(graph: &SceneGraph) -> Self {
        EvalCache {
            nodes: vec![NodeCursors::default(); graph.node_count()],
        }
    }
}

/// Evaluate the graph at `frame` (composition frame units).
pub fn evaluate(graph: &SceneGraph, frame: f32) -> RenderTree {
    Evaluator { graph, cache: None }.run(frame)
}

/// As [`evaluate`], threading bracket cursors through the transform
/// resolution. Observably equivalent to the uncached path.
pub fn evaluate_with_cache(graph: &SceneGraph, frame: f32, cache: &mut EvalCache) -> RenderTree {
    if cache.nodes.len() != graph.node_count() {
        *cache = EvalCache::new(graph);
    }
    Evaluator {
        graph,
        cache: Some(cache),
    }
    .run(frame)
}

fn resolve_prop<T, U>(
    prop: &Property<T>,
    frame: f32,
    converter: impl Fn(&T) -> U,
    default: U,
    cursor: Option<&mut KeyframeCursor>,
) -> U
where
    U: Interpolatable,
{
    match cursor {
        Some(c) => Animator::resolve_cached(prop, frame, converter, default, c),
        None => Animator::resolve(prop, frame, converter, default),
    }
}

struct Evaluator<'a> {
    graph: &'a SceneGraph,
    cache: Option<&'a mut EvalCache>,
}

#[derive(Clone, Copy)]
struct ResolvedTrim {
    start: f32,
    end: f32,
    offset: f32,
}

impl<'a> Evaluator<'a> {
    fn run(&mut self, frame: f32) -> RenderTree {
        let comp = self.graph.composition();
        let children = self.eval_instance(self.graph.root(), frame, Mat3::IDENTITY, 1.0);
        RenderTree {
            width: comp.width() as f32,
            height: comp.height() as f32,
            root: RenderNode::group(children),
        }
    }

    /// Evaluate one composition instance at its local time. Returns render
    /// nodes in draw order (back to front).
    fn eval_instance(
        &mut self,
        instance_id: usize,
        local_t: f32,
        parent_world: Mat3,
        inherited_alpha: f32,
    ) -> Vec<RenderNode> {
        let graph = self.graph;
        let inst = graph.instance(instance_id);
        if inst.layers.is_empty() {
            return Vec::new();
        }
        let base = inst.layers[0];

        // Transforms resolve for every node, parents first: parenting
        // applies even when the parent sits outside its own visibility
        // window.
        let mut worlds = vec![Mat3::IDENTITY; inst.layers.len()];
        for &id in &inst.eval_order {
            let layer = graph.layer(id);
            let local = self.resolve_transform(id, &layer.ks, local_t);
            let above = match graph.node(id).parent {
                Some(parent) => worlds[parent - base],
                None => parent_world,
            };
            worlds[id - base] = above * local;
        }

        // Wire order is front-to-back; draw order is the reverse.
        let mut nodes = Vec::new();
        for &id in inst.layers.iter().rev() {
            let node = graph.node(id);
            if node.is_matte_source {
                continue;
            }
            let layer = graph.layer(id);
            if layer.hd == Some(true) {
                continue;
            }
            // Visibility window, inclusive at both ends so the final
            // composition frame still renders layers that end on it.
            if local_t < layer.ip || local_t > layer.op {
                continue;
            }

            let world = worlds[id - base];
            let Some(mut rendered) = self.eval_layer(id, layer, world, inherited_alpha, local_t)
            else {
                continue;
            };

            if let (Some(matte_id), Some(tt)) = (node.matte_source, layer.tt) {
                let matte_layer = graph.layer(matte_id);
                let visible = matte_layer.hd != Some(true)
                    && local_t >= matte_layer.ip
                    && local_t <= matte_layer.op;
                if visible {
                    if let Some(matte_node) = self.eval_layer(
                        matte_id,
                        matte_layer,
                        worlds[matte_id - base],
                        inherited_alpha,
                        local_t,
                    ) {
                        rendered.matte = Some(Box::new(Matte {
                            mode: MatteMode::from_code(tt),
                            node: matte_node,
                        }));
                    }
                }
            }

            nodes.push(rendered);
        }
        nodes
    }

    fn eval_layer(
        &mut self,
        id: usize,
        layer: &data::Layer,
        world: Mat3,
        inherited_alpha: f32,
        local_t: f32,
    ) -> Option<RenderNode> {
        let opacity_cursor = self.cache.as_mut().map(|c| &mut c.nodes[id].opacity);
        let opacity = resolve_prop(&layer.ks.o, local_t, |v| *v / 100.0, 1.0, opacity_cursor);
        let alpha = (opacity * inherited_alpha).clamp(0.0, 1.0);

        let content = match layer.ty {
            layer_type::SHAPE => {
                let shapes = layer.shapes.as_deref().unwrap_or(&[]);
                NodeContent::Group(self.eval_shapes(shapes, local_t, world, None))
            }
            layer_type::PRECOMP => {
                let sub = self
                    .graph
                    .node(id)
                    .sub_instance
                    .expect("precomp node has an instance");
                let sub_t = self.precomp_time(id, layer, local_t);
                NodeContent::Group(self.eval_instance(sub, sub_t, world, alpha))
            }
            layer_type::SOLID => NodeContent::Shape(eval_solid(layer)),
            layer_type::IMAGE => {
                let ref_id = layer.ref_id.clone().unwrap_or_default();
                let comp = self.graph.composition();
                let asset = comp
                    .model()
                    .assets
                    .iter()
                    .find(|a| a.id == ref_id);
                NodeContent::Image(ImageNode {
                    source: comp.image(&ref_id).cloned(),
                    width: asset.and_then(|a| a.w).unwrap_or(0),
                    height: asset.and_then(|a| a.h).unwrap_or(0),
                    id: ref_id,
                })
            }
            layer_type::TEXT => match &layer.t {
                Some(text) => NodeContent::Text(self.eval_text(text, local_t)),
                None => NodeContent::Group(Vec::new()),
            },
            layer_type::NULL => NodeContent::Group(Vec::new()),
            other => {
                warn_unsupported_layer(other, layer.nm.as_deref());
                return None;
            }
        };

        let masks = match &layer.masks {
            Some(masks) => self.eval_masks(masks, local_t),
            None => Vec::new(),
        };

        Some(RenderNode {
            transform: world,
            alpha,
            blend_mode: BlendMode::from_code(layer.bm),
            content,
            masks,
            matte: None,
            name: layer.nm.clone(),
        })
    }

    /// Local clock of a nested composition: time remap when authored,
    /// otherwise the referencing layer's start offset and stretch.
    fn precomp_time(&mut self, id: usize, layer: &data::Layer, local_t: f32) -> f32 {
        if let Some(tm) = &layer.tm {
            let cursor = self.cache.as_mut().map(|c| &mut c.nodes[id].time_remap);
            let seconds = resolve_prop(tm, local_t, |v| *v, 0.0, cursor);
            return seconds * self.graph.composition().frame_rate();
        }
        let stretched = if layer.sr != 0.0 { layer.sr } else { 1.0 };
        (local_t - layer.st) / stretched
    }

    fn resolve_transform(&mut self, id: usize, t: &data::Transform, frame: f32) -> Mat3 {
        let mut cur = self.cache.as_mut().map(|c| &mut c.nodes[id]);

        let anchor = resolve_prop(
            &t.a,
            frame,
            |v| Vec3::from(v.0),
            Vec3::ZERO,
            cur.as_mut().map(|c| &mut c.anchor),
        );
        let position = match &t.p {
            PositionProperty::Unified(p) => resolve_prop(
                p,
                frame,
                |v| Vec3::from(v.0),
                Vec3::ZERO,
                cur.as_mut().map(|c| &mut c.position),
            ),
            PositionProperty::Split { x, y } => {
                let px = resolve_prop(x, frame, |v| *v, 0.0, cur.as_mut().map(|c| &mut c.position_x));
                let py = resolve_prop(y, frame, |v| *v, 0.0, cur.as_mut().map(|c| &mut c.position_y));
                Vec3::new(px, py, 0.0)
            }
        };
        let scale = resolve_prop(
            &t.s,
            frame,
            |v| Vec3::from(v.0) / 100.0,
            Vec3::ONE,
            cur.as_mut().map(|c| &mut c.scale),
        );
        let rotation = resolve_prop(
            &t.r,
            frame,
            |v| Angle(*v),
            Angle(0.0),
            cur.as_mut().map(|c| &mut c.rotation),
        );
        let skew = resolve_prop(&t.sk, frame, |v| *v, 0.0, cur.as_mut().map(|c| &mut c.skew));
        let skew_axis = resolve_prop(
            &t.sa,
            frame,
            |v| *v,
            0.0,
            cur.as_mut().map(|c| &mut c.skew_axis),
        );

        compose_transform(
            anchor.truncate(),
            position.truncate(),
            scale.truncate(),
            rotation.0,
            skew,
            skew_axis,
        )
    }

    fn eval_text(&mut self, text: &data::TextData, frame: f32) -> TextNode {
        let doc = Animator::resolve(
            &text.d,
            frame,
            |v| v.clone(),
            data::TextDocument::default(),
        );
        TextNode {
            text: doc.t.replace('\r', "\n"),
            font_family: doc.f,
            size: doc.s,
            justify: Justification::from_code(doc.j),
            tracking: doc.tr,
            line_height: doc.lh,
            fill: Vec4::new(doc.fc[0], doc.fc[1], doc.fc[2], 1.0),
            stroke: doc.sc.map(|sc| TextStroke {
                color: Vec4::new(sc[0], sc[1], sc[2], 1.0),
                width: doc.sw.unwrap_or(1.0),
            }),
        }
    }

    fn eval_masks(&mut self, masks: &[data::Mask], frame: f32) -> Vec<MaskShape> {
        masks
            .iter()
            .map(|mask| {
                let path = Animator::resolve(
                    &mask.pt,
                    frame,
                    |v| v.clone(),
                    data::BezierPath::default(),
                );
                let opacity = Animator::resolve(&mask.o, frame, |v| *v / 100.0, 1.0);
                MaskShape {
                    mode: MaskMode::from_code(mask.mode.as_deref()),
                    path: convert_path(&path),
                    opacity,
                    inverted: mask.inv,
                }
            })
            .collect()
    }

    /// Resolve a shape list into paintable nodes. Geometry is baked into
    /// layer space; group transforms are applied to everything the group
    /// produced, so paints and geometry never escape their container.
    fn eval_shapes(
        &mut self,
        shapes: &[data::Shape],
        frame: f32,
        world: Mat3,
        inherited_trim: Option<ResolvedTrim>,
    ) -> Vec<RenderNode> {
        // The trim item applies to every geometry in its group, including
        // ones listed before it, so it resolves ahead of the main pass.
        let mut trim = inherited_trim;
        for item in shapes {
            if let data::Shape::Trim(t) = item {
                trim = Some(ResolvedTrim {
                    start: Animator::resolve(&t.s, frame, |v| *v / 100.0, 0.0),
                    end: Animator::resolve(&t.e, frame, |v| *v / 100.0, 1.0),
                    offset: Animator::resolve(&t.o, frame, |v| *v / 360.0, 0.0),
                });
            }
        }

        let mut nodes: Vec<RenderNode> = Vec::new();
        let mut geometries: Vec<BezPath> = Vec::new();
        let mut group_transform: Option<(Mat3, f32)> = None;

        for item in shapes {
            match item {
                data::Shape::Path(p) => {
                    let path = Animator::resolve(
                        &p.ks,
                        frame,
                        |v| v.clone(),
                        data::BezierPath::default(),
                    );
                    geometries.push(convert_path(&path));
                }
                data::Shape::Rect(r) => {
                    let size = Animator::resolve(&r.s, frame, vec2_of, Vec2::ZERO);
                    let pos = Animator::resolve(&r.p, frame, vec2_of, Vec2::ZERO);
                    let radius = Animator::resolve(&r.r, frame, |v| *v, 0.0);
                    geometries.push(rect_path(size, pos, radius));
                }
                data::Shape::Ellipse(e) => {
                    let size = Animator::resolve(&e.s, frame, vec2_of, Vec2::ZERO);
                    let pos = Animator::resolve(&e.p, frame, vec2_of, Vec2::ZERO);
                    let half = size / 2.0;
                    let ellipse = kurbo::Ellipse::new(
                        (pos.x as f64, pos.y as f64),
                        (half.x as f64, half.y as f64),
                        0.0,
                    );
                    geometries.push(ellipse.to_path(0.1));
                }
                data::Shape::Fill(f) => {
                    if let Some(geometry) = combined_geometry(&geometries, trim) {
                        let color = Animator::resolve(&f.c, frame, vec4_of, Vec4::ONE);
                        let opacity = Animator::resolve(&f.o, frame, |v| *v / 100.0, 1.0);
                        nodes.push(shape_node(
                            world,
                            geometry,
                            Some(Fill {
                                paint: Paint::Solid(color),
                                opacity,
                                rule: fill_rule(f.r),
                            }),
                            None,
                        ));
                    }
                }
                data::Shape::GradientFill(gf) => {
                    if let Some(geometry) = combined_geometry(&geometries, trim) {
                        let opacity = Animator::resolve(&gf.o, frame, |v| *v / 100.0, 1.0);
                        let paint = self.gradient_paint(gf.t, &gf.s, &gf.e, &gf.g, frame);
                        nodes.push(shape_node(
                            world,
                            geometry,
                            Some(Fill {
                                paint,
                                opacity,
                                rule: fill_rule(gf.r),
                            }),
                            None,
                        ));
                    }
                }
                data::Shape::Stroke(s) => {
                    if let Some(geometry) = combined_geometry(&geometries, trim) {
                        let color = Animator::resolve(&s.c, frame, vec4_of, Vec4::ONE);
                        let stroke = Stroke {
                            paint: Paint::Solid(color),
                            width: Animator::resolve(&s.w, frame, |v| *v, 1.0),
                            opacity: Animator::resolve(&s.o, frame, |v| *v / 100.0, 1.0),
                            cap: line_cap(s.lc),
                            join: line_join(s.lj),
                            miter_limit: s.ml,
                            dash: self.dash_pattern(&s.d, frame),
                        };
                        nodes.push(shape_node(world, geometry, None, Some(stroke)));
                    }
                }
                data::Shape::GradientStroke(gs) => {
                    if let Some(geometry) = combined_geometry(&geometries, trim) {
                        let stroke = Stroke {
                            paint: self.gradient_paint(gs.t, &gs.s, &gs.e, &gs.g, frame),
                            width: Animator::resolve(&gs.w, frame, |v| *v, 1.0),
                            opacity: Animator::resolve(&gs.o, frame, |v| *v / 100.0, 1.0),
                            cap: line_cap(gs.lc),
                            join: line_join(gs.lj),
                            miter_limit: gs.ml,
                            dash: self.dash_pattern(&gs.d, frame),
                        };
                        nodes.push(shape_node(world, geometry, None, Some(stroke)));
                    }
                }
                data::Shape::Group(g) => {
                    nodes.extend(self.eval_shapes(&g.it, frame, world, trim));
                }
                data::Shape::Transform(tr) => {
                    let matrix = self.resolve_shape_transform(&tr.t, frame);
                    let opacity = Animator::resolve(&tr.t.o, frame, |v| *v / 100.0, 1.0);
                    group_transform = Some((matrix, opacity));
                }
                data::Shape::Trim(_) => {}
                data::Shape::Unknown => warn_unsupported_shape(),
            }
        }

        if let Some((matrix, opacity)) = group_transform {
            let affine = mat3_to_affine(matrix);
            for node in &mut nodes {
                if let NodeContent::Shape(shape) = &mut node.content {
                    shape.geometry.apply_affine(affine);
                    transform_paint(shape.fill.as_mut().map(|f| &mut f.paint), matrix);
                    transform_paint(shape.stroke.as_mut().map(|s| &mut s.paint), matrix);
                }
                node.alpha *= opacity;
            }
        }

        // Items are listed front-to-back; emit back-to-front like layers.
        nodes.reverse();
        nodes
    }

    /// Shape-group transforms have no parent chain and no cursor slots;
    /// they resolve with the plain binary-search path.
    fn resolve_shape_transform(&mut self, t: &data::Transform, frame: f32) -> Mat3 {
        let anchor = Animator::resolve(&t.a, frame, |v| Vec3::from(v.0), Vec3::ZERO);
        let position = match &t.p {
            PositionProperty::Unified(p) => {
                Animator::resolve(p, frame, |v| Vec3::from(v.0), Vec3::ZERO)
            }
            PositionProperty::Split { x, y } => Vec3::new(
                Animator::resolve(x, frame, |v| *v, 0.0),
                Animator::resolve(y, frame, |v| *v, 0.0),
                0.0,
            ),
        };
        let scale = Animator::resolve(&t.s, frame, |v| Vec3::from(v.0) / 100.0, Vec3::ONE);
        let rotation = Animator::resolve(&t.r, frame, |v| Angle(*v), Angle(0.0));
        let skew = Animator::resolve(&t.sk, frame, |v| *v, 0.0);
        let skew_axis = Animator::resolve(&t.sa, frame, |v| *v, 0.0);
        compose_transform(
            anchor.truncate(),
            position.truncate(),
            scale.truncate(),
            rotation.0,
            skew,
            skew_axis,
        )
    }

    fn gradient_paint(
        &mut self,
        kind: u8,
        start: &Property<data::Vec2>,
        end: &Property<data::Vec2>,
        stops: &data::GradientStops,
        frame: f32,
    ) -> Paint {
        let start = Animator::resolve(start, frame, vec2_of, Vec2::ZERO);
        let end = Animator::resolve(end, frame, vec2_of, Vec2::ZERO);
        let raw = Animator::resolve(&stops.k, frame, |v| v.clone(), Vec::new());
        Paint::Gradient(Gradient {
            kind: if kind == 2 {
                GradientKind::Radial
            } else {
                GradientKind::Linear
            },
            start,
            end,
            stops: build_gradient_stops(stops.p as usize, &raw),
        })
    }

    fn dash_pattern(&mut self, entries: &[data::DashEntry], frame: f32) -> Option<DashPattern> {
        if entries.is_empty() {
            return None;
        }
        let mut array = Vec::new();
        let mut offset = 0.0;
        for entry in entries {
            let value = Animator::resolve(&entry.v, frame, |v| *v, 0.0);
            if entry.n.as_deref() == Some("o") {
                offset = value;
            } else {
                array.push(value);
            }
        }
        if array.is_empty() {
            return None;
        }
        Some(DashPattern { array, offset })
    }
}

fn eval_solid(layer: &data::Layer) -> ShapeNode {
    let w = layer.sw.unwrap_or(0) as f64;
    let h = layer.sh.unwrap_or(0) as f64;
    let color = layer
        .solid_color
        .as_deref()
        .map(parse_hex_color)
        .unwrap_or(Vec4::new(0.0, 0.0, 0.0, 1.0));

    ShapeNode {
        geometry: kurbo::Rect::new(0.0, 0.0, w, h).to_path(0.1),
        fill: Some(Fill {
            paint: Paint::Solid(color),
            opacity: 1.0,
            rule: FillRule::NonZero,
        }),
        stroke: None,
    }
}

fn shape_node(
    world: Mat3,
    geometry: BezPath,
    fill: Option<Fill>,
    stroke: Option<Stroke>,
) -> RenderNode {
    RenderNode {
        transform: world,
        alpha: 1.0,
        blend_mode: BlendMode::Normal,
        content: NodeContent::Shape(ShapeNode {
            geometry,
            fill,
            stroke,
        }),
        masks: Vec::new(),
        matte: None,
        name: None,
    }
}

/// All geometry collected so far in the group, merged and trimmed. `None`
/// when there is nothing for a paint to apply to.
fn combined_geometry(geometries: &[BezPath], trim: Option<ResolvedTrim>) -> Option<BezPath> {
    if geometries.is_empty() {
        return None;
    }
    let mut merged = BezPath::new();
    for g in geometries {
        merged.extend(g.elements().iter().copied());
    }
    if let Some(t) = trim {
        merged = trim_path(&merged, t.start, t.end, t.offset);
    }
    Some(merged)
}

/// T(position) * R(rotation) * K(skew about axis) * S(scale) * T(-anchor).
fn compose_transform(
    anchor: Vec2,
    position: Vec2,
    scale: Vec2,
    rotation_deg: f32,
    skew_deg: f32,
    skew_axis_deg: f32,
) -> Mat3 {
    let mut m = Mat3::from_translation(position);
    if rotation_deg != 0.0 {
        m *= Mat3::from_angle(rotation_deg.to_radians());
    }
    if skew_deg != 0.0 {
        let axis = skew_axis_deg.to_radians();
        let shear = (-skew_deg.to_radians()).tan();
        let shear_x = Mat3::from_cols(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(shear, 1.0, 0.0),
            Vec3::Z,
        );
        m *= Mat3::from_angle(axis) * shear_x * Mat3::from_angle(-axis);
    }
    m *= Mat3::from_scale(scale);
    m * Mat3::from_translation(-anchor)
}

fn mat3_to_affine(m: Mat3) -> Affine {
    let c = m.to_cols_array();
    Affine::new([
        c[0] as f64,
        c[1] as f64,
        c[3] as f64,
        c[4] as f64,
        c[6] as f64,
        c[7] as f64,
    ])
}

fn transform_paint(paint: Option<&mut Paint>, m: Mat3) {
    if let Some(Paint::Gradient(gradient)) = paint {
        gradient.start = m.transform_point2(gradient.start);
        gradient.end = m.transform_point2(gradient.end);
    }
}

/// Wire bezier to kurbo: tangents are stored relative to their vertex.
pub(crate) fn convert_path(b: &data::BezierPath) -> BezPath {
    let n = b.v.len();
    let mut path = BezPath::new();
    if n == 0 {
        return path;
    }

    let vertex = |i: usize| -> kurbo::Point {
        kurbo::Point::new(b.v[i][0] as f64, b.v[i][1] as f64)
    };
    let tangent = |list: &[data::Vec2], i: usize| -> kurbo::Vec2 {
        list.get(i)
            .map(|t| kurbo::Vec2::new(t[0] as f64, t[1] as f64))
            .unwrap_or(kurbo::Vec2::ZERO)
    };

    path.move_to(vertex(0));
    for i in 0..n - 1 {
        path.curve_to(
            vertex(i) + tangent(&b.o, i),
            vertex(i + 1) + tangent(&b.i, i + 1),
            vertex(i + 1),
        );
    }
    if b.c {
        path.curve_to(
            vertex(n - 1) + tangent(&b.o, n - 1),
            vertex(0) + tangent(&b.i, 0),
            vertex(0),
        );
        path.close_path();
    }
    path
}

fn rect_path(size: Vec2, pos: Vec2, radius: f32) -> BezPath {
    let half = size / 2.0;
    let rect = kurbo::Rect::new(
        (pos.x - half.x) as f64,
        (pos.y - half.y) as f64,
        (pos.x + half.x) as f64,
        (pos.y + half.y) as f64,
    );
    if radius > 0.0 {
        rect.to_rounded_rect(radius as f64).to_path(0.1)
    } else {
        rect.to_path(0.1)
    }
}

/// `[offset, r, g, b]` quads for `count` stops, then optional
/// `[offset, alpha]` pairs covering the same span.
fn build_gradient_stops(count: usize, raw: &[f32]) -> Vec<GradientStop> {
    let color_len = count * 4;
    if raw.len() < color_len {
        return Vec::new();
    }
    let alpha_pairs: Vec<(f32, f32)> = raw[color_len..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();

    let sample_alpha = |offset: f32| -> f32 {
        if alpha_pairs.is_empty() {
            return 1.0;
        }
        match alpha_pairs.iter().position(|&(o, _)| o >= offset) {
            Some(0) => alpha_pairs[0].1,
            Some(i) => {
                let (o0, a0) = alpha_pairs[i - 1];
                let (o1, a1) = alpha_pairs[i];
                if o1 > o0 {
                    a0 + (a1 - a0) * (offset - o0) / (o1 - o0)
                } else {
                    a1
                }
            }
            None => alpha_pairs.last().map(|&(_, a)| a).unwrap_or(1.0),
        }
    };

    raw[..color_len]
        .chunks_exact(4)
        .map(|quad| GradientStop {
            offset: quad[0],
            color: Vec4::new(quad[1], quad[2], quad[3], sample_alpha(quad[0])),
        })
        .collect()
}

fn fill_rule(code: Option<u8>) -> FillRule {
    if code == Some(2) {
        FillRule::EvenOdd
    } else {
        FillRule::NonZero
    }
}

fn line_cap(code: u8) -> LineCap {
    match code {
        2 => LineCap::Round,
        3 => LineCap::Square,
        _ => LineCap::Butt,
    }
}

fn line_join(code: u8) -> LineJoin {
    match code {
        2 => LineJoin::Round,
        3 => LineJoin::Bevel,
        _ => LineJoin::Miter,
    }
}

fn parse_hex_color(s: &str) -> Vec4 {
    let hex = s.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| -> f32 {
        hex.get(range)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0) as f32
            / 255.0
    };
    Vec4::new(channel(0..2), channel(2..4), channel(4..6), 1.0)
}

fn warn_unsupported_layer(ty: u8, name: Option<&str>) {
    static SEEN: OnceLock<Mutex<HashSet<u8>>> = OnceLock::new();
    let store = SEEN.get_or_init(|| Mutex::new(HashSet::new()));
    if let Ok(mut seen) = store.lock() {
        if seen.insert(ty) {
            tracing::warn!(
                layer_type = ty,
                name = name.unwrap_or("unnamed"),
                "layer type not rendered"
            );
        }
    }
}

fn warn_unsupported_shape() {
    static SEEN: OnceLock<Mutex<bool>> = OnceLock::new();
    let store = SEEN.get_or_init(|| Mutex::new(false));
    if let Ok(mut seen) = store.lock() {
        if !*seen {
            *seen = true;
            tracing::warn!("unrecognized shape type skipped");
        }
    }
}

fn vec2_of(v: &data::Vec2) -> Vec2 {
    Vec2::new(v[0], v[1])
}

fn vec4_of(v: &data::Vec4) -> Vec4 {
    Vec4::new(v[0], v[1], v[2], v[3])
}
