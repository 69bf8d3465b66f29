//! Keyframe interpolation.
//!
//! [`Animator::resolve`] collapses a keyframed property to a concrete value
//! for one frame: clamped outside the keyframe range, stepped across hold
//! keyframes, eased through cubic beziers in between. Evaluation is pure;
//! the optional [`KeyframeCursor`] only accelerates the bracket lookup and
//! is observably equivalent to the binary-search path.

use glam::{Vec2, Vec3, Vec4};
use motion_data::model::{BezierPath, EasingHandle, Keyframe, Property, TextDocument, Value};

/// Solve a unit-domain cubic bezier easing curve: given the x control
/// coordinates of the two handles, find t for the requested x by
/// Newton-Raphson, then evaluate y at that t.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t -= err / dx_dt;
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// Rotation value that blends along the shortest angular path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Angle(pub f32);

/// Per-component eased progress for one keyframe segment. Properties carry
/// at most four independently eased components (position, scale, color).
pub const MAX_COMPONENTS: usize = 4;

pub trait Interpolatable: Sized + Clone {
    /// Number of independently eased components.
    const COMPONENTS: usize = 1;

    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Blend with one eased progress value per component. `eased` holds at
    /// least `COMPONENTS` entries.
    fn lerp_components(&self, other: &Self, eased: &[f32]) -> Self {
        self.lerp(other, eased.first().copied().unwrap_or(0.0))
    }

    /// Spatial blend along the cubic defined by the keyframes' `to`/`ti`
    /// tangents. Non-spatial types ignore the tangents.
    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        _tan_in: Option<&Vec<f32>>,
        _tan_out: Option<&Vec<f32>>,
    ) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Angle {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // Wrap the delta to (-180, 180] so the blend takes the short way
        // around; a 0 -> 350 track turns -10 degrees, not +350.
        let delta = (other.0 - self.0).rem_euclid(360.0);
        let delta = if delta > 180.0 { delta - 360.0 } else { delta };
        Angle(self.0 + delta * t)
    }
}

impl Interpolatable for Vec2 {
    const COMPONENTS: usize = 2;

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    fn lerp_components(&self, other: &Self, eased: &[f32]) -> Self {
        Vec2::new(
            self.x + (other.x - self.x) * eased[0],
            self.y + (other.y - self.y) * eased[1],
        )
    }
}

impl Interpolatable for Vec3 {
    const COMPONENTS: usize = 3;

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec3::lerp(*self, *other, t)
    }

    fn lerp_components(&self, other: &Self, eased: &[f32]) -> Self {
        Vec3::new(
            self.x + (other.x - self.x) * eased[0],
            self.y + (other.y - self.y) * eased[1],
            self.z + (other.z - self.z) * eased[2],
        )
    }

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        tan_in: Option<&Vec<f32>>,
        tan_out: Option<&Vec<f32>>,
    ) -> Self {
        let p0 = *self;
        let p3 = *other;

        let t_out = spatial_tangent(tan_out);
        let t_in = spatial_tangent(tan_in);

        // Tangents are authored relative to their keyframe's value.
        let p1 = p0 + t_out;
        let p2 = p3 + t_in;

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let t_sq = t * t;

        p0 * (one_minus_t_sq * one_minus_t)
            + p1 * (3.0 * one_minus_t_sq * t)
            + p2 * (3.0 * one_minus_t * t_sq)
            + p3 * (t_sq * t)
    }
}

fn spatial_tangent(tan: Option<&Vec<f32>>) -> Vec3 {
    match tan {
        Some(v) if v.len() >= 3 => Vec3::new(v[0], v[1], v[2]),
        Some(v) if v.len() >= 2 => Vec3::new(v[0], v[1], 0.0),
        _ => Vec3::ZERO,
    }
}

impl Interpolatable for Vec4 {
    const COMPONENTS: usize = 4;

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }

    fn lerp_components(&self, other: &Self, eased: &[f32]) -> Self {
        Vec4::new(
            self.x + (other.x - self.x) * eased[0],
            self.y + (other.y - self.y) * eased[1],
            self.z + (other.z - self.z) * eased[2],
            self.w + (other.w - self.w) * eased[3],
        )
    }
}

// Gradient stop arrays blend entry-wise with a single eased progress.
impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }
}

impl Interpolatable for BezierPath {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return self.clone();
        }
        if t >= 1.0 {
            return other.clone();
        }

        // Vertex counts can differ between morph targets; blend the common
        // prefix rather than failing the whole property.
        let min_verts = self.v.len().min(other.v.len());
        if min_verts == 0 {
            return self.clone();
        }

        let lerp2 = |a: [f32; 2], b: [f32; 2]| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t];

        let mut v = Vec::with_capacity(min_verts);
        let mut i = Vec::with_capacity(min_verts);
        let mut o = Vec::with_capacity(min_verts);

        for idx in 0..min_verts {
            let v1 = self.v[idx];
            let v2 = other.v[idx];
            v.push(lerp2(v1, v2));
            i.push(lerp2(
                self.i.get(idx).copied().unwrap_or([0.0, 0.0]),
                other.i.get(idx).copied().unwrap_or([0.0, 0.0]),
            ));
            o.push(lerp2(
                self.o.get(idx).copied().unwrap_or([0.0, 0.0]),
                other.o.get(idx).copied().unwrap_or([0.0, 0.0]),
            ));
        }

        BezierPath { c: self.c, v, i, o }
    }
}

// Text documents switch discretely at the keyframe boundary.
impl Interpolatable for TextDocument {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t < 1.0 {
            self.clone()
        } else {
            other.clone()
        }
    }
}

/// Last-bracket hint for monotone playback. A hit costs two comparisons;
/// any miss falls back to binary search, so results never depend on the
/// access pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyframeCursor {
    hint: usize,
}

impl KeyframeCursor {
    /// Index of the first keyframe with `t > frame`, equivalent to
    /// `keys.partition_point(|kf| kf.t <= frame)`.
    fn locate<T>(&mut self, keys: &[Keyframe<T>], frame: f32) -> usize {
        let len = keys.len();
        let valid = |idx: usize| {
            (idx == 0 || keys[idx - 1].t <= frame) && (idx == len || keys[idx].t > frame)
        };

        let hint = self.hint.min(len);
        if valid(hint) {
            return hint;
        }
        // Forward playback usually lands on the next segment.
        if hint < len && valid(hint + 1) {
            self.hint = hint + 1;
            return hint + 1;
        }

        let idx = keys.partition_point(|kf| kf.t <= frame);
        self.hint = idx;
        idx
    }
}

pub struct Animator;

impl Animator {
    /// Resolve a property at `frame`, converting the wire value through
    /// `converter`. `default` covers properties the document omitted.
    pub fn resolve<T, U>(
        prop: &Property<T>,
        frame: f32,
        converter: impl Fn(&T) -> U,
        default: U,
    ) -> U
    where
        U: Interpolatable,
    {
        Self::resolve_inner(prop, frame, &converter, default, None)
    }

    /// As [`Animator::resolve`], reusing a bracket cursor across calls.
    pub fn resolve_cached<T, U>(
        prop: &Property<T>,
        frame: f32,
        converter: impl Fn(&T) -> U,
        default: U,
        cursor: &mut KeyframeCursor,
    ) -> U
    where
        U: Interpolatable,
    {
        Self::resolve_inner(prop, frame, &converter, default, Some(cursor))
    }

    fn resolve_inner<T, U>(
        prop: &Property<T>,
        frame: f32,
        converter: &impl Fn(&T) -> U,
        default: U,
        cursor: Option<&mut KeyframeCursor>,
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

                let idx = match cursor {
                    Some(c) => c.locate(keyframes, frame),
                    None => keyframes.partition_point(|kf| kf.t <= frame),
                };

                // Before the first keyframe: clamp to its start value.
                if idx == 0 {
                    if let Some(s) = &keyframes[0].s {
                        return converter(s);
                    }
                    return default;
                }

                let len = keyframes.len();
                // At or past the last keyframe: clamp to its final value.
                if idx >= len {
                    let last = &keyframes[len - 1];
                    if let Some(e) = &last.e {
                        return converter(e);
                    }
                    if let Some(s) = &last.s {
                        return converter(s);
                    }
                    return default;
                }

                let kf_start = &keyframes[idx - 1];
                let kf_end = &keyframes[idx];

                let start_val = kf_start
                    .s
                    .as_ref()
                    .map(converter)
                    .unwrap_or_else(|| default.clone());

                // Legacy documents carry an explicit end value; modern ones
                // imply it from the next keyframe's start.
                let end_val = kf_start
                    .e
                    .as_ref()
                    .map(converter)
                    .or_else(|| kf_end.s.as_ref().map(converter))
                    .unwrap_or_else(|| start_val.clone());

                if kf_start.h == Some(1) {
                    return start_val;
                }

                let duration = kf_end.t - kf_start.t;
                if duration <= 0.0 {
                    return start_val;
                }

                let u = (frame - kf_start.t) / duration;

                let spatial = kf_start.to.is_some() && kf_end.ti.is_some();
                if spatial {
                    let eased = ease_component(kf_start.o.as_ref(), kf_end.i.as_ref(), 0, u);
                    return start_val.lerp_spatial(
                        &end_val,
                        eased,
                        kf_end.ti.as_ref(),
                        kf_start.to.as_ref(),
                    );
                }

                let mut eased = [0.0f32; MAX_COMPONENTS];
                let components = U::COMPONENTS.min(MAX_COMPONENTS);
                for (c, slot) in eased.iter_mut().enumerate().take(components) {
                    *slot = ease_component(kf_start.o.as_ref(), kf_end.i.as_ref(), c, u);
                }
                start_val.lerp_components(&end_val, &eased[..components])
            }
        }
    }
}

/// Eased progress for component `c` of a segment. Handles carry one entry
/// per component; shorter arrays clamp to their last entry, absent handles
/// mean linear.
fn ease_component(
    out_handle: Option<&EasingHandle>,
    in_handle: Option<&EasingHandle>,
    c: usize,
    u: f32,
) -> f32 {
    let pick = |values: &[f32], default: f32| -> f32 {
        if values.is_empty() {
            default
        } else {
            values[c.min(values.len() - 1)]
        }
    };

    let p1 = match out_handle {
        Some(o) => Vec2::new(pick(&o.x, 0.0), pick(&o.y, 0.0)),
        None => Vec2::new(0.0, 0.0),
    };
    let p2 = match in_handle {
        Some(i) => Vec2::new(pick(&i.x, 1.0), pick(&i.y, 1.0)),
        None => Vec2::new(1.0, 1.0),
    };

    // Linear handles short-circuit the solver.
    if p1 == Vec2::ZERO && p2 == Vec2::ONE {
        return u;
    }
    solve_cubic_bezier(p1, p2, u)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion_data::model::Value;

    fn kf(t: f32, s: f32, e: Option<f32>) -> Keyframe<f32> {
        Keyframe {
            t,
            s: Some(s),
            e,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }

    fn animated(keyframes: Vec<Keyframe<f32>>) -> Property<f32> {
        Property {
            a: 1,
            k: Value::Animated(keyframes),
            ix: None,
        }
    }

    #[test]
    fn bracket_search_covers_all_segments() {
        let prop = animated(vec![
            kf(0.0, 0.0, Some(10.0)),
            kf(10.0, 10.0, Some(20.0)),
            kf(20.0, 20.0, Some(30.0)),
        ]);
        let conv = |v: &f32| *v;

        assert_eq!(Animator::resolve(&prop, 0.0, conv, -1.0), 0.0);
        assert_eq!(Animator::resolve(&prop, 10.0, conv, -1.0), 10.0);
        assert_eq!(Animator::resolve(&prop, 20.0, conv, -1.0), 30.0);
        assert_eq!(Animator::resolve(&prop, -5.0, conv, -1.0), 0.0);
        assert_eq!(Animator::resolve(&prop, 25.0, conv, -1.0), 30.0);
        assert_eq!(Animator::resolve(&prop, 5.0, conv, -1.0), 5.0);
        assert_eq!(Animator::resolve(&prop, 15.0, conv, -1.0), 15.0);
    }

    #[test]
    fn cursor_matches_binary_search_for_any_access_pattern() {
        let prop = animated(vec![
            kf(0.0, 0.0, None),
            kf(10.0, 10.0, None),
            kf(20.0, 20.0, None),
            kf(30.0, 5.0, None),
        ]);
        let conv = |v: &f32| *v;
        let mut cursor = KeyframeCursor::default();

        // Monotone, then backwards, then random jumps.
        for frame in [0.0, 3.0, 9.9, 10.0, 14.0, 25.0, 31.0, 2.0, 29.0, -1.0, 15.5] {
            let cold = Animator::resolve(&prop, frame, conv, -1.0);
            let warm = Animator::resolve_cached(&prop, frame, conv, -1.0, &mut cursor);
            assert_eq!(cold, warm, "divergence at frame {frame}");
        }
    }

    #[test]
    fn hold_keyframes_step() {
        let mut first = kf(0.0, 1.0, None);
        first.h = Some(1);
        let prop = animated(vec![first, kf(10.0, 2.0, None)]);
        let conv = |v: &f32| *v;

        assert_eq!(Animator::resolve(&prop, 5.0, conv, 0.0), 1.0);
        assert_eq!(Animator::resolve(&prop, 9.99, conv, 0.0), 1.0);
        assert_eq!(Animator::resolve(&prop, 10.0, conv, 0.0), 2.0);
    }

    #[test]
    fn resolve_is_deterministic() {
        let prop = animated(vec![kf(0.0, 0.0, None), kf(60.0, 100.0, None)]);
        let conv = |v: &f32| *v;
        let a = Animator::resolve(&prop, 37.3, conv, 0.0);
        let b = Animator::resolve(&prop, 37.3, conv, 0.0);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn angle_takes_shortest_path() {
        let a = Angle(350.0);
        let b = Angle(10.0);
        let mid = a.lerp(&b, 0.5);
        // 350 -> 10 is +20 degrees through north, not -340.
        assert!((mid.0 - 360.0).abs() < 1e-4, "got {}", mid.0);
    }

    #[test]
    fn eased_segment_stays_monotone_bounded() {
        let bez = |x: f32| {
            solve_cubic_bezier(Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0), x)
        };
        let mut prev = 0.0;
        for i in 0..=20 {
            let v = bez(i as f32 / 20.0);
            assert!((0.0..=1.0).contains(&v));
            assert!(v >= prev - 1e-4);
            prev = v;
        }
        // Reference value from the rlottie interpolator.
        assert!((bez(0.25) - 0.129_162).abs() < 1e-3);
    }
}
