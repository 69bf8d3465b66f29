//! Arclength trimming of bezier paths.
//!
//! Trim values arrive as resolved fractions of the path's total length:
//! `start`/`end` from the percent tracks, `offset` from the degree track
//! (360 degrees = one full length). When the offset pushes the window past
//! 100 % it wraps around to the head of the path.

use kurbo::{BezPath, ParamCurve, ParamCurveArclen, PathSeg, Point};

const ARCLEN_ACCURACY: f64 = 1e-3;

/// Trim `path` to the window `[start, end] + offset`, fractions of total
/// arclength. A window of length >= 1 returns the path unchanged.
pub(crate) fn trim_path(path: &BezPath, start: f32, end: f32, offset: f32) -> BezPath {
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    let span = (hi - lo).clamp(0.0, 1.0) as f64;

    if span >= 1.0 {
        return path.clone();
    }
    if span <= 0.0 {
        return BezPath::new();
    }

    let segments: Vec<PathSeg> = path.segments().collect();
    let lengths: Vec<f64> = segments
        .iter()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .collect();
    let total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        return BezPath::new();
    }

    let from = ((lo + offset) as f64).rem_euclid(1.0);
    let to = from + span;

    let mut out = BezPath::new();
    let mut last_end: Option<Point> = None;
    if to <= 1.0 {
        emit_window(&segments, &lengths, from * total, to * total, &mut out, &mut last_end);
    } else {
        // Wrapped: tail of the path first, then the head.
        emit_window(&segments, &lengths, from * total, total, &mut out, &mut last_end);
        last_end = None;
        emit_window(&segments, &lengths, 0.0, (to - 1.0) * total, &mut out, &mut last_end);
    }
    out
}

/// Append the sub-curves covering `[win_start, win_end]` (absolute
/// arclength units) to `out`.
fn emit_window(
    segments: &[PathSeg],
    lengths: &[f64],
    win_start: f64,
    win_end: f64,
    out: &mut BezPath,
    last_end: &mut Option<Point>,
) {
    let mut walked = 0.0;
    for (seg, &len) in segments.iter().zip(lengths) {
        let seg_start = walked;
        let seg_end = walked + len;
        walked = seg_end;

        if len <= 0.0 || seg_end <= win_start || seg_start >= win_end {
            continue;
        }

        let t0 = if win_start <= seg_start {
            0.0
        } else {
            seg.inv_arclen(win_start - seg_start, ARCLEN_ACCURACY)
        };
        let t1 = if win_end >= seg_end {
            1.0
        } else {
            seg.inv_arclen(win_end - seg_start, ARCLEN_ACCURACY)
        };
        if t1 <= t0 {
            continue;
        }

        let sub = seg.subsegment(t0..t1);
        let sub_start = sub.eval(0.0);

        // Source subpath boundaries show up as jumps between consecutive
        // segment endpoints; restart the contour there.
        let continuous = last_end
            .map(|p| (p - sub_start).hypot() < 1e-6)
            .unwrap_or(false);
        if !continuous {
            out.move_to(sub_start);
        }

        match sub {
            PathSeg::Line(line) => out.line_to(line.p1),
            PathSeg::Quad(quad) => out.quad_to(quad.p1, quad.p2),
            PathSeg::Cubic(cubic) => out.curve_to(cubic.p1, cubic.p2, cubic.p3),
        }
        *last_end = Some(sub.eval(1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape as _;

    fn horizontal_line(len: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((len, 0.0));
        path
    }

    #[test]
    fn full_window_is_identity() {
        let path = horizontal_line(100.0);
        let trimmed = trim_path(&path, 0.0, 1.0, 0.0);
        assert_eq!(trimmed.elements().len(), path.elements().len());
    }

    #[test]
    fn half_window_halves_the_line() {
        let path = horizontal_line(100.0);
        let trimmed = trim_path(&path, 0.0, 0.5, 0.0);
        let bbox = trimmed.bounding_box();
        assert!((bbox.x1 - 50.0).abs() < 0.5, "x1 = {}", bbox.x1);
    }

    #[test]
    fn offset_past_end_wraps_to_head() {
        let path = horizontal_line(100.0);
        // Window [0.75, 1.25): tail quarter plus head quarter.
        let trimmed = trim_path(&path, 0.0, 0.5, 0.75);
        let moves = trimmed
            .elements()
            .iter()
            .filter(|el| matches!(el, kurbo::PathEl::MoveTo(_)))
            .count();
        assert_eq!(moves, 2, "wrapped trim should produce two contours");
        let bbox = trimmed.bounding_box();
        assert!((bbox.x0 - 0.0).abs() < 0.5);
        assert!((bbox.x1 - 100.0).abs() < 0.5);
    }

    #[test]
    fn empty_window_is_empty() {
        let path = horizontal_line(100.0);
        assert!(trim_path(&path, 0.3, 0.3, 0.0).elements().is_empty());
    }
}
