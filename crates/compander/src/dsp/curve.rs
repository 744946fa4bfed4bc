//! Transfer curve construction
//!
//! The user's breakpoints describe a piecewise-linear transfer function in
//! dB. It is stored as gain relative to the input level, moved into the
//! natural-log amplitude domain, and every interior corner is replaced by a
//! quadratic piece fitted through a circular-arc approximation, so the
//! evaluated gain changes smoothly around each knee.
//!
//! The segment table interleaves straight pieces (even slots, `a == 0`) with
//! the rounded corner pieces (odd slots). Slot 0 is the tail-off point below
//! the first breakpoint and the last two slots both hold the final point.

use compand_core::{validate_points, Breakpoint, CompandError, CompandResult};
use std::f64::consts::LN_10;

/// Scale from dB to natural-log amplitude
pub const DB_TO_LOG: f64 = LN_10 / 20.0;

/// Relative tolerance when deciding that two adjacent slopes are equal
pub const COLINEAR_TOLERANCE: f64 = 1e-9;

/// One piece of the transfer curve
///
/// Relative to the anchor, `out_log = y + dx * (a * dx + b)` with
/// `dx = in_log - x`. Both `x` and `y` are natural-log amplitudes; `y` is
/// the gain applied at `x`, not the absolute output level.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CurveSegment {
    pub x: f64,
    pub y: f64,
    pub a: f64,
    pub b: f64,
}

impl CurveSegment {
    fn point(x: f64, y: f64) -> Self {
        Self { x, y, a: 0.0, b: 0.0 }
    }

    /// Evaluate the segment's log gain at `in_log`
    #[inline]
    pub fn eval(&self, in_log: f64) -> f64 {
        let dx = in_log - self.x;
        self.y + dx * (self.a * dx + self.b)
    }
}

/// Immutable segment table plus the clamp values below its domain
#[derive(Clone, Debug, PartialEq)]
pub struct TransferCurve {
    pub(crate) segments: Vec<CurveSegment>,
    pub(crate) in_min_lin: f64,
    pub(crate) out_min_lin: f64,
}

/// A knot of the piecewise-linear curve: input level and relative gain
#[derive(Clone, Copy, Debug, PartialEq)]
struct Knot {
    x: f64,
    y: f64,
}

fn alloc<T>(len: usize) -> CompandResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CompandError::ResourceExhausted("transfer curve segments"))?;
    Ok(v)
}

fn is_colinear(p0: Knot, p1: Knot, p2: Knot) -> bool {
    let g1 = (p1.y - p0.y) * (p2.x - p1.x);
    let g2 = (p2.y - p1.y) * (p1.x - p0.x);
    (g1 - g2).abs() <= COLINEAR_TOLERANCE * g1.abs().max(g2.abs()).max(1.0)
}

/// Drop the middle knot of every colinear run of three
fn join_colinear(knots: &[Knot]) -> CompandResult<Vec<Knot>> {
    let mut joined: Vec<Knot> = alloc(knots.len())?;
    for &knot in knots {
        let n = joined.len();
        if n >= 2 && is_colinear(joined[n - 2], joined[n - 1], knot) {
            joined.pop();
        }
        joined.push(knot);
    }
    Ok(joined)
}

fn slope(from: &CurveSegment, to: &CurveSegment) -> f64 {
    let dx = to.x - from.x;
    if dx == 0.0 {
        0.0
    } else {
        (to.y - from.y) / dx
    }
}

impl TransferCurve {
    /// Build the curve from dB breakpoints, a soft-knee radius in dB and an
    /// output gain in dB
    pub fn build(points: &[Breakpoint], soft_knee_db: f64, gain_db: f64) -> CompandResult<Self> {
        validate_points(points)?;

        let mut knots: Vec<Knot> = alloc(points.len() + 2)?;
        knots.extend(points.iter().map(|p| Knot {
            x: p.input_db,
            y: p.gain_db(),
        }));

        // Unity point closes the curve at full scale
        if knots.last().map_or(true, |k| k.x < 0.0) {
            knots.push(Knot { x: 0.0, y: 0.0 });
        }

        // Tail-off below the first breakpoint keeps its gain
        let first = knots[0];
        knots.insert(
            0,
            Knot {
                x: first.x - 2.0 * soft_knee_db,
                y: first.y,
            },
        );

        let knots = join_colinear(&knots)?;

        let count = knots.len();
        let mut segments: Vec<CurveSegment> = alloc(2 * count - 1)?;
        for (i, knot) in knots.iter().enumerate() {
            if i > 0 {
                segments.push(CurveSegment::default());
            }
            segments.push(CurveSegment::point(
                knot.x * DB_TO_LOG,
                (knot.y + gain_db) * DB_TO_LOG,
            ));
        }

        round_corners(&mut segments, soft_knee_db * DB_TO_LOG);

        let floor = segments[1];
        let curve = Self {
            segments,
            in_min_lin: floor.x.exp(),
            out_min_lin: floor.y.exp(),
        };

        for (i, s) in curve.segments.iter().enumerate() {
            tracing::debug!(
                "segment {}: x={:.6} y={:.6} a={:.6} b={:.6}",
                i,
                s.x,
                s.y,
                s.a,
                s.b
            );
        }

        Ok(curve)
    }

    /// Build the curve described by validated settings
    pub fn from_settings(settings: &compand_core::CompandSettings) -> CompandResult<Self> {
        Self::build(&settings.breakpoints()?, settings.soft_knee, settings.gain)
    }

    /// Segment table ordered by increasing `x`
    pub fn segments(&self) -> &[CurveSegment] {
        &self.segments
    }

    /// Envelope level below which the gain is clamped
    pub fn in_min_lin(&self) -> f64 {
        self.in_min_lin
    }

    /// Gain applied below `in_min_lin`
    pub fn out_min_lin(&self) -> f64 {
        self.out_min_lin
    }
}

/// Replace each interior vertex (even slot) with a rounded corner
///
/// The corner piece lives in the odd slot before the vertex. The vertex
/// itself is moved to the end of the arc and keeps the slope of the outgoing
/// line, so the straight pieces stay on their original lines.
fn round_corners(segments: &mut [CurveSegment], radius: f64) {
    let last = segments.len() - 1;

    for v in (2..last).step_by(2) {
        let prev = segments[v - 2];
        let vertex = segments[v];
        let next = segments[v + 2];

        segments[v - 2].a = 0.0;
        segments[v - 2].b = slope(&prev, &vertex);
        segments[v].a = 0.0;
        segments[v].b = slope(&vertex, &next);

        // Arc start: back along the incoming line, at most its whole length
        let theta = (vertex.y - prev.y).atan2(vertex.x - prev.x);
        let len = (vertex.x - prev.x).hypot(vertex.y - prev.y);
        let r = radius.min(len);
        let start_x = vertex.x - r * theta.cos();
        let start_y = vertex.y - r * theta.sin();

        // Arc end: forward along the outgoing line, at most half of it
        let theta = (next.y - vertex.y).atan2(next.x - vertex.x);
        let len = (next.x - vertex.x).hypot(next.y - vertex.y);
        let r = radius.min(len / 2.0);
        let end_x = vertex.x + r * theta.cos();
        let end_y = vertex.y + r * theta.sin();

        let cx = (start_x + vertex.x + end_x) / 3.0;
        let cy = (start_y + vertex.y + end_y) / 3.0;

        segments[v].x = end_x;
        segments[v].y = end_y;

        let in1 = cx - start_x;
        let out1 = cy - start_y;
        let in2 = end_x - start_x;
        let out2 = end_y - start_y;

        let mut a = (out2 / in2 - out1 / in1) / (in2 - in1);
        let mut b = out1 / in1 - a * in1;
        if !a.is_finite() || !b.is_finite() {
            // Zero-width corner, keep it straight
            a = 0.0;
            b = if in2 != 0.0 { out2 / in2 } else { 0.0 };
        }

        segments[v - 1] = CurveSegment {
            x: start_x,
            y: start_y,
            a,
            b,
        };
    }

    // Sentinel before the final point
    let end = segments[last];
    segments[last - 1] = CurveSegment::point(end.x, end.y);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_points() -> Vec<Breakpoint> {
        vec![Breakpoint::new(-70.0, -70.0), Breakpoint::new(-60.0, -20.0)]
    }

    #[test]
    fn test_default_curve_layout() {
        let curve = TransferCurve::build(&default_points(), 0.01, 0.0).unwrap();
        // tail, -70, -60, unity -> 4 knots, 7 slots
        assert_eq!(curve.segments().len(), 7);

        let last = curve.segments()[6];
        assert_eq!(last.x, 0.0);
        assert_eq!(last.y, 0.0);
        assert_eq!(curve.segments()[5], last);
    }

    #[test]
    fn test_segments_ordered() {
        let points = vec![
            Breakpoint::new(-90.0, -90.0),
            Breakpoint::new(-60.0, -40.0),
            Breakpoint::new(-30.0, -20.0),
            Breakpoint::new(-10.0, -8.0),
        ];
        for knee in [0.01, 1.0, 6.0, 30.0] {
            let curve = TransferCurve::build(&points, knee, -2.0).unwrap();
            for pair in curve.segments().windows(2) {
                assert!(
                    pair[0].x <= pair[1].x + 1e-12,
                    "unordered at knee {}: {:?}",
                    knee,
                    pair
                );
            }
        }
    }

    #[test]
    fn test_floor_values() {
        let curve = TransferCurve::build(&default_points(), 0.01, 0.0).unwrap();
        // Floor sits one knee radius below the first breakpoint, at unity gain
        let expected_in = 10f64.powf(-70.01 / 20.0);
        assert!((curve.in_min_lin() - expected_in).abs() < 1e-12);
        assert!((curve.out_min_lin() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gain_offsets_every_point() {
        let plain = TransferCurve::build(&default_points(), 0.01, 0.0).unwrap();
        let boosted = TransferCurve::build(&default_points(), 0.01, 6.0).unwrap();
        let offset = 6.0 * DB_TO_LOG;

        for (p, b) in plain.segments().iter().zip(boosted.segments()) {
            assert!((p.x - b.x).abs() < 1e-12);
            assert!((b.y - p.y - offset).abs() < 1e-9);
        }
    }

    #[test]
    fn test_colinear_points_joined() {
        // Every point lies on the unity line, so only the tail and the end survive
        let points = vec![
            Breakpoint::new(-90.0, -90.0),
            Breakpoint::new(-50.0, -50.0),
            Breakpoint::new(-20.0, -20.0),
        ];
        let curve = TransferCurve::build(&points, 0.01, 0.0).unwrap();
        assert_eq!(curve.segments().len(), 3);
        assert_eq!(curve.in_min_lin(), 1.0);
        assert_eq!(curve.out_min_lin(), 1.0);
    }

    #[test]
    fn test_near_colinear_within_tolerance() {
        let knots = [
            Knot { x: -60.0, y: 10.0 },
            Knot { x: -40.0, y: 5.0 },
            Knot { x: -20.0, y: 1e-12 },
        ];
        // Slope -0.25 then -0.25 plus rounding noise
        assert!(is_colinear(knots[0], knots[1], knots[2]));
        assert!(!is_colinear(
            knots[0],
            knots[1],
            Knot { x: -20.0, y: 1.0 }
        ));
    }

    #[test]
    fn test_no_unity_point_above_zero() {
        let points = vec![Breakpoint::new(-60.0, -60.0), Breakpoint::new(6.0, 0.0)];
        let curve = TransferCurve::build(&points, 0.01, 0.0).unwrap();
        let last = curve.segments().last().copied().unwrap();
        assert!((last.x - 6.0 * DB_TO_LOG).abs() < 1e-12);
        assert!((last.y + 6.0 * DB_TO_LOG).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unordered_points() {
        let points = vec![Breakpoint::new(-20.0, -20.0), Breakpoint::new(-40.0, -40.0)];
        assert!(matches!(
            TransferCurve::build(&points, 0.01, 0.0),
            Err(CompandError::NonIncreasingPoints { .. })
        ));
    }

    #[test]
    fn test_empty_points_is_flat() {
        let curve = TransferCurve::build(&[], 0.01, -6.0).unwrap();
        assert_eq!(curve.segments().len(), 3);
        assert!((curve.out_min_lin() - 10f64.powf(-6.0 / 20.0)).abs() < 1e-12);
    }
}
