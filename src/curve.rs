use super::*;
use super::error::CurveError;
use super::interval::Interval;
use super::linear::{join, LinearCurve, MonotonicLinearCurve};
use super::point::{remap, ControlPoint};
use super::segment::BezierSegment;
use serde::{Deserialize, Serialize};

/// Which side of a split ordinate a trim drops.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrimSide {
    /// Drop everything before the ordinate, keep `[x, end)`.
    Before,
    /// Drop everything after the ordinate, keep `[start, x)`.
    After,
}

/// An ordered, right-met sequence of cubic Bezier segments forming a function
/// of the `in` axis over the half-open domain
/// `[segments[0].p0.in, segments[last].p3.in)`.
///
/// Adjacent segments share their boundary point (position only; higher
/// continuity is the caller's business). An empty curve is legal and
/// evaluates as the identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BezierCurve {
    pub segments: Vec<BezierSegment>,
}

impl BezierCurve {
    pub fn new(segments: Vec<BezierSegment>) -> Self {
        debug_assert!(segments
            .windows(2)
            .all(|pair| pair[0].p3.nearly_equal(&pair[1].p0)));
        BezierCurve { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Half-open input domain. Empty curves report an empty interval.
    pub fn input_interval(&self) -> Interval {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => Interval::new(first.p0.input, last.p3.input),
            _ => Interval::default(),
        }
    }

    /// Index of the segment whose half-open input span contains `x`.
    /// Linear search; the very first boundary is inclusive.
    pub fn find_segment_index(&self, x: NativeFloat) -> Option<usize> {
        self.segments
            .iter()
            .position(|segment| segment.input_interval().contains(x))
    }

    /// Evaluate the curve as a function of its input axis. An empty curve is
    /// the identity by convention; anything outside the domain is
    /// `OutOfBounds`.
    pub fn evaluate(&self, x: NativeFloat) -> Result<NativeFloat, CurveError> {
        if self.segments.is_empty() {
            return Ok(x);
        }
        let index = self
            .find_segment_index(x)
            .ok_or(CurveError::OutOfBounds(x))?;
        Ok(self.segments[index].eval_at_input(x).output)
    }

    /// Evaluate with the input seeded as the differentiation variable;
    /// returns the output value and `d out / d in`.
    pub fn evaluate_dual(&self, x: NativeFloat) -> Result<Dual, CurveError> {
        if self.segments.is_empty() {
            return Ok(Dual::seeded(x));
        }
        let index = self
            .find_segment_index(x)
            .ok_or(CurveError::OutOfBounds(x))?;
        Ok(self.segments[index].eval_at_input_dual(x).output)
    }

    /// Split the containing segment at `x` and splice the halves in. When `x`
    /// falls within `EPSILON` of a segment boundary the curve is returned as
    /// an unchanged clone.
    pub fn split_at_input_ordinate(&self, x: NativeFloat) -> Result<BezierCurve, CurveError> {
        let index = self
            .find_segment_index(x)
            .ok_or(CurveError::OutOfBounds(x))?;
        let segment = self.segments[index];
        match segment.split_at(segment.u_at_input(x)) {
            None => Ok(self.clone()),
            Some((left, right)) => {
                let mut segments = Vec::with_capacity(self.segments.len() + 1);
                segments.extend_from_slice(&self.segments[..index]);
                segments.push(left);
                segments.push(right);
                segments.extend_from_slice(&self.segments[index + 1..]);
                Ok(BezierCurve { segments })
            }
        }
    }

    /// Repeated single-ordinate split. Ordinates outside the domain are
    /// skipped; the result does not depend on the order of the list.
    pub fn split_at_each_input_ordinate(&self, ordinates: &[NativeFloat]) -> BezierCurve {
        let mut curve = self.clone();
        for &x in ordinates {
            if let Ok(split) = curve.split_at_input_ordinate(x) {
                curve = split;
            }
        }
        curve
    }

    /// Split wherever the curve's output crosses one of the given ordinates.
    /// Each segment is assumed monotonic in its output axis (split on
    /// critical points first); ordinates a segment never reaches are skipped.
    pub fn split_at_each_output_ordinate(&self, ordinates: &[NativeFloat]) -> BezierCurve {
        let mut inputs = Vec::new();
        for &v in ordinates {
            for segment in &self.segments {
                let (o0, o1, o2, o3) = (
                    segment.p0.output,
                    segment.p1.output,
                    segment.p2.output,
                    segment.p3.output,
                );
                let u = if o0 < o3 && v > o0 && v < o3 {
                    find_u(v, o0, o1, o2, o3)
                } else if o3 < o0 && v > o3 && v < o0 {
                    // falling output axis: invert through negation
                    find_u(-v, -o0, -o1, -o2, -o3)
                } else {
                    continue;
                };
                inputs.push(segment.eval_at(u).input);
            }
        }
        self.split_at_each_input_ordinate(&inputs)
    }

    /// Split at `x` and drop one side. Requests within `EPSILON` of the
    /// domain ends are no-ops; requests beyond the domain are `OutOfBounds`.
    pub fn trimmed_from_input_ordinate(
        &self,
        x: NativeFloat,
        side: TrimSide,
    ) -> Result<BezierCurve, CurveError> {
        let domain = self.input_interval();
        if x < domain.start - EPSILON || x > domain.end + EPSILON {
            return Err(CurveError::OutOfBounds(x));
        }
        match side {
            TrimSide::Before if x <= domain.start + EPSILON => return Ok(self.clone()),
            TrimSide::After if x >= domain.end - EPSILON => return Ok(self.clone()),
            _ => {}
        }
        let split = self.split_at_input_ordinate(x)?;
        let segments = split
            .segments
            .into_iter()
            .filter(|segment| match side {
                TrimSide::Before => segment.p0.input >= x - EPSILON,
                TrimSide::After => segment.p3.input <= x + EPSILON,
            })
            .collect();
        Ok(BezierCurve { segments })
    }

    /// Trim to an input interval: two single-sided trims.
    pub fn trimmed_in_input_space(&self, bounds: Interval) -> Result<BezierCurve, CurveError> {
        self.trimmed_from_input_ordinate(bounds.start, TrimSide::Before)?
            .trimmed_from_input_ordinate(bounds.end, TrimSide::After)
    }

    /// Split every segment on its critical points. Every segment of the
    /// result is monotonic in both axes.
    pub fn split_on_critical_points(&self) -> BezierCurve {
        BezierCurve {
            segments: self
                .segments
                .iter()
                .flat_map(|segment| segment.split_on_critical_points())
                .collect(),
        }
    }

    /// Lower to a polyline: split on critical points, then linearize each
    /// segment at the default tolerance, concatenating knots.
    pub fn linearized(&self) -> LinearCurve {
        let split = self.split_on_critical_points();
        let mut knots: Vec<ControlPoint> = Vec::new();
        for segment in &split.segments {
            for knot in segment.linearize(LINEARIZATION_TOLERANCE) {
                let duplicate = knots
                    .last()
                    .map_or(false, |last| last.nearly_equal(&knot));
                if !duplicate {
                    knots.push(knot);
                }
            }
        }
        LinearCurve::new(knots)
    }

    /// Conservative bounding box over all segments' control-point boxes.
    pub fn extents(&self) -> (ControlPoint, ControlPoint) {
        let mut segments = self.segments.iter();
        let (mut min, mut max) = match segments.next() {
            Some(first) => first.extents(),
            None => return (ControlPoint::default(), ControlPoint::default()),
        };
        for segment in segments {
            let (lo, hi) = segment.extents();
            min.input = Float::min(min.input, lo.input);
            min.output = Float::min(min.output, lo.output);
            max.input = Float::max(max.input, hi.input);
            max.output = Float::max(max.output, hi.output);
        }
        (min, max)
    }

    /// Affine remap of every control point from the curve's own extents box
    /// onto the target box.
    pub fn rescaled_to(&self, target_min: ControlPoint, target_max: ControlPoint) -> BezierCurve {
        let (min, max) = self.extents();
        let remap_point = |p: &ControlPoint| -> ControlPoint {
            ControlPoint::new(
                remap(p.input, min.input, max.input, target_min.input, target_max.input),
                remap(
                    p.output,
                    min.output,
                    max.output,
                    target_min.output,
                    target_max.output,
                ),
            )
        };
        BezierCurve {
            segments: self
                .segments
                .iter()
                .map(|s| {
                    BezierSegment::new(
                        remap_point(&s.p0),
                        remap_point(&s.p1),
                        remap_point(&s.p2),
                        remap_point(&s.p3),
                    )
                })
                .collect(),
        }
    }

    /// Remap onto the unit box.
    pub fn normalized(&self) -> BezierCurve {
        self.rescaled_to(ControlPoint::new(0.0, 0.0), ControlPoint::new(1.0, 1.0))
    }

    /// Compose: treat `self` as the curve from axis B to axis C and `a2b` as
    /// the curve from axis A to axis B, and return the monotonic pieces of
    /// the A-to-C mapping. This is the authoritative path: both operands are
    /// lowered to monotonic polylines and joined pairwise. Pieces that do not
    /// overlap produce nothing; completely disjoint operands produce an
    /// empty result.
    ///
    /// Caller contract: `a2b`'s output axis and `self`'s input axis must be
    /// the same coordinate system.
    pub fn project_curve(&self, a2b: &BezierCurve) -> Vec<MonotonicLinearCurve> {
        let b2c_pieces = self.linearized().split_at_critical_points();
        let a2b_pieces = a2b.linearized().split_at_critical_points();
        let mut result = Vec::new();
        for ab in &a2b_pieces {
            for bc in &b2c_pieces {
                let joined = join(ab, bc);
                if !joined.is_empty() {
                    result.push(joined);
                }
            }
        }
        result
    }

    /// Experimental direct-cubic composition built on the three-point
    /// approximation; stays in the Bezier representation but is only
    /// approximate between the projected sample points. [`project_curve`]
    /// remains the authoritative path.
    ///
    /// [`project_curve`]: BezierCurve::project_curve
    pub fn project_curve_bezier(&self, a2b: &BezierCurve) -> Result<BezierCurve, CurveError> {
        let through = self.split_on_critical_points();
        let mut boundaries: Vec<NativeFloat> =
            through.segments.iter().map(|s| s.p0.input).collect();
        if let Some(last) = through.segments.last() {
            boundaries.push(last.p3.input);
        }
        let a2b = a2b
            .split_on_critical_points()
            .split_at_each_output_ordinate(&boundaries);
        let mut segments = Vec::new();
        for segment in &a2b.segments {
            let mid_out = segment.eval_at(0.5).output;
            if let Some(index) = through.find_segment_index(mid_out) {
                segments.push(through.segments[index].project_segment_three_point(segment)?);
            }
            // segments whose output leaves the through-curve domain are dropped
        }
        Ok(BezierCurve { segments })
    }
}
