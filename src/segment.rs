use super::*;
use super::dual::{Dual, DualPoint};
use super::error::CurveError;
use super::interval::Interval;
use super::invert::find_u;
use super::ordinate::Ordinate;
use super::point::ControlPoint;
use super::quadratic_bezier::QuadraticBezier;
use serde::{Deserialize, Serialize};

/// Subdivision stops here even if the flatness test still fails; past this
/// depth the control net differences are below f32 resolution.
const MAX_LINEARIZE_DEPTH: u32 = 24;

/// A cubic Bezier segment acting as a function of its `in` axis.
///
/// Control points must satisfy `p0.in <= p1.in <= p2.in <= p3.in`, which
/// rules out cusps and loops and makes `in -> out` single-valued. The
/// parameter `u` runs over `[0, 1)`; function semantics are recovered by
/// solving `in(u) = x` with [`find_u`] and evaluating at the result.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct BezierSegment<T = NativeFloat> {
    pub p0: ControlPoint<T>,
    pub p1: ControlPoint<T>,
    pub p2: ControlPoint<T>,
    pub p3: ControlPoint<T>,
}

impl<T: Ordinate> BezierSegment<T> {
    pub fn new(
        p0: ControlPoint<T>,
        p1: ControlPoint<T>,
        p2: ControlPoint<T>,
        p3: ControlPoint<T>,
    ) -> Self {
        BezierSegment { p0, p1, p2, p3 }
    }

    /// Evaluate at parameter `u` using the De Casteljau reduction, three
    /// successive rounds of linear interpolation.
    pub fn eval_at(&self, u: T) -> ControlPoint<T> {
        // reduce 4 -> 3
        let ctrl_1ab = self.p0 + (self.p1 - self.p0) * u;
        let ctrl_1bc = self.p1 + (self.p2 - self.p1) * u;
        let ctrl_1cd = self.p2 + (self.p3 - self.p2) * u;
        // reduce 3 -> 2
        let ctrl_2ab = ctrl_1ab + (ctrl_1bc - ctrl_1ab) * u;
        let ctrl_2bc = ctrl_1bc + (ctrl_1cd - ctrl_1bc) * u;
        // reduce 2 -> 1, the point on the curve
        ctrl_2ab + (ctrl_2bc - ctrl_2ab) * u
    }

    /// Subdivide at `u` into two segments that exactly reconstruct this one.
    /// Returns `None` when `u` is within `EPSILON` of either end of `(0, 1)`.
    pub fn split_at(&self, u: T) -> Option<(Self, Self)> {
        let at = u.real();
        if at <= EPSILON || at >= 1.0 - EPSILON {
            return None;
        }
        let ctrl_1ab = self.p0 + (self.p1 - self.p0) * u;
        let ctrl_1bc = self.p1 + (self.p2 - self.p1) * u;
        let ctrl_1cd = self.p2 + (self.p3 - self.p2) * u;
        let ctrl_2ab = ctrl_1ab + (ctrl_1bc - ctrl_1ab) * u;
        let ctrl_2bc = ctrl_1bc + (ctrl_1cd - ctrl_1bc) * u;
        let ctrl_3ab = ctrl_2ab + (ctrl_2bc - ctrl_2ab) * u;

        Some((
            BezierSegment {
                p0: self.p0,
                p1: ctrl_1ab,
                p2: ctrl_2ab,
                p3: ctrl_3ab,
            },
            BezierSegment {
                p0: ctrl_3ab,
                p1: ctrl_2bc,
                p2: ctrl_1cd,
                p3: self.p3,
            },
        ))
    }

    /// Solve `in(u) = x` for the parameter. Clamps outside the segment.
    pub fn u_at_input(&self, x: T) -> T {
        find_u(
            x,
            self.p0.input,
            self.p1.input,
            self.p2.input,
            self.p3.input,
        )
    }

    /// Evaluate the segment as a function of its `in` axis.
    pub fn eval_at_input(&self, x: T) -> ControlPoint<T> {
        self.eval_at(self.u_at_input(x))
    }

    /// The derivative curve: a quadratic Bezier with control points
    /// `3(p1-p0), 3(p2-p1), 3(p3-p2)`.
    pub fn hodograph(&self) -> QuadraticBezier<T> {
        let three = T::from_native(3.0);
        QuadraticBezier::new(
            (self.p1 - self.p0) * three,
            (self.p2 - self.p1) * three,
            (self.p3 - self.p2) * three,
        )
    }
}

impl BezierSegment<NativeFloat> {
    /// Lift every control point into constant duals.
    pub fn lifted(&self) -> BezierSegment<Dual> {
        BezierSegment {
            p0: self.p0.lifted(),
            p1: self.p1.lifted(),
            p2: self.p2.lifted(),
            p3: self.p3.lifted(),
        }
    }

    /// Evaluate at a dual parameter; with `u.i = 1` the infinitesimal part of
    /// the result is `dP/du`.
    pub fn eval_at_dual(&self, u: Dual) -> DualPoint {
        self.lifted().eval_at(u)
    }

    /// Evaluate as a function of the `in` axis with the input seeded as the
    /// differentiation variable; the result's `out.i` is `d out / d in`.
    pub fn eval_at_input_dual(&self, x: NativeFloat) -> DualPoint {
        self.lifted().eval_at_input(Dual::seeded(x))
    }

    /// The input span this segment covers, half-open.
    pub fn input_interval(&self) -> Interval {
        Interval::new(self.p0.input, self.p3.input)
    }

    /// Axis-aligned bounding box of the four control points. This is a
    /// conservative hull, not the tight extents of the curve itself.
    pub fn extents(&self) -> (ControlPoint, ControlPoint) {
        let mut min = self.p0;
        let mut max = self.p0;
        for p in [self.p1, self.p2, self.p3].iter() {
            min.input = Float::min(min.input, p.input);
            min.output = Float::min(min.output, p.output);
            max.input = Float::max(max.input, p.input);
            max.output = Float::max(max.output, p.output);
        }
        (min, max)
    }

    pub fn is_finite(&self) -> bool {
        self.p0.is_finite() && self.p1.is_finite() && self.p2.is_finite() && self.p3.is_finite()
    }

    /// Polynomial order of the `in`-axis cubic: 3, 2 or 1 depending on which
    /// leading coefficients survive. All coefficients vanishing means the
    /// input axis is a single point and the segment has no defined slope.
    pub fn input_order(&self) -> Result<usize, CurveError> {
        let (b0, b1, b2, b3) = (
            self.p0.input,
            self.p1.input,
            self.p2.input,
            self.p3.input,
        );
        let a = -b0 + 3.0 * b1 - 3.0 * b2 + b3;
        let b = 3.0 * b0 - 6.0 * b1 + 3.0 * b2;
        let c = 3.0 * (b1 - b0);
        if Float::abs(a) >= EPSILON {
            Ok(3)
        } else if Float::abs(b) >= EPSILON {
            Ok(2)
        } else if Float::abs(c) >= EPSILON {
            Ok(1)
        } else {
            Err(CurveError::NoSolution)
        }
    }

    /// Parameters strictly inside `(0, 1)` at which the segment stops being
    /// monotonic in one axis or changes its bend: component roots of the
    /// hodograph, component roots of the hodograph taken relative to the
    /// baseline (extrema of the deviation from the chord), and inflection
    /// parameters where a second-derivative component vanishes. Deduplicated
    /// within `EPSILON` and sorted ascending.
    pub fn critical_parameters(&self) -> ArrayVec<[NativeFloat; 12]> {
        let mut params: ArrayVec<[NativeFloat; 12]> = ArrayVec::new();
        let hodograph = self.hodograph();

        for root in hodograph.input_roots() {
            push_parameter(&mut params, root);
        }
        for root in hodograph.output_roots() {
            push_parameter(&mut params, root);
        }

        // the same roots for the segment with its baseline removed
        let chord = self.p3 - self.p0;
        let relative = QuadraticBezier::new(
            hodograph.start - chord,
            hodograph.ctrl - chord,
            hodograph.end - chord,
        );
        for root in relative.input_roots() {
            push_parameter(&mut params, root);
        }
        for root in relative.output_roots() {
            push_parameter(&mut params, root);
        }

        // inflections: zeros of the linear second derivative
        let l0 = (self.p0 - self.p1 * 2.0 + self.p2) * 6.0;
        let l1 = (self.p1 - self.p2 * 2.0 + self.p3) * 6.0;
        if let Some(root) = linear_root(l0.input, l1.input) {
            push_parameter(&mut params, root);
        }
        if let Some(root) = linear_root(l0.output, l1.output) {
            push_parameter(&mut params, root);
        }

        params.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
        params
    }

    /// Cascade [`split_at`] over [`critical_parameters`], re-mapping each
    /// parameter onto the right-hand remainder. Every returned segment is
    /// monotonic in both axes.
    ///
    /// [`split_at`]: BezierSegment::split_at
    /// [`critical_parameters`]: BezierSegment::critical_parameters
    pub fn split_on_critical_points(&self) -> Vec<BezierSegment> {
        let params = self.critical_parameters();
        let mut pieces = Vec::with_capacity(params.len() + 1);
        let mut rest = *self;
        let mut consumed = 0.0;
        for &t in params.iter() {
            let local = (t - consumed) / (1.0 - consumed);
            if let Some((left, right)) = rest.split_at(local) {
                pieces.push(left);
                rest = right;
                consumed = t;
            }
        }
        pieces.push(rest);
        pieces
    }

    /// Flatness test for linearization: with `u = 3p1 - 2p0 - p3` and
    /// `v = 3p2 - 2p3 - p0`, the segment is flat when
    /// `max(u.in^2, v.in^2) + max(u.out^2, v.out^2) <= tolerance`.
    pub fn is_flat(&self, tolerance: NativeFloat) -> bool {
        let u = self.p1 * 3.0 - self.p0 * 2.0 - self.p3;
        let v = self.p2 * 3.0 - self.p3 * 2.0 - self.p0;
        let horizontal = Float::max(u.input * u.input, v.input * v.input);
        let vertical = Float::max(u.output * u.output, v.output * v.output);
        horizontal + vertical <= tolerance
    }

    /// Approximate the segment with a polyline by adaptive subdivision.
    /// The result starts at `p0` and ends at `p3` exactly; interior knots
    /// track the curve within the tolerance. Control points must be finite.
    pub fn linearize(&self, tolerance: NativeFloat) -> Vec<ControlPoint> {
        debug_assert!(self.is_finite());
        let mut knots = Vec::new();
        knots.push(self.p0);
        self.linearize_into(tolerance, MAX_LINEARIZE_DEPTH, &mut knots);
        knots
    }

    fn linearize_into(&self, tolerance: NativeFloat, depth: u32, knots: &mut Vec<ControlPoint>) {
        if depth == 0 || self.is_flat(tolerance) {
            knots.push(self.p3);
            return;
        }
        match self.split_at(0.5) {
            Some((left, right)) => {
                left.linearize_into(tolerance, depth - 1, knots);
                right.linearize_into(tolerance, depth - 1, knots);
            }
            None => knots.push(self.p3),
        }
    }

    /// Coarse projection: map every control point of `other` through
    /// `self.eval_at_input`. Only meaningful as the cheap fallback of the
    /// three-point approximation.
    pub fn project_segment(&self, other: &BezierSegment) -> BezierSegment {
        let through = |p: &ControlPoint| -> ControlPoint {
            ControlPoint::new(p.input, self.eval_at_input(p.output).output)
        };
        BezierSegment::new(
            through(&other.p0),
            through(&other.p1),
            through(&other.p2),
            through(&other.p3),
        )
    }

    /// Three-point approximate projection of `other` through `self`, staying
    /// in the cubic representation: both endpoints are projected exactly, the
    /// midpoint is projected, the chain-rule slope at the midpoint comes from
    /// dual evaluations of both operands, and the inner control points are
    /// recovered by inverting the midpoint value and velocity equations.
    pub fn project_segment_three_point(
        &self,
        other: &BezierSegment,
    ) -> Result<BezierSegment, CurveError> {
        self.input_order()?;
        other.input_order()?;

        let start = ControlPoint::new(
            other.p0.input,
            self.eval_at_input(other.p0.output).output,
        );
        let end = ControlPoint::new(
            other.p3.input,
            self.eval_at_input(other.p3.output).output,
        );
        let mid_ab = other.eval_at(0.5);
        let mid = ControlPoint::new(mid_ab.input, self.eval_at_input(mid_ab.output).output);

        // chain rule: d(self . other)/dx at the midpoint
        let outer = self.eval_at_input_dual(mid_ab.output).output.i;
        let inner = other.eval_at_input_dual(mid_ab.input).output.i;
        let slope = outer * inner;

        // parameter-space input velocity of `other` at u = 1/2 fixes the
        // parameterization of the reconstruction
        let velocity_in = other.hodograph().eval_at(0.5).input;
        let mid_velocity = ControlPoint::new(velocity_in, slope * velocity_in);

        // B(1/2) = (p0 + 3p1 + 3p2 + p3)/8 and B'(1/2) = 3(p3 + p2 - p1 - p0)/4
        let sum = (mid * 8.0 - start - end) * (1.0 / 3.0);
        let diff = mid_velocity * (4.0 / 3.0) - end + start;
        let p2 = (sum + diff) * 0.5;
        let p1 = sum - p2;
        Ok(BezierSegment::new(start, p1, p2, end))
    }
}

fn push_parameter(params: &mut ArrayVec<[NativeFloat; 12]>, t: NativeFloat) {
    if t <= EPSILON || t >= 1.0 - EPSILON {
        return;
    }
    if params.iter().any(|p| Float::abs(p - t) < EPSILON) {
        return;
    }
    params.push(t);
}

/// Root of the linear interpolation `l0 + (l1 - l0) * u`.
fn linear_root(l0: NativeFloat, l1: NativeFloat) -> Option<NativeFloat> {
    if Float::abs(l1 - l0) < EPSILON {
        None
    } else {
        Some(l0 / (l0 - l1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_segment() -> BezierSegment {
        BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(1.0 / 3.0, 1.0 / 3.0),
            ControlPoint::new(2.0 / 3.0, 2.0 / 3.0),
            ControlPoint::new(1.0, 1.0),
        )
    }

    fn upside_down_u() -> BezierSegment {
        BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(0.0, 100.0),
            ControlPoint::new(100.0, 100.0),
            ControlPoint::new(100.0, 0.0),
        )
    }

    fn ease_segment() -> BezierSegment {
        BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(0.4, 0.0),
            ControlPoint::new(0.6, 1.0),
            ControlPoint::new(1.0, 1.0),
        )
    }

    #[test]
    fn identity_evaluates() {
        let segment = identity_segment();
        for &x in [0.25, 0.5, 0.75].iter() {
            let p = segment.eval_at_input(x);
            assert!((p.output - x).abs() < EPSILON);
        }
    }

    #[test]
    fn linear_slope_two_evaluates() {
        // (1,0) -> (2,2) with collinear intermediates
        let segment = BezierSegment::new(
            ControlPoint::new(1.0, 0.0),
            ControlPoint::new(4.0 / 3.0, 2.0 / 3.0),
            ControlPoint::new(5.0 / 3.0, 4.0 / 3.0),
            ControlPoint::new(2.0, 2.0),
        );
        for &(x, expected) in [(1.25, 0.5), (1.5, 1.0), (1.75, 1.5)].iter() {
            let p = segment.eval_at_input(x);
            assert!((p.output - expected).abs() < 10.0 * EPSILON);
        }
    }

    #[test]
    fn split_agrees_with_evaluate() {
        let segment = ease_segment();
        let nsteps = 50;
        for step in 1..nsteps {
            let u = step as NativeFloat / nsteps as NativeFloat;
            let (left, right) = segment.split_at(u).unwrap();
            let at = segment.eval_at(u);
            assert!(left.p3.nearly_equal(&at));
            assert!(right.p0.nearly_equal(&at));
        }
    }

    #[test]
    fn split_reconstructs_both_halves() {
        let segment = ease_segment();
        let at = 0.37;
        let (left, right) = segment.split_at(at).unwrap();
        let max_err = 1e-4;
        let nsteps = 100;
        for step in 0..=nsteps {
            let u = step as NativeFloat / nsteps as NativeFloat;
            let err_left = segment.eval_at(u * at) - left.eval_at(u);
            assert!(err_left.input.abs() < max_err && err_left.output.abs() < max_err);
            let err_right = segment.eval_at(at + u * (1.0 - at)) - right.eval_at(u);
            assert!(err_right.input.abs() < max_err && err_right.output.abs() < max_err);
        }
    }

    #[test]
    fn split_refuses_the_ends() {
        let segment = ease_segment();
        assert!(segment.split_at(0.0).is_none());
        assert!(segment.split_at(EPSILON * 0.5).is_none());
        assert!(segment.split_at(1.0).is_none());
        assert!(segment.split_at(1.0 - EPSILON * 0.5).is_none());
    }

    #[test]
    fn find_u_round_trips_over_the_domain() {
        let segment = ease_segment();
        let max_err = 10.0 * EPSILON;
        let nsteps = 100;
        for step in 0..=nsteps {
            let x = step as NativeFloat / nsteps as NativeFloat;
            let u = segment.u_at_input(x);
            assert!((segment.eval_at(u).input - x).abs() < max_err);
        }
    }

    #[test]
    fn upside_down_u_critical_parameters() {
        let params = upside_down_u().critical_parameters();
        assert_eq!(params.len(), 3);
        // (3 - sqrt(3))/6 and (3 + sqrt(3))/6 from the baseline-relative
        // hodograph, 1/2 from both the plain hodograph and the inflection
        assert!((params[0] - 0.211_324_87).abs() < 1e-3);
        assert!((params[1] - 0.5).abs() < 1e-3);
        assert!((params[2] - 0.788_675_13).abs() < 1e-3);
    }

    #[test]
    fn upside_down_u_splits_into_four_monotonic_pieces() {
        let pieces = upside_down_u().split_on_critical_points();
        assert_eq!(pieces.len(), 4);
        for piece in &pieces {
            assert_monotonic_both_axes(piece);
        }
    }

    fn assert_monotonic_both_axes(segment: &BezierSegment) {
        let nsteps = 64;
        let mut previous = segment.eval_at(0.0);
        let mut in_dir = 0.0;
        let mut out_dir = 0.0;
        for step in 1..=nsteps {
            let u = step as NativeFloat / nsteps as NativeFloat;
            let p = segment.eval_at(u);
            let din = p.input - previous.input;
            let dout = p.output - previous.output;
            if din.abs() > EPSILON {
                assert!(in_dir * din >= 0.0, "input direction flipped");
                in_dir = din.signum();
            }
            if dout.abs() > EPSILON {
                assert!(out_dir * dout >= 0.0, "output direction flipped");
                out_dir = dout.signum();
            }
            previous = p;
        }
    }

    #[test]
    fn identity_has_no_critical_parameters() {
        assert!(identity_segment().critical_parameters().is_empty());
        assert_eq!(identity_segment().split_on_critical_points().len(), 1);
    }

    #[test]
    fn linearize_flat_segment_is_two_knots() {
        let knots = identity_segment().linearize(LINEARIZATION_TOLERANCE);
        assert_eq!(knots.len(), 2);
        assert!(knots[0].nearly_equal(&ControlPoint::new(0.0, 0.0)));
        assert!(knots[1].nearly_equal(&ControlPoint::new(1.0, 1.0)));
    }

    #[test]
    fn linearize_knot_count_shrinks_with_tolerance() {
        let segment = ease_segment();
        let fine = segment.linearize(1e-6);
        let coarse = segment.linearize(1e-2);
        assert!(fine.len() >= coarse.len());
        assert!(coarse.len() >= 2);
        // endpoints are exact at every tolerance
        assert!(fine[0].nearly_equal(&segment.p0));
        assert!(fine.last().unwrap().nearly_equal(&segment.p3));
    }

    #[test]
    fn linearize_tracks_the_curve() {
        let segment = ease_segment();
        let knots = segment.linearize(1e-4);
        // every emitted knot lies on the segment
        for knot in &knots {
            let on_curve = segment.eval_at_input(knot.input);
            assert!((on_curve.output - knot.output).abs() < 1e-2);
        }
    }

    #[test]
    fn extents_cover_the_control_net() {
        let (min, max) = upside_down_u().extents();
        assert!(min.nearly_equal(&ControlPoint::new(0.0, 0.0)));
        assert!(max.nearly_equal(&ControlPoint::new(100.0, 100.0)));
    }

    #[test]
    fn dual_eval_matches_plain_and_differentiates() {
        let segment = ease_segment();
        let h = 1e-3;
        for step in 1..10 {
            let u = step as NativeFloat / 10.0;
            let dual = segment.eval_at_dual(Dual::seeded(u));
            let plain = segment.eval_at(u);
            assert!((dual.input.r - plain.input).abs() < EPSILON);
            assert!((dual.output.r - plain.output).abs() < EPSILON);

            let ahead = segment.eval_at(u + h);
            let behind = segment.eval_at(u - h);
            let numeric_in = (ahead.input - behind.input) / (2.0 * h);
            let numeric_out = (ahead.output - behind.output) / (2.0 * h);
            assert!((dual.input.i - numeric_in).abs() < 1e-2);
            assert!((dual.output.i - numeric_out).abs() < 1e-2);

            // the hodograph is the same derivative
            let hodo = segment.hodograph().eval_at(u);
            assert!((dual.input.i - hodo.input).abs() < 1e-3);
            assert!((dual.output.i - hodo.output).abs() < 1e-3);
        }
    }

    #[test]
    fn input_seeded_dual_gives_the_function_slope() {
        // slope-2 line: d out / d in must be 2 everywhere
        let segment = BezierSegment::new(
            ControlPoint::new(1.0, 0.0),
            ControlPoint::new(4.0 / 3.0, 2.0 / 3.0),
            ControlPoint::new(5.0 / 3.0, 4.0 / 3.0),
            ControlPoint::new(2.0, 2.0),
        );
        for step in 1..10 {
            let x = 1.0 + step as NativeFloat / 10.0;
            let dual = segment.eval_at_input_dual(x);
            assert!((dual.output.i - 2.0).abs() < 1e-3);
        }
    }

    #[test]
    fn input_order_classifies() {
        assert_eq!(identity_segment().input_order(), Ok(1));
        assert_eq!(ease_segment().input_order(), Ok(3));
        let degenerate = BezierSegment::new(
            ControlPoint::new(1.0, 0.0),
            ControlPoint::new(1.0, 1.0),
            ControlPoint::new(1.0, 2.0),
            ControlPoint::new(1.0, 3.0),
        );
        assert_eq!(degenerate.input_order(), Err(CurveError::NoSolution));
    }

    #[test]
    fn three_point_projection_of_identity_is_identity() {
        let ident = identity_segment();
        let projected = ident.project_segment_three_point(&ident).unwrap();
        let nsteps = 20;
        for step in 0..=nsteps {
            let u = step as NativeFloat / nsteps as NativeFloat;
            let expect = ident.eval_at(u);
            let got = projected.eval_at(u);
            assert!((expect.input - got.input).abs() < 1e-3);
            assert!((expect.output - got.output).abs() < 1e-3);
        }
    }

    #[test]
    fn coarse_projection_maps_control_points() {
        // doubling line projected through itself quadruples the endpoints
        let doubler = BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(1.0 / 3.0, 2.0 / 3.0),
            ControlPoint::new(2.0 / 3.0, 4.0 / 3.0),
            ControlPoint::new(1.0, 2.0),
        );
        let through = BezierSegment::new(
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(2.0 / 3.0, 4.0 / 3.0),
            ControlPoint::new(4.0 / 3.0, 8.0 / 3.0),
            ControlPoint::new(2.0, 4.0),
        );
        let projected = through.project_segment(&doubler);
        assert!((projected.p3.output - 4.0).abs() < 1e-3);
        assert!((projected.p0.output - 0.0).abs() < 1e-3);
    }
}
