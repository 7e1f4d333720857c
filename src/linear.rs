use super::*;
use super::error::CurveError;
use super::interval::Interval;
use super::point::{remap, ControlPoint};
use serde::{Deserialize, Serialize};

/// Direction of the output axis across one knot pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlopeKind {
    Rising,
    Flat,
    Falling,
}

impl SlopeKind {
    /// Classify the pair `a -> b`. Equality within `EPSILON` on either axis
    /// counts as flat.
    pub fn between(a: &ControlPoint, b: &ControlPoint) -> SlopeKind {
        if Float::abs(b.input - a.input) <= EPSILON || Float::abs(b.output - a.output) <= EPSILON {
            SlopeKind::Flat
        } else if b.output > a.output {
            SlopeKind::Rising
        } else {
            SlopeKind::Falling
        }
    }
}

/// A piecewise-linear curve: ordered knots interpreted as line segments
/// between consecutive pairs, with the same right-met, half-open function
/// semantics as a Bezier curve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearCurve {
    pub knots: Vec<ControlPoint>,
}

impl LinearCurve {
    pub fn new(knots: Vec<ControlPoint>) -> Self {
        LinearCurve { knots }
    }

    /// Split into monotonic runs: walk adjacent knot pairs tracking the slope
    /// kind and begin a new piece at every knot where it changes. Fewer than
    /// three knots is trivially monotonic.
    pub fn split_at_critical_points(&self) -> Vec<MonotonicLinearCurve> {
        if self.knots.len() < 3 {
            return vec![MonotonicLinearCurve {
                knots: self.knots.clone(),
            }];
        }
        let mut pieces = Vec::new();
        let mut start = 0;
        let mut kind = SlopeKind::between(&self.knots[0], &self.knots[1]);
        for i in 1..self.knots.len() - 1 {
            let next = SlopeKind::between(&self.knots[i], &self.knots[i + 1]);
            if next != kind {
                pieces.push(MonotonicLinearCurve {
                    knots: self.knots[start..=i].to_vec(),
                });
                start = i;
                kind = next;
            }
        }
        pieces.push(MonotonicLinearCurve {
            knots: self.knots[start..].to_vec(),
        });
        pieces
    }

    /// Affine remap of every knot from the curve's own extents box onto the
    /// target box.
    pub fn rescaled_to(&self, target_min: ControlPoint, target_max: ControlPoint) -> LinearCurve {
        let (min, max) = self.extents();
        LinearCurve {
            knots: self
                .knots
                .iter()
                .map(|k| {
                    ControlPoint::new(
                        remap(k.input, min.input, max.input, target_min.input, target_max.input),
                        remap(
                            k.output,
                            min.output,
                            max.output,
                            target_min.output,
                            target_max.output,
                        ),
                    )
                })
                .collect(),
        }
    }

    pub fn normalized(&self) -> LinearCurve {
        self.rescaled_to(ControlPoint::new(0.0, 0.0), ControlPoint::new(1.0, 1.0))
    }

    /// Bounding box over all knots.
    pub fn extents(&self) -> (ControlPoint, ControlPoint) {
        let mut knots = self.knots.iter();
        let (mut min, mut max) = match knots.next() {
            Some(first) => (*first, *first),
            None => return (ControlPoint::default(), ControlPoint::default()),
        };
        for k in knots {
            min.input = Float::min(min.input, k.input);
            min.output = Float::min(min.output, k.output);
            max.input = Float::max(max.input, k.input);
            max.output = Float::max(max.output, k.output);
        }
        (min, max)
    }
}

/// A piecewise-linear curve whose output axis keeps a single slope kind, so
/// `input_at_output` is single-valued. Built by
/// [`LinearCurve::split_at_critical_points`] or by the trims below; the
/// invariant is the constructor's caller's responsibility and is checked in
/// debug builds only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonotonicLinearCurve {
    knots: Vec<ControlPoint>,
}

impl MonotonicLinearCurve {
    pub fn from_knots(knots: Vec<ControlPoint>) -> Self {
        let curve = MonotonicLinearCurve { knots };
        debug_assert!(curve.holds_single_slope_kind());
        curve
    }

    fn holds_single_slope_kind(&self) -> bool {
        let mut kind = None;
        for pair in self.knots.windows(2) {
            match SlopeKind::between(&pair[0], &pair[1]) {
                SlopeKind::Flat => continue,
                found => match kind {
                    None => kind = Some(found),
                    Some(k) if k == found => {}
                    Some(_) => return false,
                },
            }
        }
        true
    }

    pub fn knots(&self) -> &[ControlPoint] {
        &self.knots
    }

    /// A curve needs two knots to span anything.
    pub fn is_empty(&self) -> bool {
        self.knots.len() < 2
    }

    /// The single slope kind; all-flat (or empty) curves report `Flat`.
    pub fn slope_kind(&self) -> SlopeKind {
        for pair in self.knots.windows(2) {
            match SlopeKind::between(&pair[0], &pair[1]) {
                SlopeKind::Flat => continue,
                kind => return kind,
            }
        }
        SlopeKind::Flat
    }

    pub fn input_extents(&self) -> Interval {
        match (self.knots.first(), self.knots.last()) {
            (Some(first), Some(last)) => Interval::new(first.input, last.input),
            _ => Interval::default(),
        }
    }

    pub fn output_extents(&self) -> Interval {
        match (self.knots.first(), self.knots.last()) {
            (Some(first), Some(last)) => Interval::new(
                Float::min(first.output, last.output),
                Float::max(first.output, last.output),
            ),
            _ => Interval::default(),
        }
    }

    /// Index of the first knot whose input exceeds `x`; binary search over
    /// the sorted knot inputs.
    fn upper_bound(&self, x: NativeFloat) -> Option<usize> {
        let mut first = 0usize;
        let mut count = self.knots.len() as isize;
        while count > 0 {
            let step = count / 2;
            let it = first + step as usize;
            if !(x < self.knots[it].input) {
                first = it + 1;
                count -= step + 1;
            } else {
                count = step;
            }
        }
        if first == self.knots.len() {
            None
        } else {
            Some(first)
        }
    }

    /// Interpolating lookup along the input axis. Exact hits on either domain
    /// endpoint answer with that endpoint's output; anything outside is
    /// `OutOfBounds`.
    pub fn output_at_input(&self, x: NativeFloat) -> Result<NativeFloat, CurveError> {
        let first = self.knots.first().ok_or(CurveError::OutOfBounds(x))?;
        let last = self.knots[self.knots.len() - 1];
        if Float::abs(x - first.input) <= EPSILON {
            return Ok(first.output);
        }
        if Float::abs(x - last.input) <= EPSILON {
            return Ok(last.output);
        }
        if x < first.input || x > last.input {
            return Err(CurveError::OutOfBounds(x));
        }
        let hi = self.upper_bound(x).ok_or(CurveError::OutOfBounds(x))?;
        debug_assert!(hi > 0);
        let a = self.knots[hi - 1];
        let b = self.knots[hi];
        if b.input - a.input <= EPSILON {
            return Ok(a.output);
        }
        let t = (x - a.input) / (b.input - a.input);
        Ok(a.output + (b.output - a.output) * t)
    }

    /// Inverse lookup along the output axis, single-valued thanks to the
    /// monotonic invariant. Handles both rising and falling curves.
    pub fn input_at_output(&self, v: NativeFloat) -> Result<NativeFloat, CurveError> {
        let first = self.knots.first().ok_or(CurveError::OutOfBounds(v))?;
        let last = self.knots[self.knots.len() - 1];
        if Float::abs(v - first.output) <= EPSILON {
            return Ok(first.input);
        }
        if Float::abs(v - last.output) <= EPSILON {
            return Ok(last.input);
        }
        for pair in self.knots.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let rising_hit = a.output <= v && v < b.output;
            let falling_hit = a.output > v && v >= b.output;
            if !(rising_hit || falling_hit) {
                continue;
            }
            if Float::abs(b.output - a.output) <= EPSILON {
                return Ok(a.input);
            }
            let t = (v - a.output) / (b.output - a.output);
            return Ok(a.input + (b.input - a.input) * t);
        }
        Err(CurveError::OutOfBounds(v))
    }

    /// Clone clipped to an input interval, inserting an interpolated knot at
    /// each cut that lands strictly inside an existing segment. The bounds
    /// are intersected with the domain; a vanishing remainder yields the
    /// empty curve.
    pub fn trimmed_input(&self, bounds: Interval) -> Result<Self, CurveError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let domain = self.input_extents();
        let start = Float::max(bounds.start, domain.start);
        let end = Float::min(bounds.end, domain.end);
        if end - start <= EPSILON {
            return Ok(MonotonicLinearCurve::default());
        }
        let start_out = self.output_at_input(start)?;
        let end_out = self.output_at_input(end)?;
        let mut knots = vec![ControlPoint::new(start, start_out)];
        for k in &self.knots {
            if k.input > start + EPSILON && k.input < end - EPSILON {
                knots.push(*k);
            }
        }
        knots.push(ControlPoint::new(end, end_out));
        Ok(MonotonicLinearCurve { knots })
    }

    /// Clone clipped to an output interval. The monotonic invariant turns the
    /// output interval into one contiguous input interval.
    pub fn trimmed_output(&self, bounds: Interval) -> Result<Self, CurveError> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let extents = self.output_extents();
        let lo = Float::max(bounds.start, extents.start);
        let hi = Float::min(bounds.end, extents.end);
        match self.slope_kind() {
            SlopeKind::Flat => {
                let out = self.knots[0].output;
                if out >= bounds.start - EPSILON && out <= bounds.end + EPSILON {
                    Ok(self.clone())
                } else {
                    Ok(MonotonicLinearCurve::default())
                }
            }
            SlopeKind::Rising => {
                if hi - lo <= EPSILON {
                    return Ok(MonotonicLinearCurve::default());
                }
                let start = self.input_at_output(lo)?;
                let end = self.input_at_output(hi)?;
                self.trimmed_input(Interval::new(start, end))
            }
            SlopeKind::Falling => {
                if hi - lo <= EPSILON {
                    return Ok(MonotonicLinearCurve::default());
                }
                let start = self.input_at_output(hi)?;
                let end = self.input_at_output(lo)?;
                self.trimmed_input(Interval::new(start, end))
            }
        }
    }

    /// Split at each of a sorted ascending list of input ordinates. Each
    /// split point appears twice: as the last knot of the piece before it
    /// and as the first knot of the piece after it. Ordinates outside the
    /// open interior of the domain are skipped.
    pub fn split_at_input_ordinates(&self, ordinates: &[NativeFloat]) -> Vec<MonotonicLinearCurve> {
        if self.is_empty() {
            return vec![self.clone()];
        }
        let domain = self.input_extents();
        let mut pieces = Vec::new();
        let mut current = vec![self.knots[0]];
        let mut index = 1;
        for &x in ordinates {
            if x <= domain.start + EPSILON || x >= domain.end - EPSILON {
                continue;
            }
            while index < self.knots.len() && self.knots[index].input <= x - EPSILON {
                current.push(self.knots[index]);
                index += 1;
            }
            let cut = match self.output_at_input(x) {
                Ok(out) => ControlPoint::new(x, out),
                Err(_) => continue,
            };
            if !current
                .last()
                .map_or(false, |last| last.nearly_equal(&cut))
            {
                current.push(cut);
            }
            pieces.push(MonotonicLinearCurve { knots: current });
            current = vec![cut];
        }
        while index < self.knots.len() {
            let knot = self.knots[index];
            if !current
                .last()
                .map_or(false, |last| last.nearly_equal(&knot))
            {
                current.push(knot);
            }
            index += 1;
        }
        pieces.push(MonotonicLinearCurve { knots: current });
        pieces
    }

    /// Swap the input and output axes. Falling curves come back with their
    /// knots reversed so the new input axis ascends; flat curves have no
    /// single-valued inverse (caller contract).
    pub fn inverted(&self) -> Self {
        let mut knots: Vec<ControlPoint> = self
            .knots
            .iter()
            .map(|k| ControlPoint::new(k.output, k.input))
            .collect();
        if self.slope_kind() == SlopeKind::Falling {
            knots.reverse();
        }
        MonotonicLinearCurve { knots }
    }
}

/// Compose two monotonic curves: the result maps the input axis of `a2b`
/// straight onto the output axis of `b2c`.
///
/// The shared axis is `a2b`'s output / `b2c`'s input, which the caller must
/// supply in the same coordinate system. The operands are trimmed to their
/// overlap on that axis (no overlap composes to the empty curve, not an
/// error), then merged with one cursor on each: matching mid-axis ordinates
/// emit a knot directly, otherwise whichever cursor trails is looked up
/// through the opposite curve and advanced. The result keeps the monotonic
/// invariant and carries at most `|a2b| + |b2c|` knots.
pub fn join(a2b: &MonotonicLinearCurve, b2c: &MonotonicLinearCurve) -> MonotonicLinearCurve {
    if a2b.is_empty() || b2c.is_empty() {
        return MonotonicLinearCurve::default();
    }
    let overlap = a2b.output_extents().intersect(&b2c.input_extents());
    if overlap.is_empty() {
        return MonotonicLinearCurve::default();
    }
    let a2b = match a2b.trimmed_output(overlap) {
        Ok(trimmed) if !trimmed.is_empty() => trimmed,
        _ => return MonotonicLinearCurve::default(),
    };
    let b2c = match b2c.trimmed_input(overlap) {
        Ok(trimmed) if !trimmed.is_empty() => trimmed,
        _ => return MonotonicLinearCurve::default(),
    };

    // A falling a2b walks the shared axis downward, so its partner cursor
    // walks b2c from the far end.
    let falling = a2b.slope_kind() == SlopeKind::Falling;
    let a_len = a2b.knots.len();
    let b_len = b2c.knots.len();
    let mut knots: Vec<ControlPoint> = Vec::with_capacity(a_len + b_len);
    let mut i = 0;
    let mut j = 0;
    while i < a_len && j < b_len {
        let jj = if falling { b_len - 1 - j } else { j };
        let mid_a = a2b.knots[i].output;
        let mid_b = b2c.knots[jj].input;

        let knot = if Float::abs(mid_a - mid_b) <= EPSILON {
            let knot = ControlPoint::new(a2b.knots[i].input, b2c.knots[jj].output);
            i += 1;
            j += 1;
            knot
        } else if (mid_a < mid_b) != falling {
            // a2b's cursor trails on the shared axis
            let input = a2b.knots[i].input;
            i += 1;
            match b2c.output_at_input(mid_a) {
                Ok(out) => ControlPoint::new(input, out),
                Err(_) => continue,
            }
        } else {
            let output = b2c.knots[jj].output;
            j += 1;
            match a2b.input_at_output(mid_b) {
                Ok(input) => ControlPoint::new(input, output),
                Err(_) => continue,
            }
        };

        if !knots
            .last()
            .map_or(false, |last| last.nearly_equal(&knot))
        {
            knots.push(knot);
        }
    }
    MonotonicLinearCurve { knots }
}
