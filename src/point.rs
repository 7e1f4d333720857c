use super::*;
use super::ordinate::Ordinate;
use serde::{Deserialize, Serialize};

/// A control point: an ordered `(in, out)` pair.
///
/// The `in` ordinate is the axis a curve is a function of; `out` is the value
/// it maps to. Arithmetic is pointwise, multiplication exists both against a
/// scalar and against another point. The wire names are `in`/`out`; the
/// historical `time`/`value` spellings are accepted when reading.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint<T = NativeFloat> {
    #[serde(rename = "in", alias = "time")]
    pub input: T,
    #[serde(rename = "out", alias = "value")]
    pub output: T,
}

impl<T: Ordinate> ControlPoint<T> {
    pub fn new(input: T, output: T) -> Self {
        ControlPoint { input, output }
    }
}

impl<T: Ordinate> Add for ControlPoint<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        ControlPoint::new(self.input + rhs.input, self.output + rhs.output)
    }
}

impl<T: Ordinate> Sub for ControlPoint<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        ControlPoint::new(self.input - rhs.input, self.output - rhs.output)
    }
}

/// Scalar multiplication.
impl<T: Ordinate> Mul<T> for ControlPoint<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        ControlPoint::new(self.input * rhs, self.output * rhs)
    }
}

/// Pointwise multiplication.
impl<T: Ordinate> Mul<ControlPoint<T>> for ControlPoint<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        ControlPoint::new(self.input * rhs.input, self.output * rhs.output)
    }
}

/// Pointwise division.
impl<T: Ordinate> Div<ControlPoint<T>> for ControlPoint<T> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        ControlPoint::new(self.input / rhs.input, self.output / rhs.output)
    }
}

impl ControlPoint<NativeFloat> {
    pub fn distance(&self, other: &Self) -> NativeFloat {
        let d = *other - *self;
        Float::sqrt(d.input * d.input + d.output * d.output)
    }

    /// Unit-length version of this point read as a vector from the origin.
    /// Points shorter than `EPSILON` are returned unchanged.
    pub fn normalized(&self) -> Self {
        let length = self.distance(&ControlPoint::default());
        if length < EPSILON {
            *self
        } else {
            *self * (1.0 / length)
        }
    }

    /// Equality within `EPSILON` on both axes.
    pub fn nearly_equal(&self, other: &Self) -> bool {
        Float::abs(self.input - other.input) <= EPSILON
            && Float::abs(self.output - other.output) <= EPSILON
    }

    pub fn is_finite(&self) -> bool {
        self.input.is_finite() && self.output.is_finite()
    }

    /// Lift both ordinates into constant duals.
    pub fn lifted(&self) -> ControlPoint<Dual> {
        ControlPoint::new(Dual::constant(self.input), Dual::constant(self.output))
    }
}

/// Affine remap of a single ordinate from one span onto another. Collapsed
/// source spans map everything to `to_min`.
pub(crate) fn remap(
    v: NativeFloat,
    from_min: NativeFloat,
    from_max: NativeFloat,
    to_min: NativeFloat,
    to_max: NativeFloat,
) -> NativeFloat {
    let width = from_max - from_min;
    if Float::abs(width) < EPSILON {
        return to_min;
    }
    (v - from_min) / width * (to_max - to_min) + to_min
}
