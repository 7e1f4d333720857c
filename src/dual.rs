use super::*;
use super::ordinate::Ordinate;
use super::point::ControlPoint;

/// A dual scalar: real part `r` plus infinitesimal part `i`, with `ε² = 0`.
///
/// Multiplication follows `(a + bε)(c + dε) = ac + (ad + bc)ε`, which is the
/// product rule; feeding a computation `Dual::seeded(x)` therefore carries the
/// exact derivative with respect to `x` through every arithmetic step.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Dual {
    pub r: NativeFloat,
    pub i: NativeFloat,
}

/// A control point whose ordinates carry derivatives.
pub type DualPoint = ControlPoint<Dual>;

impl Dual {
    pub const fn new(r: NativeFloat, i: NativeFloat) -> Self {
        Dual { r, i }
    }

    /// A dual with no infinitesimal part; behaves exactly like the plain value.
    pub const fn constant(r: NativeFloat) -> Self {
        Dual { r, i: 0.0 }
    }

    /// A dual seeded as the differentiation variable (`i = 1`).
    pub const fn seeded(r: NativeFloat) -> Self {
        Dual { r, i: 1.0 }
    }

    pub fn recip(self) -> Self {
        Dual {
            r: 1.0 / self.r,
            i: -self.i / (self.r * self.r),
        }
    }
}

impl Add for Dual {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Dual::new(self.r + rhs.r, self.i + rhs.i)
    }
}

impl Sub for Dual {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Dual::new(self.r - rhs.r, self.i - rhs.i)
    }
}

impl Mul for Dual {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Dual::new(self.r * rhs.r, self.r * rhs.i + self.i * rhs.r)
    }
}

impl Div for Dual {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        Dual::new(
            self.r / rhs.r,
            (self.i * rhs.r - self.r * rhs.i) / (rhs.r * rhs.r),
        )
    }
}

impl Neg for Dual {
    type Output = Self;

    fn neg(self) -> Self {
        Dual::new(-self.r, -self.i)
    }
}

impl Ordinate for Dual {
    const ZERO: Self = Dual::constant(0.0);
    const ONE: Self = Dual::constant(1.0);

    fn from_native(value: NativeFloat) -> Self {
        Dual::constant(value)
    }

    fn real(self) -> NativeFloat {
        self.r
    }

    fn abs(self) -> Self {
        if self.r < 0.0 {
            -self
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_rule() {
        let a = Dual::new(3.0, 2.0);
        let b = Dual::new(-1.5, 4.0);
        let p = a * b;
        assert!((p.r - -4.5).abs() < EPSILON);
        // (ad + bc)
        assert!((p.i - (3.0 * 4.0 + 2.0 * -1.5)).abs() < EPSILON);
    }

    #[test]
    fn division_inverts_multiplication() {
        let a = Dual::new(3.0, 2.0);
        let b = Dual::new(-1.5, 4.0);
        let q = (a * b) / b;
        assert!((q.r - a.r).abs() < EPSILON);
        assert!((q.i - a.i).abs() < EPSILON);
    }

    #[test]
    fn reciprocal_matches_division() {
        let b = Dual::new(2.0, -3.0);
        let lhs = Dual::constant(1.0) / b;
        let rhs = b.recip();
        assert!((lhs.r - rhs.r).abs() < EPSILON);
        assert!((lhs.i - rhs.i).abs() < EPSILON);
    }

    #[test]
    fn seeded_square_has_derivative_two_x() {
        // f(x) = x^2, f'(x) = 2x
        for step in 0..10 {
            let x = step as NativeFloat * 0.5;
            let fx = Dual::seeded(x) * Dual::seeded(x);
            assert!((fx.r - x * x).abs() < EPSILON);
            assert!((fx.i - 2.0 * x).abs() < EPSILON);
        }
    }
}
