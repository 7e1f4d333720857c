use super::*;
use super::dual::Dual;
use super::ordinate::Ordinate;

/// Iteration cap for [`find_u`]; the bracket always converges long before
/// this on well-conditioned segments.
pub const MAX_FIND_U_ITERATIONS: usize = 45;

/// Termination threshold on the bracket width, two ulps of the scalar type.
pub const MAX_ABS_FIND_U_ERROR: NativeFloat = 2.0 * f32::EPSILON;

/// One-dimensional cubic Bezier over four ordinate scalars, unrolled
/// De Casteljau.
fn component_at<T: Ordinate>(u: T, b0: T, b1: T, b2: T, b3: T) -> T {
    let q0 = b0 + (b1 - b0) * u;
    let q1 = b1 + (b2 - b1) * u;
    let q2 = b2 + (b3 - b2) * u;
    let r0 = q0 + (q1 - q0) * u;
    let r1 = q1 + (q2 - q1) * u;
    r0 + (r1 - r0) * u
}

/// Find `u` in `[0, 1]` such that the cubic Bezier over the scalars
/// `p0..p3` evaluates to `x`.
///
/// Hybrid bisection / false position: a bracketing pair of residuals is kept
/// at all times, the next candidate is the secant through the bracket, and
/// when a candidate fails to flip the bracket the retained endpoint's
/// residual is contracted so the stale end cannot pin the iteration
/// (the Illinois variant). Inputs at or beyond the end scalars clamp to `0`
/// or `1`; this function never errors.
///
/// The scalars must be non-decreasing (`p0 <= p3`), which the segment
/// invariant on the `in` axis guarantees.
pub fn find_u<T: Ordinate>(x: T, p0: T, p1: T, p2: T, p3: T) -> T {
    if x.real() <= p0.real() {
        return T::ZERO;
    }
    if x.real() >= p3.real() {
        return T::ONE;
    }

    // shift coordinates so the first scalar sits at zero
    let x = x - p0;
    let c1 = p1 - p0;
    let c2 = p2 - p0;
    let c3 = p3 - p0;

    let mut u1 = T::ZERO;
    let mut x1 = -x;
    let mut u2 = T::ONE;
    let mut x2 = c3 - x;

    for _ in 0..MAX_FIND_U_ITERATIONS {
        if (x2 - x1).real() == 0.0 {
            break;
        }
        let u3 = u2 - x2 * (u2 - u1) / (x2 - x1);
        let x3 = component_at(u3, T::ZERO, c1, c2, c3) - x;

        if x3.real() == 0.0 {
            return u3;
        }
        if x3.real() * x2.real() < 0.0 {
            // the candidate flipped sign: the old far end becomes the near end
            u1 = u2;
            x1 = x2;
        } else if (x2 + x3).real() != 0.0 {
            // same sign as the near end: contract the far residual
            x1 = x1 * x2 / (x2 + x3);
        }
        u2 = u3;
        x2 = x3;

        if Float::abs((u2 - u1).real()) <= MAX_ABS_FIND_U_ERROR {
            break;
        }
    }

    // whichever bracket end sits closer to the root
    if Float::abs(x1.real()) < Float::abs(x2.real()) {
        u1
    } else {
        u2
    }
}

/// [`find_u`] over duals: returns `u` in the real part and `du/dx` in the
/// infinitesimal part.
pub fn find_u_dual(
    x: NativeFloat,
    p0: NativeFloat,
    p1: NativeFloat,
    p2: NativeFloat,
    p3: NativeFloat,
) -> Dual {
    find_u(
        Dual::seeded(x),
        Dual::constant(p0),
        Dual::constant(p1),
        Dual::constant(p2),
        Dual::constant(p3),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_at_the_ends() {
        assert_eq!(find_u(-1.0, 0.0, 1.0, 2.0, 3.0), 0.0);
        assert_eq!(find_u(0.0, 0.0, 1.0, 2.0, 3.0), 0.0);
        assert_eq!(find_u(3.0, 0.0, 1.0, 2.0, 3.0), 1.0);
        assert_eq!(find_u(7.5, 0.0, 1.0, 2.0, 3.0), 1.0);
    }

    #[test]
    fn uniform_scalars_invert_linearly() {
        // equally spaced scalars make the cubic the identity in u
        let max_err = 1e-5;
        let nsteps = 100;
        for step in 1..nsteps {
            let x = step as NativeFloat / nsteps as NativeFloat;
            let u = find_u(x, 0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0);
            assert!((u - x).abs() < max_err);
        }
    }

    #[test]
    fn round_trips_through_evaluation() {
        // smoothstep-shaped scalars, flat tangents at both ends
        let (p0, p1, p2, p3) = (0.0, 0.0, 1.0, 1.0);
        let max_err = 10.0 * EPSILON;
        let nsteps = 200;
        for step in 0..=nsteps {
            let x = step as NativeFloat / nsteps as NativeFloat;
            let u = find_u(x, p0, p1, p2, p3);
            let back = component_at(u, p0, p1, p2, p3);
            assert!((back - x).abs() < max_err);
        }
    }

    #[test]
    fn shifted_scalars_round_trip() {
        let (p0, p1, p2, p3) = (1.0, 4.0 / 3.0, 5.0 / 3.0, 2.0);
        let max_err = 10.0 * EPSILON;
        let nsteps = 50;
        for step in 0..=nsteps {
            let x = 1.0 + step as NativeFloat / nsteps as NativeFloat;
            let u = find_u(x, p0, p1, p2, p3);
            let back = component_at(u, p0, p1, p2, p3);
            assert!((back - x).abs() < max_err);
        }
    }

    #[test]
    fn dual_variant_agrees_and_differentiates() {
        let (p0, p1, p2, p3) = (0.0, 0.1, 0.9, 1.0);
        let h = 1e-3;
        for step in 1..10 {
            let x = step as NativeFloat / 10.0;
            let u = find_u_dual(x, p0, p1, p2, p3);
            // real part agrees with the plain run
            assert!((u.r - find_u(x, p0, p1, p2, p3)).abs() < EPSILON);
            // infinitesimal part approximates du/dx
            let ahead = find_u(x + h, p0, p1, p2, p3);
            let behind = find_u(x - h, p0, p1, p2, p3);
            let numeric = (ahead - behind) / (2.0 * h);
            assert!((u.i - numeric).abs() < 1e-2);
        }
    }
}
