use super::*;
use thiserror::Error;

/// Failure kinds reported by curve operations.
///
/// Errors are returned, never panicked. Precondition violations that are
/// programmer errors (non-finite control points, broken monotonic invariants)
/// are checked with `debug_assert!` instead and are not part of this taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
pub enum CurveError {
    /// An evaluation or trim was requested outside the curve's domain.
    #[error("ordinate {0} is outside the curve domain")]
    OutOfBounds(NativeFloat),

    /// All polynomial coefficients of a cubic vanish, so it has no defined
    /// order and no slope anywhere.
    #[error("cubic coefficients all vanish, the polynomial has no defined order")]
    NoSolution,
}
