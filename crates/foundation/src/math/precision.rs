//! Float helpers shared by the geometry crates.
//!
//! - `canonical_f64` / `canonical_bits` make floats safe to hash as content keys.
//! - `stable_total_cmp_f64` gives a deterministic ordering for hit sorting.
//! - `clamp_finite` is the clamping primitive behind all local-coordinate clamps.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for hashing and ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        // Handles +0.0 and -0.0.
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Little-endian bytes of the canonicalized value, for content hashing.
pub fn canonical_bits(v: f64) -> [u8; 8] {
    canonical_f64(v).to_bits().to_le_bytes()
}

/// Deterministic total ordering for floats.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Clamp `v` into `[min, max]`.
///
/// NaN collapses to `min` and an inverted range collapses to `min`, so the
/// result is always inside the range and clamping twice is a no-op.
pub fn clamp_finite(v: f64, min: f64, max: f64) -> f64 {
    let max = max.max(min);
    if v.is_nan() {
        return min;
    }
    v.clamp(min, max)
}

pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() <= eps
}
