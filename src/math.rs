// src/math.rs
// Lane-wise numeric helpers shared by both pendulum models and the sampling driver.
// A "lane" is one independent pendulum inside a batch; every lane vector in a model has the same length.
// All arithmetic is plain IEEE-754 f64: NaN and infinities flow through untouched.

use crate::error::{Result, SimulationError};
use nalgebra::DVector;
use std::f64::consts::TAU;

/// Fixed-length vector of per-lane values (one entry per pendulum in the batch).
pub type Lanes = DVector<f64>;

/// Reduces an angle into `[0, 2π)`.
///
/// `rem_euclid` can round a tiny negative input up to exactly `2π`; that case folds to `0.0`
/// so the half-open range holds. Non-finite input stays non-finite.
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU); // Floor-mod, result >= 0 for finite input.
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Sign function with `sign(0) = 0` and `sign(NaN) = NaN`.
///
/// `f64::signum` maps `0.0` to `1.0`, which would switch friction on for a joint at rest.
pub fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() {
        x
    } else {
        x.signum()
    }
}

/// Builds a lane vector from a slice.
pub fn lanes_from(values: &[f64]) -> Lanes {
    DVector::from_column_slice(values)
}

/// Checks that `values` has exactly `expected` lanes.
pub fn ensure_lanes(field: &'static str, values: &Lanes, expected: usize) -> Result<()> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(SimulationError::shape_mismatch(field, expected, values.len()))
    }
}

/// Stretches a single-lane vector to `lanes` entries; any other length must already match.
///
/// Mirrors array broadcasting of a scalar: a model constructed with one rod length and many
/// starting angles gives every lane that length.
pub fn broadcast(field: &'static str, values: Lanes, lanes: usize) -> Result<Lanes> {
    if values.len() == 1 && lanes != 1 {
        return Ok(DVector::from_element(lanes, values[0]));
    }
    ensure_lanes(field, &values, lanes)?;
    Ok(values)
}
