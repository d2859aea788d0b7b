//! # Non-Uniform Catmull-Rom
//!
//! Four-point spline through `p1` and `p2`, shaped by the outer points `p0`
//! and `p3`, parametrized by each point's own timestamp. Snapshots rarely
//! arrive evenly spaced, so the knots are the real send times rather than
//! `0, 1, 2, 3`.
//!
//! Evaluated with the Barry-Goldman pyramid:
//!
//! ```text
//!   A1 = p0..p1 at t   A2 = p1..p2 at t   A3 = p2..p3 at t
//!          B1 = A1..A2 over [t0, t2]   B2 = A2..A3 over [t1, t3]
//!                     C = B1..B2 over [t1, t2]
//! ```
//!
//! Every stage is a [`SyncValue::blend`], so the same code serves vectors
//! (lerp) and rotations (slerp).

use crate::value::SyncValue;

#[inline]
fn weight(t: f64, from: f64, to: f64) -> f32 {
    #[allow(clippy::cast_possible_truncation)]
    let w = ((t - from) / (to - from)) as f32;
    w
}

/// Evaluates the spline at time `t`, normally within `[t1, t2]`.
///
/// Consecutive knots must differ; use [`catmull_rom_checked`] when that is
/// not already guaranteed.
#[must_use]
pub fn catmull_rom<T: SyncValue>(points: [T; 4], times: [f64; 4], t: f64) -> T {
    let [p0, p1, p2, p3] = points;
    let [t0, t1, t2, t3] = times;

    let a1 = p0.blend(p1, weight(t, t0, t1));
    let a2 = p1.blend(p2, weight(t, t1, t2));
    let a3 = p2.blend(p3, weight(t, t2, t3));

    let b1 = a1.blend(a2, weight(t, t0, t2));
    let b2 = a2.blend(a3, weight(t, t1, t3));

    b1.blend(b2, weight(t, t1, t2))
}

/// [`catmull_rom`] that returns `None` instead of dividing by zero when
/// knots are not strictly increasing.
#[must_use]
pub fn catmull_rom_checked<T: SyncValue>(points: [T; 4], times: [f64; 4], t: f64) -> Option<T> {
    let increasing = times.windows(2).all(|w| w[1] > w[0]);
    increasing.then(|| catmull_rom(points, times, t))
}
