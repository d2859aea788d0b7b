//! # Error Correction
//!
//! When the authoritative value jumps (leaving extrapolation, re-anchoring
//! on a newer sample) the body should glide, not teleport. The jump is
//! captured as a residual, added on top of the authoritative value, and
//! decayed toward neutral over `error_correction_time`.
//!
//! ```text
//! displayed = authoritative ⊕ residual
//! residual ← blend(residual, neutral, min(dt / correction_time, 1))
//! ```

use crate::value::SyncValue;

/// Residuals smaller than this collapse to neutral.
pub const RESIDUAL_EPSILON: f32 = 1e-4;

/// Exponentially decaying display offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ErrorCorrector<T: SyncValue> {
    correction_time: f64,
    residual: T,
}

impl<T: SyncValue> ErrorCorrector<T> {
    /// Creates a corrector. A zero `correction_time` disables correction.
    #[must_use]
    pub const fn new(correction_time: f64) -> Self {
        Self {
            correction_time,
            residual: T::NEUTRAL,
        }
    }

    /// True if residuals are kept at all.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.correction_time > 0.0
    }

    /// Current residual.
    #[inline]
    #[must_use]
    pub const fn residual(&self) -> T {
        self.residual
    }

    /// True if a residual is being blended away.
    #[inline]
    #[must_use]
    pub fn is_correcting(&self) -> bool {
        self.residual != T::NEUTRAL
    }

    /// Records the jump from what was `displayed` to the new `authoritative`
    /// value so the display stays continuous.
    pub fn capture(&mut self, displayed: T, authoritative: T) {
        if !self.is_enabled() {
            self.residual = T::NEUTRAL;
            return;
        }
        self.residual = displayed.difference(authoritative);
        self.collapse();
    }

    /// Value to display for `authoritative`.
    #[inline]
    #[must_use]
    pub fn apply(&self, authoritative: T) -> T {
        if self.is_correcting() {
            authoritative.compose(self.residual)
        } else {
            authoritative
        }
    }

    /// Shrinks the residual for a tick of `dt` seconds.
    pub fn decay(&mut self, dt: f64) {
        if !self.is_enabled() {
            self.residual = T::NEUTRAL;
            return;
        }
        if !self.is_correcting() || dt <= 0.0 {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let factor = (dt / self.correction_time).min(1.0) as f32;
        self.residual = self.residual.blend(T::NEUTRAL, factor);
        self.collapse();
    }

    /// Drops the residual.
    pub fn clear(&mut self) {
        self.residual = T::NEUTRAL;
    }

    fn collapse(&mut self) {
        let magnitude_sq = self.residual.magnitude_squared();
        if !magnitude_sq.is_finite() || magnitude_sq < RESIDUAL_EPSILON * RESIDUAL_EPSILON {
            self.residual = T::NEUTRAL;
        }
    }
}
