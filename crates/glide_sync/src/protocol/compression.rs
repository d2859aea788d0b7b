//! # Quantization
//!
//! Lossy float compression for the wire.
//!
//! A float inside a known `[min, max]` range is mapped onto the 65,536 codes
//! of a `u16`. Values outside the range clamp to the nearest end code rather
//! than wrapping.
//!
//! ```text
//! min                                                     max
//!  |-----|-----|-----|-----|-- ... --|-----|-----|-----|-----|
//!  0     1     2     3     4       65532 65533 65534 65535
//!        <-scale->
//! ```

use serde::{Deserialize, Serialize};

use glide_shared::Vec3;

use crate::error::{SyncError, SyncResult};

/// Highest representable code.
pub const MAX_CODE: u16 = u16::MAX;

/// Size of one quantization step for a range.
#[inline]
fn scale(min: f32, max: f32) -> f64 {
    (f64::from(max) - f64::from(min)) / f64::from(MAX_CODE)
}

/// Compresses `value` into a 16-bit code over `[min, max]`.
///
/// Out-of-range values clamp. An empty or inverted range compresses
/// everything to code 0.
#[must_use]
pub fn compress(value: f32, min: f32, max: f32) -> u16 {
    let step = scale(min, max);
    if step.is_nan() || step <= 0.0 || !value.is_finite() {
        return 0;
    }
    let code = ((f64::from(value) - f64::from(min)) / step).round();
    // Clamped to the code range first, so the cast cannot truncate
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let code = code.clamp(0.0, f64::from(MAX_CODE)) as u16;
    code
}

/// Expands a 16-bit code back into `[min, max]`.
#[must_use]
pub fn decompress(code: u16, min: f32, max: f32) -> f32 {
    let step = scale(min, max);
    if step.is_nan() || step <= 0.0 {
        return min;
    }
    #[allow(clippy::cast_possible_truncation)]
    let value = (step * f64::from(code) + f64::from(min)) as f32;
    value
}

/// Worst-case error of a compress/decompress round trip (half a step).
#[must_use]
pub fn precision(min: f32, max: f32) -> f32 {
    #[allow(clippy::cast_possible_truncation)]
    let half = (scale(min, max) * 0.5) as f32;
    half.max(0.0)
}

/// A quantization range for a single scalar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quantizer {
    /// Lowest representable value.
    pub min: f32,
    /// Highest representable value.
    pub max: f32,
}

impl Quantizer {
    /// Creates a quantizer over `[min, max]`.
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// See [`compress`].
    #[inline]
    #[must_use]
    pub fn compress(&self, value: f32) -> u16 {
        compress(value, self.min, self.max)
    }

    /// See [`decompress`].
    #[inline]
    #[must_use]
    pub fn decompress(&self, code: u16) -> f32 {
        decompress(code, self.min, self.max)
    }

    /// See [`precision`].
    #[inline]
    #[must_use]
    pub fn precision(&self) -> f32 {
        precision(self.min, self.max)
    }
}

/// Per-axis quantization bounds for one vector-shaped wire channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizeRange {
    /// Per-axis minimum.
    pub min: Vec3,
    /// Per-axis maximum.
    pub max: Vec3,
}

impl QuantizeRange {
    /// Same bounds on every axis.
    #[must_use]
    pub const fn uniform(min: f32, max: f32) -> Self {
        Self {
            min: Vec3::new(min, min, min),
            max: Vec3::new(max, max, max),
        }
    }

    /// Quantizer for axis `axis` (0 = X, 1 = Y, 2 = Z).
    #[must_use]
    pub fn axis(&self, axis: usize) -> Quantizer {
        let min = self.min.to_array();
        let max = self.max.to_array();
        Quantizer::new(min[axis % 3], max[axis % 3])
    }

    /// Rejects inverted, empty or non-finite ranges.
    pub fn validate(&self, name: &str) -> SyncResult<()> {
        for (lo, hi) in self.min.to_array().into_iter().zip(self.max.to_array()) {
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(SyncError::InvalidConfig(format!(
                    "{name} range must satisfy min < max on every axis (got {lo}..{hi})"
                )));
            }
        }
        Ok(())
    }
}
