//! # Interpolation Engine
//!
//! Produces the displayed value between two buffered samples.
//!
//! ## Rules
//! - A pair further apart than the snap threshold is a teleport: the result
//!   is the newer sample exactly, whatever `t` is
//! - `t <= 0` gives the older sample and `t >= 1` the newer one, exactly
//! - Catmull-Rom needs both flanking samples and strictly increasing times;
//!   otherwise the pair is blended linearly

use crate::config::InterpolationMode;
use crate::snapshot::{Bracket, Snapshot};
use crate::spline::catmull_rom_checked;
use crate::value::SyncValue;

/// Result of one interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolated<T> {
    /// Value to display.
    pub value: T,
    /// True if the pair was treated as a teleport.
    pub snapped: bool,
}

impl<T> Interpolated<T> {
    const fn blended(value: T) -> Self {
        Self { value, snapped: false }
    }
}

/// Blends bracketing samples according to the configured mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InterpolationEngine {
    mode: InterpolationMode,
    snap_threshold_sq: Option<f32>,
}

impl InterpolationEngine {
    /// Creates an engine. `snap_threshold` of `None` never snaps.
    #[must_use]
    pub fn new(mode: InterpolationMode, snap_threshold: Option<f32>) -> Self {
        Self {
            mode,
            snap_threshold_sq: snap_threshold.map(|s| s * s),
        }
    }

    /// Configured mode.
    #[must_use]
    pub const fn mode(&self) -> InterpolationMode {
        self.mode
    }

    /// True if moving from `from` to `to` counts as a teleport.
    #[inline]
    #[must_use]
    pub fn should_snap<T: SyncValue>(&self, from: T, to: T) -> bool {
        self.snap_threshold_sq
            .is_some_and(|limit| from.distance_squared(to) > limit)
    }

    /// Interpolates a bracket produced by the playback selector.
    #[must_use]
    pub fn interpolate<T: SyncValue>(&self, bracket: &Bracket<T>) -> Interpolated<T> {
        let Bracket { lhs, rhs, t, older, newer, .. } = *bracket;

        if self.should_snap(lhs.value, rhs.value) {
            return Interpolated {
                value: rhs.value,
                snapped: true,
            };
        }
        // Equal times leave nothing to blend across
        if t <= 0.0 || rhs.time <= lhs.time {
            return Interpolated::blended(lhs.value);
        }
        if t >= 1.0 {
            return Interpolated::blended(rhs.value);
        }

        let linear = || lhs.value.blend(rhs.value, t);
        let value = match (self.mode, older, newer) {
            (InterpolationMode::CatmullRom, Some(p0), Some(p3)) => catmull_rom_checked(
                [p0.value, lhs.value, rhs.value, p3.value],
                [p0.time, lhs.time, rhs.time, p3.time],
                bracket.time(),
            )
            .unwrap_or_else(linear),
            _ => linear(),
        };
        Interpolated::blended(value)
    }

    /// Interpolates a bare pair with no flanking samples.
    #[must_use]
    pub fn interpolate_pair<T: SyncValue>(
        &self,
        lhs: Snapshot<T>,
        rhs: Snapshot<T>,
        t: f32,
    ) -> Interpolated<T> {
        self.interpolate(&Bracket {
            lhs,
            rhs,
            lhs_index: 1,
            t,
            older: None,
            newer: None,
        })
    }
}
