//! # Extrapolation Controller
//!
//! Dead reckoning for when playback runs past the newest sample.
//!
//! ```text
//!   Interpolating ──(no bracketing pair, rate known)──► Extrapolating
//!         ▲                                                  │
//!         └────────────(bracketing pair returns)─────────────┘
//! ```
//!
//! While extrapolating, the value is the reference sample advanced by its
//! rate (transmitted, or derived from the two newest samples) and the
//! body's acceleration. A newer reference re-anchors the projection.

use crate::config::ExtrapolationConfig;
use crate::snapshot::{Snapshot, StateBuffer};
use crate::value::SyncValue;

/// Active dead-reckoning state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrapolationState<T: SyncValue> {
    /// Sample the projection starts from.
    pub reference: Snapshot<T>,
    /// Local time at which extrapolation was entered or re-anchored.
    pub start_real_time: f64,
    /// Rate applied to the reference.
    pub rate: T::Rate,
}

/// One extrapolated value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extrapolated<T> {
    /// Projected value.
    pub value: T,
    /// True if a time or distance limit stopped the projection.
    pub limited: bool,
}

/// Enters, advances and leaves dead reckoning.
#[derive(Clone, Debug)]
pub struct ExtrapolationController<T: SyncValue> {
    config: ExtrapolationConfig,
    state: Option<ExtrapolationState<T>>,
    /// Last value inside the distance limit.
    last_admissible: Option<T>,
    /// Limit warning already logged for this episode.
    warned: bool,
}

impl<T: SyncValue> ExtrapolationController<T> {
    /// Creates an idle controller.
    #[must_use]
    pub const fn new(config: ExtrapolationConfig) -> Self {
        Self {
            config,
            state: None,
            last_admissible: None,
            warned: false,
        }
    }

    /// True while dead reckoning.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Current state, if extrapolating.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> Option<&ExtrapolationState<T>> {
        self.state.as_ref()
    }

    /// True if entering, or re-anchoring on a newer sample, is due.
    #[must_use]
    pub fn needs_anchor(&self, buffer: &StateBuffer<T>) -> bool {
        if !self.config.enabled {
            return false;
        }
        match (&self.state, buffer.newest()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(state), Some(newest)) => newest.time > state.reference.time,
        }
    }

    /// Anchors on the newest buffered sample.
    ///
    /// Returns the new state, or `None` if extrapolation is disabled or no
    /// rate is known (a single sample without a transmitted rate). A
    /// failed anchor leaves any previous state untouched.
    pub fn begin(&mut self, buffer: &StateBuffer<T>, now: f64) -> Option<ExtrapolationState<T>> {
        if !self.config.enabled {
            return None;
        }
        let reference = *buffer.newest()?;
        let rate = buffer.rate_at(0)?;

        let state = ExtrapolationState {
            reference,
            start_real_time: now,
            rate,
        };
        if self.state.is_some() {
            tracing::debug!(reference_time = reference.time, "Extrapolation re-anchored");
        } else {
            tracing::debug!(reference_time = reference.time, "Extrapolation started");
        }
        self.state = Some(state);
        self.last_admissible = Some(reference.value);
        self.warned = false;
        Some(state)
    }

    /// Projects the reference to playback time `target`.
    pub fn extrapolate(&mut self, target: f64, acceleration: T::Rate) -> Option<Extrapolated<T>> {
        let state = self.state?;
        let mut limited = false;

        let mut elapsed = (target - state.reference.time).max(0.0);
        if let Some(max_time) = self.config.max_time {
            if elapsed > max_time {
                elapsed = max_time;
                limited = true;
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let mut value = state.reference.value.advance(state.rate, acceleration, elapsed as f32);

        if let Some(max_distance) = self.config.max_distance {
            if value.distance_squared(state.reference.value) > max_distance * max_distance {
                value = self.last_admissible.unwrap_or(state.reference.value);
                limited = true;
            } else {
                self.last_admissible = Some(value);
            }
        }

        if limited && !self.warned {
            tracing::warn!(
                reference_time = state.reference.time,
                elapsed, "Extrapolation limit reached, holding"
            );
            self.warned = true;
        }

        Some(Extrapolated { value, limited })
    }

    /// Leaves dead reckoning, returning the state that was active.
    pub fn end(&mut self) -> Option<ExtrapolationState<T>> {
        let state = self.state.take();
        if let Some(state) = &state {
            tracing::debug!(reference_time = state.reference.time, "Extrapolation ended");
        }
        self.last_admissible = None;
        state
    }

    /// Drops any state without logging.
    pub fn clear(&mut self) {
        self.state = None;
        self.last_admissible = None;
        self.warned = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_shared::Vec3;

    fn x(v: f32) -> Vec3 {
        Vec3::new(v, 0.0, 0.0)
    }

    fn moving_buffer() -> StateBuffer<Vec3> {
        // 2 units per second along X
        let mut buffer = StateBuffer::new(4);
        buffer.add_state(Snapshot::new(1.0, x(2.0)));
        buffer.add_state(Snapshot::new(1.5, x(3.0)));
        buffer
    }

    fn unlimited() -> ExtrapolationConfig {
        ExtrapolationConfig {
            enabled: true,
            max_time: None,
            max_distance: None,
        }
    }

    #[test]
    fn test_derived_rate_projection() {
        let mut controller = ExtrapolationController::new(unlimited());
        let buffer = moving_buffer();
        assert!(controller.needs_anchor(&buffer));

        let state = controller.begin(&buffer, 10.0).unwrap();
        assert_eq!(state.rate, x(2.0));
        assert_eq!(state.start_real_time, 10.0);

        let out = controller.extrapolate(2.0, Vec3::ZERO).unwrap();
        assert!((out.value.x - 4.0).abs() < 1e-5);
        assert!(!out.limited);
    }

    #[test]
    fn test_transmitted_rate_wins() {
        let mut controller = ExtrapolationController::new(unlimited());
        let mut buffer = StateBuffer::new(4);
        buffer.add_state(Snapshot::with_rate(1.0, x(0.0), Vec3::Z));
        let state = controller.begin(&buffer, 0.0).unwrap();
        assert_eq!(state.rate, Vec3::Z);
    }

    #[test]
    fn test_no_rate_does_not_enter() {
        let mut controller = ExtrapolationController::new(unlimited());
        let mut buffer = StateBuffer::new(4);
        buffer.add_state(Snapshot::new(1.0, x(0.0)));
        assert!(controller.begin(&buffer, 0.0).is_none());
        assert!(!controller.is_active());
        assert!(controller.extrapolate(2.0, Vec3::ZERO).is_none());
    }

    #[test]
    fn test_disabled() {
        let mut controller = ExtrapolationController::new(ExtrapolationConfig {
            enabled: false,
            ..unlimited()
        });
        let buffer = moving_buffer();
        assert!(!controller.needs_anchor(&buffer));
        assert!(controller.begin(&buffer, 0.0).is_none());
    }

    #[test]
    fn test_time_limit_caps_projection() {
        let mut controller = ExtrapolationController::new(ExtrapolationConfig {
            max_time: Some(0.25),
            ..unlimited()
        });
        controller.begin(&moving_buffer(), 0.0);
        let out = controller.extrapolate(3.0, Vec3::ZERO).unwrap();
        assert!((out.value.x - 3.5).abs() < 1e-5);
        assert!(out.limited);
    }

    #[test]
    fn test_distance_limit_holds_last_admissible() {
        let mut controller = ExtrapolationController::new(ExtrapolationConfig {
            max_distance: Some(1.0),
            ..unlimited()
        });
        controller.begin(&moving_buffer(), 0.0);

        let inside = controller.extrapolate(1.75, Vec3::ZERO).unwrap();
        assert!((inside.value.x - 3.5).abs() < 1e-5);

        let beyond = controller.extrapolate(2.5, Vec3::ZERO).unwrap();
        assert!(beyond.limited);
        assert_eq!(beyond.value, inside.value);
    }

    #[test]
    fn test_reanchor_on_newer_sample() {
        let mut controller = ExtrapolationController::new(unlimited());
        let mut buffer = moving_buffer();
        controller.begin(&buffer, 0.0);
        assert!(!controller.needs_anchor(&buffer));

        buffer.add_state(Snapshot::new(2.0, x(5.0)));
        assert!(controller.needs_anchor(&buffer));
        let state = controller.begin(&buffer, 0.5).unwrap();
        assert_eq!(state.reference.time, 2.0);
        assert_eq!(state.rate, x(4.0));
    }

    #[test]
    fn test_end_returns_state() {
        let mut controller = ExtrapolationController::new(unlimited());
        controller.begin(&moving_buffer(), 0.0);
        assert!(controller.end().is_some());
        assert!(!controller.is_active());
        assert!(controller.end().is_none());
    }

    #[test]
    fn test_acceleration_bends_path() {
        let mut controller = ExtrapolationController::new(unlimited());
        controller.begin(&moving_buffer(), 0.0);
        let gravity = Vec3::new(0.0, -10.0, 0.0);
        let out = controller.extrapolate(2.5, gravity).unwrap();
        assert!((out.value.y + 5.0).abs() < 1e-4);
    }
}
