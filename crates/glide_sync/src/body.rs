//! # Synchronized Bodies
//!
//! The engine never touches a game object directly. It reads and writes
//! through [`SynchronizedBody`], and reports what it is doing through the
//! hook methods, all of which default to no-ops.
//!
//! ```text
//! Synchronizer defines:          Game implements:
//! ┌────────────────────────┐       ┌──────────────────────┐
//! │ trait SynchronizedBody │ ←──── │ impl for its object  │
//! └────────────────────────┘       └──────────────────────┘
//! ```
//!
//! Three ready-made bodies cover the common shapes: [`PositionBody`],
//! [`RotationBody`] and [`CompositeBody`].

use glide_shared::{Quaternion, Transform, Vec3};

use crate::extrapolation::ExtrapolationState;
use crate::protocol::WireValue;
use crate::snapshot::Snapshot;
use crate::value::{Motion, SyncValue};

/// Rate type of a body's value.
pub type RateOf<B> = <<B as SynchronizedBody>::Value as SyncValue>::Rate;

/// A game object whose state is driven by a synchronizer.
pub trait SynchronizedBody {
    /// Shape of the synchronized value.
    type Value: WireValue;

    /// Value currently shown / simulated.
    fn current_value(&self) -> Self::Value;

    /// Rate of change to transmit, when the body knows it.
    fn current_rate(&self) -> Option<<Self::Value as SyncValue>::Rate> {
        None
    }

    /// Constant acceleration applied while dead reckoning.
    fn acceleration(&self) -> <Self::Value as SyncValue>::Rate {
        Default::default()
    }

    /// Writes the displayed value.
    fn apply(&mut self, value: Self::Value);

    /// Called after blending between two buffered samples.
    fn on_interpolation(
        &mut self,
        _lhs: &Snapshot<Self::Value>,
        _rhs: &Snapshot<Self::Value>,
        _lhs_index: usize,
        _t: f32,
    ) {
    }

    /// Called with each dead-reckoned value.
    fn on_extrapolation(&mut self, _value: &Self::Value) {}

    /// Called when dead reckoning starts or re-anchors.
    fn on_begin_extrapolation(&mut self, _state: &ExtrapolationState<Self::Value>, _dt: f64) {}

    /// Called when interpolation resumes at `target`.
    fn on_end_extrapolation(&mut self, _target: &Self::Value) {}

    /// Called on ticks where a residual is being blended away.
    fn on_error_correction(&mut self, _residual: &Self::Value) {}
}

/// How often each hook fired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BodyStats {
    /// Values written.
    pub applied: u64,
    /// Interpolated ticks.
    pub interpolated: u64,
    /// Extrapolated ticks.
    pub extrapolated: u64,
    /// Times dead reckoning started or re-anchored.
    pub extrapolations_started: u64,
    /// Ticks with an active residual.
    pub corrected: u64,
}

/// A point moving in space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PositionBody {
    /// Displayed position.
    pub position: Vec3,
    /// Known velocity, sent when the wire layout carries velocity.
    pub velocity: Option<Vec3>,
    /// Acceleration assumed while dead reckoning (gravity, usually).
    pub gravity: Vec3,
    /// Hook counters.
    pub stats: BodyStats,
}

impl PositionBody {
    /// Body at rest at `position`.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Same body, with gravity applied while dead reckoning.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }
}

impl SynchronizedBody for PositionBody {
    type Value = Vec3;

    fn current_value(&self) -> Vec3 {
        self.position
    }

    fn current_rate(&self) -> Option<Vec3> {
        self.velocity
    }

    fn acceleration(&self) -> Vec3 {
        self.gravity
    }

    fn apply(&mut self, value: Vec3) {
        self.position = value;
        self.stats.applied += 1;
    }

    fn on_interpolation(&mut self, _: &Snapshot<Vec3>, _: &Snapshot<Vec3>, _: usize, _: f32) {
        self.stats.interpolated += 1;
    }

    fn on_extrapolation(&mut self, _value: &Vec3) {
        self.stats.extrapolated += 1;
    }

    fn on_begin_extrapolation(&mut self, state: &ExtrapolationState<Vec3>, _dt: f64) {
        self.stats.extrapolations_started += 1;
        self.velocity = Some(state.rate);
    }

    fn on_error_correction(&mut self, _residual: &Vec3) {
        self.stats.corrected += 1;
    }
}

/// An orientation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RotationBody {
    /// Displayed rotation.
    pub rotation: Quaternion,
    /// Known angular velocity, sent when the wire layout carries it.
    pub angular_velocity: Option<Vec3>,
    /// Hook counters.
    pub stats: BodyStats,
}

impl RotationBody {
    /// Body at rest facing `rotation`.
    #[must_use]
    pub fn new(rotation: Quaternion) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }
}

impl SynchronizedBody for RotationBody {
    type Value = Quaternion;

    fn current_value(&self) -> Quaternion {
        self.rotation
    }

    fn current_rate(&self) -> Option<Vec3> {
        self.angular_velocity
    }

    fn apply(&mut self, value: Quaternion) {
        self.rotation = value;
        self.stats.applied += 1;
    }

    fn on_interpolation(
        &mut self,
        _: &Snapshot<Quaternion>,
        _: &Snapshot<Quaternion>,
        _: usize,
        _: f32,
    ) {
        self.stats.interpolated += 1;
    }

    fn on_extrapolation(&mut self, _value: &Quaternion) {
        self.stats.extrapolated += 1;
    }

    fn on_begin_extrapolation(&mut self, state: &ExtrapolationState<Quaternion>, _dt: f64) {
        self.stats.extrapolations_started += 1;
        self.angular_velocity = Some(state.rate);
    }

    fn on_error_correction(&mut self, _residual: &Quaternion) {
        self.stats.corrected += 1;
    }
}

/// Position, rotation and scale together.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeBody {
    /// Displayed transform.
    pub transform: Transform,
    /// Known linear and angular velocity.
    pub motion: Option<Motion>,
    /// Linear acceleration while dead reckoning.
    pub gravity: Vec3,
    /// Hook counters.
    pub stats: BodyStats,
}

impl CompositeBody {
    /// Body at rest at `transform`.
    #[must_use]
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            motion: None,
            gravity: Vec3::ZERO,
            stats: BodyStats::default(),
        }
    }
}

impl Default for CompositeBody {
    fn default() -> Self {
        Self::new(Transform::IDENTITY)
    }
}

impl SynchronizedBody for CompositeBody {
    type Value = Transform;

    fn current_value(&self) -> Transform {
        self.transform
    }

    fn current_rate(&self) -> Option<Motion> {
        self.motion
    }

    fn acceleration(&self) -> Motion {
        Motion::new(self.gravity, Vec3::ZERO)
    }

    fn apply(&mut self, value: Transform) {
        self.transform = value;
        self.stats.applied += 1;
    }

    fn on_interpolation(
        &mut self,
        _: &Snapshot<Transform>,
        _: &Snapshot<Transform>,
        _: usize,
        _: f32,
    ) {
        self.stats.interpolated += 1;
    }

    fn on_extrapolation(&mut self, _value: &Transform) {
        self.stats.extrapolated += 1;
    }

    fn on_begin_extrapolation(&mut self, state: &ExtrapolationState<Transform>, _dt: f64) {
        self.stats.extrapolations_started += 1;
        self.motion = Some(state.rate);
    }

    fn on_error_correction(&mut self, _residual: &Transform) {
        self.stats.corrected += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal(Vec3);

    impl SynchronizedBody for Minimal {
        type Value = Vec3;

        fn current_value(&self) -> Vec3 {
            self.0
        }

        fn apply(&mut self, value: Vec3) {
            self.0 = value;
        }
    }

    #[test]
    fn test_default_hooks_and_rates() {
        let mut body = Minimal(Vec3::X);
        assert_eq!(body.current_rate(), None);
        assert_eq!(body.acceleration(), Vec3::ZERO);
        body.on_extrapolation(&Vec3::Y);
        body.on_error_correction(&Vec3::Y);
        body.apply(Vec3::Z);
        assert_eq!(body.current_value(), Vec3::Z);
    }

    #[test]
    fn test_position_body_counts_hooks() {
        let mut body = PositionBody::new(Vec3::ZERO).with_gravity(Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(body.acceleration().y, -9.81);

        body.apply(Vec3::X);
        body.on_extrapolation(&Vec3::X);
        body.on_begin_extrapolation(
            &ExtrapolationState {
                reference: Snapshot::new(1.0, Vec3::X),
                start_real_time: 0.0,
                rate: Vec3::Y,
            },
            0.016,
        );

        assert_eq!(body.position, Vec3::X);
        assert_eq!(body.velocity, Some(Vec3::Y));
        assert_eq!(body.stats.applied, 1);
        assert_eq!(body.stats.extrapolated, 1);
        assert_eq!(body.stats.extrapolations_started, 1);
    }

    #[test]
    fn test_composite_acceleration_is_linear_only() {
        let mut body = CompositeBody::default();
        body.gravity = Vec3::new(0.0, -1.0, 0.0);
        assert_eq!(body.acceleration(), Motion::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ZERO));
    }
}
