//! # Synchronized Value Shapes
//!
//! The synchronization engine is generic over the shape of the value it
//! smooths. [`SyncValue`] is the minimal algebra it needs: blending,
//! distance, a residual difference that can be re-applied, and a
//! rate-of-change for dead reckoning.
//!
//! | Shape        | Blend          | Residual            | Rate                 |
//! |--------------|----------------|---------------------|----------------------|
//! | `Vec3`       | lerp           | `a - b`             | velocity             |
//! | `Quaternion` | slerp          | `a * b^-1`          | angular velocity     |
//! | `Transform`  | both + scale   | both + scale        | [`Motion`]           |

use std::fmt::Debug;

use glide_shared::{Quaternion, Transform, Vec3};

/// A value that can be buffered, interpolated, extrapolated and corrected.
pub trait SyncValue: Copy + Debug + PartialEq {
    /// Rate of change used for dead reckoning.
    type Rate: Copy + Debug + Default + PartialEq;

    /// Neutral residual: composing with it changes nothing.
    const NEUTRAL: Self;

    /// Blends toward `other` by `t` without clamping.
    #[must_use]
    fn blend(self, other: Self, t: f32) -> Self;

    /// Squared distance between two values (radians squared for rotations).
    #[must_use]
    fn distance_squared(self, other: Self) -> f32;

    /// Residual `self ⊖ other`: composing `other` with it yields `self`.
    #[must_use]
    fn difference(self, other: Self) -> Self;

    /// Applies a residual: `self ⊕ residual`.
    #[must_use]
    fn compose(self, residual: Self) -> Self;

    /// Constant rate taking `from` to `to` over `dt` seconds.
    ///
    /// A non-positive `dt` yields the zero rate.
    #[must_use]
    fn rate_between(from: Self, to: Self, dt: f32) -> Self::Rate;

    /// Dead-reckons `dt` seconds ahead with a constant rate and acceleration.
    #[must_use]
    fn advance(self, rate: Self::Rate, acceleration: Self::Rate, dt: f32) -> Self;

    /// False for NaN or infinite components.
    #[must_use]
    fn is_finite(self) -> bool;

    /// False for NaN or infinite rate components.
    #[must_use]
    fn rate_is_finite(rate: Self::Rate) -> bool;

    /// Squared size of a residual.
    #[must_use]
    fn magnitude_squared(self) -> f32 {
        self.distance_squared(Self::NEUTRAL)
    }
}

impl SyncValue for Vec3 {
    type Rate = Vec3;

    const NEUTRAL: Self = Vec3::ZERO;

    fn blend(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }

    fn distance_squared(self, other: Self) -> f32 {
        Vec3::distance_squared(self, other)
    }

    fn difference(self, other: Self) -> Self {
        self - other
    }

    fn compose(self, residual: Self) -> Self {
        self + residual
    }

    fn rate_between(from: Self, to: Self, dt: f32) -> Vec3 {
        if dt > 0.0 {
            (to - from) * (1.0 / dt)
        } else {
            Vec3::ZERO
        }
    }

    fn advance(self, rate: Vec3, acceleration: Vec3, dt: f32) -> Self {
        self + rate * dt + acceleration * (0.5 * dt * dt)
    }

    fn is_finite(self) -> bool {
        Vec3::is_finite(self)
    }

    fn rate_is_finite(rate: Vec3) -> bool {
        rate.is_finite()
    }
}

impl SyncValue for Quaternion {
    type Rate = Vec3;

    const NEUTRAL: Self = Quaternion::IDENTITY;

    fn blend(self, other: Self, t: f32) -> Self {
        self.slerp_unclamped(other, t)
    }

    fn distance_squared(self, other: Self) -> f32 {
        let angle = self.angle_between(other);
        angle * angle
    }

    fn difference(self, other: Self) -> Self {
        (self * other.inverse()).normalize()
    }

    fn compose(self, residual: Self) -> Self {
        (residual * self).normalize()
    }

    fn rate_between(from: Self, to: Self, dt: f32) -> Vec3 {
        if dt <= 0.0 {
            return Vec3::ZERO;
        }
        let (axis, angle) = to.difference(from).to_axis_angle();
        axis * (angle / dt)
    }

    fn advance(self, rate: Vec3, acceleration: Vec3, dt: f32) -> Self {
        let omega = rate + acceleration * (0.5 * dt);
        let delta = Quaternion::from_axis_angle(omega, omega.length() * dt);
        (delta * self).normalize()
    }

    fn is_finite(self) -> bool {
        Quaternion::is_finite(self)
    }

    fn rate_is_finite(rate: Vec3) -> bool {
        rate.is_finite()
    }
}

/// Linear plus angular rate of a [`Transform`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// Linear velocity, units per second.
    pub linear: Vec3,
    /// Angular velocity, radians per second about its direction.
    pub angular: Vec3,
}

impl Motion {
    /// Creates a motion from its parts.
    #[must_use]
    pub const fn new(linear: Vec3, angular: Vec3) -> Self {
        Self { linear, angular }
    }
}

impl SyncValue for Transform {
    type Rate = Motion;

    const NEUTRAL: Self = Transform::new(Vec3::ZERO, Quaternion::IDENTITY, 0.0);

    fn blend(self, other: Self, t: f32) -> Self {
        Transform::new(
            self.position.blend(other.position, t),
            self.rotation.blend(other.rotation, t),
            self.scale + (other.scale - self.scale) * t,
        )
    }

    /// Position distance squared plus rotation angle squared; scale is not
    /// part of the distance.
    fn distance_squared(self, other: Self) -> f32 {
        SyncValue::distance_squared(self.position, other.position)
            + SyncValue::distance_squared(self.rotation, other.rotation)
    }

    fn difference(self, other: Self) -> Self {
        Transform::new(
            self.position.difference(other.position),
            self.rotation.difference(other.rotation),
            self.scale - other.scale,
        )
    }

    fn compose(self, residual: Self) -> Self {
        Transform::new(
            self.position.compose(residual.position),
            self.rotation.compose(residual.rotation),
            self.scale + residual.scale,
        )
    }

    fn rate_between(from: Self, to: Self, dt: f32) -> Motion {
        Motion::new(
            Vec3::rate_between(from.position, to.position, dt),
            Quaternion::rate_between(from.rotation, to.rotation, dt),
        )
    }

    fn advance(self, rate: Motion, acceleration: Motion, dt: f32) -> Self {
        Transform::new(
            self.position.advance(rate.linear, acceleration.linear, dt),
            self.rotation.advance(rate.angular, acceleration.angular, dt),
            self.scale,
        )
    }

    fn is_finite(self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    fn rate_is_finite(rate: Motion) -> bool {
        rate.linear.is_finite() && rate.angular.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec3_residual_round_trip() {
        let a = Vec3::new(3.0, -1.0, 2.0);
        let b = Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(b.compose(a.difference(b)), a);
    }

    #[test]
    fn test_quaternion_residual_round_trip() {
        let a = Quaternion::from_euler(Vec3::new(0.2, 0.4, -0.3));
        let b = Quaternion::from_euler(Vec3::new(-0.1, 0.0, 0.9));
        let back = b.compose(a.difference(b));
        assert!(back.angle_between(a) < 1e-3);
    }

    #[test]
    fn test_vec3_dead_reckoning() {
        let rate = Vec3::rate_between(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 0.5);
        assert_eq!(rate, Vec3::new(4.0, 0.0, 0.0));

        let gravity = Vec3::new(0.0, -10.0, 0.0);
        let p = Vec3::ZERO.advance(rate, gravity, 1.0);
        assert_eq!(p, Vec3::new(4.0, -5.0, 0.0));
    }

    #[test]
    fn test_quaternion_dead_reckoning_matches_rate() {
        let from = Quaternion::IDENTITY;
        let to = Quaternion::from_axis_angle(Vec3::Y, 0.3);
        let rate = Quaternion::rate_between(from, to, 0.1);
        assert!((rate.length() - 3.0).abs() < 1e-3);

        let ahead = to.advance(rate, Vec3::ZERO, 0.1);
        let expected = Quaternion::from_axis_angle(Vec3::Y, 0.6);
        assert!(ahead.angle_between(expected) < 1e-3);
    }

    #[test]
    fn test_zero_dt_rate_is_zero() {
        assert_eq!(Vec3::rate_between(Vec3::ZERO, Vec3::X, 0.0), Vec3::ZERO);
        assert_eq!(
            Transform::rate_between(Transform::IDENTITY, Transform::IDENTITY, -1.0),
            Motion::default()
        );
    }

    #[test]
    fn test_transform_neutral_residual() {
        let t = Transform::from_position_rotation(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::from_axis_angle(Vec3::Z, 0.5),
        );
        let composed = t.compose(Transform::NEUTRAL);
        assert_eq!(composed.position, t.position);
        assert!(composed.rotation.angle_between(t.rotation) < 1e-4);
        assert_eq!(composed.scale, t.scale);
    }
}
