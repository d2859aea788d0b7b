//! # Axis Selection
//!
//! Which scalar components of each wire channel are transmitted.
//!
//! Components left out of the mask are never written; the receiver keeps
//! whatever value it last knew for them. A body that only moves on the
//! ground plane can send position X and Z and save a third of the bytes.
//!
//! ```text
//! bit:  0  1  2 | 3  4  5 | 6  7  8 | 9 10 11 | 12
//!       position| rotation| velocity| angular | derive velocity
//!       X  Y  Z | X  Y  Z | X  Y  Z | X  Y  Z |
//! ```

use serde::{Deserialize, Serialize};

/// A vector-shaped wire channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Position, world units.
    Position,
    /// Rotation as Euler angles, radians.
    Rotation,
    /// Linear velocity, units per second.
    Velocity,
    /// Angular velocity, radians per second.
    AngularVelocity,
}

impl Channel {
    /// Every channel, in wire order.
    pub const ALL: [Self; 4] = [
        Self::Position,
        Self::Rotation,
        Self::Velocity,
        Self::AngularVelocity,
    ];

    /// Bit offset of this channel's X component.
    #[must_use]
    const fn shift(self) -> u16 {
        match self {
            Self::Position => 0,
            Self::Rotation => 3,
            Self::Velocity => 6,
            Self::AngularVelocity => 9,
        }
    }
}

/// Bit set of transmitted axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Axis>", into = "Vec<Axis>")]
pub struct AxisMask(u16);

impl AxisMask {
    /// Position X.
    pub const POSITION_X: Self = Self(1 << 0);
    /// Position Y.
    pub const POSITION_Y: Self = Self(1 << 1);
    /// Position Z.
    pub const POSITION_Z: Self = Self(1 << 2);
    /// Rotation X (roll).
    pub const ROTATION_X: Self = Self(1 << 3);
    /// Rotation Y (pitch).
    pub const ROTATION_Y: Self = Self(1 << 4);
    /// Rotation Z (yaw).
    pub const ROTATION_Z: Self = Self(1 << 5);
    /// Velocity X.
    pub const VELOCITY_X: Self = Self(1 << 6);
    /// Velocity Y.
    pub const VELOCITY_Y: Self = Self(1 << 7);
    /// Velocity Z.
    pub const VELOCITY_Z: Self = Self(1 << 8);
    /// Angular velocity X.
    pub const ANGULAR_X: Self = Self(1 << 9);
    /// Angular velocity Y.
    pub const ANGULAR_Y: Self = Self(1 << 10);
    /// Angular velocity Z.
    pub const ANGULAR_Z: Self = Self(1 << 11);
    /// Never transmit velocities; derive them from buffered samples instead.
    pub const DERIVE_VELOCITY: Self = Self(1 << 12);

    /// Nothing selected.
    pub const NONE: Self = Self(0);
    /// All three position axes.
    pub const POSITION: Self = Self(0b111);
    /// All three rotation axes.
    pub const ROTATION: Self = Self(0b111 << 3);
    /// All three velocity axes.
    pub const VELOCITY: Self = Self(0b111 << 6);
    /// All three angular velocity axes.
    pub const ANGULAR_VELOCITY: Self = Self(0b111 << 9);

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Union of two masks.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if velocities are derived locally rather than transmitted.
    #[inline]
    #[must_use]
    pub const fn derives_velocity(self) -> bool {
        self.contains(Self::DERIVE_VELOCITY)
    }

    /// Per-axis selection for `channel` as `[x, y, z]`.
    ///
    /// Velocity channels report nothing selected while
    /// [`AxisMask::DERIVE_VELOCITY`] is set.
    #[must_use]
    pub const fn axes(self, channel: Channel) -> [bool; 3] {
        let is_rate = matches!(channel, Channel::Velocity | Channel::AngularVelocity);
        if is_rate && self.derives_velocity() {
            return [false; 3];
        }
        let bits = self.0 >> channel.shift();
        [bits & 1 != 0, bits & 2 != 0, bits & 4 != 0]
    }

    /// True if any axis of `channel` goes on the wire.
    #[must_use]
    pub const fn has_channel(self, channel: Channel) -> bool {
        let [x, y, z] = self.axes(channel);
        x || y || z
    }

    /// Number of scalars written per payload.
    #[must_use]
    pub fn scalar_count(self) -> usize {
        Channel::ALL
            .iter()
            .map(|&c| self.axes(c).iter().filter(|&&on| on).count())
            .sum()
    }
}

impl std::ops::BitOr for AxisMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Named axis, used for the config-file representation of [`AxisMask`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// Position X.
    PositionX,
    /// Position Y.
    PositionY,
    /// Position Z.
    PositionZ,
    /// Rotation X.
    RotationX,
    /// Rotation Y.
    RotationY,
    /// Rotation Z.
    RotationZ,
    /// Velocity X.
    VelocityX,
    /// Velocity Y.
    VelocityY,
    /// Velocity Z.
    VelocityZ,
    /// Angular velocity X.
    AngularX,
    /// Angular velocity Y.
    AngularY,
    /// Angular velocity Z.
    AngularZ,
    /// See [`AxisMask::DERIVE_VELOCITY`].
    DeriveVelocity,
}

impl Axis {
    const ALL: [Self; 13] = [
        Self::PositionX,
        Self::PositionY,
        Self::PositionZ,
        Self::RotationX,
        Self::RotationY,
        Self::RotationZ,
        Self::VelocityX,
        Self::VelocityY,
        Self::VelocityZ,
        Self::AngularX,
        Self::AngularY,
        Self::AngularZ,
        Self::DeriveVelocity,
    ];

    const fn mask(self) -> AxisMask {
        AxisMask(1 << self as u16)
    }
}

impl From<Vec<Axis>> for AxisMask {
    fn from(axes: Vec<Axis>) -> Self {
        axes.into_iter().fold(Self::NONE, |mask, axis| mask | axis.mask())
    }
}

impl From<AxisMask> for Vec<Axis> {
    fn from(mask: AxisMask) -> Self {
        Axis::ALL
            .into_iter()
            .filter(|axis| mask.contains(axis.mask()))
            .collect()
    }
}
