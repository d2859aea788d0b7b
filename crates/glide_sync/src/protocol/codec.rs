//! # Value Payload Codec
//!
//! Encodes a synchronized value (and optionally its rate) as the scalars
//! selected by an [`AxisMask`], in fixed channel order:
//!
//! ```text
//! position X Y Z | rotation X Y Z | velocity X Y Z | angular X Y Z
//! ```
//!
//! Each selected scalar is either a raw `f32` or a quantized `u16`,
//! depending on [`CompressionMode`]. The timestamp is not part of the
//! payload; the transport envelope carries it.

use serde::{Deserialize, Serialize};

use glide_shared::{Quaternion, Transform, Vec3};

use super::axis::{AxisMask, Channel};
use super::compression::QuantizeRange;
use super::serialization::{PayloadReader, PayloadWriter};
use crate::error::{SyncError, SyncResult};
use crate::value::{Motion, SyncValue};

/// How selected scalars are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    /// 32-bit floats, lossless.
    #[default]
    None,
    /// 16-bit codes over the channel's [`QuantizeRange`].
    Quantized,
}

/// Everything the codec needs to agree on between sender and receiver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireFormat {
    /// Transmitted axes.
    pub axes: AxisMask,
    /// Scalar encoding.
    pub compression: CompressionMode,
    /// Quantization bounds for positions.
    pub position_range: QuantizeRange,
    /// Quantization bounds for Euler angles.
    pub rotation_range: QuantizeRange,
    /// Quantization bounds for linear velocity.
    pub velocity_range: QuantizeRange,
    /// Quantization bounds for angular velocity.
    pub angular_range: QuantizeRange,
}

impl Default for WireFormat {
    fn default() -> Self {
        Self {
            axes: AxisMask::POSITION | AxisMask::ROTATION | AxisMask::DERIVE_VELOCITY,
            compression: CompressionMode::None,
            position_range: QuantizeRange::uniform(-1024.0, 1024.0),
            rotation_range: QuantizeRange::uniform(-std::f32::consts::PI, std::f32::consts::PI),
            velocity_range: QuantizeRange::uniform(-64.0, 64.0),
            angular_range: QuantizeRange::uniform(-32.0, 32.0),
        }
    }
}

impl WireFormat {
    /// Quantization bounds for `channel`.
    #[must_use]
    pub const fn range(&self, channel: Channel) -> &QuantizeRange {
        match channel {
            Channel::Position => &self.position_range,
            Channel::Rotation => &self.rotation_range,
            Channel::Velocity => &self.velocity_range,
            Channel::AngularVelocity => &self.angular_range,
        }
    }

    /// Bytes one scalar occupies.
    #[must_use]
    pub const fn scalar_size(&self) -> usize {
        match self.compression {
            CompressionMode::None => 4,
            CompressionMode::Quantized => 2,
        }
    }

    /// Payload size for a value using the given channels.
    #[must_use]
    pub fn payload_size(&self, channels: &[Channel]) -> usize {
        channels
            .iter()
            .map(|&c| self.axes.axes(c).iter().filter(|&&on| on).count())
            .sum::<usize>()
            * self.scalar_size()
    }

    /// Rejects unusable quantization ranges (only checked when quantizing).
    pub fn validate(&self) -> SyncResult<()> {
        if self.compression == CompressionMode::Quantized {
            self.position_range.validate("position")?;
            self.rotation_range.validate("rotation")?;
            self.velocity_range.validate("velocity")?;
            self.angular_range.validate("angular velocity")?;
        }
        Ok(())
    }

    /// Writes the selected axes of one channel.
    fn write_channel(
        &self,
        writer: &mut PayloadWriter,
        channel: Channel,
        v: Vec3,
    ) -> SyncResult<()> {
        let range = self.range(channel);
        let selected = self.axes.axes(channel).into_iter().zip(v.to_array());
        for (axis, (on, value)) in selected.enumerate() {
            if !on {
                continue;
            }
            match self.compression {
                CompressionMode::None => writer.write_f32(value)?,
                CompressionMode::Quantized => writer.write_u16(range.axis(axis).compress(value))?,
            }
        }
        Ok(())
    }

    /// Reads the selected axes of one channel; unselected axes keep `last`.
    fn read_channel(
        &self,
        reader: &mut PayloadReader<'_>,
        channel: Channel,
        last: Vec3,
    ) -> SyncResult<Vec3> {
        let range = self.range(channel);
        let mut out = last.to_array();
        for (axis, on) in self.axes.axes(channel).into_iter().enumerate() {
            if !on {
                continue;
            }
            out[axis] = match self.compression {
                CompressionMode::None => reader.read_f32()?,
                CompressionMode::Quantized => range.axis(axis).decompress(reader.read_u16()?),
            };
        }
        Ok(Vec3::from_array(out))
    }

    /// Reads a rate channel, or `None` if it is not on the wire.
    fn read_rate(
        &self,
        reader: &mut PayloadReader<'_>,
        channel: Channel,
        last: Vec3,
    ) -> SyncResult<Option<Vec3>> {
        if self.axes.has_channel(channel) {
            self.read_channel(reader, channel, last).map(Some)
        } else {
            Ok(None)
        }
    }

    fn write_rotation(&self, writer: &mut PayloadWriter, rotation: Quaternion) -> SyncResult<()> {
        if self.axes.has_channel(Channel::Rotation) {
            self.write_channel(writer, Channel::Rotation, rotation.to_euler())?;
        }
        Ok(())
    }

    fn read_rotation(
        &self,
        reader: &mut PayloadReader<'_>,
        last: Quaternion,
    ) -> SyncResult<Quaternion> {
        if !self.axes.has_channel(Channel::Rotation) {
            return Ok(last);
        }
        let euler = self.read_channel(reader, Channel::Rotation, last.to_euler())?;
        Ok(Quaternion::from_euler(euler))
    }
}

/// A [`SyncValue`] with a wire representation.
pub trait WireValue: SyncValue {
    /// Channels this shape uses, in wire order.
    const CHANNELS: &'static [Channel];

    /// Writes `self` and, if the format carries it, `rate`.
    ///
    /// A missing rate is written as zero when the format expects one.
    fn write_payload(
        &self,
        rate: Option<Self::Rate>,
        writer: &mut PayloadWriter,
        format: &WireFormat,
    ) -> SyncResult<()>;

    /// Reads a value; axes missing from the format keep `last` / `last_rate`.
    fn read_payload(
        reader: &mut PayloadReader<'_>,
        format: &WireFormat,
        last: Self,
        last_rate: Self::Rate,
    ) -> SyncResult<(Self, Option<Self::Rate>)>;
}

impl WireValue for Vec3 {
    const CHANNELS: &'static [Channel] = &[Channel::Position, Channel::Velocity];

    fn write_payload(
        &self,
        rate: Option<Vec3>,
        writer: &mut PayloadWriter,
        format: &WireFormat,
    ) -> SyncResult<()> {
        format.write_channel(writer, Channel::Position, *self)?;
        format.write_channel(writer, Channel::Velocity, rate.unwrap_or_default())
    }

    fn read_payload(
        reader: &mut PayloadReader<'_>,
        format: &WireFormat,
        last: Self,
        last_rate: Vec3,
    ) -> SyncResult<(Self, Option<Vec3>)> {
        let position = format.read_channel(reader, Channel::Position, last)?;
        let rate = format.read_rate(reader, Channel::Velocity, last_rate)?;
        Ok((position, rate))
    }
}

impl WireValue for Quaternion {
    const CHANNELS: &'static [Channel] = &[Channel::Rotation, Channel::AngularVelocity];

    fn write_payload(
        &self,
        rate: Option<Vec3>,
        writer: &mut PayloadWriter,
        format: &WireFormat,
    ) -> SyncResult<()> {
        format.write_rotation(writer, *self)?;
        format.write_channel(writer, Channel::AngularVelocity, rate.unwrap_or_default())
    }

    fn read_payload(
        reader: &mut PayloadReader<'_>,
        format: &WireFormat,
        last: Self,
        last_rate: Vec3,
    ) -> SyncResult<(Self, Option<Vec3>)> {
        let rotation = format.read_rotation(reader, last)?;
        let rate = format.read_rate(reader, Channel::AngularVelocity, last_rate)?;
        Ok((rotation, rate))
    }
}

impl WireValue for Transform {
    const CHANNELS: &'static [Channel] = &Channel::ALL;

    fn write_payload(
        &self,
        rate: Option<Motion>,
        writer: &mut PayloadWriter,
        format: &WireFormat,
    ) -> SyncResult<()> {
        let rate = rate.unwrap_or_default();
        format.write_channel(writer, Channel::Position, self.position)?;
        format.write_rotation(writer, self.rotation)?;
        format.write_channel(writer, Channel::Velocity, rate.linear)?;
        format.write_channel(writer, Channel::AngularVelocity, rate.angular)
    }

    fn read_payload(
        reader: &mut PayloadReader<'_>,
        format: &WireFormat,
        last: Self,
        last_rate: Motion,
    ) -> SyncResult<(Self, Option<Motion>)> {
        let position = format.read_channel(reader, Channel::Position, last.position)?;
        let rotation = format.read_rotation(reader, last.rotation)?;
        let linear = format.read_rate(reader, Channel::Velocity, last_rate.linear)?;
        let angular = format.read_rate(reader, Channel::AngularVelocity, last_rate.angular)?;

        let rate = match (linear, angular) {
            (None, None) => None,
            (linear, angular) => Some(Motion::new(
                linear.unwrap_or(last_rate.linear),
                angular.unwrap_or(last_rate.angular),
            )),
        };
        Ok((Transform::new(position, rotation, last.scale), rate))
    }
}

/// Checks that a format can carry at least one component of `T`.
pub fn ensure_carries<T: WireValue>(format: &WireFormat) -> SyncResult<()> {
    let carries_value = T::CHANNELS
        .iter()
        .any(|&c| matches!(c, Channel::Position | Channel::Rotation) && format.axes.has_channel(c));
    if carries_value {
        Ok(())
    } else {
        Err(SyncError::InvalidConfig(
            "axis mask selects no component of the synchronized value".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantized(axes: AxisMask) -> WireFormat {
        WireFormat {
            axes,
            compression: CompressionMode::Quantized,
            position_range: QuantizeRange::uniform(-10.0, 10.0),
            ..WireFormat::default()
        }
    }

    #[test]
    fn test_raw_position_layout() {
        let format = WireFormat {
            axes: AxisMask::POSITION_X | AxisMask::POSITION_Z,
            ..WireFormat::default()
        };
        let mut writer = PayloadWriter::new();
        Vec3::new(1.0, 2.0, 3.0).write_payload(None, &mut writer, &format).unwrap();
        assert_eq!(writer.len(), 8);
        assert_eq!(format.payload_size(Vec3::CHANNELS), 8);

        let mut reader = PayloadReader::new(writer.as_slice());
        let last = Vec3::new(9.0, 7.0, 9.0);
        let (value, rate) = Vec3::read_payload(&mut reader, &format, last, Vec3::ZERO).unwrap();
        // Y was not sent, so the receiver keeps its own
        assert_eq!(value, Vec3::new(1.0, 7.0, 3.0));
        assert_eq!(rate, None);
    }

    #[test]
    fn test_quantized_position_within_precision() {
        let format = quantized(AxisMask::POSITION);
        let mut writer = PayloadWriter::new();
        let sent = Vec3::new(0.0, -3.3, 9.99);
        sent.write_payload(None, &mut writer, &format).unwrap();
        assert_eq!(writer.len(), 6);

        let mut reader = PayloadReader::new(writer.as_slice());
        let (value, _) = Vec3::read_payload(&mut reader, &format, Vec3::ZERO, Vec3::ZERO).unwrap();
        let bound = 20.0 / 65535.0;
        for (a, b) in value.to_array().into_iter().zip(sent.to_array()) {
            assert!((a - b).abs() <= bound);
        }
    }

    #[test]
    fn test_transmitted_velocity() {
        let format = WireFormat {
            axes: AxisMask::POSITION | AxisMask::VELOCITY,
            ..WireFormat::default()
        };
        let mut writer = PayloadWriter::new();
        Vec3::ZERO
            .write_payload(Some(Vec3::new(1.0, 0.0, -2.0)), &mut writer, &format)
            .unwrap();

        let mut reader = PayloadReader::new(writer.as_slice());
        let (_, rate) = Vec3::read_payload(&mut reader, &format, Vec3::ZERO, Vec3::ZERO).unwrap();
        assert_eq!(rate, Some(Vec3::new(1.0, 0.0, -2.0)));
    }

    #[test]
    fn test_rotation_yaw_only() {
        let format = WireFormat {
            axes: AxisMask::ROTATION_Z,
            ..WireFormat::default()
        };
        let sent = Quaternion::from_axis_angle(Vec3::Z, 1.0);
        let mut writer = PayloadWriter::new();
        sent.write_payload(None, &mut writer, &format).unwrap();
        assert_eq!(writer.len(), 4);

        let mut reader = PayloadReader::new(writer.as_slice());
        let (rotation, _) =
            Quaternion::read_payload(&mut reader, &format, Quaternion::IDENTITY, Vec3::ZERO)
                .unwrap();
        assert!(rotation.angle_between(sent) < 1e-4);
    }

    #[test]
    fn test_transform_keeps_scale_and_truncation_errors() {
        let format = WireFormat::default();
        let sent = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::IDENTITY, 1.0);
        let mut writer = PayloadWriter::new();
        sent.write_payload(None, &mut writer, &format).unwrap();

        let last = Transform::new(Vec3::ZERO, Quaternion::IDENTITY, 2.5);
        let mut reader = PayloadReader::new(writer.as_slice());
        let (value, rate) =
            Transform::read_payload(&mut reader, &format, last, Motion::default()).unwrap();
        assert_eq!(value.position, sent.position);
        assert_eq!(value.scale, 2.5);
        assert_eq!(rate, None);

        let mut short = PayloadReader::new(&writer.as_slice()[..5]);
        assert!(Transform::read_payload(&mut short, &format, last, Motion::default()).is_err());
    }

    #[test]
    fn test_ensure_carries() {
        let rotation_only = WireFormat {
            axes: AxisMask::ROTATION,
            ..WireFormat::default()
        };
        assert!(ensure_carries::<Quaternion>(&rotation_only).is_ok());
        assert!(ensure_carries::<Vec3>(&rotation_only).is_err());
        assert!(ensure_carries::<Transform>(&rotation_only).is_ok());
    }
}
