//! # Synchronizer Configuration
//!
//! Validated once at construction, immutable afterwards. Loadable from TOML:
//!
//! ```toml
//! interpolation = "catmull_rom"
//! buffer_capacity = 16
//! buffering_delay = 0.1
//! send_rate = 20.0
//! snap_threshold = 8.0
//!
//! [extrapolation]
//! enabled = true
//! max_time = 0.5
//!
//! [wire]
//! axes = ["position_x", "position_y", "position_z", "derive_velocity"]
//! compression = "quantized"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::protocol::{ensure_carries, WireFormat, WireValue};
use crate::snapshot::MIN_CAPACITY;

/// How a bracketing pair is blended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    /// Straight lerp / slerp between the pair.
    Linear,
    /// Non-uniform Catmull-Rom through the pair and its neighbours.
    #[default]
    CatmullRom,
}

/// Dead-reckoning limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrapolationConfig {
    /// Extrapolate when playback runs past the newest sample.
    pub enabled: bool,
    /// Longest time to project past the reference sample, in seconds.
    pub max_time: Option<f64>,
    /// Longest distance to project from the reference sample.
    pub max_distance: Option<f32>,
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_time: Some(0.5),
            max_distance: None,
        }
    }
}

/// Synchronizer configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Blend used between bracketing samples.
    pub interpolation: InterpolationMode,
    /// Samples kept in the state buffer (at least 4).
    pub buffer_capacity: usize,
    /// Playback lag behind the newest sample, in seconds.
    pub buffering_delay: f64,
    /// Maximum snapshots sent per second.
    pub send_rate: f64,
    /// Minimum change before a new snapshot is worth sending.
    pub update_threshold: f32,
    /// Distance beyond which playback jumps instead of blending.
    pub snap_threshold: Option<f32>,
    /// Seconds for a residual to decay away; zero disables correction.
    pub error_correction_time: f64,
    /// Dead-reckoning settings.
    pub extrapolation: ExtrapolationConfig,
    /// Payload layout.
    pub wire: WireFormat,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMode::CatmullRom,
            buffer_capacity: 16,
            buffering_delay: 0.1,
            send_rate: 20.0,
            update_threshold: 0.001,
            snap_threshold: None,
            error_correction_time: 0.1,
            extrapolation: ExtrapolationConfig::default(),
            wire: WireFormat::default(),
        }
    }
}

fn check(ok: bool, message: &str) -> SyncResult<()> {
    if ok {
        Ok(())
    } else {
        Err(SyncError::InvalidConfig(message.to_string()))
    }
}

fn non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

impl SyncConfig {
    /// Low-latency wired network.
    ///
    /// Short delay and a fast send rate; a send interval and a half of lag
    /// is enough to ride out LAN jitter.
    #[must_use]
    pub fn lan() -> Self {
        Self {
            buffer_capacity: 16,
            buffering_delay: 0.05, // 1.5 send intervals at 30Hz
            send_rate: 30.0,
            snap_threshold: Some(10.0),
            error_correction_time: 0.05,
            ..Self::default()
        }
    }

    /// Public internet with loss and jitter.
    ///
    /// Larger history so a lost packet still leaves a bracketing pair, and
    /// shorter extrapolation so mispredictions stay small.
    #[must_use]
    pub fn internet() -> Self {
        Self {
            buffer_capacity: 32,
            buffering_delay: 0.15, // 3 send intervals at 20Hz
            send_rate: 20.0,
            snap_threshold: Some(8.0),
            error_correction_time: 0.2,
            extrapolation: ExtrapolationConfig {
                enabled: true,
                max_time: Some(0.25),
                max_distance: Some(5.0),
            },
            ..Self::default()
        }
    }

    /// Looks up a preset by name: `default`, `lan` or `internet`.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default()),
            "lan" => Some(Self::lan()),
            "internet" => Some(Self::internet()),
            _ => None,
        }
    }

    /// Parses and validates a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> SyncResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Minimum seconds between two sends.
    #[must_use]
    pub fn send_interval(&self) -> f64 {
        1.0 / self.send_rate
    }

    /// Seconds of sender time a full buffer spans at `send_rate`.
    #[must_use]
    pub fn buffered_span(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let intervals = self.buffer_capacity.saturating_sub(1) as f64;
        intervals / self.send_rate
    }

    /// Checks every value independent of the synchronized shape.
    pub fn validate(&self) -> SyncResult<()> {
        check(
            self.buffer_capacity >= MIN_CAPACITY,
            "buffer_capacity must be at least 4",
        )?;
        check(
            non_negative(self.buffering_delay),
            "buffering_delay must be finite and non-negative",
        )?;
        check(
            !(self.interpolation == InterpolationMode::CatmullRom && self.buffering_delay == 0.0),
            "catmull_rom interpolation needs a non-zero buffering_delay",
        )?;
        check(
            self.send_rate.is_finite() && self.send_rate > 0.0,
            "send_rate must be positive",
        )?;
        // A delay the buffer cannot span leaves playback behind the oldest sample
        check(
            self.buffering_delay < self.buffered_span(),
            "buffering_delay must be shorter than (buffer_capacity - 1) / send_rate",
        )?;
        check(
            self.update_threshold.is_finite() && self.update_threshold >= 0.0,
            "update_threshold must be non-negative",
        )?;
        if let Some(snap) = self.snap_threshold {
            check(snap.is_finite() && snap >= 0.0, "snap_threshold must be non-negative")?;
        }
        check(
            non_negative(self.error_correction_time),
            "error_correction_time must be finite and non-negative",
        )?;
        if let Some(max_time) = self.extrapolation.max_time {
            check(non_negative(max_time), "extrapolation.max_time must be non-negative")?;
        }
        if let Some(max_distance) = self.extrapolation.max_distance {
            check(
                max_distance.is_finite() && max_distance >= 0.0,
                "extrapolation.max_distance must be non-negative",
            )?;
        }
        self.wire.validate()
    }

    /// [`Self::validate`] plus a check that the wire layout carries `T`.
    pub fn validate_for<T: WireValue>(&self) -> SyncResult<()> {
        self.validate()?;
        ensure_carries::<T>(&self.wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{AxisMask, CompressionMode, QuantizeRange};
    use glide_shared::{Quaternion, Vec3};

    fn invalid(config: &SyncConfig) -> bool {
        matches!(config.validate(), Err(SyncError::InvalidConfig(_)))
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(SyncConfig::default().validate().is_ok());
        assert!(SyncConfig::lan().validate().is_ok());
        assert!(SyncConfig::internet().validate().is_ok());
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(SyncConfig::by_name("lan"), Some(SyncConfig::lan()));
        assert_eq!(SyncConfig::by_name("internet"), Some(SyncConfig::internet()));
        assert_eq!(SyncConfig::by_name("default"), Some(SyncConfig::default()));
        assert_eq!(SyncConfig::by_name("satellite"), None);
    }

    #[test]
    fn test_rejects_small_capacity() {
        let config = SyncConfig {
            buffer_capacity: 3,
            ..SyncConfig::default()
        };
        assert!(invalid(&config));
    }

    #[test]
    fn test_rejects_bad_times() {
        for delay in [-0.1, f64::NAN, f64::INFINITY] {
            let config = SyncConfig {
                buffering_delay: delay,
                ..SyncConfig::default()
            };
            assert!(invalid(&config), "delay {delay}");
        }
        let config = SyncConfig {
            error_correction_time: -1.0,
            ..SyncConfig::default()
        };
        assert!(invalid(&config));
        let config = SyncConfig {
            send_rate: 0.0,
            ..SyncConfig::default()
        };
        assert!(invalid(&config));
    }

    #[test]
    fn test_rejects_delay_the_buffer_cannot_span() {
        // 3 intervals at 20Hz cover 0.15 s
        let config = SyncConfig {
            buffer_capacity: 4,
            buffering_delay: 0.5,
            send_rate: 20.0,
            ..SyncConfig::default()
        };
        assert!((config.buffered_span() - 0.15).abs() < 1e-12);
        assert!(invalid(&config));
        assert!(invalid(&SyncConfig {
            buffering_delay: 0.15,
            ..config
        }));

        let spanned = SyncConfig {
            buffering_delay: 0.1,
            ..config
        };
        assert!(spanned.validate().is_ok());
        assert!(SyncConfig::from_toml_str(
            "buffer_capacity = 4\nbuffering_delay = 0.5\nsend_rate = 20.0"
        )
        .is_err());
    }

    #[test]
    fn test_zero_delay_only_with_linear() {
        let spline = SyncConfig {
            buffering_delay: 0.0,
            ..SyncConfig::default()
        };
        assert!(invalid(&spline));

        let linear = SyncConfig {
            interpolation: InterpolationMode::Linear,
            ..spline
        };
        assert!(linear.validate().is_ok());
    }

    #[test]
    fn test_zero_correction_time_is_allowed() {
        let config = SyncConfig {
            error_correction_time: 0.0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_negative_thresholds() {
        let config = SyncConfig {
            snap_threshold: Some(-1.0),
            ..SyncConfig::default()
        };
        assert!(invalid(&config));
        let config = SyncConfig {
            update_threshold: -0.5,
            ..SyncConfig::default()
        };
        assert!(invalid(&config));
    }

    #[test]
    fn test_inverted_range_only_matters_when_quantized() {
        let mut config = SyncConfig::default();
        config.wire.position_range = QuantizeRange::uniform(5.0, -5.0);
        assert!(config.validate().is_ok());

        config.wire.compression = CompressionMode::Quantized;
        assert!(invalid(&config));
    }

    #[test]
    fn test_validate_for_shape() {
        let mut config = SyncConfig::default();
        config.wire.axes = AxisMask::ROTATION;
        assert!(config.validate_for::<Quaternion>().is_ok());
        assert!(config.validate_for::<Vec3>().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = SyncConfig::from_toml_str(
            r#"
            interpolation = "linear"
            buffer_capacity = 8
            buffering_delay = 0.2
            snap_threshold = 4.0

            [extrapolation]
            enabled = false

            [wire]
            axes = ["position_x", "position_z", "derive_velocity"]
            compression = "quantized"
            "#,
        )
        .unwrap();

        assert_eq!(config.interpolation, InterpolationMode::Linear);
        assert_eq!(config.buffer_capacity, 8);
        assert_eq!(config.snap_threshold, Some(4.0));
        assert!(!config.extrapolation.enabled);
        assert_eq!(config.extrapolation.max_time, Some(0.5));
        assert!(config.wire.axes.contains(AxisMask::POSITION_Z));
        assert!(!config.wire.axes.contains(AxisMask::POSITION_Y));
        assert!(config.wire.axes.derives_velocity());
        assert_eq!(config.wire.compression, CompressionMode::Quantized);
        // Untouched keys keep defaults
        assert_eq!(config.send_rate, 20.0);
    }

    #[test]
    fn test_from_toml_errors() {
        assert!(matches!(
            SyncConfig::from_toml_str("buffer_capacity = \"many\""),
            Err(SyncError::ConfigParse(_))
        ));
        assert!(matches!(
            SyncConfig::from_toml_str("buffer_capacity = 2"),
            Err(SyncError::InvalidConfig(_))
        ));
    }
}
