//! # Synchronization Scenario Tests
//!
//! Drives owner and proxy synchronizers end to end through encoded payloads
//! on a manual clock.

use std::sync::Arc;

use parking_lot::Mutex;

use glide_sync::protocol::{precision, AxisMask, QuantizeRange};
use glide_sync::simulation::{run_scenario, NetworkConditions, ScenarioConfig};
use glide_sync::{
    Authority, CompositeBody, CompressionMode, ExtrapolationConfig, InterpolationMode, ManualClock,
    PayloadReader, PayloadWriter, PositionBody, Quaternion, RotationBody, SyncConfig, SyncContext,
    SynchronizedBody, Synchronizer, TraceEvent, Transform, Vec3, WireValue,
};

fn xy(x: f32, y: f32) -> Vec3 {
    Vec3::new(x, y, 0.0)
}

fn unlimited_extrapolation() -> ExtrapolationConfig {
    ExtrapolationConfig {
        enabled: true,
        max_time: None,
        max_distance: None,
    }
}

fn proxy_with<B: SynchronizedBody>(
    body: B,
    config: SyncConfig,
) -> (Synchronizer<B>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0.0));
    let sync = Synchronizer::new(body, config, SyncContext::new(clock.clone()), Authority::Proxy)
        .expect("valid config");
    (sync, clock)
}

fn deliver<B: SynchronizedBody>(
    sync: &mut Synchronizer<B>,
    time: f64,
    value: B::Value,
) -> Option<usize> {
    let mut writer = PayloadWriter::new();
    value
        .write_payload(None, &mut writer, &sync.config().wire)
        .expect("payload fits");
    sync.receive_current_state(time, &mut PayloadReader::new(writer.as_slice()))
        .expect("payload complete")
}

/// Test: Four evenly spaced samples, playback at 1.5, in both modes.
#[test]
fn test_playback_between_evenly_spaced_samples() {
    for mode in [InterpolationMode::Linear, InterpolationMode::CatmullRom] {
        let config = SyncConfig {
            interpolation: mode,
            buffer_capacity: 4,
            buffering_delay: 1.5,
            send_rate: 1.0,
            ..SyncConfig::default()
        };
        let (mut proxy, _clock) = proxy_with(PositionBody::default(), config);
        for i in 0..4u8 {
            deliver(&mut proxy, f64::from(i), xy(f32::from(i), 0.0));
        }

        let shown = proxy.update().expect("buffer has samples");
        assert!((shown.x - 1.5).abs() < 1e-5, "{mode:?}: {shown:?}");
        assert_eq!(shown.y, 0.0);
    }
}

/// Test: A jump larger than the snap threshold is shown immediately.
#[test]
fn test_teleport_snaps() {
    let config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.5,
        snap_threshold: Some(10.0),
        ..SyncConfig::default()
    };
    let (mut proxy, clock) = proxy_with(PositionBody::default(), config);
    deliver(&mut proxy, 0.0, xy(0.0, 0.0));
    deliver(&mut proxy, 1.0, xy(20.0, 0.0));

    for _ in 0..5 {
        assert_eq!(proxy.update(), Some(xy(20.0, 0.0)));
        clock.advance(0.05);
    }
}

/// Test: Quantized position survives the wire within one quantization step.
#[test]
fn test_quantized_owner_to_proxy() {
    let mut config = SyncConfig::lan();
    config.wire.compression = CompressionMode::Quantized;
    config.wire.position_range = QuantizeRange::uniform(-10.0, 10.0);

    let clock = Arc::new(ManualClock::new(0.0));
    let context = SyncContext::new(clock.clone());
    let sent = Vec3::new(0.0, 3.3, -7.1);
    let owner_body = PositionBody::new(sent);
    let mut owner = Synchronizer::new(owner_body, config, context.clone(), Authority::Owner)
        .expect("valid config");
    let mut proxy = Synchronizer::new(PositionBody::default(), config, context, Authority::Proxy)
        .expect("valid config");

    let mut writer = PayloadWriter::new();
    let timestamp = owner.get_current_state(&mut writer).expect("payload fits");
    assert_eq!(writer.len(), 6);

    let index = proxy
        .receive_current_state(timestamp, &mut PayloadReader::new(writer.as_slice()))
        .expect("payload complete");
    assert_eq!(index, Some(0));

    let shown = proxy.update().expect("sample buffered");
    let bound = 2.0 * precision(-10.0, 10.0);
    for (a, b) in shown.to_array().into_iter().zip(sent.to_array()) {
        assert!((a - b).abs() <= bound, "{a} vs {b}");
    }
}

/// Test: Axes left off the wire keep the receiver's own value.
#[test]
fn test_axis_mask_keeps_unsent_components() {
    let mut config = SyncConfig::default();
    config.wire.axes = AxisMask::POSITION_X | AxisMask::POSITION_Z | AxisMask::DERIVE_VELOCITY;

    let (mut proxy, _clock) = proxy_with(PositionBody::new(Vec3::new(0.0, 9.0, 0.0)), config);
    deliver(&mut proxy, 1.0, Vec3::new(1.0, 5.0, 2.0));

    assert_eq!(proxy.update(), Some(Vec3::new(1.0, 9.0, 2.0)));
}

/// Test: Late packets are slotted into place; stale and duplicate ones dropped.
#[test]
fn test_reordered_delivery() {
    let config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.1,
        ..SyncConfig::default()
    };
    let (mut proxy, _clock) = proxy_with(PositionBody::default(), config);

    assert_eq!(deliver(&mut proxy, 0.0, xy(0.0, 0.0)), Some(0));
    assert_eq!(deliver(&mut proxy, 0.2, xy(2.0, 0.0)), Some(0));
    assert_eq!(deliver(&mut proxy, 0.1, xy(1.0, 0.0)), Some(1));
    assert_eq!(deliver(&mut proxy, 0.1, xy(1.0, 0.0)), None);
    assert_eq!(deliver(&mut proxy, 0.3, xy(3.0, 0.0)), Some(0));

    let times: Vec<f64> = proxy.buffer().iter().map(|s| s.time).collect();
    assert_eq!(times, vec![0.3, 0.2, 0.1, 0.0]);

    let shown = proxy.update().expect("samples buffered");
    assert!((shown.x - 2.0).abs() < 1e-4);
}

/// Test: A transmitted angular velocity drives dead reckoning from one sample.
#[test]
fn test_rotation_extrapolates_with_transmitted_rate() {
    let mut config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.1,
        extrapolation: unlimited_extrapolation(),
        ..SyncConfig::default()
    };
    config.wire.axes = AxisMask::ROTATION | AxisMask::ANGULAR_VELOCITY;

    let clock = Arc::new(ManualClock::new(0.0));
    let context = SyncContext::new(clock.clone());
    let mut owner_body = RotationBody::new(Quaternion::IDENTITY);
    owner_body.angular_velocity = Some(Vec3::new(0.0, 0.0, 1.0));
    let mut owner = Synchronizer::new(owner_body, config, context.clone(), Authority::Owner)
        .expect("valid config");
    let mut proxy = Synchronizer::new(RotationBody::default(), config, context, Authority::Proxy)
        .expect("valid config");

    let mut writer = PayloadWriter::new();
    let timestamp = owner.get_current_state(&mut writer).expect("payload fits");
    proxy
        .receive_current_state(timestamp, &mut PayloadReader::new(writer.as_slice()))
        .expect("payload complete");

    clock.set(0.3);
    let shown = proxy.update().expect("sample buffered");
    assert!(proxy.is_extrapolating());

    let expected = Quaternion::from_axis_angle(Vec3::Z, 0.2);
    assert!(shown.angle_between(expected) < 1e-3, "{shown:?}");
    assert_eq!(proxy.body().stats.extrapolations_started, 1);
}

/// Test: Position and rotation blend together; scale stays local.
#[test]
fn test_composite_body_interpolates_both_parts() {
    let config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.5,
        ..SyncConfig::default()
    };
    let (mut proxy, _clock) = proxy_with(CompositeBody::default(), config);

    deliver(
        &mut proxy,
        0.0,
        Transform::new(Vec3::ZERO, Quaternion::IDENTITY, 1.0),
    );
    deliver(
        &mut proxy,
        1.0,
        Transform::new(Vec3::new(4.0, 0.0, 0.0), Quaternion::from_axis_angle(Vec3::Z, 1.0), 1.0),
    );

    let shown = proxy.update().expect("samples buffered");
    assert!(shown.position.distance(Vec3::new(2.0, 0.0, 0.0)) < 1e-4);
    assert!(shown.rotation.angle_between(Quaternion::from_axis_angle(Vec3::Z, 0.5)) < 1e-3);
    assert_eq!(shown.scale, 1.0);
    assert_eq!(proxy.body().stats.interpolated, 1);
}

/// Test: The trace hook sees the extrapolation round trip.
#[test]
fn test_trace_hook_reports_extrapolation_round_trip() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let clock = Arc::new(ManualClock::new(0.0));
    let context = SyncContext::new(clock.clone())
        .with_trace(Arc::new(move |event: &TraceEvent| sink.lock().push(*event)));

    let config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.1,
        extrapolation: unlimited_extrapolation(),
        ..SyncConfig::default()
    };
    let mut proxy = Synchronizer::new(PositionBody::default(), config, context, Authority::Proxy)
        .expect("valid config");

    deliver(&mut proxy, 0.0, xy(0.0, 0.0));
    clock.set(0.1);
    deliver(&mut proxy, 0.1, xy(1.0, 0.0));
    proxy.update();
    clock.set(0.3);
    proxy.update();
    deliver(&mut proxy, 0.2, xy(2.0, 0.0));
    proxy.update();

    let seen = events.lock();
    assert!(matches!(seen[0], TraceEvent::Interpolated { .. }));
    assert!(seen
        .iter()
        .any(|e| matches!(
            e,
            TraceEvent::ExtrapolationStarted { reference_time } if *reference_time == 0.1
        )));
    assert!(seen
        .iter()
        .any(|e| matches!(e, TraceEvent::ExtrapolationEnded { .. })));
}

/// Test: Resetting mid-extrapolation keeps the body where it is.
#[test]
fn test_reset_during_extrapolation() {
    let config = SyncConfig {
        interpolation: InterpolationMode::Linear,
        buffering_delay: 0.1,
        extrapolation: unlimited_extrapolation(),
        ..SyncConfig::default()
    };
    let (mut proxy, clock) = proxy_with(PositionBody::default(), config);
    deliver(&mut proxy, 0.0, xy(0.0, 0.0));
    clock.set(0.1);
    deliver(&mut proxy, 0.1, xy(1.0, 0.0));
    clock.set(0.4);
    let shown = proxy.update().expect("samples buffered");
    assert!(proxy.is_extrapolating());

    proxy.reset();
    assert!(!proxy.is_extrapolating());
    assert_eq!(proxy.residual(), Vec3::ZERO);
    clock.advance(0.016);
    assert_eq!(proxy.update(), Some(shown));
}

/// Test: Settings loaded from TOML drive a working synchronizer.
#[test]
fn test_toml_config_end_to_end() {
    let config = SyncConfig::from_toml_str(
        r#"
        interpolation = "linear"
        buffer_capacity = 6
        buffering_delay = 0.25
        send_rate = 10.0

        [wire]
        axes = ["position_x", "position_y", "position_z", "derive_velocity"]
        "#,
    )
    .expect("valid toml");

    let (mut proxy, _clock) = proxy_with(PositionBody::default(), config);
    deliver(&mut proxy, 1.0, xy(0.0, 0.0));
    deliver(&mut proxy, 1.5, xy(1.0, 0.0));
    let shown = proxy.update().expect("samples buffered");
    assert!((shown.x - 0.5).abs() < 1e-5);
}

/// Test: A poor link still yields bounded, reproducible tracking error.
#[test]
fn test_poor_network_simulation() {
    let scenario = ScenarioConfig {
        network: NetworkConditions::POOR,
        ..ScenarioConfig::default()
    };
    let first = run_scenario(SyncConfig::internet(), &scenario).expect("valid preset");
    let second = run_scenario(SyncConfig::internet(), &scenario).expect("valid preset");

    assert_eq!(first, second);
    assert!(first.link.dropped > 0);
    assert!(first.mean_error.is_finite());
    assert!(first.mean_error < 1.0, "{first}");
}
