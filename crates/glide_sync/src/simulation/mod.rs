//! # Link Simulation
//!
//! Runs an owner and a proxy synchronizer against each other across a
//! simulated lossy link, on a shared manual clock, and measures how far the
//! proxy's display strays from the truth.
//!
//! ## Features
//!
//! - Latency with jitter (which also reorders packets)
//! - Packet loss
//! - Packet duplication
//! - Seeded, so every run with the same seed is identical

use std::fmt;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use glide_shared::Vec3;

use crate::body::PositionBody;
use crate::config::SyncConfig;
use crate::context::{ManualClock, SyncContext};
use crate::error::SyncResult;
use crate::protocol::{PayloadReader, PayloadWriter};
use crate::synchronizer::{Authority, Synchronizer};

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// One-way base latency in milliseconds.
    pub base_latency_ms: u32,
    /// Jitter (+/-) in milliseconds.
    pub jitter_ms: u32,
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: u8,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        base_latency_ms: 1,
        jitter_ms: 0,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Good network conditions (fiber).
    pub const GOOD: Self = Self {
        base_latency_ms: 20,
        jitter_ms: 5,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        base_latency_ms: 50,
        jitter_ms: 20,
        packet_loss_percent: 1,
        duplicate_percent: 1,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        base_latency_ms: 100,
        jitter_ms: 50,
        packet_loss_percent: 5,
        duplicate_percent: 2,
    };

    /// Looks up a preset by name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "perfect" => Some(Self::PERFECT),
            "good" => Some(Self::GOOD),
            "average" => Some(Self::AVERAGE),
            "poor" => Some(Self::POOR),
            _ => None,
        }
    }

    /// Draws a one-way delay in seconds.
    fn sample_latency(&self, rng: &mut ChaCha8Rng) -> f64 {
        let jitter = if self.jitter_ms > 0 {
            let spread = i64::from(self.jitter_ms);
            rng.gen_range(-spread..=spread)
        } else {
            0
        };
        let latency_ms = (i64::from(self.base_latency_ms) + jitter).max(0);
        #[allow(clippy::cast_precision_loss)]
        let latency = latency_ms as f64 / 1000.0;
        latency
    }

    fn roll(percent: u8, rng: &mut ChaCha8Rng) -> bool {
        rng.gen_range(0u8..100) < percent
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// A packet that made it across.
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    /// Sender timestamp from the envelope.
    pub timestamp: f64,
    /// Encoded value.
    pub payload: Vec<u8>,
}

/// Link counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Packets handed to the link.
    pub sent: u64,
    /// Packets lost.
    pub dropped: u64,
    /// Extra copies created.
    pub duplicated: u64,
    /// Packets handed to the receiver.
    pub delivered: u64,
}

#[derive(Clone, Debug)]
struct InFlight {
    deliver_at: f64,
    packet: Packet,
}

/// One-directional unreliable link.
#[derive(Clone, Debug)]
pub struct LinkSimulator {
    conditions: NetworkConditions,
    rng: ChaCha8Rng,
    in_flight: Vec<InFlight>,
    stats: LinkStats,
}

impl LinkSimulator {
    /// Creates a link with deterministic randomness.
    #[must_use]
    pub fn new(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            conditions,
            rng: ChaCha8Rng::seed_from_u64(seed),
            in_flight: Vec::new(),
            stats: LinkStats::default(),
        }
    }

    /// Queues a packet sent at local time `now`.
    pub fn send(&mut self, now: f64, timestamp: f64, payload: &[u8]) {
        self.stats.sent += 1;
        if NetworkConditions::roll(self.conditions.packet_loss_percent, &mut self.rng) {
            self.stats.dropped += 1;
            return;
        }

        let copies = if NetworkConditions::roll(self.conditions.duplicate_percent, &mut self.rng) {
            self.stats.duplicated += 1;
            2
        } else {
            1
        };
        for _ in 0..copies {
            let deliver_at = now + self.conditions.sample_latency(&mut self.rng);
            self.in_flight.push(InFlight {
                deliver_at,
                packet: Packet {
                    timestamp,
                    payload: payload.to_vec(),
                },
            });
        }
    }

    /// Removes and returns every packet due by `now`, in arrival order.
    pub fn deliver(&mut self, now: f64) -> Vec<Packet> {
        let (mut ready, pending): (Vec<_>, Vec<_>) = self
            .in_flight
            .drain(..)
            .partition(|p| p.deliver_at <= now);
        self.in_flight = pending;

        ready.sort_by(|a, b| a.deliver_at.total_cmp(&b.deliver_at));
        self.stats.delivered += ready.len() as u64;
        ready.into_iter().map(|p| p.packet).collect()
    }

    /// Packets still travelling.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Counters so far.
    #[must_use]
    pub const fn stats(&self) -> LinkStats {
        self.stats
    }
}

/// Path the owner moves along.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionPath {
    /// Straight line along X.
    Line {
        /// Units per second.
        speed: f32,
    },
    /// Circle in the XZ plane around the origin.
    Circle {
        /// Circle radius.
        radius: f32,
        /// Radians per second.
        angular_speed: f32,
    },
}

impl MotionPath {
    /// Position at time `t`.
    #[must_use]
    pub fn position(&self, t: f64) -> Vec3 {
        #[allow(clippy::cast_possible_truncation)]
        let t = t as f32;
        match *self {
            Self::Line { speed } => Vec3::new(speed * t, 0.0, 0.0),
            Self::Circle {
                radius,
                angular_speed,
            } => {
                let (s, c) = (angular_speed * t).sin_cos();
                Vec3::new(radius * c, 0.0, radius * s)
            }
        }
    }

    /// Velocity at time `t`.
    #[must_use]
    pub fn velocity(&self, t: f64) -> Vec3 {
        #[allow(clippy::cast_possible_truncation)]
        let t = t as f32;
        match *self {
            Self::Line { speed } => Vec3::new(speed, 0.0, 0.0),
            Self::Circle {
                radius,
                angular_speed,
            } => {
                let (s, c) = (angular_speed * t).sin_cos();
                Vec3::new(-radius * angular_speed * s, 0.0, radius * angular_speed * c)
            }
        }
    }
}

/// One simulation run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenarioConfig {
    /// Simulated seconds.
    pub duration: f64,
    /// Proxy ticks per second.
    pub tick_rate: f64,
    /// Link quality.
    pub network: NetworkConditions,
    /// Owner movement.
    pub path: MotionPath,
    /// Random seed for the link.
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            duration: 10.0,
            tick_rate: 60.0,
            network: NetworkConditions::AVERAGE,
            path: MotionPath::Circle {
                radius: 10.0,
                angular_speed: 1.0,
            },
            seed: 0x5EED,
        }
    }
}

/// Outcome of [`run_scenario`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationReport {
    /// Ticks simulated.
    pub ticks: u64,
    /// Ticks where the proxy displayed something.
    pub displayed_ticks: u64,
    /// Link counters.
    pub link: LinkStats,
    /// Mean distance between display and truth at the playback time.
    pub mean_error: f32,
    /// Worst distance between display and truth.
    pub max_error: f32,
    /// Ticks spent dead reckoning.
    pub extrapolated_ticks: u64,
    /// Times dead reckoning started or re-anchored.
    pub extrapolations_started: u64,
    /// Ticks with an active error residual.
    pub corrected_ticks: u64,
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ticks:              {} ({} displayed)", self.ticks, self.displayed_ticks)?;
        writeln!(
            f,
            "Packets:            {} sent, {} dropped, {} duplicated, {} delivered",
            self.link.sent, self.link.dropped, self.link.duplicated, self.link.delivered
        )?;
        writeln!(f, "Mean error:         {:.4}", self.mean_error)?;
        writeln!(f, "Max error:          {:.4}", self.max_error)?;
        writeln!(
            f,
            "Extrapolation:      {} ticks, {} episodes",
            self.extrapolated_ticks, self.extrapolations_started
        )?;
        write!(f, "Error correction:   {} ticks", self.corrected_ticks)
    }
}

/// Runs an owner and a proxy across a simulated link.
///
/// The owner follows `scenario.path`; error is measured on the proxy against
/// the path at the proxy's playback time.
///
/// # Errors
///
/// Returns an error if `sync_config` is invalid.
pub fn run_scenario(
    sync_config: SyncConfig,
    scenario: &ScenarioConfig,
) -> SyncResult<SimulationReport> {
    let clock = Arc::new(ManualClock::new(0.0));
    let context = SyncContext::new(clock.clone());

    let mut owner = Synchronizer::new(
        PositionBody::new(scenario.path.position(0.0)),
        sync_config,
        context.clone(),
        Authority::Owner,
    )?;
    let mut proxy =
        Synchronizer::new(PositionBody::default(), sync_config, context, Authority::Proxy)?;
    let mut link = LinkSimulator::new(scenario.network, scenario.seed);
    let mut writer = PayloadWriter::new();

    let mut report = SimulationReport::default();
    let mut error_sum = 0.0f64;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ticks = (scenario.duration * scenario.tick_rate).ceil().max(0.0) as u64;

    for tick in 0..ticks {
        #[allow(clippy::cast_precision_loss)]
        let now = tick as f64 / scenario.tick_rate;
        clock.set(now);

        let body = owner.body_mut();
        body.position = scenario.path.position(now);
        body.velocity = Some(scenario.path.velocity(now));

        if owner.need_to_update() {
            let timestamp = owner.get_current_state(&mut writer)?;
            link.send(now, timestamp, writer.as_slice());
        }

        for packet in link.deliver(now) {
            let mut reader = PayloadReader::new(&packet.payload);
            proxy.receive_current_state(packet.timestamp, &mut reader)?;
        }

        report.ticks += 1;
        let (Some(shown), Some(playback)) = (proxy.update(), proxy.playback_time()) else {
            continue;
        };
        let error = shown.distance(scenario.path.position(playback));
        report.displayed_ticks += 1;
        report.max_error = report.max_error.max(error);
        error_sum += f64::from(error);
    }

    if report.displayed_ticks > 0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let mean = (error_sum / report.displayed_ticks as f64) as f32;
        report.mean_error = mean;
    }
    let stats = proxy.body().stats;
    report.link = link.stats();
    report.extrapolated_ticks = stats.extrapolated;
    report.extrapolations_started = stats.extrapolations_started;
    report.corrected_ticks = stats.corrected;

    tracing::debug!(
        ticks = report.ticks,
        mean_error = report.mean_error,
        max_error = report.max_error,
        "Scenario finished"
    );
    Ok(report)
}
