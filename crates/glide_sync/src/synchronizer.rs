//! # Synchronizer
//!
//! One synchronizer per replicated body. The owner side paces and encodes
//! snapshots; the proxy side buffers them and drives the body every tick.
//!
//! ## Tick Flow (proxy)
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ 1. DECAY      shrink the error residual by dt                │
//! │ 2. TARGET     playback time = sender clock estimate - delay  │
//! │ 3. SELECT     bracketing pair / insufficient / stale         │
//! │ 4. RESOLVE    interpolate │ extrapolate │ hold               │
//! │ 5. DISPLAY    authoritative ⊕ residual → body.apply          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The playback time follows the local clock between arrivals and never
//! moves backward, so playback can run past the newest sample and dead
//! reckoning takes over until data catches up.
//!
//! Arrival jitter moves the sender clock estimate around. Playback chases
//! the estimate at a bounded rate (the local clock ±10%) instead of jumping
//! to it; only a drift larger than [`PLAYBACK_RESYNC_DRIFT`], or one that
//! leaves playback behind the whole buffer, jumps, and the jump is folded
//! into the error residual.

use crate::body::{RateOf, SynchronizedBody};
use crate::config::SyncConfig;
use crate::context::{SyncContext, TraceEvent};
use crate::correction::ErrorCorrector;
use crate::error::SyncResult;
use crate::extrapolation::{ExtrapolationController, ExtrapolationState};
use crate::interpolation::InterpolationEngine;
use crate::protocol::{PayloadReader, PayloadWriter, WireValue};
use crate::snapshot::{Bracket, Playback, PlaybackSelector, Snapshot, StateBuffer};
use crate::value::SyncValue;

/// Fraction by which playback may run faster or slower than the local clock.
pub const PLAYBACK_RATE_TOLERANCE: f64 = 0.1;

/// Seconds of forward drift past which playback jumps to the estimate.
pub const PLAYBACK_RESYNC_DRIFT: f64 = 1.0;

/// Which side of the link controls the body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Authority {
    /// Simulates the body locally and sends snapshots.
    Owner,
    /// Receives snapshots and plays them back.
    #[default]
    Proxy,
}

/// Last snapshot handed to the transport.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SentState<T> {
    time: f64,
    value: T,
}

/// Drives one [`SynchronizedBody`] from network snapshots.
pub struct Synchronizer<B: SynchronizedBody> {
    body: B,
    config: SyncConfig,
    context: SyncContext,
    authority: Authority,

    buffer: StateBuffer<B::Value>,
    selector: PlaybackSelector,
    interpolation: InterpolationEngine,
    extrapolation: ExtrapolationController<B::Value>,
    corrector: ErrorCorrector<B::Value>,

    /// Local time the newest buffered sample arrived.
    newest_arrival: Option<f64>,
    /// Playback time of the previous tick.
    playback_time: Option<f64>,
    /// Local time of the previous tick.
    last_tick: Option<f64>,
    /// Value last written to the body by this synchronizer.
    displayed: Option<B::Value>,
    /// Newest decoded value, the base for axes missing from the wire.
    last_received: B::Value,
    last_received_rate: RateOf<B>,

    last_sent: Option<SentState<B::Value>>,
}

impl<B: SynchronizedBody> Synchronizer<B> {
    /// Creates a synchronizer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::InvalidConfig`] if `config` fails
    /// validation or its wire layout carries nothing of `B::Value`.
    pub fn new(
        body: B,
        config: SyncConfig,
        context: SyncContext,
        authority: Authority,
    ) -> SyncResult<Self> {
        config.validate_for::<B::Value>()?;

        let last_received = body.current_value();
        Ok(Self {
            body,
            buffer: StateBuffer::new(config.buffer_capacity),
            selector: PlaybackSelector::new(config.buffering_delay),
            interpolation: InterpolationEngine::new(config.interpolation, config.snap_threshold),
            extrapolation: ExtrapolationController::new(config.extrapolation),
            corrector: ErrorCorrector::new(config.error_correction_time),
            config,
            context,
            authority,
            newest_arrival: None,
            playback_time: None,
            last_tick: None,
            displayed: None,
            last_received,
            last_received_rate: Default::default(),
            last_sent: None,
        })
    }

    // =========================================================================
    // Send path
    // =========================================================================

    /// True when the owner should send: a send interval has passed and the
    /// body moved more than `update_threshold` since the last send (or
    /// nothing was ever sent). Proxies never send.
    #[must_use]
    pub fn need_to_update(&self) -> bool {
        if self.authority != Authority::Owner {
            return false;
        }
        let Some(sent) = self.last_sent else {
            return true;
        };
        let elapsed = self.context.now() - sent.time;
        if elapsed < self.config.send_interval() {
            return false;
        }
        let threshold = self.config.update_threshold;
        self.body.current_value().distance_squared(sent.value) > threshold * threshold
    }

    /// Encodes the body's current state into `writer` and returns the
    /// timestamp the transport must send with it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::PayloadOverflow`] if the payload does not
    /// fit.
    pub fn get_current_state(&mut self, writer: &mut PayloadWriter) -> SyncResult<f64> {
        writer.reset();
        let now = self.context.now();
        let value = self.body.current_value();
        let rate = if self.config.wire.axes.derives_velocity() {
            None
        } else {
            self.body.current_rate()
        };

        value.write_payload(rate, writer, &self.config.wire)?;
        self.last_sent = Some(SentState { time: now, value });
        Ok(now)
    }

    // =========================================================================
    // Receive path
    // =========================================================================

    /// Decodes and buffers a snapshot.
    ///
    /// Returns the buffer index it landed at, or `None` when it was dropped
    /// (out of order, duplicate, non-finite, or this side owns the body).
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::PayloadTruncated`] if the payload is short.
    pub fn receive_current_state(
        &mut self,
        timestamp: f64,
        reader: &mut PayloadReader<'_>,
    ) -> SyncResult<Option<usize>> {
        let (value, rate) = B::Value::read_payload(
            reader,
            &self.config.wire,
            self.last_received,
            self.last_received_rate,
        )?;

        if self.authority == Authority::Owner {
            tracing::trace!(timestamp, "Owner ignored incoming snapshot");
            return Ok(None);
        }
        let rate_ok = rate.map_or(true, <B::Value as SyncValue>::rate_is_finite);
        if !timestamp.is_finite() || !value.is_finite() || !rate_ok {
            tracing::trace!(timestamp, "Dropped non-finite snapshot");
            return Ok(None);
        }

        let index = self.buffer.add_state(Snapshot {
            time: timestamp,
            value,
            rate,
        });
        match index {
            None => tracing::trace!(timestamp, "Dropped out-of-order snapshot"),
            Some(0) => {
                self.newest_arrival = Some(self.context.now());
                self.last_received = value;
                if let Some(rate) = rate {
                    self.last_received_rate = rate;
                }
            }
            Some(_) => {}
        }
        Ok(index)
    }

    /// Applies a snapshot immediately, discarding history.
    ///
    /// Used for teleports and initial placement: the body jumps, buffered
    /// samples, extrapolation and residual are dropped, and playback
    /// restarts from this sample.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::PayloadTruncated`] if the payload is short.
    pub fn receive_sync(
        &mut self,
        timestamp: f64,
        reader: &mut PayloadReader<'_>,
    ) -> SyncResult<()> {
        let (value, rate) = B::Value::read_payload(
            reader,
            &self.config.wire,
            self.last_received,
            self.last_received_rate,
        )?;
        if !timestamp.is_finite() || !value.is_finite() {
            tracing::trace!(timestamp, "Dropped non-finite sync");
            return Ok(());
        }

        tracing::debug!(timestamp, "Hard sync");
        self.body.apply(value);
        self.buffer.reset(value, timestamp);
        self.extrapolation.clear();
        self.corrector.clear();
        self.newest_arrival = Some(self.context.now());
        self.playback_time = None;
        self.displayed = Some(value);
        self.last_received = value;
        if let Some(rate) = rate.filter(|&r| <B::Value as SyncValue>::rate_is_finite(r)) {
            self.last_received_rate = rate;
        }
        Ok(())
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances playback by the time elapsed since the previous call and
    /// writes the result to the body.
    ///
    /// Returns the displayed value, or `None` if there was nothing to show
    /// (owner side, or no snapshot received yet).
    pub fn update(&mut self) -> Option<B::Value> {
        let now = self.context.now();
        let dt = self.last_tick.map_or(0.0, |last| (now - last).max(0.0));
        self.last_tick = Some(now);

        if self.authority == Authority::Owner {
            return None;
        }

        self.corrector.decay(dt);

        let Some((target, jumped)) = self.advance_playback(now, dt) else {
            self.context.trace(&TraceEvent::Held);
            return None;
        };

        let authoritative = match PlaybackSelector::select(&self.buffer, target) {
            Playback::Bracketed(bracket) => self.play_bracket(&bracket, target),
            Playback::InsufficientHistory => self.play_ahead(target, now, dt),
            Playback::Stale { oldest_index } => self.play_stale(oldest_index, target),
        }?;

        if jumped {
            if let Some(previous) = self.displayed {
                self.corrector.capture(previous, authoritative);
            }
        }

        let displayed = self.corrector.apply(authoritative);
        if self.corrector.is_correcting() {
            self.body.on_error_correction(&self.corrector.residual());
        }
        self.body.apply(displayed);
        self.displayed = Some(displayed);
        Some(displayed)
    }

    /// Estimates the sender clock and derives a non-decreasing playback time.
    ///
    /// Returns the target and whether it jumped instead of converging.
    fn advance_playback(&mut self, now: f64, dt: f64) -> Option<(f64, bool)> {
        let baseline = self.selector.target(&self.buffer)?;
        let since_arrival = self.newest_arrival.map_or(0.0, |arrival| (now - arrival).max(0.0));
        let estimate = baseline + since_arrival;

        let Some(previous) = self.playback_time else {
            self.playback_time = Some(estimate);
            return Some((estimate, false));
        };

        let slowest = previous + dt * (1.0 - PLAYBACK_RATE_TOLERANCE);
        let fastest = previous + dt * (1.0 + PLAYBACK_RATE_TOLERANCE);
        let behind_buffer = self.buffer.oldest().is_some_and(|s| fastest < s.time);

        let (target, jumped) = if estimate > fastest
            && (estimate - fastest > PLAYBACK_RESYNC_DRIFT || behind_buffer)
        {
            tracing::debug!(from = previous, to = estimate, "Playback resynchronized");
            (estimate, true)
        } else {
            (estimate.clamp(slowest, fastest), false)
        };
        self.playback_time = Some(target);
        Some((target, jumped))
    }

    /// Display the active projection would give at `target`, residual included.
    fn projected_display(&mut self, target: f64) -> Option<B::Value> {
        let acceleration = self.body.acceleration();
        let projected = self.extrapolation.extrapolate(target, acceleration)?;
        Some(self.corrector.apply(projected.value))
    }

    fn play_bracket(&mut self, bracket: &Bracket<B::Value>, target: f64) -> Option<B::Value> {
        let result = self.interpolation.interpolate(bracket);

        let projected = self.projected_display(target);
        if self.extrapolation.end().is_some() {
            if let Some(projected) = projected {
                self.corrector.capture(projected, result.value);
            }
            self.body.on_end_extrapolation(&result.value);
            self.context
                .trace(&TraceEvent::ExtrapolationEnded { target_time: target });
        }

        if result.snapped {
            self.corrector.clear();
            self.context.trace(&TraceEvent::Snapped {
                time: bracket.rhs.time,
            });
        } else {
            self.context.trace(&TraceEvent::Interpolated {
                lhs_time: bracket.lhs.time,
                rhs_time: bracket.rhs.time,
                t: bracket.t,
            });
        }

        self.body
            .on_interpolation(&bracket.lhs, &bracket.rhs, bracket.lhs_index, bracket.t);
        Some(result.value)
    }

    fn play_ahead(&mut self, target: f64, now: f64, dt: f64) -> Option<B::Value> {
        let mut reanchored_from = None;
        if self.extrapolation.needs_anchor(&self.buffer) {
            let previous = self.projected_display(target);
            if let Some(state) = self.extrapolation.begin(&self.buffer, now) {
                self.body.on_begin_extrapolation(&state, dt);
                if previous.is_some() {
                    reanchored_from = previous;
                } else {
                    self.context.trace(&TraceEvent::ExtrapolationStarted {
                        reference_time: state.reference.time,
                    });
                }
            }
        }

        let acceleration = self.body.acceleration();
        if let Some(extrapolated) = self.extrapolation.extrapolate(target, acceleration) {
            if let Some(previous) = reanchored_from {
                self.corrector.capture(previous, extrapolated.value);
            }
            self.body.on_extrapolation(&extrapolated.value);
            return Some(extrapolated.value);
        }

        tracing::trace!(target, "No rate to extrapolate with, holding newest");
        self.context.trace(&TraceEvent::Held);
        self.buffer.newest().map(|s| s.value)
    }

    fn play_stale(&mut self, oldest_index: usize, target: f64) -> Option<B::Value> {
        let oldest = *self.buffer.get(oldest_index)?;
        let projected = self.projected_display(target);
        if self.extrapolation.end().is_some() {
            if let Some(projected) = projected {
                self.corrector.capture(projected, oldest.value);
            }
            self.body.on_end_extrapolation(&oldest.value);
        }
        tracing::trace!(oldest_time = oldest.time, "Playback behind buffer, holding oldest");
        self.context.trace(&TraceEvent::Stale {
            oldest_time: oldest.time,
        });
        Some(oldest.value)
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Restarts playback from what is currently displayed.
    ///
    /// The buffer is seeded with the displayed value at the current playback
    /// time, so the body does not jump; extrapolation and residual are
    /// dropped.
    pub fn reset(&mut self) {
        let value = self.displayed.unwrap_or_else(|| self.body.current_value());
        let time = self
            .playback_time
            .or_else(|| self.buffer.newest().map(|s| s.time))
            .unwrap_or(0.0);

        tracing::debug!(time, "Synchronizer reset");
        self.buffer.reset(value, time);
        self.extrapolation.clear();
        self.corrector.clear();
        // Seeded so the clock estimate continues from the seed, not behind it
        self.newest_arrival = Some(self.context.now() - self.config.buffering_delay);
        self.playback_time = Some(time);
    }

    /// Switches sides. Any change discards all synchronization state.
    pub fn set_authority(&mut self, authority: Authority) {
        if authority == self.authority {
            return;
        }
        tracing::info!(from = ?self.authority, to = ?authority, "Authority changed");
        self.authority = authority;
        self.buffer.clear();
        self.extrapolation.clear();
        self.corrector.clear();
        self.newest_arrival = None;
        self.playback_time = None;
        self.displayed = None;
        self.last_received = self.body.current_value();
        self.last_sent = None;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The driven body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// The driven body, mutably (owners move it here).
    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// Consumes the synchronizer, returning the body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Current side.
    #[must_use]
    pub const fn authority(&self) -> Authority {
        self.authority
    }

    /// Buffered snapshots.
    #[must_use]
    pub const fn buffer(&self) -> &StateBuffer<B::Value> {
        &self.buffer
    }

    /// Playback time of the last tick, in sender seconds.
    #[must_use]
    pub const fn playback_time(&self) -> Option<f64> {
        self.playback_time
    }

    /// True while dead reckoning.
    #[must_use]
    pub const fn is_extrapolating(&self) -> bool {
        self.extrapolation.is_active()
    }

    /// Dead-reckoning state, if any.
    #[must_use]
    pub const fn extrapolation_state(&self) -> Option<&ExtrapolationState<B::Value>> {
        self.extrapolation.state()
    }

    /// Residual still being blended away.
    #[must_use]
    pub const fn residual(&self) -> B::Value {
        self.corrector.residual()
    }

    /// Value last written to the body.
    #[must_use]
    pub const fn displayed(&self) -> Option<B::Value> {
        self.displayed
    }

    /// Local time of the last send.
    #[must_use]
    pub fn last_sent_time(&self) -> Option<f64> {
        self.last_sent.map(|s| s.time)
    }
}

impl<B: SynchronizedBody + std::fmt::Debug> std::fmt::Debug for Synchronizer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("body", &self.body)
            .field("authority", &self.authority)
            .field("buffered", &self.buffer.len())
            .field("playback_time", &self.playback_time)
            .field("extrapolating", &self.extrapolation.is_active())
            .finish_non_exhaustive()
    }
}
