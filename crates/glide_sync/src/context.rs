//! # Synchronization Context
//!
//! Services shared by every synchronizer in a process, passed in at
//! construction: the local clock and an optional trace hook.
//!
//! Tests and the link simulator use a [`ManualClock`] so playback is
//! deterministic; games use [`SystemClock`].

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Local time source, in seconds.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> f64;
}

/// Monotonic wall clock starting at zero.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Starts the clock now.
    #[must_use]
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Jumps to `time`.
    pub fn set(&self, time: f64) {
        *self.now.lock() = time;
    }

    /// Moves forward by `dt` seconds.
    pub fn advance(&self, dt: f64) {
        *self.now.lock() += dt;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// What the synchronizer did on a tick, reported to the trace hook.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceEvent {
    /// Blended between two buffered samples.
    Interpolated {
        /// Sender time of the older sample.
        lhs_time: f64,
        /// Sender time of the newer sample.
        rhs_time: f64,
        /// Blend factor.
        t: f32,
    },
    /// Jumped straight to the newer sample.
    Snapped {
        /// Sender time of the sample jumped to.
        time: f64,
    },
    /// Started dead reckoning.
    ExtrapolationStarted {
        /// Sender time of the reference sample.
        reference_time: f64,
    },
    /// Resumed interpolation after dead reckoning.
    ExtrapolationEnded {
        /// Playback time at which a bracketing pair reappeared.
        target_time: f64,
    },
    /// Nothing to play; the body keeps its value.
    Held,
    /// Playback fell behind the whole buffer.
    Stale {
        /// Sender time of the oldest sample, which is held.
        oldest_time: f64,
    },
}

/// Callback receiving [`TraceEvent`]s.
pub type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

/// Shared services for synchronizers.
#[derive(Clone)]
pub struct SyncContext {
    clock: Arc<dyn Clock>,
    trace: Option<TraceHook>,
}

impl SyncContext {
    /// Creates a context around `clock`, without tracing.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, trace: None }
    }

    /// Adds a trace hook.
    #[must_use]
    pub fn with_trace(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    /// Current local time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Reports an event to the hook, if any.
    #[inline]
    pub fn trace(&self, event: &TraceEvent) {
        if let Some(hook) = &self.trace {
            hook(event);
        }
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock::new()))
    }
}

impl fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncContext")
            .field("now", &self.now())
            .field("trace", &self.trace.is_some())
            .finish()
    }
}
