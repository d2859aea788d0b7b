//! # Snapshot History
//!
//! Received authoritative samples, kept newest-first for playback.
//!
//! ## Snapshot Interpolation
//!
//! The receiver keeps a short history of samples and plays back slightly in
//! the past, so there is (almost) always a pair of samples on either side of
//! the playback time.
//!
//! ```text
//! Sender times:     [1] [2] [3] [4] [5] [6]
//!                    │   │   │   │   │   │
//! Network Delay:     ~~~~~~~~~~~~~~~~~~~~~
//!                              │   │
//! Buffer:            index 0 = [4], index 1 = [3]  (5, 6 in flight)
//!                              │
//! Playback:                    ▼  newest - buffering delay
//!                     Interpolate between 3 and 4
//! ```

mod playback;

pub use playback::{playback_target, Bracket, Playback, PlaybackSelector};

use crate::value::SyncValue;

/// Smallest capacity that still leaves room for a four-point spline.
pub const MIN_CAPACITY: usize = 4;

/// One timestamped authoritative sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot<T: SyncValue> {
    /// Sender clock time in seconds.
    pub time: f64,
    /// Sampled value.
    pub value: T,
    /// Rate of change, when it travelled on the wire.
    pub rate: Option<T::Rate>,
}

impl<T: SyncValue> Snapshot<T> {
    /// Creates a snapshot without a transmitted rate.
    #[must_use]
    pub const fn new(time: f64, value: T) -> Self {
        Self { time, value, rate: None }
    }

    /// Creates a snapshot carrying a transmitted rate.
    #[must_use]
    pub const fn with_rate(time: f64, value: T, rate: T::Rate) -> Self {
        Self { time, value, rate: Some(rate) }
    }
}

/// Fixed-capacity history ordered newest-first.
///
/// Invariant: `time` strictly decreases from index 0 to `len() - 1`.
#[derive(Clone, Debug)]
pub struct StateBuffer<T: SyncValue> {
    /// Samples, index 0 is the newest.
    states: Vec<Snapshot<T>>,
    /// Maximum number of samples retained.
    capacity: usize,
}

impl<T: SyncValue> StateBuffer<T> {
    /// Creates an empty buffer.
    ///
    /// Capacities below [`MIN_CAPACITY`] are raised to it.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            states: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Inserts a snapshot in time order.
    ///
    /// Returns the insertion index, or `None` if the snapshot was rejected:
    /// it is not newer than the oldest retained sample, or its timestamp is
    /// already present. When full, the oldest sample is evicted.
    pub fn add_state(&mut self, snapshot: Snapshot<T>) -> Option<usize> {
        if !snapshot.time.is_finite() {
            return None;
        }
        if let Some(oldest) = self.states.last() {
            if snapshot.time <= oldest.time {
                return None;
            }
        }

        // Buffer is small; a linear scan from the newest end is enough
        let mut index = self.states.len();
        for (i, existing) in self.states.iter().enumerate() {
            if snapshot.time == existing.time {
                return None;
            }
            if snapshot.time > existing.time {
                index = i;
                break;
            }
        }

        self.states.insert(index, snapshot);
        self.states.truncate(self.capacity);
        Some(index)
    }

    /// Discards history and seeds a single synthetic sample.
    ///
    /// Used after teleports and resynchronization so playback never blends
    /// through the old history.
    pub fn reset(&mut self, value: T, time: f64) {
        self.states.clear();
        self.states.push(Snapshot::new(time, value));
    }

    /// Discards all samples.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Sample at `index` (0 = newest).
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Snapshot<T>> {
        self.states.get(index)
    }

    /// Newest sample.
    #[inline]
    #[must_use]
    pub fn newest(&self) -> Option<&Snapshot<T>> {
        self.states.first()
    }

    /// Oldest retained sample.
    #[inline]
    #[must_use]
    pub fn oldest(&self) -> Option<&Snapshot<T>> {
        self.states.last()
    }

    /// Number of buffered samples.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True if nothing is buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Maximum number of samples retained.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot<T>> {
        self.states.iter()
    }

    /// Rate estimated from the sample at `index` and the next older one.
    #[must_use]
    pub fn derived_rate(&self, index: usize) -> Option<T::Rate> {
        let newer = self.states.get(index)?;
        let older = self.states.get(index + 1)?;
        #[allow(clippy::cast_possible_truncation)]
        let dt = (newer.time - older.time) as f32;
        Some(T::rate_between(older.value, newer.value, dt))
    }

    /// Rate at `index`: the transmitted one if present, else derived.
    #[must_use]
    pub fn rate_at(&self, index: usize) -> Option<T::Rate> {
        self.states
            .get(index)
            .and_then(|s| s.rate)
            .or_else(|| self.derived_rate(index))
    }
}
