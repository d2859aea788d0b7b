//! Playback-time resolution against the state buffer.

use super::{Snapshot, StateBuffer};
use crate::value::SyncValue;

/// Baseline playback time: the newest sample's time minus the buffering delay.
#[inline]
#[must_use]
pub fn playback_target(newest_time: f64, buffering_delay: f64) -> f64 {
    newest_time - buffering_delay
}

/// Pair of samples surrounding the playback time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bracket<T: SyncValue> {
    /// Older sample of the pair.
    pub lhs: Snapshot<T>,
    /// Newer sample of the pair.
    pub rhs: Snapshot<T>,
    /// Buffer index of `lhs` (`rhs` sits at `lhs_index - 1`).
    pub lhs_index: usize,
    /// Blend factor in `[0, 1]`.
    pub t: f32,
    /// Sample just older than `lhs`, if buffered.
    pub older: Option<Snapshot<T>>,
    /// Sample just newer than `rhs`, if buffered.
    pub newer: Option<Snapshot<T>>,
}

impl<T: SyncValue> Bracket<T> {
    /// Sender time the bracket was resolved at.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.lhs.time + f64::from(self.t) * (self.rhs.time - self.lhs.time)
    }
}

/// Outcome of resolving a playback time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Playback<T: SyncValue> {
    /// Two samples surround the target.
    Bracketed(Bracket<T>),
    /// Target is newer than every sample, or fewer than two are buffered.
    InsufficientHistory,
    /// Target is older than every sample; hold the oldest.
    Stale {
        /// Index of the oldest sample.
        oldest_index: usize,
    },
}

/// Resolves playback times with a fixed buffering delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackSelector {
    buffering_delay: f64,
}

impl PlaybackSelector {
    /// Creates a selector that plays back `buffering_delay` seconds behind
    /// the newest sample.
    #[must_use]
    pub const fn new(buffering_delay: f64) -> Self {
        Self { buffering_delay }
    }

    /// Configured delay in seconds.
    #[must_use]
    pub const fn buffering_delay(&self) -> f64 {
        self.buffering_delay
    }

    /// Baseline target for `buffer`, or `None` when it is empty.
    #[must_use]
    pub fn target<T: SyncValue>(&self, buffer: &StateBuffer<T>) -> Option<f64> {
        buffer
            .newest()
            .map(|s| playback_target(s.time, self.buffering_delay))
    }

    /// Finds the first pair (newest-first) with `lhs.time <= target <= rhs.time`.
    #[must_use]
    pub fn select<T: SyncValue>(buffer: &StateBuffer<T>, target: f64) -> Playback<T> {
        if buffer.len() < 2 {
            return Playback::InsufficientHistory;
        }
        let (Some(newest), Some(oldest)) = (buffer.newest(), buffer.oldest()) else {
            return Playback::InsufficientHistory;
        };
        if target > newest.time || target.is_nan() {
            return Playback::InsufficientHistory;
        }
        if target < oldest.time {
            return Playback::Stale {
                oldest_index: buffer.len() - 1,
            };
        }

        for rhs_index in 0..buffer.len() - 1 {
            let lhs_index = rhs_index + 1;
            let (Some(rhs), Some(lhs)) = (buffer.get(rhs_index), buffer.get(lhs_index)) else {
                break;
            };
            if lhs.time <= target && target <= rhs.time {
                let span = rhs.time - lhs.time;
                #[allow(clippy::cast_possible_truncation)]
                let t = if span > 0.0 {
                    ((target - lhs.time) / span).clamp(0.0, 1.0) as f32
                } else {
                    0.0
                };
                return Playback::Bracketed(Bracket {
                    lhs: *lhs,
                    rhs: *rhs,
                    lhs_index,
                    t,
                    older: buffer.get(lhs_index + 1).copied(),
                    newer: rhs_index.checked_sub(1).and_then(|i| buffer.get(i)).copied(),
                });
            }
        }

        // Unreachable while the buffer keeps its order; hold the newest
        Playback::InsufficientHistory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glide_shared::Vec3;

    fn buffer(times: &[f64]) -> StateBuffer<Vec3> {
        let mut buffer = StateBuffer::new(8);
        for &t in times {
            #[allow(clippy::cast_possible_truncation)]
            buffer.add_state(Snapshot::new(t, Vec3::new(t as f32, 0.0, 0.0)));
        }
        buffer
    }

    fn bracket(playback: Playback<Vec3>) -> Bracket<Vec3> {
        match playback {
            Playback::Bracketed(b) => b,
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_bracket_with_flanks() {
        let buffer = buffer(&[0.0, 1.0, 2.0, 3.0]);
        let b = bracket(PlaybackSelector::select(&buffer, 1.5));
        assert_eq!(b.lhs.time, 1.0);
        assert_eq!(b.rhs.time, 2.0);
        assert_eq!(b.lhs_index, 2);
        assert!((b.t - 0.5).abs() < 1e-6);
        assert_eq!(b.older.map(|s| s.time), Some(0.0));
        assert_eq!(b.newer.map(|s| s.time), Some(3.0));
        assert!((b.time() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_bracket_at_edges_has_no_flanks() {
        let buffer = buffer(&[0.0, 1.0]);
        let b = bracket(PlaybackSelector::select(&buffer, 0.25));
        assert!(b.older.is_none());
        assert!(b.newer.is_none());
    }

    #[test]
    fn test_exact_newest_time_brackets_at_one() {
        let buffer = buffer(&[0.0, 1.0, 2.0]);
        let b = bracket(PlaybackSelector::select(&buffer, 2.0));
        assert_eq!(b.rhs.time, 2.0);
        assert_eq!(b.t, 1.0);
    }

    #[test]
    fn test_target_newer_than_all() {
        let buffer = buffer(&[0.0, 1.0]);
        assert_eq!(
            PlaybackSelector::select(&buffer, 1.01),
            Playback::InsufficientHistory
        );
    }

    #[test]
    fn test_single_sample_is_insufficient() {
        let buffer = buffer(&[1.0]);
        assert_eq!(
            PlaybackSelector::select(&buffer, 0.5),
            Playback::InsufficientHistory
        );
    }

    #[test]
    fn test_target_older_than_all_is_stale() {
        let buffer = buffer(&[1.0, 2.0, 3.0]);
        assert_eq!(
            PlaybackSelector::select(&buffer, 0.5),
            Playback::Stale { oldest_index: 2 }
        );
    }

    #[test]
    fn test_selector_target() {
        let selector = PlaybackSelector::new(0.1);
        assert_eq!(selector.target(&buffer(&[])), None);
        let target = selector.target(&buffer(&[1.0, 2.0])).unwrap();
        assert!((target - 1.9).abs() < 1e-12);
    }
}
