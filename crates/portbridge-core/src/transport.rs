//! Transport capture.
//!
//! Once per block the stream reads the host's position into a
//! [`HostPosition`], hands it to a [`TempoSmoother`], and rebuilds a
//! [`TransportSnapshot`] for the engine.
//!
//! # Play State Changes
//!
//! `transport_changed` is derived here by comparing this block's play state
//! with the previous block's. Host transport events are never consulted,
//! since not every host integration delivers them.
//!
//! # Example
//!
//! ```
//! use portbridge_core::{HostPosition, TransportSynchronizer};
//!
//! let mut sync = TransportSynchronizer::new();
//! let position = HostPosition {
//!     is_playing: true,
//!     tempo: Some(128.0),
//!     ..HostPosition::default()
//! };
//!
//! let snapshot = sync.capture(Some(&position), 48_000.0);
//! assert!(snapshot.transport_changed);
//! assert_eq!(snapshot.tempo, 128.0);
//! ```

use crate::types::SampleRate;

// =============================================================================
// HostPosition
// =============================================================================

/// Position data read from the host for one block.
///
/// Every timing field is `Option` because hosts report different subsets.
/// `is_playing` is always valid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HostPosition {
    /// True if the host transport is running.
    pub is_playing: bool,
    /// Tempo in BPM.
    pub tempo: Option<f64>,
    /// Time signature numerator (e.g., 3 in 3/4).
    pub time_sig_numerator: Option<i32>,
    /// Time signature denominator (e.g., 4 in 3/4).
    pub time_sig_denominator: Option<i32>,
    /// Position in samples from project start.
    pub sample_position: Option<i64>,
    /// Position in quarter notes from project start.
    pub beat_position: Option<f64>,
}

impl HostPosition {
    /// Returns the time signature as (numerator, denominator) if both are known.
    #[inline]
    pub fn time_signature(&self) -> Option<(i32, i32)> {
        match (self.time_sig_numerator, self.time_sig_denominator) {
            (Some(num), Some(den)) => Some((num, den)),
            _ => None,
        }
    }
}

// =============================================================================
// TempoSmoother
// =============================================================================

/// Downstream tempo smoothing collaborator.
///
/// Receives the raw position once per block and reports the values the
/// engine should see. Implementations run on the audio thread and must not
/// allocate or block.
pub trait TempoSmoother: Send {
    /// Feed this block's host position.
    fn feed(&mut self, position: &HostPosition);

    /// Smoothed tempo in BPM.
    fn tempo(&self) -> f64;

    /// Smoothed position in quarter notes.
    fn beat_position(&self) -> f64;

    /// Forget all history.
    fn reset(&mut self) {}
}

/// Reports the last host values unchanged. Absent values read as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughTempo {
    tempo: f64,
    beat_position: f64,
}

impl TempoSmoother for PassThroughTempo {
    fn feed(&mut self, position: &HostPosition) {
        self.tempo = position.tempo.unwrap_or(0.0);
        self.beat_position = position.beat_position.unwrap_or(0.0);
    }

    fn tempo(&self) -> f64 {
        self.tempo
    }

    fn beat_position(&self) -> f64 {
        self.beat_position
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// TransportSnapshot
// =============================================================================

/// Normalized transport state for one block. Rebuilt every block.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportSnapshot {
    pub is_playing: bool,
    /// Tempo in BPM, as reported by the smoother.
    pub tempo: f64,
    /// Position in quarter notes, as reported by the smoother.
    pub beat_position: f64,
    /// True if `is_playing` differs from the previous block.
    pub transport_changed: bool,
    pub sample_rate: SampleRate,
    pub time_sig_numerator: i32,
    pub time_sig_denominator: i32,
    pub sample_position: i64,
    /// False when the host supplied no position for this block.
    pub has_host_position: bool,
}

// =============================================================================
// TransportSynchronizer
// =============================================================================

/// Builds a [`TransportSnapshot`] from host position once per block.
pub struct TransportSynchronizer {
    smoother: Box<dyn TempoSmoother>,
    snapshot: TransportSnapshot,
    was_playing: bool,
}

impl TransportSynchronizer {
    /// Create a synchronizer with [`PassThroughTempo`].
    pub fn new() -> Self {
        Self::with_smoother(Box::new(PassThroughTempo::default()))
    }

    /// Create a synchronizer with a custom smoothing collaborator.
    pub fn with_smoother(smoother: Box<dyn TempoSmoother>) -> Self {
        Self {
            smoother,
            snapshot: TransportSnapshot::default(),
            was_playing: false,
        }
    }

    /// Capture this block's transport state.
    ///
    /// With `None`, the previous tempo, beat position and play state are kept
    /// and `transport_changed` is false.
    pub fn capture(
        &mut self,
        position: Option<&HostPosition>,
        sample_rate: SampleRate,
    ) -> &TransportSnapshot {
        let snapshot = &mut self.snapshot;
        snapshot.sample_rate = sample_rate;

        let Some(position) = position else {
            snapshot.transport_changed = false;
            snapshot.has_host_position = false;
            return &self.snapshot;
        };

        self.smoother.feed(position);

        let (numerator, denominator) = position.time_signature().unwrap_or((0, 0));
        snapshot.is_playing = position.is_playing;
        snapshot.transport_changed = position.is_playing != self.was_playing;
        snapshot.tempo = self.smoother.tempo();
        snapshot.beat_position = self.smoother.beat_position();
        snapshot.time_sig_numerator = numerator;
        snapshot.time_sig_denominator = denominator;
        snapshot.sample_position = position.sample_position.unwrap_or(0);
        snapshot.has_host_position = true;

        self.was_playing = position.is_playing;
        &self.snapshot
    }

    /// The snapshot built by the last [`capture`](Self::capture).
    #[inline]
    pub fn snapshot(&self) -> &TransportSnapshot {
        &self.snapshot
    }

    /// Return to the stopped, empty state.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.snapshot = TransportSnapshot::default();
        self.was_playing = false;
    }
}

impl Default for TransportSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransportSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSynchronizer")
            .field("snapshot", &self.snapshot)
            .field("was_playing", &self.was_playing)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(is_playing: bool) -> HostPosition {
        HostPosition {
            is_playing,
            ..HostPosition::default()
        }
    }

    #[test]
    fn test_transport_changed_sequence() {
        let mut sync = TransportSynchronizer::new();
        let changed: Vec<bool> = [false, false, true, true, false]
            .into_iter()
            .map(|p| sync.capture(Some(&playing(p)), 44_100.0).transport_changed)
            .collect();

        assert_eq!(changed, vec![false, false, true, false, true]);
    }

    #[test]
    fn test_absent_fields_default_to_zero() {
        let mut sync = TransportSynchronizer::new();
        let snap = *sync.capture(Some(&playing(true)), 48_000.0);

        assert!(snap.is_playing);
        assert!(snap.has_host_position);
        assert_eq!(snap.tempo, 0.0);
        assert_eq!(snap.beat_position, 0.0);
        assert_eq!(snap.time_sig_numerator, 0);
        assert_eq!(snap.sample_position, 0);
        assert_eq!(snap.sample_rate, 48_000.0);
    }

    #[test]
    fn test_full_position() {
        let mut sync = TransportSynchronizer::new();
        let position = HostPosition {
            is_playing: true,
            tempo: Some(96.0),
            time_sig_numerator: Some(7),
            time_sig_denominator: Some(8),
            sample_position: Some(441_000),
            beat_position: Some(16.5),
        };
        let snap = *sync.capture(Some(&position), 44_100.0);

        assert_eq!(snap.tempo, 96.0);
        assert_eq!(snap.beat_position, 16.5);
        assert_eq!((snap.time_sig_numerator, snap.time_sig_denominator), (7, 8));
        assert_eq!(snap.sample_position, 441_000);
    }

    #[test]
    fn test_half_time_signature_is_ignored() {
        let position = HostPosition {
            time_sig_numerator: Some(3),
            ..HostPosition::default()
        };
        assert_eq!(position.time_signature(), None);
    }

    #[test]
    fn test_missing_position_keeps_previous_state() {
        let mut sync = TransportSynchronizer::new();
        let position = HostPosition {
            is_playing: true,
            tempo: Some(140.0),
            ..HostPosition::default()
        };
        assert!(sync.capture(Some(&position), 44_100.0).transport_changed);

        let snap = *sync.capture(None, 44_100.0);
        assert!(snap.is_playing);
        assert!(!snap.transport_changed);
        assert!(!snap.has_host_position);
        assert_eq!(snap.tempo, 140.0);

        // Still playing, so no change is reported on return
        assert!(!sync.capture(Some(&position), 44_100.0).transport_changed);
    }

    struct Halving {
        tempo: f64,
    }

    impl TempoSmoother for Halving {
        fn feed(&mut self, position: &HostPosition) {
            self.tempo = position.tempo.unwrap_or(0.0) / 2.0;
        }

        fn tempo(&self) -> f64 {
            self.tempo
        }

        fn beat_position(&self) -> f64 {
            -1.0
        }
    }

    #[test]
    fn test_snapshot_reads_back_from_smoother() {
        let mut sync = TransportSynchronizer::with_smoother(Box::new(Halving { tempo: 0.0 }));
        let position = HostPosition {
            tempo: Some(120.0),
            beat_position: Some(4.0),
            ..HostPosition::default()
        };
        let snap = *sync.capture(Some(&position), 44_100.0);
        assert_eq!(snap.tempo, 60.0);
        assert_eq!(snap.beat_position, -1.0);
    }

    #[test]
    fn test_reset() {
        let mut sync = TransportSynchronizer::new();
        sync.capture(Some(&playing(true)), 44_100.0);
        sync.reset();
        assert_eq!(*sync.snapshot(), TransportSnapshot::default());

        // First playing block after reset reports a change again
        assert!(sync.capture(Some(&playing(true)), 44_100.0).transport_changed);
    }
}
