//! One-shot fault tracking for the real-time path.
//!
//! Every fault category has its own [`OneShot`] flag. The first occurrence of
//! a fault trips the flag and is logged by the caller; later occurrences only
//! bump a counter. A misconfiguration that repeats every block therefore
//! produces exactly one log line for the life of the stream.

/// Category of a non-fatal fault observed during block processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Input port index outside the configured range.
    InputRange,
    /// Output port index outside the configured range.
    OutputRange,
    /// Input port whose channel offset is beyond the delivered channels.
    InputUnmapped,
    /// Output port whose channel offset is beyond the delivered channels.
    OutputUnmapped,
    /// Block delivered before the stream was prepared.
    UnpreparedDelivery,
    /// Block longer than `MAX_BLOCK_LENGTH`.
    OversizeBlock,
}

impl Fault {
    /// Number of fault categories.
    pub const COUNT: usize = 6;

    /// All categories, in index order.
    pub const ALL: [Fault; Self::COUNT] = [
        Self::InputRange,
        Self::OutputRange,
        Self::InputUnmapped,
        Self::OutputUnmapped,
        Self::UnpreparedDelivery,
        Self::OversizeBlock,
    ];

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::InputRange => 0,
            Self::OutputRange => 1,
            Self::InputUnmapped => 2,
            Self::OutputUnmapped => 3,
            Self::UnpreparedDelivery => 4,
            Self::OversizeBlock => 5,
        }
    }
}

/// A flag that reports `true` exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneShot {
    tripped: bool,
}

impl OneShot {
    /// Create an untripped flag.
    pub const fn new() -> Self {
        Self { tripped: false }
    }

    /// Trip the flag. Returns `true` only on the first call.
    #[inline]
    pub fn trip(&mut self) -> bool {
        !std::mem::replace(&mut self.tripped, true)
    }

    /// Whether the flag has been tripped.
    #[inline]
    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

/// Per-category one-shot flags and occurrence counters.
///
/// Owned by the stream and written only from the audio thread.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    flags: [OneShot; Fault::COUNT],
    counts: [u32; Fault::COUNT],
}

impl Diagnostics {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `fault`.
    ///
    /// Returns `true` if this is the first occurrence, in which case the
    /// caller should log it.
    #[inline]
    pub fn record(&mut self, fault: Fault) -> bool {
        let i = fault.index();
        self.counts[i] = self.counts[i].saturating_add(1);
        self.flags[i].trip()
    }

    /// Number of occurrences of `fault` so far.
    #[inline]
    pub fn count(&self, fault: Fault) -> u32 {
        self.counts[fault.index()]
    }

    /// Whether `fault` has been logged.
    #[inline]
    pub fn has_logged(&self, fault: Fault) -> bool {
        self.flags[fault.index()].is_tripped()
    }

    /// Copy the counters into a plain snapshot.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            input_range: self.count(Fault::InputRange),
            output_range: self.count(Fault::OutputRange),
            input_unmapped: self.count(Fault::InputUnmapped),
            output_unmapped: self.count(Fault::OutputUnmapped),
            unprepared_deliveries: self.count(Fault::UnpreparedDelivery),
            oversize_blocks: self.count(Fault::OversizeBlock),
        }
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    pub input_range: u32,
    pub output_range: u32,
    pub input_unmapped: u32,
    pub output_unmapped: u32,
    pub unprepared_deliveries: u32,
    pub oversize_blocks: u32,
}

impl DiagnosticsSnapshot {
    /// Returns true if no fault was ever recorded.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}
