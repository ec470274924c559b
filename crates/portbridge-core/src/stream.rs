//! Stream lifecycle and per-block sequencing shared by every host convention.
//!
//! [`StreamCore`] owns the port pool, the transport synchronizer, the
//! diagnostics and the registered [`Listener`]. Host adapters translate their
//! native entry points into [`StreamCore::prepare`], [`StreamCore::process`]
//! and [`StreamCore::release`] and supply the block's
//! [`ChannelCapabilities`].
//!
//! # State Transitions
//!
//! ```text
//! Unprepared --[prepare]--> Prepared --[release]--> Unprepared
//!                   ^           |
//!                   +-[prepare]-+   (re-captures block length / sample rate)
//! ```
//!
//! # Per-Block Sequence
//!
//! 1. Capture transport (if the host supplied a position)
//! 2. Record the delivered block length
//! 3. Prepare the port pool
//! 4. Invoke the listener once, or copy inputs to outputs if none is set
//! 5. Commit outputs back to the host
//!
//! Blocks delivered while unprepared are dropped, their host outputs are
//! silenced, and the first occurrence is logged.

use crate::channel::{ChannelCapabilities, Direction};
use crate::config::BridgeConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsSnapshot, Fault};
use crate::error::{BridgeError, BridgeResult};
use crate::host::HostBuffer;
use crate::midi::MidiBuffer;
use crate::port_pool::{PortBufferPool, PreparedBlock};
use crate::transport::{HostPosition, TempoSmoother, TransportSnapshot, TransportSynchronizer};
use crate::types::{PortIndex, SampleRate, MAX_BLOCK_LENGTH};

// =============================================================================
// Collaborator traits
// =============================================================================

/// The downstream engine.
///
/// Called synchronously, exactly once per block, on the audio thread. The
/// handle and every buffer reached through it are valid only for the
/// duration of the call.
pub trait Listener: Send {
    fn process_block(&mut self, stream: &mut StreamHandle<'_>);
}

impl<F> Listener for F
where
    F: FnMut(&mut StreamHandle<'_>) + Send,
{
    fn process_block(&mut self, stream: &mut StreamHandle<'_>) {
        self(stream)
    }
}

/// Source of host position for adapters whose block entry point carries none.
pub trait PlayHead: Send {
    /// Position for the block about to be processed, if the host knows it.
    fn position(&mut self) -> Option<HostPosition>;
}

// =============================================================================
// StreamState
// =============================================================================

/// Stream lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamState {
    /// Block length and sample rate unknown; blocks are dropped.
    Unprepared,
    /// Ready to process blocks.
    Prepared {
        /// Length of the most recent block (or the prepared maximum before
        /// the first block arrives).
        block_length: usize,
        sample_rate: SampleRate,
    },
}

impl StreamState {
    #[inline]
    pub fn is_prepared(&self) -> bool {
        matches!(self, Self::Prepared { .. })
    }

    /// Block length, only when prepared.
    pub fn block_length(&self) -> Option<usize> {
        match self {
            Self::Prepared { block_length, .. } => Some(*block_length),
            Self::Unprepared => None,
        }
    }

    /// Sample rate, only when prepared.
    pub fn sample_rate(&self) -> Option<SampleRate> {
        match self {
            Self::Prepared { sample_rate, .. } => Some(*sample_rate),
            Self::Unprepared => None,
        }
    }
}

// =============================================================================
// StreamHandle
// =============================================================================

/// The listener's view of one block.
pub struct StreamHandle<'a> {
    block: PreparedBlock<'a>,
    transport: &'a TransportSnapshot,
    midi: Option<&'a MidiBuffer>,
    config: &'a BridgeConfig,
    sample_rate: SampleRate,
    stream_time: u64,
}

impl<'a> StreamHandle<'a> {
    /// Frames in this block.
    #[inline]
    pub fn block_length(&self) -> usize {
        self.block.block_length()
    }

    #[inline]
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Interleaved input and output buffers for a port pair.
    ///
    /// Never fails: out-of-range ports get the Void buffers.
    #[inline]
    pub fn buffers(
        &mut self,
        input_port: PortIndex,
        output_port: PortIndex,
    ) -> (&[f32], &mut [f32]) {
        self.block.buffers(input_port, output_port)
    }

    /// Interleaved input samples for `port`.
    #[inline]
    pub fn input(&mut self, port: PortIndex) -> &[f32] {
        self.block.input(port)
    }

    /// Interleaved output samples for `port`, zeroed on first access.
    #[inline]
    pub fn output(&mut self, port: PortIndex) -> &mut [f32] {
        self.block.output(port)
    }

    #[inline]
    pub fn input_port_count(&self) -> usize {
        self.config.port_count
    }

    #[inline]
    pub fn output_port_count(&self) -> usize {
        self.config.port_count
    }

    /// Transport state captured for this block.
    #[inline]
    pub fn transport(&self) -> &TransportSnapshot {
        self.transport
    }

    /// MIDI events delivered with this block (push convention only).
    #[inline]
    pub fn midi(&self) -> Option<&MidiBuffer> {
        self.midi
    }

    /// Frames processed since the stream was last prepared.
    #[inline]
    pub fn stream_time(&self) -> u64 {
        self.stream_time
    }

    /// Input latency in frames.
    #[inline]
    pub fn input_latency(&self) -> u32 {
        self.config.input_latency
    }

    /// Output latency in frames.
    #[inline]
    pub fn output_latency(&self) -> u32 {
        self.config.output_latency
    }

    /// Copy every mapped input port to the matching output port.
    fn pass_through(&mut self) {
        let capabilities = *self.block.capabilities();
        for port in 0..self.block.port_count() {
            if capabilities.resolve(Direction::Input, port).is_none()
                || capabilities.resolve(Direction::Output, port).is_none()
            {
                continue;
            }
            let (input, output) = self.block.buffers(port, port);
            output.copy_from_slice(input);
        }
    }

    fn commit(self) {
        self.block.commit();
    }
}

// =============================================================================
// StreamCore
// =============================================================================

/// Convention-independent stream state and block sequencing.
pub struct StreamCore {
    config: BridgeConfig,
    state: StreamState,
    pool: PortBufferPool,
    transport: TransportSynchronizer,
    listener: Option<Box<dyn Listener>>,
    diagnostics: Diagnostics,
    stream_time: u64,
}

impl StreamCore {
    /// Validate `config` and allocate port buffers.
    ///
    /// Must run on a non-realtime thread before streaming starts.
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: StreamState::Unprepared,
            pool: PortBufferPool::new(config.port_count),
            transport: TransportSynchronizer::new(),
            listener: None,
            diagnostics: Diagnostics::new(),
            stream_time: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Register the engine. Replaces any previous listener.
    pub fn set_listener(&mut self, listener: impl Listener + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Remove the engine; blocks fall back to pass-through.
    pub fn clear_listener(&mut self) -> Option<Box<dyn Listener>> {
        self.listener.take()
    }

    #[inline]
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Replace the tempo smoothing collaborator.
    ///
    /// Only allowed while unprepared, so the smoother never sees a partial
    /// history.
    pub fn set_tempo_smoother(&mut self, smoother: Box<dyn TempoSmoother>) -> BridgeResult<()> {
        if self.state.is_prepared() {
            return Err(BridgeError::InvalidState(
                "tempo smoother cannot be replaced while prepared".to_string(),
            ));
        }
        self.transport = TransportSynchronizer::with_smoother(smoother);
        Ok(())
    }

    /// Enter (or stay in) the prepared state.
    ///
    /// Repeated calls without a release re-capture the block length and
    /// sample rate and leave everything else untouched. Block lengths above
    /// [`MAX_BLOCK_LENGTH`] are clamped.
    pub fn prepare(&mut self, block_length: usize, sample_rate: SampleRate) -> BridgeResult<()> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            log::error!("Rejecting prepare with sample rate {}", sample_rate);
            return Err(BridgeError::InvalidConfiguration(format!(
                "sample rate must be positive, got {}",
                sample_rate
            )));
        }

        let clamped = block_length.min(MAX_BLOCK_LENGTH);
        if clamped != block_length {
            log::warn!(
                "Block length {} exceeds MAX_BLOCK_LENGTH ({}); clamping",
                block_length,
                MAX_BLOCK_LENGTH
            );
        }

        match self.state {
            StreamState::Prepared { .. } => {
                log::debug!(
                    "Re-prepare while prepared: block_length={}, sample_rate={}",
                    clamped,
                    sample_rate
                );
            }
            StreamState::Unprepared => {
                self.stream_time = 0;
                self.transport.reset();
                log::debug!(
                    "Stream prepared: block_length={}, sample_rate={}, ports={}",
                    clamped,
                    sample_rate,
                    self.config.port_count
                );
            }
        }

        self.state = StreamState::Prepared {
            block_length: clamped,
            sample_rate,
        };
        Ok(())
    }

    /// Return to the unprepared state. Diagnostics are kept.
    pub fn release(&mut self) {
        if self.state.is_prepared() {
            log::debug!("Stream released after {} frames", self.stream_time);
        }
        self.state = StreamState::Unprepared;
    }

    /// Process one block.
    ///
    /// `capabilities` must already reflect the channel counts delivered in
    /// `host` (see [`ChannelCapabilities::with_delivered`]).
    pub fn process(
        &mut self,
        host: &mut dyn HostBuffer,
        capabilities: &ChannelCapabilities,
        position: Option<&HostPosition>,
        midi: Option<&MidiBuffer>,
    ) {
        let StreamState::Prepared { sample_rate, .. } = self.state else {
            if self.diagnostics.record(Fault::UnpreparedDelivery) {
                log::warn!("Block delivered before prepare; dropping it");
            }
            host.silence_outputs();
            return;
        };

        let transport = self.transport.capture(position, sample_rate);

        let frames = host.frames();
        if frames > MAX_BLOCK_LENGTH && self.diagnostics.record(Fault::OversizeBlock) {
            log::warn!(
                "Host delivered {} frames, more than MAX_BLOCK_LENGTH ({}); extra frames are silenced",
                frames,
                MAX_BLOCK_LENGTH
            );
        }
        let block_length = frames.min(MAX_BLOCK_LENGTH);
        self.state = StreamState::Prepared {
            block_length,
            sample_rate,
        };

        let block = self
            .pool
            .prepare(block_length, host, capabilities, &mut self.diagnostics);
        let mut handle = StreamHandle {
            block,
            transport,
            midi,
            config: &self.config,
            sample_rate,
            stream_time: self.stream_time,
        };

        match self.listener.as_mut() {
            Some(listener) => listener.process_block(&mut handle),
            None => handle.pass_through(),
        }
        handle.commit();

        self.stream_time += block_length as u64;
    }

    /// Fault counters accumulated over the life of the stream.
    #[inline]
    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    /// Whether `fault` has been logged.
    #[inline]
    pub fn has_logged(&self, fault: Fault) -> bool {
        self.diagnostics.has_logged(fault)
    }

    /// Transport snapshot from the last processed block.
    #[inline]
    pub fn transport(&self) -> &TransportSnapshot {
        self.transport.snapshot()
    }

    /// Frames processed since the last prepare.
    #[inline]
    pub fn stream_time(&self) -> u64 {
        self.stream_time
    }
}

impl std::fmt::Debug for StreamCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamCore")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("has_listener", &self.listener.is_some())
            .field("stream_time", &self.stream_time)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// HostStream
// =============================================================================

/// Operations every host adapter shares.
///
/// Adapters implement the two accessors and keep their own convention's
/// `prepare` / `deliver_block` entry points.
pub trait HostStream {
    fn core(&self) -> &StreamCore;

    fn core_mut(&mut self) -> &mut StreamCore;

    fn set_listener(&mut self, listener: impl Listener + 'static)
    where
        Self: Sized,
    {
        self.core_mut().set_listener(listener);
    }

    fn clear_listener(&mut self) -> Option<Box<dyn Listener>> {
        self.core_mut().clear_listener()
    }

    fn release(&mut self) {
        self.core_mut().release();
    }

    fn state(&self) -> StreamState {
        self.core().state()
    }

    fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.core().diagnostics()
    }

    fn transport(&self) -> &TransportSnapshot {
        self.core().transport()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelMask;
    use crate::host::ChannelBuffers;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Seen {
        block_length: usize,
        sample_rate: f64,
        stream_time: u64,
        is_playing: bool,
        transport_changed: bool,
        first_input: Vec<f32>,
    }

    /// Records what the engine saw and writes a constant to port 0.
    struct Recorder {
        seen: Arc<Mutex<Vec<Seen>>>,
        fill: Option<f32>,
    }

    impl Listener for Recorder {
        fn process_block(&mut self, stream: &mut StreamHandle<'_>) {
            let snapshot = *stream.transport();
            let first_input = stream.input(0).to_vec();
            if let Some(value) = self.fill {
                stream.output(0).fill(value);
            }
            self.seen.lock().unwrap().push(Seen {
                block_length: stream.block_length(),
                sample_rate: stream.sample_rate(),
                stream_time: stream.stream_time(),
                is_playing: snapshot.is_playing,
                transport_changed: snapshot.transport_changed,
                first_input,
            });
        }
    }

    fn recorder(core: &mut StreamCore, fill: Option<f32>) -> Arc<Mutex<Vec<Seen>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        core.set_listener(Recorder {
            seen: Arc::clone(&seen),
            fill,
        });
        seen
    }

    fn stereo_caps() -> ChannelCapabilities {
        ChannelCapabilities::fixed_bus(2, 2).with_delivered(2, 2)
    }

    fn run_block(
        core: &mut StreamCore,
        frames: usize,
        input: f32,
        position: Option<&HostPosition>,
    ) -> (Vec<f32>, Vec<f32>) {
        let left = vec![input; frames];
        let right = vec![-input; frames];
        let inputs: [&[f32]; 2] = [&left, &right];
        let mut out_l = vec![99.0f32; frames];
        let mut out_r = vec![99.0f32; frames];
        {
            let mut outputs: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
            let mut host = ChannelBuffers::new(&inputs, &mut outputs, frames);
            core.process(&mut host, &stereo_caps(), position, None);
        }
        (out_l, out_r)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = StreamCore::new(BridgeConfig::new().with_port_count(0));
        assert!(matches!(result, Err(BridgeError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_unprepared_delivery_is_dropped() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        let seen = recorder(&mut core, Some(1.0));

        let (l, r) = run_block(&mut core, 64, 0.5, None);
        run_block(&mut core, 64, 0.5, None);

        assert!(seen.lock().unwrap().is_empty());
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
        assert_eq!(core.diagnostics().unprepared_deliveries, 2);
        assert!(core.has_logged(Fault::UnpreparedDelivery));
        assert_eq!(core.stream_time(), 0);
    }

    #[test]
    fn test_listener_called_once_per_block() {
        let mut core = StreamCore::new(BridgeConfig::new().with_port_count(2)).unwrap();
        let seen = recorder(&mut core, Some(0.25));
        core.prepare(128, 48_000.0).unwrap();

        let (l, r) = run_block(&mut core, 128, 0.5, None);
        run_block(&mut core, 64, 0.5, None);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].block_length, 128);
        assert_eq!(seen[0].sample_rate, 48_000.0);
        assert_eq!(seen[0].first_input.len(), 256);
        assert_eq!(&seen[0].first_input[..2], &[0.5, -0.5]);
        assert_eq!(seen[1].block_length, 64);
        assert_eq!(seen[1].stream_time, 128);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.25));
    }

    #[test]
    fn test_untouched_outputs_are_silent() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        let _seen = recorder(&mut core, None);
        core.prepare(32, 44_100.0).unwrap();

        let (l, r) = run_block(&mut core, 32, 0.5, None);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_pass_through_without_listener() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        core.prepare(16, 44_100.0).unwrap();

        let (l, r) = run_block(&mut core, 16, 0.5, None);
        assert!(l.iter().all(|&s| s == 0.5));
        assert!(r.iter().all(|&s| s == -0.5));
        // Ports beyond the delivered channels are skipped, not logged
        assert!(core.diagnostics().is_clean());
    }

    fn halve(stream: &mut StreamHandle<'_>) {
        let (input, output) = stream.buffers(0, 0);
        for (o, i) in output.iter_mut().zip(input) {
            *o = i * 0.5;
        }
    }

    #[test]
    fn test_function_listener() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        core.set_listener(halve);
        core.prepare(8, 44_100.0).unwrap();

        let (l, r) = run_block(&mut core, 8, 0.5, None);
        assert!(l.iter().all(|&s| s == 0.25));
        assert!(r.iter().all(|&s| s == -0.25));

        assert!(core.clear_listener().is_some());
        assert!(!core.has_listener());
    }

    #[test]
    fn test_repeated_prepare_is_idempotent() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        let seen = recorder(&mut core, None);

        core.prepare(512, 44_100.0).unwrap();
        run_block(&mut core, 512, 0.1, None);
        core.prepare(128, 48_000.0).unwrap();
        assert_eq!(
            core.state(),
            StreamState::Prepared {
                block_length: 128,
                sample_rate: 48_000.0
            }
        );
        // Stream time survives a re-prepare
        assert_eq!(core.stream_time(), 512);

        run_block(&mut core, 128, 0.1, None);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].block_length, 128);
        assert_eq!(seen[1].sample_rate, 48_000.0);
        assert_eq!(seen[1].first_input.len(), 256);
        assert!(core.diagnostics().is_clean());
    }

    #[test]
    fn test_release_then_prepare_resets_stream_time() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        core.prepare(64, 44_100.0).unwrap();
        run_block(&mut core, 64, 0.1, None);
        assert_eq!(core.stream_time(), 64);

        core.release();
        assert_eq!(core.state(), StreamState::Unprepared);
        run_block(&mut core, 64, 0.1, None);
        assert_eq!(core.diagnostics().unprepared_deliveries, 1);

        core.prepare(64, 44_100.0).unwrap();
        assert_eq!(core.stream_time(), 0);
        // Flags survive the release
        assert!(core.has_logged(Fault::UnpreparedDelivery));
    }

    #[test]
    fn test_prepare_rejects_bad_sample_rate() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        assert!(core.prepare(64, 0.0).is_err());
        assert!(core.prepare(64, f64::NAN).is_err());
        assert!(!core.state().is_prepared());
    }

    #[test]
    fn test_prepare_clamps_block_length() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        core.prepare(MAX_BLOCK_LENGTH * 2, 44_100.0).unwrap();
        assert_eq!(core.state().block_length(), Some(MAX_BLOCK_LENGTH));
    }

    #[test]
    fn test_oversize_block_is_clamped() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        let seen = recorder(&mut core, Some(1.0));
        core.prepare(MAX_BLOCK_LENGTH, 44_100.0).unwrap();

        let frames = MAX_BLOCK_LENGTH + 16;
        let (l, _r) = run_block(&mut core, frames, 0.5, None);

        assert_eq!(seen.lock().unwrap()[0].block_length, MAX_BLOCK_LENGTH);
        assert!(l[..MAX_BLOCK_LENGTH].iter().all(|&s| s == 1.0));
        assert!(l[MAX_BLOCK_LENGTH..].iter().all(|&s| s == 0.0));
        assert_eq!(core.diagnostics().oversize_blocks, 1);
    }

    #[test]
    fn test_transport_flows_to_listener() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        let seen = recorder(&mut core, None);
        core.prepare(16, 44_100.0).unwrap();

        let playing = HostPosition {
            is_playing: true,
            tempo: Some(120.0),
            ..HostPosition::default()
        };
        run_block(&mut core, 16, 0.0, Some(&playing));
        run_block(&mut core, 16, 0.0, Some(&playing));
        run_block(&mut core, 16, 0.0, None);

        let seen = seen.lock().unwrap();
        assert!(seen[0].is_playing && seen[0].transport_changed);
        assert!(seen[1].is_playing && !seen[1].transport_changed);
        assert!(seen[2].is_playing && !seen[2].transport_changed);
        assert_eq!(core.transport().tempo, 120.0);
    }

    #[test]
    fn test_tempo_smoother_only_replaced_when_unprepared() {
        let mut core = StreamCore::new(BridgeConfig::new()).unwrap();
        assert!(core
            .set_tempo_smoother(Box::new(crate::transport::PassThroughTempo::default()))
            .is_ok());

        core.prepare(16, 44_100.0).unwrap();
        let result =
            core.set_tempo_smoother(Box::new(crate::transport::PassThroughTempo::default()));
        assert!(matches!(result, Err(BridgeError::InvalidState(_))));
    }

    #[test]
    fn test_bitmap_capabilities_reach_listener() {
        let mut core = StreamCore::new(BridgeConfig::new().with_port_count(2)).unwrap();
        let seen = recorder(&mut core, None);
        core.prepare(256, 44_100.0).unwrap();

        let channels: Vec<Vec<f32>> = (0..4).map(|c| vec![c as f32; 256]).collect();
        let inputs: Vec<&[f32]> = channels.iter().map(|c| c.as_slice()).collect();
        let mut outputs: [&mut [f32]; 0] = [];
        let mut host = ChannelBuffers::new(&inputs, &mut outputs, 256);
        let caps = ChannelCapabilities::active_bitmap(
            ChannelMask::from_bits(0b0101),
            ChannelMask::EMPTY,
        )
        .with_delivered(4, 0);
        core.process(&mut host, &caps, None, None);

        let seen = seen.lock().unwrap();
        assert_eq!(&seen[0].first_input[..4], &[0.0, 2.0, 0.0, 2.0]);
    }
}
