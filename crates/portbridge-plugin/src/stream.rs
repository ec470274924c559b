//! Push-convention stream adapter.
//!
//! The plugin host calls [`PluginStream::prepare`] with
//! `(sample_rate, block_length)`, then pushes one block per process call
//! together with its MIDI event buffer, and finally
//! [`release`](HostStream::release)s the stream.
//!
//! The port count is fixed at construction as `1 + aux bus count`. Channel
//! counts are read from the [`BusTotals`] collaborator at every block and
//! combined with the delivered buffer width under the fixed-bus capability
//! model.

use crate::bus::BusTotals;
use portbridge_core::{
    BridgeConfig, BridgeResult, ChannelCapabilities, HostBuffer, HostPosition, HostStream,
    MidiBuffer, OneShot, PlayHead, SampleRate, StreamCore,
};

/// Stream adapter for plugin process calls.
pub struct PluginStream<B: BusTotals> {
    buses: B,
    core: StreamCore,
    play_head: Option<Box<dyn PlayHead>>,
    midi_overflow: OneShot,
}

impl<B: BusTotals> PluginStream<B> {
    /// Create a stream whose port count follows the aux bus count.
    ///
    /// Fails with `LimitExceeded` when the bus layout needs more than
    /// `MAX_PORTS` ports or `MAX_HOST_CHANNELS` channels.
    pub fn new(buses: B) -> BridgeResult<Self> {
        if let Err(err) = buses.check_limits() {
            log::error!("Rejected bus layout: {}", err);
            return Err(err);
        }
        let config = BridgeConfig::from_aux_buses(buses.aux_bus_count());
        Self::with_config(buses, config)
    }

    /// Create a stream with an explicit configuration.
    pub fn with_config(buses: B, config: BridgeConfig) -> BridgeResult<Self> {
        let core = StreamCore::new(config)?;
        log::debug!(
            "Plugin stream created: ports={}, bus totals {}in/{}out",
            config.port_count,
            buses.total_input_channels(),
            buses.total_output_channels()
        );
        Ok(Self {
            buses,
            core,
            play_head: None,
            midi_overflow: OneShot::new(),
        })
    }

    #[inline]
    pub fn buses(&self) -> &B {
        &self.buses
    }

    /// Mutable access to the bus collaborator (e.g., after re-negotiation).
    ///
    /// The port count does not follow later changes.
    #[inline]
    pub fn buses_mut(&mut self) -> &mut B {
        &mut self.buses
    }

    /// Attach a position source for [`deliver_block`](Self::deliver_block).
    pub fn set_play_head(&mut self, play_head: impl PlayHead + 'static) {
        self.play_head = Some(Box::new(play_head));
    }

    pub fn clear_play_head(&mut self) {
        self.play_head = None;
    }

    /// Host setup: sample rate first, then maximum block length.
    pub fn prepare(&mut self, sample_rate: SampleRate, block_length: usize) -> BridgeResult<()> {
        self.core.prepare(block_length, sample_rate)
    }

    /// Process one block, taking position from the attached play head.
    pub fn deliver_block(&mut self, buffers: &mut dyn HostBuffer, midi: &MidiBuffer) {
        let position = self.play_head.as_mut().and_then(|head| head.position());
        self.deliver_block_with_position(buffers, midi, position.as_ref());
    }

    /// Process one block with an explicit host position.
    pub fn deliver_block_with_position(
        &mut self,
        buffers: &mut dyn HostBuffer,
        midi: &MidiBuffer,
        position: Option<&HostPosition>,
    ) {
        if midi.has_overflowed() && self.midi_overflow.trip() {
            log::warn!(
                "MIDI input overflow: {} events reached capacity, some events were dropped",
                midi.len()
            );
        }

        let capabilities = ChannelCapabilities::fixed_bus(
            self.buses.total_input_channels(),
            self.buses.total_output_channels(),
        )
        .with_delivered(buffers.input_channel_count(), buffers.output_channel_count());

        self.core
            .process(buffers, &capabilities, position, Some(midi));
    }
}

impl<B: BusTotals> HostStream for PluginStream<B> {
    fn core(&self) -> &StreamCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StreamCore {
        &mut self.core
    }
}
