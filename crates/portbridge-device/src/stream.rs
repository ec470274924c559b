//! Pull-convention stream adapter.
//!
//! The device driver calls [`DeviceStream::prepare`] with
//! `(block_length, sample_rate)`, then [`DeviceStream::deliver_block`] once
//! per callback with a [`DeviceBlock`], and finally
//! [`release`](HostStream::release).
//!
//! Channel activity comes from the [`DeviceCapabilities`] collaborator and is
//! combined with the channel counts actually delivered in each block, using
//! the active-bitmap capability model.

use crate::device::DeviceCapabilities;
use portbridge_core::{
    BridgeConfig, BridgeResult, ChannelBuffers, ChannelCapabilities, HostBuffer, HostStream,
    PlayHead, SampleRate, StreamCore,
};

/// One device callback's buffers.
///
/// Every channel slice is addressed from `start` for `length` frames.
pub struct DeviceBlock<'a, 'b> {
    pub inputs: &'a [&'b [f32]],
    pub outputs: &'a mut [&'b mut [f32]],
    /// First frame of the block within each channel slice.
    pub start: usize,
    /// Frames in the block.
    pub length: usize,
}

impl<'a, 'b> DeviceBlock<'a, 'b> {
    /// A block covering the first `length` frames of each slice.
    pub fn new(inputs: &'a [&'b [f32]], outputs: &'a mut [&'b mut [f32]], length: usize) -> Self {
        Self {
            inputs,
            outputs,
            start: 0,
            length,
        }
    }
}

/// Stream adapter for audio device callbacks.
pub struct DeviceStream<D: DeviceCapabilities> {
    device: D,
    core: StreamCore,
    play_head: Option<Box<dyn PlayHead>>,
}

impl<D: DeviceCapabilities> DeviceStream<D> {
    /// Create a stream over `device`.
    ///
    /// Allocates all port buffers; call before streaming starts.
    pub fn new(device: D, config: BridgeConfig) -> BridgeResult<Self> {
        let core = StreamCore::new(config)?;
        log::debug!(
            "Device stream created: ports={}, active inputs={:#b}, active outputs={:#b}",
            config.port_count,
            device.active_inputs().bits(),
            device.active_outputs().bits()
        );
        Ok(Self {
            device,
            core,
            play_head: None,
        })
    }

    /// Create a stream with [`BridgeConfig::default`].
    pub fn with_default_ports(device: D) -> BridgeResult<Self> {
        Self::new(device, BridgeConfig::default())
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    #[inline]
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Attach a position source, queried once per block.
    pub fn set_play_head(&mut self, play_head: impl PlayHead + 'static) {
        self.play_head = Some(Box::new(play_head));
    }

    pub fn clear_play_head(&mut self) {
        self.play_head = None;
    }

    /// Device start: block length first, then sample rate.
    pub fn prepare(&mut self, block_length: usize, sample_rate: SampleRate) -> BridgeResult<()> {
        self.core.prepare(block_length, sample_rate)
    }

    /// Process one device callback.
    pub fn deliver_block(&mut self, block: &mut DeviceBlock<'_, '_>) {
        let mut host =
            ChannelBuffers::with_window(block.inputs, block.outputs, block.start, block.length);
        let capabilities = ChannelCapabilities::active_bitmap(
            self.device.active_inputs(),
            self.device.active_outputs(),
        )
        .with_delivered(host.input_channel_count(), host.output_channel_count());

        let position = self.play_head.as_mut().and_then(|head| head.position());
        self.core
            .process(&mut host, &capabilities, position.as_ref(), None);
    }
}

impl<D: DeviceCapabilities> HostStream for DeviceStream<D> {
    fn core(&self) -> &StreamCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StreamCore {
        &mut self.core
    }
}
