//! Port buffer pool.
//!
//! Owns one interleaved input buffer and one interleaved output buffer per
//! logical port, plus a Void pair returned for any out-of-range port request.
//! All storage is allocated once in [`PortBufferPool::new`]; per-block work
//! only flips `prepared` flags and copies samples.
//!
//! # Block Protocol
//!
//! ```text
//! pool.prepare(len, host, caps, diag) -> PreparedBlock
//!     block.input(port)   interleave host channels on first touch
//!     block.output(port)  zero-fill on first touch
//!     block.commit()      de-interleave prepared outputs, zero the rest
//! ```
//!
//! The [`PreparedBlock`] borrows the host buffer, so the borrow checker
//! enforces that no port buffer outlives the block it was prepared for.

use crate::channel::{ChannelCapabilities, Direction};
use crate::diagnostics::{Diagnostics, Fault};
use crate::host::HostBuffer;
use crate::types::{PortIndex, MAX_BLOCK_LENGTH, PORT_BUFFER_LEN, PORT_CHANNELS};

/// One fixed-capacity interleaved stereo buffer.
#[derive(Debug)]
struct PortBuffer {
    samples: Box<[f32]>,
    /// Valid for the current block only.
    prepared: bool,
}

impl PortBuffer {
    fn new() -> Self {
        Self {
            samples: vec![0.0; PORT_BUFFER_LEN].into_boxed_slice(),
            prepared: false,
        }
    }
}

/// Pre-allocated interleaved buffers for every logical port.
#[derive(Debug)]
pub struct PortBufferPool {
    inputs: Vec<PortBuffer>,
    outputs: Vec<PortBuffer>,
    /// Cleared at construction, never written afterwards.
    void_input: Box<[f32]>,
    /// Scratch for out-of-range output requests; never copied to the host.
    void_output: Box<[f32]>,
    block_length: usize,
}

impl PortBufferPool {
    /// Allocate buffers for `port_count` ports.
    ///
    /// This is the only allocation the pool ever performs. Call it from the
    /// configuration thread.
    pub fn new(port_count: usize) -> Self {
        Self {
            inputs: (0..port_count).map(|_| PortBuffer::new()).collect(),
            outputs: (0..port_count).map(|_| PortBuffer::new()).collect(),
            void_input: vec![0.0; PORT_BUFFER_LEN].into_boxed_slice(),
            void_output: vec![0.0; PORT_BUFFER_LEN].into_boxed_slice(),
            block_length: 0,
        }
    }

    /// Number of real (non-void) ports.
    #[inline]
    pub fn port_count(&self) -> usize {
        self.inputs.len()
    }

    /// Block length recorded by the last [`prepare`](Self::prepare).
    #[inline]
    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Start a block.
    ///
    /// Resets every `prepared` flag and records the block length, clamped to
    /// [`MAX_BLOCK_LENGTH`]. The returned [`PreparedBlock`] is the only way to
    /// reach port buffers until it is committed.
    pub fn prepare<'a>(
        &'a mut self,
        block_length: usize,
        host: &'a mut dyn HostBuffer,
        capabilities: &'a ChannelCapabilities,
        diagnostics: &'a mut Diagnostics,
    ) -> PreparedBlock<'a> {
        self.block_length = block_length.min(MAX_BLOCK_LENGTH);
        for buffer in self.inputs.iter_mut().chain(self.outputs.iter_mut()) {
            buffer.prepared = false;
        }

        PreparedBlock {
            pool: self,
            host,
            capabilities,
            diagnostics,
        }
    }
}

/// Port access for one block.
pub struct PreparedBlock<'a> {
    pool: &'a mut PortBufferPool,
    host: &'a mut dyn HostBuffer,
    capabilities: &'a ChannelCapabilities,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> PreparedBlock<'a> {
    /// Frames in this block.
    #[inline]
    pub fn block_length(&self) -> usize {
        self.pool.block_length
    }

    /// Number of real ports.
    #[inline]
    pub fn port_count(&self) -> usize {
        self.pool.port_count()
    }

    /// Channel capabilities this block was prepared with.
    #[inline]
    pub fn capabilities(&self) -> &ChannelCapabilities {
        self.capabilities
    }

    /// Interleaved input samples for `port`.
    ///
    /// Returns `block_length * 2` samples for a valid port, or the full-size
    /// Void buffer for an out-of-range one.
    pub fn input(&mut self, port: PortIndex) -> &[f32] {
        let pool = &mut *self.pool;
        let len = pool.block_length * PORT_CHANNELS;
        input_slot(
            &mut pool.inputs,
            &pool.void_input,
            port,
            len,
            &*self.host,
            self.capabilities,
            self.diagnostics,
        )
    }

    /// Interleaved output samples for `port`, zeroed on first access.
    ///
    /// Out-of-range ports get the Void output buffer, whose contents are
    /// discarded.
    pub fn output(&mut self, port: PortIndex) -> &mut [f32] {
        let pool = &mut *self.pool;
        let len = pool.block_length * PORT_CHANNELS;
        output_slot(
            &mut pool.outputs,
            &mut pool.void_output,
            port,
            len,
            self.capabilities,
            self.diagnostics,
        )
    }

    /// Input and output buffers in one call.
    pub fn buffers(
        &mut self,
        input_port: PortIndex,
        output_port: PortIndex,
    ) -> (&[f32], &mut [f32]) {
        let pool = &mut *self.pool;
        let len = pool.block_length * PORT_CHANNELS;
        let input = input_slot(
            &mut pool.inputs,
            &pool.void_input,
            input_port,
            len,
            &*self.host,
            self.capabilities,
            self.diagnostics,
        );
        let output = output_slot(
            &mut pool.outputs,
            &mut pool.void_output,
            output_port,
            len,
            self.capabilities,
            self.diagnostics,
        );
        (input, output)
    }

    /// Copy prepared outputs back to the host and end the block.
    ///
    /// Walks every host output channel in delivery order. Channel `c` takes
    /// side `c % 2` of port `c / 2`. Channels without a prepared port, and
    /// frames beyond the block length, are zero-filled. A channel shorter than
    /// the block is zeroed as far as it reaches.
    pub fn commit(self) {
        let PreparedBlock {
            pool,
            host,
            capabilities,
            ..
        } = self;
        let frames = pool.block_length;
        let usable = capabilities.channel_count(Direction::Output);

        for channel in 0..host.output_channel_count() {
            let Some(dst) = host.output_mut(channel) else {
                host.clear_output(channel);
                continue;
            };
            let source = if channel < usable {
                pool.outputs
                    .get(channel / PORT_CHANNELS)
                    .filter(|buffer| buffer.prepared)
            } else {
                None
            };

            match source {
                Some(buffer) => {
                    let side = channel % PORT_CHANNELS;
                    let n = frames.min(dst.len());
                    for (sample, frame) in dst[..n]
                        .iter_mut()
                        .zip(buffer.samples.chunks_exact(PORT_CHANNELS))
                    {
                        *sample = frame[side];
                    }
                    dst[n..].fill(0.0);
                }
                None => dst.fill(0.0),
            }
        }
    }
}

fn input_slot<'p>(
    inputs: &'p mut [PortBuffer],
    void: &'p [f32],
    port: PortIndex,
    len: usize,
    host: &dyn HostBuffer,
    capabilities: &ChannelCapabilities,
    diagnostics: &mut Diagnostics,
) -> &'p [f32] {
    let port_count = inputs.len();
    let Some(buffer) = inputs.get_mut(port) else {
        if diagnostics.record(Fault::InputRange) {
            log::warn!(
                "Input port {} out of range ({} ports); using void buffer",
                port,
                port_count
            );
        }
        return void;
    };

    if !buffer.prepared {
        let dst = &mut buffer.samples[..len];
        let pair = capabilities.resolve(Direction::Input, port);
        let left = pair.and_then(|p| host.input(p.left));
        match (pair, left) {
            (Some(pair), Some(left)) => {
                let right = host.input(pair.right).unwrap_or(left);
                interleave(dst, left, right);
            }
            _ => {
                if diagnostics.record(Fault::InputUnmapped) {
                    log::warn!(
                        "Input port {} has no channels in this block ({} delivered); reading silence",
                        port,
                        capabilities.channel_count(Direction::Input)
                    );
                }
                dst.fill(0.0);
            }
        }
        buffer.prepared = true;
    }

    &buffer.samples[..len]
}

fn output_slot<'p>(
    outputs: &'p mut [PortBuffer],
    void: &'p mut [f32],
    port: PortIndex,
    len: usize,
    capabilities: &ChannelCapabilities,
    diagnostics: &mut Diagnostics,
) -> &'p mut [f32] {
    let port_count = outputs.len();
    let Some(buffer) = outputs.get_mut(port) else {
        if diagnostics.record(Fault::OutputRange) {
            log::warn!(
                "Output port {} out of range ({} ports); writes discarded",
                port,
                port_count
            );
        }
        return void;
    };

    if !buffer.prepared {
        if capabilities.resolve(Direction::Output, port).is_none()
            && diagnostics.record(Fault::OutputUnmapped)
        {
            log::warn!(
                "Output port {} has no channels in this block ({} delivered); writes discarded",
                port,
                capabilities.channel_count(Direction::Output)
            );
        }
        buffer.samples[..len].fill(0.0);
        buffer.prepared = true;
    }

    &mut buffer.samples[..len]
}

/// Interleave two channels into `dst` (L, R, L, R, ...).
///
/// Frames the sources do not cover are zeroed.
fn interleave(dst: &mut [f32], left: &[f32], right: &[f32]) {
    let mut written = 0;
    for ((frame, &l), &r) in dst.chunks_exact_mut(PORT_CHANNELS).zip(left).zip(right) {
        frame[0] = l;
        frame[1] = r;
        written += PORT_CHANNELS;
    }
    dst[written..].fill(0.0);
}
