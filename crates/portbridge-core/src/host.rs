//! Views over host-owned, non-interleaved channel buffers.
//!
//! Hosts deliver audio as one slice per physical channel. [`HostBuffer`]
//! abstracts that shape so the port pool never sees a format-specific struct,
//! and [`ChannelBuffers`] implements it over borrowed slices with an optional
//! frame window (start offset plus length).

/// A host's block buffer, as seen by the port pool.
///
/// Channels are addressed by their physical index in delivery order.
/// Returning `None` means the channel is absent for this block.
pub trait HostBuffer {
    /// Number of frames in this block.
    fn frames(&self) -> usize;

    /// Number of input channels delivered.
    fn input_channel_count(&self) -> usize;

    /// Number of output channels delivered.
    fn output_channel_count(&self) -> usize;

    /// Samples of input `channel`, exactly [`frames`](Self::frames) long.
    fn input(&self, channel: usize) -> Option<&[f32]>;

    /// Samples of output `channel`, exactly [`frames`](Self::frames) long.
    fn output_mut(&mut self, channel: usize) -> Option<&mut [f32]>;

    /// Zero whatever part of output `channel` lies inside this block.
    ///
    /// Unlike [`output_mut`](Self::output_mut) this also reaches a channel
    /// that is shorter than the block, so no stale samples are left behind.
    fn clear_output(&mut self, channel: usize) {
        if let Some(out) = self.output_mut(channel) {
            out.fill(0.0);
        }
    }

    /// Zero every delivered output channel.
    fn silence_outputs(&mut self) {
        for channel in 0..self.output_channel_count() {
            self.clear_output(channel);
        }
    }
}

/// Borrowed channel slices with a frame window.
///
/// `'a` is the borrow of the channel arrays, `'b` the borrow of the sample
/// data. A channel whose slice does not cover `start..start + frames` is
/// reported as absent.
pub struct ChannelBuffers<'a, 'b> {
    inputs: &'a [&'b [f32]],
    outputs: &'a mut [&'b mut [f32]],
    start: usize,
    frames: usize,
}

impl<'a, 'b> ChannelBuffers<'a, 'b> {
    /// View the first `frames` frames of every channel.
    pub fn new(inputs: &'a [&'b [f32]], outputs: &'a mut [&'b mut [f32]], frames: usize) -> Self {
        Self::with_window(inputs, outputs, 0, frames)
    }

    /// View `frames` frames starting at `start` in every channel.
    pub fn with_window(
        inputs: &'a [&'b [f32]],
        outputs: &'a mut [&'b mut [f32]],
        start: usize,
        frames: usize,
    ) -> Self {
        Self {
            inputs,
            outputs,
            start,
            frames,
        }
    }

    /// First frame of the window.
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    fn window(&self) -> Option<std::ops::Range<usize>> {
        Some(self.start..self.start.checked_add(self.frames)?)
    }
}

impl HostBuffer for ChannelBuffers<'_, '_> {
    #[inline]
    fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    fn input_channel_count(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    fn output_channel_count(&self) -> usize {
        self.outputs.len()
    }

    fn input(&self, channel: usize) -> Option<&[f32]> {
        let window = self.window()?;
        self.inputs.get(channel)?.get(window)
    }

    fn output_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        let window = self.window()?;
        self.outputs.get_mut(channel)?.get_mut(window)
    }

    fn clear_output(&mut self, channel: usize) {
        let start = self.start;
        let end = start.saturating_add(self.frames);
        if let Some(out) = self.outputs.get_mut(channel) {
            let end = end.min(out.len());
            if let Some(covered) = out.get_mut(start.min(end)..end) {
                covered.fill(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_counts() {
        let a = [0.0f32; 8];
        let inputs: [&[f32]; 2] = [&a, &a];
        let mut o0 = [0.0f32; 8];
        let mut outputs: [&mut [f32]; 1] = [&mut o0];
        let buffers = ChannelBuffers::new(&inputs, &mut outputs, 8);

        assert_eq!(buffers.frames(), 8);
        assert_eq!(buffers.input_channel_count(), 2);
        assert_eq!(buffers.output_channel_count(), 1);
        assert!(buffers.input(2).is_none());
    }

    #[test]
    fn test_window_offsets_access() {
        let a = [0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0];
        let inputs: [&[f32]; 1] = [&a];
        let mut o0 = [0.0f32; 6];
        {
            let mut outputs: [&mut [f32]; 1] = [&mut o0];
            let mut buffers = ChannelBuffers::with_window(&inputs, &mut outputs, 2, 3);

            assert_eq!(buffers.start(), 2);
            assert_eq!(buffers.input(0), Some(&[2.0f32, 3.0, 4.0][..]));
            buffers.output_mut(0).unwrap().fill(9.0);
        }
        assert_eq!(o0, [0.0, 0.0, 9.0, 9.0, 9.0, 0.0]);
    }

    #[test]
    fn test_short_channel_is_absent() {
        let long = [1.0f32; 16];
        let short = [1.0f32; 4];
        let inputs: [&[f32]; 2] = [&long, &short];
        let mut outputs: [&mut [f32]; 0] = [];
        let buffers = ChannelBuffers::new(&inputs, &mut outputs, 8);

        assert!(buffers.input(0).is_some());
        assert!(buffers.input(1).is_none());
    }

    #[test]
    fn test_silence_outputs() {
        let inputs: [&[f32]; 0] = [];
        let mut o0 = [1.0f32; 4];
        let mut o1 = [1.0f32; 4];
        {
            let mut outputs: [&mut [f32]; 2] = [&mut o0, &mut o1];
            let mut buffers = ChannelBuffers::new(&inputs, &mut outputs, 4);
            buffers.silence_outputs();
        }
        assert_eq!(o0, [0.0; 4]);
        assert_eq!(o1, [0.0; 4]);
    }

    #[test]
    fn test_silence_reaches_short_channel() {
        let inputs: [&[f32]; 0] = [];
        let mut full = [1.0f32; 8];
        let mut short = [1.0f32; 5];
        {
            let mut outputs: [&mut [f32]; 2] = [&mut full, &mut short];
            let mut buffers = ChannelBuffers::with_window(&inputs, &mut outputs, 2, 6);
            assert!(buffers.output_mut(1).is_none());
            buffers.silence_outputs();
        }
        assert_eq!(full, [1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(short, [1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clear_output_past_window_start_is_noop() {
        let inputs: [&[f32]; 0] = [];
        let mut tiny = [1.0f32; 2];
        {
            let mut outputs: [&mut [f32]; 1] = [&mut tiny];
            let mut buffers = ChannelBuffers::with_window(&inputs, &mut outputs, 4, 4);
            buffers.clear_output(0);
            buffers.clear_output(3);
        }
        assert_eq!(tiny, [1.0, 1.0]);
    }
}
