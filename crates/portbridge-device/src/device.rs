//! Device capability collaborator.

use portbridge_core::ChannelMask;

/// Reports which hardware channels the user has enabled.
///
/// Queried once per block on the audio thread, so implementations must
/// return cached values without blocking.
pub trait DeviceCapabilities: Send {
    /// Active input channels.
    fn active_inputs(&self) -> ChannelMask;

    /// Active output channels.
    fn active_outputs(&self) -> ChannelMask;
}

/// A device with fixed active-channel masks.
///
/// Useful for bring-up and tests, or for hosts that configure channels once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDevice {
    inputs: ChannelMask,
    outputs: ChannelMask,
}

impl FixedDevice {
    pub const fn new(inputs: ChannelMask, outputs: ChannelMask) -> Self {
        Self { inputs, outputs }
    }

    /// Channels 0 and 1 active in both directions.
    pub const fn stereo() -> Self {
        Self::new(ChannelMask::contiguous(2), ChannelMask::contiguous(2))
    }

    pub fn set_active_inputs(&mut self, inputs: ChannelMask) {
        self.inputs = inputs;
    }

    pub fn set_active_outputs(&mut self, outputs: ChannelMask) {
        self.outputs = outputs;
    }
}

impl Default for FixedDevice {
    fn default() -> Self {
        Self::stereo()
    }
}

impl DeviceCapabilities for FixedDevice {
    fn active_inputs(&self) -> ChannelMask {
        self.inputs
    }

    fn active_outputs(&self) -> ChannelMask {
        self.outputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_default() {
        let device = FixedDevice::default();
        assert_eq!(device.active_inputs().bits(), 0b11);
        assert_eq!(device.active_outputs().bits(), 0b11);
    }

    #[test]
    fn test_set_masks() {
        let mut device = FixedDevice::stereo();
        device.set_active_inputs(ChannelMask::from_bits(0b0101));
        assert!(device.active_inputs().is_active(2));
        assert!(!device.active_inputs().is_active(1));
    }
}
