//! Channel capability model.
//!
//! Answers "how many channels exist and which are active" for each direction,
//! and maps a logical port onto a stereo pair of physical channels.
//!
//! # Models
//!
//! - [`CapabilityModel::FixedBus`]: channel counts come from the host's bus
//!   negotiation and are constant for the callback. Every channel is usable.
//! - [`CapabilityModel::ActiveBitmap`]: a device reports an active-channel
//!   bitmap that may contain gaps. The authoritative channel count is always
//!   the number of channels actually delivered in the block, never the
//!   position of the highest active bit.
//!
//! # Port Resolution
//!
//! Port `P` uses channels `2P` (left) and `2P + 1` (right). A port whose left
//! channel is not delivered is unmapped (silence). If only the left channel
//! exists, it is duplicated into the right slot.
//!
//! Under the bitmap model, input port 0 instead takes the two lowest *active*
//! channels, because users commonly enable non-contiguous hardware inputs.
//! Higher ports keep literal offsets. Output resolution is always literal,
//! matching the channel walk performed when a block is committed.

use crate::types::{PortIndex, MAX_HOST_CHANNELS, PORT_CHANNELS};

/// Direction of audio flow relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to engine.
    Input,
    /// Engine to host.
    Output,
}

// =============================================================================
// ChannelMask
// =============================================================================

/// Bit vector of active physical channels (bit N = channel N).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct ChannelMask(u64);

impl ChannelMask {
    /// No active channels.
    pub const EMPTY: Self = Self(0);

    /// Create a mask from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask with the first `count` channels active.
    pub const fn contiguous(count: usize) -> Self {
        if count >= MAX_HOST_CHANNELS {
            Self(u64::MAX)
        } else {
            Self((1u64 << count) - 1)
        }
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns a copy with `channel` marked active.
    ///
    /// Channels at or beyond [`MAX_HOST_CHANNELS`] are ignored.
    #[inline]
    pub const fn with(self, channel: usize) -> Self {
        if channel < MAX_HOST_CHANNELS {
            Self(self.0 | (1u64 << channel))
        } else {
            self
        }
    }

    /// Whether `channel` is active.
    #[inline]
    pub const fn is_active(self, channel: usize) -> bool {
        channel < MAX_HOST_CHANNELS && self.0 & (1u64 << channel) != 0
    }

    /// Number of active channels.
    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Active channels below `limit`, in ascending order.
    pub fn active_below(self, limit: usize) -> impl Iterator<Item = usize> {
        (0..limit.min(MAX_HOST_CHANNELS)).filter(move |&ch| self.is_active(ch))
    }
}

// =============================================================================
// StereoPair
// =============================================================================

/// Physical channels backing one port for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StereoPair {
    pub left: usize,
    pub right: usize,
}

impl StereoPair {
    /// True when the right slot duplicates the left channel.
    #[inline]
    pub fn is_mono(&self) -> bool {
        self.left == self.right
    }
}

// =============================================================================
// ChannelCapabilities
// =============================================================================

/// How channel availability is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityModel {
    /// Channel counts negotiated with the host; all channels usable.
    FixedBus,
    /// Active-channel bitmap reported by a device.
    ActiveBitmap,
}

/// Channel availability for one block.
///
/// Built by the adapter from its host collaborator and passed explicitly into
/// block preparation. Call [`with_delivered`](Self::with_delivered) with the
/// channel counts of the block's buffer before resolving ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCapabilities {
    model: CapabilityModel,
    input_channels: usize,
    output_channels: usize,
    input_active: ChannelMask,
    output_active: ChannelMask,
}

impl ChannelCapabilities {
    /// Capabilities from negotiated bus totals.
    pub fn fixed_bus(input_channels: usize, output_channels: usize) -> Self {
        Self {
            model: CapabilityModel::FixedBus,
            input_channels,
            output_channels,
            input_active: ChannelMask::contiguous(input_channels),
            output_active: ChannelMask::contiguous(output_channels),
        }
    }

    /// Capabilities from a device's active-channel bitmaps.
    ///
    /// Channel counts start at zero; they are only known once a block
    /// arrives.
    pub fn active_bitmap(input_active: ChannelMask, output_active: ChannelMask) -> Self {
        Self {
            model: CapabilityModel::ActiveBitmap,
            input_channels: 0,
            output_channels: 0,
            input_active,
            output_active,
        }
    }

    /// Apply the channel counts actually delivered in the block.
    ///
    /// For the fixed-bus model the usable count is the smaller of the
    /// negotiated and delivered widths. For the bitmap model the delivered
    /// width is authoritative.
    pub fn with_delivered(mut self, delivered_inputs: usize, delivered_outputs: usize) -> Self {
        match self.model {
            CapabilityModel::FixedBus => {
                self.input_channels = self.input_channels.min(delivered_inputs);
                self.output_channels = self.output_channels.min(delivered_outputs);
            }
            CapabilityModel::ActiveBitmap => {
                self.input_channels = delivered_inputs;
                self.output_channels = delivered_outputs;
            }
        }
        self
    }

    /// The capability model in use.
    #[inline]
    pub fn model(&self) -> CapabilityModel {
        self.model
    }

    /// Number of usable channels in `direction`.
    #[inline]
    pub fn channel_count(&self, direction: Direction) -> usize {
        match direction {
            Direction::Input => self.input_channels,
            Direction::Output => self.output_channels,
        }
    }

    /// Active-channel mask in `direction`.
    #[inline]
    pub fn active(&self, direction: Direction) -> ChannelMask {
        match direction {
            Direction::Input => self.input_active,
            Direction::Output => self.output_active,
        }
    }

    /// Resolve the physical channels for `port` in `direction`.
    ///
    /// Returns `None` when the port is unmapped for this block.
    pub fn resolve(&self, direction: Direction, port: PortIndex) -> Option<StereoPair> {
        let available = self.channel_count(direction);
        if self.model == CapabilityModel::ActiveBitmap && direction == Direction::Input && port == 0
        {
            return lowest_active_pair(self.input_active, available);
        }
        literal_pair(port, available)
    }
}

/// Literal-offset resolution: channels `2P` and `2P + 1`.
fn literal_pair(port: PortIndex, available: usize) -> Option<StereoPair> {
    let left = port.checked_mul(PORT_CHANNELS)?;
    if left >= available {
        return None;
    }
    let right = if left + 1 < available { left + 1 } else { left };
    Some(StereoPair { left, right })
}

/// The two lowest active channels below `available`.
fn lowest_active_pair(mask: ChannelMask, available: usize) -> Option<StereoPair> {
    let mut active = mask.active_below(available);
    let left = active.next()?;
    let right = active.next().unwrap_or(left);
    Some(StereoPair { left, right })
}
