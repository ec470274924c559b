//! Common types and limits used throughout portbridge.

// =============================================================================
// Real-Time Limits
// =============================================================================
//
// These constants are compile-time ceilings for everything that is allocated
// before streaming starts. Port buffers are sized from them once, during
// configuration, and are never reallocated on the audio thread.
//
// - 4096 frames: the largest block any supported host delivers in practice
// - 16 ports: one main stereo pair plus up to 15 auxiliary pairs
// - 64 host channels: width of the active-channel bitmap
// =============================================================================

/// Maximum number of frames in a single block.
///
/// Blocks longer than this are clamped; the extra host output frames are
/// zero-filled.
pub const MAX_BLOCK_LENGTH: usize = 4096;

/// Maximum number of logical ports.
pub const MAX_PORTS: usize = 16;

/// Port count used when the host does not derive one (pull convention).
pub const DEFAULT_PORT_COUNT: usize = 8;

/// Maximum number of physical host channels addressable by a [`ChannelMask`].
///
/// [`ChannelMask`]: crate::ChannelMask
pub const MAX_HOST_CHANNELS: usize = 64;

/// Number of interleaved channels in one port buffer (left, right).
pub const PORT_CHANNELS: usize = 2;

/// Number of floats physically held by every port buffer.
pub const PORT_BUFFER_LEN: usize = MAX_BLOCK_LENGTH * PORT_CHANNELS;

/// Logical port index.
pub type PortIndex = usize;

/// Sample rate in Hz.
pub type SampleRate = f64;
