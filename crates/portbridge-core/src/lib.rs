//! # portbridge-core
//!
//! Real-time audio I/O bridging between a host's native multi-channel
//! callback and a fixed set of interleaved stereo ports.
//!
//! This crate is format-agnostic. Host adapters (`portbridge-device`,
//! `portbridge-plugin`) translate their calling convention into
//! [`StreamCore`] calls and describe each block's channels with
//! [`ChannelCapabilities`]. Nothing on the block path allocates, locks or
//! returns an error; faults degrade to silence and are recorded in
//! [`Diagnostics`].
//!
//! ## Data Flow
//!
//! ```text
//! host block -> StreamCore::process
//!                 -> TransportSynchronizer::capture
//!                 -> PortBufferPool::prepare (interleave on first touch)
//!                 -> Listener::process_block (reads/writes ports)
//!                 -> PreparedBlock::commit   (de-interleave, zero the rest)
//!            -> host
//! ```
//!
//! ## Main Types
//!
//! - [`StreamCore`] - Lifecycle state machine and block sequencing
//! - [`Listener`] - Downstream engine, called once per block
//! - [`StreamHandle`] - The engine's view of one block
//! - [`ChannelCapabilities`] - Channel counts, active channels, port mapping
//! - [`PortBufferPool`] - Pre-allocated interleaved port buffers
//! - [`TransportSynchronizer`] - Host position to [`TransportSnapshot`]
//! - [`MidiBuffer`] - Fixed-capacity MIDI side channel
//! - [`BridgeConfig`] - Port count and latency
//! - [`BridgeError`] - Configuration errors

pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod midi;
pub mod port_pool;
pub mod stream;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use channel::{CapabilityModel, ChannelCapabilities, ChannelMask, Direction, StereoPair};
pub use config::BridgeConfig;
pub use diagnostics::{Diagnostics, DiagnosticsSnapshot, Fault, OneShot};
pub use error::{BridgeError, BridgeResult};
pub use host::{ChannelBuffers, HostBuffer};
pub use midi::{MidiBuffer, MidiEvent, MAX_MIDI_EVENTS};
pub use port_pool::{PortBufferPool, PreparedBlock};
pub use stream::{HostStream, Listener, PlayHead, StreamCore, StreamHandle, StreamState};
pub use transport::{
    HostPosition, PassThroughTempo, TempoSmoother, TransportSnapshot, TransportSynchronizer,
};
pub use types::{
    PortIndex, SampleRate, DEFAULT_PORT_COUNT, MAX_BLOCK_LENGTH, MAX_HOST_CHANNELS, MAX_PORTS,
    PORT_BUFFER_LEN, PORT_CHANNELS,
};
