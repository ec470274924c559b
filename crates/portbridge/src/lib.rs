//! # portbridge
//!
//! Real-time audio I/O bridging for Rust.
//!
//! Converts a host's native multi-channel callback into a fixed set of
//! interleaved stereo ports, captures host transport once per block, and
//! hands both to an engine through a single [`Listener`](prelude::Listener)
//! call per block.
//!
//! ## Architecture
//!
//! ```text
//! Device driver (pull)          Plugin host (push)
//!        |                             |
//! DeviceStream<D>               PluginStream<B>
//!        \                             /
//!         +------- StreamCore --------+
//!                      |
//!                 Your Listener
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use portbridge::prelude::*;
//!
//! struct Gain(f32);
//!
//! impl Listener for Gain {
//!     fn process_block(&mut self, stream: &mut StreamHandle<'_>) {
//!         let (input, output) = stream.buffers(0, 0);
//!         for (o, i) in output.iter_mut().zip(input) {
//!             *o = i * self.0;
//!         }
//!     }
//! }
//!
//! let mut stream = DeviceStream::with_default_ports(FixedDevice::stereo()).unwrap();
//! stream.set_listener(Gain(0.5));
//! stream.prepare(64, 48_000.0).unwrap();
//!
//! let left = [1.0f32; 64];
//! let right = [1.0f32; 64];
//! let inputs: [&[f32]; 2] = [&left, &right];
//! let mut out_l = [0.0f32; 64];
//! let mut out_r = [0.0f32; 64];
//! let mut outputs: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
//!
//! stream.deliver_block(&mut DeviceBlock::new(&inputs, &mut outputs, 64));
//! assert_eq!(out_l[0], 0.5);
//! ```

// Re-export sub-crates
pub use portbridge_core as core;
pub use portbridge_device as device;
pub use portbridge_plugin as plugin;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use portbridge::prelude::*;
/// ```
pub mod prelude {
    pub use portbridge_core::{
        // Lifecycle and engine boundary
        HostStream, Listener, PlayHead, StreamHandle, StreamState,
        // Configuration and errors
        BridgeConfig, BridgeError, BridgeResult,
        // Channels and buffers
        ChannelBuffers, ChannelMask, HostBuffer,
        // Transport
        HostPosition, TempoSmoother, TransportSnapshot,
        // MIDI
        MidiBuffer, MidiEvent,
        // Diagnostics
        DiagnosticsSnapshot,
    };

    // Pull convention
    pub use portbridge_device::{DeviceBlock, DeviceCapabilities, DeviceStream, FixedDevice};

    // Push convention
    pub use portbridge_plugin::{BusInfo, BusTotals, BusType, CachedBusConfig, PluginStream};
}
