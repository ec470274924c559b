//! # portbridge-plugin
//!
//! Push-convention adapter: plugin hosts that call
//! `prepare(sample_rate, block_length)`, then push a fixed-channel-count
//! buffer plus a MIDI event buffer on every process call.
//!
//! ```text
//! plugin host -> PluginStream::deliver_block(buffers, midi)
//!                  -> BusTotals (negotiated channel totals)
//!                  -> StreamCore::process -> Listener
//! ```
//!
//! With the `vst3` feature, [`vst3_io`] converts raw VST3 `ProcessData` into
//! stream blocks.

pub mod bus;
pub mod stream;
#[cfg(feature = "vst3")]
pub mod vst3_io;

pub use bus::{BusInfo, BusTotals, BusType, CachedBusConfig};
pub use stream::PluginStream;
#[cfg(feature = "vst3")]
pub use vst3_io::{deliver_process_data, midi_from_event_list, position_from_context};
