//! # portbridge-device
//!
//! Pull-convention adapter: audio device drivers that call
//! `prepare(block_length, sample_rate)`, hand over a buffer structure with an
//! explicit start offset and length once per callback, and report channel
//! activity through a separate capability query.
//!
//! ```text
//! device driver -> DeviceStream::deliver_block(DeviceBlock)
//!                    -> DeviceCapabilities (active-channel bitmaps)
//!                    -> StreamCore::process -> Listener
//! ```

pub mod device;
pub mod stream;

pub use device::{DeviceCapabilities, FixedDevice};
pub use stream::{DeviceBlock, DeviceStream};
