//! Stream configuration.
//!
//! [`BridgeConfig`] is read once when a stream is constructed and is immutable
//! afterwards. The port count in particular never changes while a stream runs.
//!
//! # Example
//!
//! ```
//! use portbridge_core::BridgeConfig;
//!
//! pub static CONFIG: BridgeConfig = BridgeConfig::new()
//!     .with_port_count(4)
//!     .with_input_latency(64)
//!     .with_output_latency(128);
//!
//! assert!(CONFIG.validate().is_ok());
//! ```

use crate::error::{BridgeError, BridgeResult};
use crate::types::{DEFAULT_PORT_COUNT, MAX_PORTS};

/// Format-agnostic stream configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Number of logical stereo ports exposed to the engine.
    pub port_count: usize,

    /// Input latency in frames, reported to the engine.
    pub input_latency: u32,

    /// Output latency in frames, reported to the engine.
    pub output_latency: u32,
}

impl BridgeConfig {
    /// Create a configuration with the default port count and no latency.
    pub const fn new() -> Self {
        Self {
            port_count: DEFAULT_PORT_COUNT,
            input_latency: 0,
            output_latency: 0,
        }
    }

    /// Derive the port count from an auxiliary bus count.
    ///
    /// The main bus is port 0 and every aux bus adds one port. The result is
    /// clamped to [`MAX_PORTS`].
    pub const fn from_aux_buses(aux_bus_count: usize) -> Self {
        let ports = aux_bus_count.saturating_add(1);
        Self::new().with_port_count(if ports > MAX_PORTS { MAX_PORTS } else { ports })
    }

    /// Set the port count.
    pub const fn with_port_count(mut self, port_count: usize) -> Self {
        self.port_count = port_count;
        self
    }

    /// Set the reported input latency.
    pub const fn with_input_latency(mut self, frames: u32) -> Self {
        self.input_latency = frames;
        self
    }

    /// Set the reported output latency.
    pub const fn with_output_latency(mut self, frames: u32) -> Self {
        self.output_latency = frames;
        self
    }

    /// Check the configuration against compile-time limits.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.port_count == 0 {
            return Err(BridgeError::InvalidConfiguration(
                "port count must be at least 1".to_string(),
            ));
        }
        if self.port_count > MAX_PORTS {
            return Err(BridgeError::LimitExceeded(format!(
                "{} ports requested, but MAX_PORTS is {}",
                self.port_count, MAX_PORTS
            )));
        }
        Ok(())
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}
