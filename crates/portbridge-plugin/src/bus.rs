//! Bus configuration for the push convention.
//!
//! The plugin host negotiates a main bus plus optional auxiliary buses.
//! [`CachedBusConfig`] stores that layout once, at setup time, and answers the
//! two questions the stream needs:
//!
//! - how many ports to allocate (main bus plus one per aux bus)
//! - how many channels exist in total, queried at every block through
//!   [`BusTotals`]

use portbridge_core::{BridgeError, BridgeResult, MAX_HOST_CHANNELS, MAX_PORTS};

/// Processor collaborator reporting negotiated channel totals.
///
/// Called once per block on the audio thread.
pub trait BusTotals: Send {
    /// Input channels summed over every input bus.
    fn total_input_channels(&self) -> usize;

    /// Output channels summed over every output bus.
    fn total_output_channels(&self) -> usize;

    /// Number of auxiliary buses (the wider of the two directions).
    fn aux_bus_count(&self) -> usize;

    /// Check the reported layout against [`MAX_PORTS`] and
    /// [`MAX_HOST_CHANNELS`].
    fn check_limits(&self) -> BridgeResult<()> {
        let ports = self.aux_bus_count().saturating_add(1);
        if ports > MAX_PORTS {
            return Err(BridgeError::LimitExceeded(format!(
                "{} buses exceed MAX_PORTS ({})",
                ports, MAX_PORTS
            )));
        }
        let widest = self.total_input_channels().max(self.total_output_channels());
        if widest > MAX_HOST_CHANNELS {
            return Err(BridgeError::LimitExceeded(format!(
                "{} channels exceed MAX_HOST_CHANNELS ({})",
                widest, MAX_HOST_CHANNELS
            )));
        }
        Ok(())
    }
}

/// Bus type classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusType {
    /// Main bus (bus 0, always present)
    Main,
    /// Auxiliary bus (sidechain, additional outputs, etc.)
    Auxiliary,
}

/// Information about a single audio bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusInfo {
    /// Number of channels in this bus
    pub channel_count: usize,
    pub bus_type: BusType,
}

impl BusInfo {
    pub const fn main(channel_count: usize) -> Self {
        Self {
            channel_count,
            bus_type: BusType::Main,
        }
    }

    pub const fn aux(channel_count: usize) -> Self {
        Self {
            channel_count,
            bus_type: BusType::Auxiliary,
        }
    }
}

/// Bus layout captured when the host configures the plugin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedBusConfig {
    pub input_buses: Vec<BusInfo>,
    pub output_buses: Vec<BusInfo>,
}

impl CachedBusConfig {
    pub fn new(input_buses: Vec<BusInfo>, output_buses: Vec<BusInfo>) -> Self {
        Self {
            input_buses,
            output_buses,
        }
    }

    /// Main stereo bus in each direction plus `aux` stereo aux buses.
    pub fn stereo_with_aux(aux: usize) -> Self {
        let buses = || -> Vec<BusInfo> {
            std::iter::once(BusInfo::main(2))
                .chain(std::iter::repeat(BusInfo::aux(2)).take(aux))
                .collect()
        };
        Self::new(buses(), buses())
    }

    #[inline]
    pub fn input_bus_count(&self) -> usize {
        self.input_buses.len()
    }

    #[inline]
    pub fn output_bus_count(&self) -> usize {
        self.output_buses.len()
    }

    /// Returns `None` if the bus index is out of bounds.
    pub fn input_bus_info(&self, bus: usize) -> Option<&BusInfo> {
        self.input_buses.get(bus)
    }

    /// Returns `None` if the bus index is out of bounds.
    pub fn output_bus_info(&self, bus: usize) -> Option<&BusInfo> {
        self.output_buses.get(bus)
    }

    /// Check the layout against the port and channel limits.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.input_bus_count() > MAX_PORTS {
            return Err(BridgeError::LimitExceeded(format!(
                "Input bus count {} exceeds MAX_PORTS ({})",
                self.input_bus_count(),
                MAX_PORTS
            )));
        }
        if self.output_bus_count() > MAX_PORTS {
            return Err(BridgeError::LimitExceeded(format!(
                "Output bus count {} exceeds MAX_PORTS ({})",
                self.output_bus_count(),
                MAX_PORTS
            )));
        }

        let inputs = self.total_input_channels();
        if inputs > MAX_HOST_CHANNELS {
            return Err(BridgeError::LimitExceeded(format!(
                "{} input channels exceed MAX_HOST_CHANNELS ({})",
                inputs, MAX_HOST_CHANNELS
            )));
        }
        let outputs = self.total_output_channels();
        if outputs > MAX_HOST_CHANNELS {
            return Err(BridgeError::LimitExceeded(format!(
                "{} output channels exceed MAX_HOST_CHANNELS ({})",
                outputs, MAX_HOST_CHANNELS
            )));
        }

        Ok(())
    }
}

impl BusTotals for CachedBusConfig {
    fn total_input_channels(&self) -> usize {
        self.input_buses.iter().map(|b| b.channel_count).sum()
    }

    fn total_output_channels(&self) -> usize {
        self.output_buses.iter().map(|b| b.channel_count).sum()
    }

    fn aux_bus_count(&self) -> usize {
        self.input_bus_count()
            .max(self.output_bus_count())
            .saturating_sub(1)
    }
}

impl Default for CachedBusConfig {
    /// Stereo in, stereo out, main bus only.
    fn default() -> Self {
        Self::stereo_with_aux(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CachedBusConfig::default();
        assert_eq!(config.input_bus_count(), 1);
        assert_eq!(config.output_bus_count(), 1);
        assert_eq!(config.total_input_channels(), 2);
        assert_eq!(config.total_output_channels(), 2);
        assert_eq!(config.aux_bus_count(), 0);
    }

    #[test]
    fn test_custom_config() {
        let config = CachedBusConfig::new(
            vec![BusInfo::main(2), BusInfo::aux(2)],
            vec![BusInfo::main(6)],
        );

        assert_eq!(config.total_input_channels(), 4);
        assert_eq!(config.total_output_channels(), 6);
        assert_eq!(config.aux_bus_count(), 1);
        assert_eq!(config.input_bus_info(1).map(|b| b.bus_type), Some(BusType::Auxiliary));
        assert!(config.output_bus_info(1).is_none());
    }

    #[test]
    fn test_stereo_with_aux() {
        let config = CachedBusConfig::stereo_with_aux(3);
        assert_eq!(config.input_bus_count(), 4);
        assert_eq!(config.total_output_channels(), 8);
        assert_eq!(config.aux_bus_count(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_limits() {
        let too_many_buses = CachedBusConfig::stereo_with_aux(MAX_PORTS);
        assert!(matches!(
            too_many_buses.validate(),
            Err(BridgeError::LimitExceeded(_))
        ));

        let too_wide = CachedBusConfig::new(vec![BusInfo::main(MAX_HOST_CHANNELS + 1)], vec![]);
        assert!(matches!(too_wide.validate(), Err(BridgeError::LimitExceeded(_))));
    }

    #[test]
    fn test_no_buses() {
        let config = CachedBusConfig::new(vec![], vec![]);
        assert_eq!(config.aux_bus_count(), 0);
        assert_eq!(config.total_input_channels(), 0);
    }
}
