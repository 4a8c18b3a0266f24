//! Machine configuration.

use serde::{Deserialize, Serialize};

/// Name of the 48K ROM resource handed to the [`RomProvider`](crate::RomProvider).
pub const DEFAULT_ROM_NAME: &str = "ZXSpectrum48.rom";

/// CPU clock of the 48K in Hz.
pub const CPU_FREQUENCY: u64 = 3_500_000;

/// Configuration for creating a [`Spectrum`](crate::Spectrum).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    /// ROM resource requested from the ROM provider at construction.
    pub rom_name: String,
    /// Frame tact at which INT is raised.
    pub interrupt_tact: u32,
    /// CPU clock in Hz, used to pace frames against the wall clock.
    pub cpu_frequency: u64,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            rom_name: DEFAULT_ROM_NAME.to_string(),
            interrupt_tact: 0,
            cpu_frequency: CPU_FREQUENCY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let config = SpectrumConfig {
            rom_name: "Custom.rom".to_string(),
            interrupt_tact: 14,
            cpu_frequency: 3_546_900,
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: SpectrumConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SpectrumConfig =
            serde_json::from_str(r#"{"interrupt_tact": 4}"#).expect("deserialize");
        assert_eq!(config.rom_name, DEFAULT_ROM_NAME);
        assert_eq!(config.interrupt_tact, 4);
        assert_eq!(config.cpu_frequency, CPU_FREQUENCY);
    }
}
