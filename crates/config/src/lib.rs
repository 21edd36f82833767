// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

/// Default chip clock rate in Hz (1 MHz, the board's free-running PHI).
pub const DEFAULT_CLOCK_RATE: u32 = 1_000_000;

/// Lowest accepted chip clock rate in Hz. Keeps the sequencer divider
/// math inside its 16.8 fixed-point range.
pub const MIN_CLOCK_RATE: u32 = 100_000;

/// Number of addressable chip sockets on the bus.
pub const MAX_SOCKETS: usize = 4;

/// Registers per socket (5 address lines + mirror bit on some variants).
pub const REGISTERS_PER_SOCKET: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChipModel {
    /// Genuine MOS 6581 silicon. Needs datasheet reset timing.
    #[serde(alias = "6581")]
    Mos6581,
    /// Genuine MOS 8580 silicon. Needs datasheet reset timing.
    #[serde(alias = "8580")]
    Mos8580,
    /// Hardware SID emulator (SwinSID, SKPico, ARMSID, ...).
    #[default]
    Emulated,
    /// Socket populated but chip family not configured.
    Unknown,
}

impl ChipModel {
    /// Genuine silicon needs the long reset hold; emulators do not.
    pub fn is_genuine(self) -> bool {
        matches!(self, ChipModel::Mos6581 | ChipModel::Mos8580)
    }
}

fn default_true() -> bool {
    true
}

fn default_address_mask() -> u8 {
    0x1F
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SocketConfig {
    #[serde(default)]
    pub chip: ChipModel,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Which address bits are physically wired for this socket. Fewer lines
    /// mean high registers alias lower ones (mirroring).
    #[serde(default = "default_address_mask")]
    pub address_mask: u8,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            chip: ChipModel::default(),
            enabled: true,
            address_mask: default_address_mask(),
        }
    }
}

fn default_clock_rate() -> u32 {
    DEFAULT_CLOCK_RATE
}

fn default_sockets() -> Vec<SocketConfig> {
    vec![SocketConfig::default(), SocketConfig::default()]
}

fn default_active_chips() -> u8 {
    2
}

fn default_name() -> String {
    "sidbus".to_string()
}

/// Board-level configuration consumed by the bus controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    #[serde(default = "default_name")]
    pub name: String,
    /// Chip clock rate in Hz (PAL 985248, NTSC 1022727, or a free-running
    /// 1 MHz). Changing this requires a full bus resynchronization.
    #[serde(default = "default_clock_rate")]
    pub clock_rate: u32,
    #[serde(default = "default_sockets")]
    pub sockets: Vec<SocketConfig>,
    /// How many chips the host addresses. Bounded by the socket count.
    #[serde(default = "default_active_chips")]
    pub active_chips: u8,
    /// Treat the dual sockets as a single chip-select domain (SKPico-style
    /// boards where one socket answers for two address regions).
    #[serde(default)]
    pub mirror_dual_socket: bool,
    /// Activity LED. The LED driver itself lives outside the bus core; the
    /// flag is carried here so the transport layer can read it.
    #[serde(default = "default_true")]
    pub led_enabled: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: default_name(),
            clock_rate: DEFAULT_CLOCK_RATE,
            sockets: default_sockets(),
            active_chips: default_active_chips(),
            mirror_dual_socket: false,
            led_enabled: true,
        }
    }
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board config {:?}", path))?;
        let config: Self =
            serde_yaml::from_str(&content).context("Failed to parse board config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_rate < MIN_CLOCK_RATE {
            bail!(
                "clock_rate must be at least {} Hz, got {}",
                MIN_CLOCK_RATE,
                self.clock_rate
            );
        }
        if self.sockets.is_empty() {
            bail!("at least one socket must be configured");
        }
        if self.sockets.len() > MAX_SOCKETS {
            bail!(
                "at most {} sockets are supported, got {}",
                MAX_SOCKETS,
                self.sockets.len()
            );
        }
        if self.active_chips as usize > MAX_SOCKETS {
            bail!("active_chips must be at most {}", MAX_SOCKETS);
        }
        for (i, socket) in self.sockets.iter().enumerate() {
            if socket.address_mask > 0x1F {
                bail!(
                    "socket {} address_mask {:#04x} exceeds the 5 wired address lines",
                    i,
                    socket.address_mask
                );
            }
        }
        tracing::debug!(
            "Board config '{}' valid: {} sockets, {} Hz",
            self.name,
            self.sockets.len(),
            self.clock_rate
        );
        Ok(())
    }

    pub fn socket(&self, index: usize) -> Option<&SocketConfig> {
        self.sockets.get(index)
    }

    /// True when any populated socket carries genuine MOS silicon.
    pub fn has_genuine_chip(&self) -> bool {
        self.sockets
            .iter()
            .any(|s| s.enabled && s.chip.is_genuine())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.clock_rate, DEFAULT_CLOCK_RATE);
        assert_eq!(config.sockets.len(), 2);
        assert!(config.validate().is_ok());
        assert!(!config.has_genuine_chip());
    }

    #[test]
    fn test_genuine_detection() {
        let mut config = BoardConfig::default();
        config.sockets[1].chip = ChipModel::Mos8580;
        assert!(config.has_genuine_chip());

        config.sockets[1].enabled = false;
        assert!(!config.has_genuine_chip());
    }

    #[test]
    fn test_zero_clock_rejected() {
        let config = BoardConfig {
            clock_rate: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_below_minimum_clock_rejected() {
        let config = BoardConfig {
            clock_rate: MIN_CLOCK_RATE - 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BoardConfig {
            clock_rate: MIN_CLOCK_RATE,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wide_address_mask_rejected() {
        let mut config = BoardConfig::default();
        config.sockets[0].address_mask = 0x3F;
        assert!(config.validate().is_err());
    }
}
