// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Chip lifecycle: enable/disable, pause with glitch-free mute, reset
//! variants, and bulk register clear.
//!
//! Pausing always interleaves with a mute or unmute pass over the
//! active chips' volume registers so the electrical pause never leaves
//! an audible transient. The cache holds the last known volume byte per
//! chip so unmute restores the exact level, not a default.

use crate::controller::BusController;
use crate::pins;
use sidbus_config::REGISTERS_PER_SOCKET;

/// Mode/volume register, relative to a chip's region base.
pub const VOLUME_REGISTER: u8 = 0x18;

/// Audible fallback when the cached volume nibble was zero.
pub const DEFAULT_VOLUME_NIBBLE: u8 = 0x0E;

/// Size of the chip register table (29 registers on a SID). The last
/// four are read-only status and are never cleared.
pub const REGISTER_TABLE_LEN: u8 = 29;

impl BusController {
    /// Release reset, restore every active chip's volume, resume.
    pub fn enable(&mut self) {
        self.board.pins.put(pins::RES, true);
        self.unmute_all();
        self.paused = false;
        tracing::info!("Chips enabled");
    }

    /// Mute every active chip, deselect both chip-select lines, hold
    /// the chips in reset.
    pub fn disable(&mut self) {
        self.mute_all();
        self.board.pins.put(pins::CS1, true);
        self.board.pins.put(pins::CS2, true);
        self.board.pins.put(pins::RES, false);
        tracing::info!("Chips disabled, reset asserted");
    }

    /// Couple the electrical pause with an audio mute so no click or
    /// pop escapes. Toggling twice restores the previous state exactly.
    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.unmute_all();
        } else {
            self.mute_all();
        }
        self.pause();
        self.paused = !self.paused;
    }

    /// Hard reset. Genuine silicon wants the reset line held for at
    /// least 10 chip-clock microseconds before release; emulators skip
    /// the hold for responsiveness. One emulated chip family is known
    /// to drop notes around this sequence; the timing is kept as-is
    /// pending hardware testing.
    pub fn hard_reset(&mut self) {
        self.board.pins.put(pins::RES, false);
        if self.config.has_genuine_chip() {
            let hold_edges = (self.config.clock_rate / 100_000).max(10);
            for _ in 0..hold_edges {
                self.board.tick();
            }
        }
        self.board.pins.put(pins::RES, true);
        tracing::info!("Hard reset complete");
    }

    /// Soft reset cycle: disable, release the data lines, one settle
    /// edge, enable.
    pub fn reset_sid(&mut self) {
        self.disable();
        self.clear_bus();
        self.board.tick();
        self.enable();
    }

    /// Write zero to every writable register of one chip. Status
    /// registers stay untouched. Calling this right before resuming
    /// playback can produce audible glitches; keep it off the hot path.
    pub fn clear_chip_registers(&mut self, chip: usize) {
        let base = match u8::try_from(chip * usize::from(REGISTERS_PER_SOCKET)) {
            Ok(base) if base < 0x80 => base,
            _ => return,
        };
        for reg in 0..REGISTER_TABLE_LEN - 4 {
            self.write(base + reg, 0);
        }
        tracing::debug!("Cleared registers of chip {}", chip);
    }

    fn active_chips(&self) -> usize {
        usize::from(self.config.active_chips).min(self.volume_cache.len())
    }

    fn mute_all(&mut self) {
        for chip in 0..self.active_chips() {
            let address = chip as u8 * REGISTERS_PER_SOCKET + VOLUME_REGISTER;
            let current = self.shadow.get(address);
            self.volume_cache[chip] = current;
            // zero the volume nibble, keep the filter nibble
            self.write(address, current & 0xF0);
        }
    }

    fn unmute_all(&mut self) {
        for chip in 0..self.active_chips() {
            let address = chip as u8 * REGISTERS_PER_SOCKET + VOLUME_REGISTER;
            let cached = self.volume_cache[chip];
            let restored = if cached & 0x0F == 0 {
                // a silent cache would make unmute inaudible
                (cached & 0xF0) | DEFAULT_VOLUME_NIBBLE
            } else {
                cached
            };
            self.write(address, restored);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidbus_config::BoardConfig;

    fn controller() -> BusController {
        BusController::new(BoardConfig::default()).unwrap()
    }

    #[test]
    fn test_disable_caches_and_mutes() {
        let mut bus = controller();
        bus.write(0x18, 0x5F);
        bus.disable();
        assert_eq!(bus.shadow().get(0x18), 0x50);
        assert!(!bus.board().pins.get(pins::RES));
    }

    #[test]
    fn test_enable_restores_cached_volume() {
        let mut bus = controller();
        bus.write(0x18, 0x5A);
        bus.disable();
        bus.enable();
        assert_eq!(bus.shadow().get(0x18), 0x5A);
        assert!(bus.board().pins.get(pins::RES));
    }

    #[test]
    fn test_enable_forces_audible_volume_when_cache_silent() {
        let mut bus = controller();
        bus.write(0x18, 0x50);
        bus.disable();
        bus.enable();
        assert_eq!(bus.shadow().get(0x18), 0x50 | DEFAULT_VOLUME_NIBBLE);
    }

    #[test]
    fn test_pause_toggle_idempotent() {
        let mut bus = controller();
        bus.write(0x18, 0x3C);
        bus.write(0x38, 0x07);
        assert!(!bus.paused());
        bus.toggle_pause();
        assert!(bus.paused());
        assert_eq!(bus.shadow().get(0x18), 0x30);
        bus.toggle_pause();
        assert!(!bus.paused());
        assert_eq!(bus.shadow().get(0x18), 0x3C);
        assert_eq!(bus.shadow().get(0x38), 0x07);
    }

    #[test]
    fn test_clear_chip_registers_spares_status() {
        let mut bus = controller();
        for reg in 0..0x1D {
            bus.write(reg, 0xEE);
        }
        bus.clear_chip_registers(0);
        for reg in 0..=0x18 {
            assert_eq!(bus.shadow().get(reg), 0, "register {:#04x}", reg);
        }
        for reg in 0x19..0x1D {
            assert_eq!(bus.shadow().get(reg), 0xEE, "register {:#04x}", reg);
        }
    }

    #[test]
    fn test_clear_out_of_range_chip_is_noop() {
        let mut bus = controller();
        bus.write(0x18, 0x11);
        bus.clear_chip_registers(7);
        assert_eq!(bus.shadow().get(0x18), 0x11);
    }

    #[test]
    fn test_hard_reset_holds_for_genuine_chip() {
        let mut config = BoardConfig::default();
        config.sockets[0].chip = sidbus_config::ChipModel::Mos6581;
        let mut bus = BusController::new(config).unwrap();
        let before = bus.board().edge_count();
        bus.hard_reset();
        assert!(bus.board().edge_count() >= before + 10);
        assert!(bus.board().pins.get(pins::RES));
    }

    #[test]
    fn test_hard_reset_skips_hold_for_emulated() {
        let mut bus = controller();
        let before = bus.board().edge_count();
        bus.hard_reset();
        assert_eq!(bus.board().edge_count(), before);
        assert!(bus.board().pins.get(pins::RES));
    }
}
