// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Physical pin assignment and the digital pin block.
//!
//! The bus occupies 18 pins: eight bidirectional data lines, six
//! output-only address lines, and the RES/RW/CS1/CS2 control lines.
//! PHI carries the chip clock (generated or externally supplied).

/* Data bus, output or input depending on direction */
pub const D0: usize = 0;
pub const D7: usize = 7;

/* Address bus, output only */
pub const A0: usize = 8;
pub const A5: usize = 13;

/* Control lines */
pub const RES: usize = 18;
pub const RW: usize = 19;
pub const CS1: usize = 20;
pub const CS2: usize = 21;
pub const PHI: usize = 22;

pub const PIN_COUNT: usize = 30;

/// All 18 bus pins as a direction mask (data, address, RES..CS2).
pub const BUS_DIR_MASK: u32 = 0x003C_3FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinDir {
    #[default]
    Input,
    Output,
}

/// Direction and level of every digital pin.
#[derive(Debug, Clone)]
pub struct PinBlock {
    dirs: [PinDir; PIN_COUNT],
    levels: [bool; PIN_COUNT],
}

impl Default for PinBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl PinBlock {
    pub fn new() -> Self {
        Self {
            dirs: [PinDir::Input; PIN_COUNT],
            levels: [false; PIN_COUNT],
        }
    }

    pub fn set_dir(&mut self, pin: usize, dir: PinDir) {
        if pin < PIN_COUNT {
            self.dirs[pin] = dir;
        }
    }

    pub fn dir(&self, pin: usize) -> PinDir {
        self.dirs.get(pin).copied().unwrap_or_default()
    }

    pub fn put(&mut self, pin: usize, high: bool) {
        if pin < PIN_COUNT {
            self.levels[pin] = high;
        }
    }

    pub fn get(&self, pin: usize) -> bool {
        self.levels.get(pin).copied().unwrap_or(false)
    }

    /// One-time pin bring-up. Pulses reset low then leaves it high (bus
    /// idle), both chip-selects high (inactive), RW low.
    pub fn init_pins(&mut self) {
        self.set_dir(RES, PinDir::Output);
        self.put(RES, false);
        self.put(RES, true);

        self.set_dir(CS1, PinDir::Output);
        self.set_dir(CS2, PinDir::Output);
        self.set_dir(RW, PinDir::Output);
        self.put(CS1, true);
        self.put(CS2, true);
        self.put(RW, false);

        tracing::info!("Bus pins configured, reset deasserted");
    }

    /// Retarget the data/address pin directions from a 16-bit mask
    /// (bit n set = pin n drives the bus).
    pub fn apply_dir_mask(&mut self, mask: u16) {
        for pin in D0..=A5 {
            let dir = if mask & (1 << pin) != 0 {
                PinDir::Output
            } else {
                PinDir::Input
            };
            self.set_dir(pin, dir);
        }
    }
}
