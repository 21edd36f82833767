// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Bit-packed control and data words, laid out exactly as the sequencers
//! consume them: a 16-bit control word for the control sequencer and a
//! 32-bit data word for the data/address sequencer.

use bitflags::bitflags;

bitflags! {
    /// Flag bits of the control word. Bit 0 is the bus direction, bits
    /// 1..=3 hold the 3-bit chip-select pattern, bits 4..=5 are fixed
    /// bus-protocol bits that are always driven high.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u16 {
        const READ = 1 << 0;
        const CS2_SELECT = 1 << 1;
        const CS1_SELECT = 1 << 2;
        const SELECT_HI = 1 << 3;
        const PROTO_A = 1 << 4;
        const PROTO_B = 1 << 5;
    }
}

/// 3-bit chip-select pattern, ORed into the control word at bits 1..=3.
/// `0b110` and `0b111` are reserved: a region configured with either is
/// administratively disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectPattern(u8);

impl SelectPattern {
    pub const CS1: SelectPattern = SelectPattern(0b010);
    pub const CS2: SelectPattern = SelectPattern(0b001);
    pub const BOTH: SelectPattern = SelectPattern(0b011);
    pub const DISABLED: SelectPattern = SelectPattern(0b110);
    pub const DISABLED_ALT: SelectPattern = SelectPattern(0b111);

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_disabled(self) -> bool {
        self.0 == Self::DISABLED.0 || self.0 == Self::DISABLED_ALT.0
    }
}

/// Instantaneous state of the control lines, as one sequencer word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlWord(u16);

impl ControlWord {
    /// Base word for a write transaction: protocol bits high, RW low,
    /// no chip selected yet.
    pub const WRITE_BASE: ControlWord = ControlWord(0b11_0000);

    /// Pause word: both chip-selects forced inactive, write direction.
    pub const PAUSE: ControlWord = ControlWord(0b11_0110);

    pub fn for_write() -> Self {
        Self::WRITE_BASE
    }

    pub fn for_read() -> Self {
        Self(Self::WRITE_BASE.0 | ControlFlags::READ.bits())
    }

    pub fn with_select(self, pattern: SelectPattern) -> Self {
        Self(self.0 | (u16::from(pattern.bits()) << 1))
    }

    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn is_read(self) -> bool {
        self.0 & ControlFlags::READ.bits() != 0
    }

    pub fn cs1_selected(self) -> bool {
        self.0 & ControlFlags::CS1_SELECT.bits() != 0
    }

    pub fn cs2_selected(self) -> bool {
        self.0 & ControlFlags::CS2_SELECT.bits() != 0
    }
}

/// Direction mask for a write: every data and address pin drives the bus.
pub const DIR_OUT_ALL: u16 = 0xFFFF;

/// Direction mask for a read: data pins turned around to inputs, address
/// pins still driven.
pub const DIR_READ: u16 = 0xFF00;

/// One wide word for the data/address sequencer: payload in bits 0..=7,
/// 6-bit bus address in bits 8..=13, pin direction mask in bits 16..=31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataWord(u32);

impl DataWord {
    pub fn for_write(bus_address: u8, data: u8) -> Self {
        Self(
            (u32::from(DIR_OUT_ALL) << 16)
                | (u32::from(bus_address & 0x3F) << 8)
                | u32::from(data),
        )
    }

    pub fn for_read(bus_address: u8) -> Self {
        Self((u32::from(DIR_READ) << 16) | (u32::from(bus_address & 0x3F) << 8))
    }

    /// Neutral word for CLEAR_BUS: data pins released to inputs, zero
    /// payload. No chip samples this, so it is fire-and-forget.
    pub fn clear_bus() -> Self {
        Self(u32::from(DIR_READ) << 16)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn data(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub fn address(self) -> u8 {
        ((self.0 >> 8) & 0x3F) as u8
    }

    pub fn dir_mask(self) -> u16 {
        (self.0 >> 16) as u16
    }
}
