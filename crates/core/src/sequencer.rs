// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The four hardware sequencers and their shared program memory.
//!
//! Each sequencer runs one small fixed program autonomously once enabled.
//! The bank hands out slots with a uniform claim/program/configure/release
//! lifecycle; bring-up claims all four and resynchronization releases and
//! re-claims them as a set.

use crate::{BusError, BusResult};

pub const SLOT_COUNT: usize = 4;
pub const PROGRAM_MEMORY_SIZE: usize = 64;

pub type SlotId = usize;

/// Control-line program: pull a control word, hold until the clock-edge
/// gate fires, drive RW/CS, then sample the data pins back and push.
const CONTROL_PROGRAM: &[u16] = &[0x80A0, 0x20C4, 0x6006, 0x4008, 0x8000];

/// Data/address program: pull one wide word, hold for the gate, then
/// drive the pin directions and the address/data lines in one go.
const DATA_PROGRAM: &[u16] = &[0x80A0, 0x20C4, 0x6010, 0x600E];

/// Clock program: free-running square wave on PHI, one edge per divided
/// system tick, raising the edge gate as it toggles.
const CLOCK_PROGRAM: &[u16] = &[0xE001, 0xC004, 0xE000];

/// Delay program: pull a cycle count, count it down against the chip
/// clock, then signal completion.
const DELAY_PROGRAM: &[u16] = &[0x80A0, 0xA027, 0x0042, 0xC000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerKind {
    Control,
    Data,
    Clock,
    Delay,
}

impl SequencerKind {
    pub fn program(self) -> &'static [u16] {
        match self {
            SequencerKind::Control => CONTROL_PROGRAM,
            SequencerKind::Data => DATA_PROGRAM,
            SequencerKind::Clock => CLOCK_PROGRAM,
            SequencerKind::Delay => DELAY_PROGRAM,
        }
    }
}

/// One claimed sequencer slot.
#[derive(Debug, Clone)]
pub struct Sequencer {
    pub kind: SequencerKind,
    /// Program memory offset assigned at load time.
    pub offset: u8,
    /// 16.8 fixed-point clock divider.
    pub clkdiv: u32,
    pub enabled: bool,
    gate_armed: bool,
    clk_counter: u32,
}

impl Sequencer {
    fn new(kind: SequencerKind, offset: u8) -> Self {
        Self {
            kind,
            offset,
            clkdiv: 1 << 8,
            enabled: false,
            gate_armed: false,
            clk_counter: 0,
        }
    }

    pub fn set_clkdiv(&mut self, clkdiv: u32) {
        self.clkdiv = clkdiv.max(1);
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Arm the edge-wait gate: the next transfer into this sequencer is
    /// held until a chip clock edge releases the gate. Must be armed
    /// before the triggering transfer, every time.
    pub fn arm_wait_gate(&mut self) {
        self.gate_armed = true;
    }

    pub fn gate_armed(&self) -> bool {
        self.gate_armed
    }

    pub(crate) fn release_gate(&mut self) {
        self.gate_armed = false;
    }

    /// Restart the divider phase counter.
    pub fn restart(&mut self) {
        self.clk_counter = 0;
    }
}

/// Four sequencer slots plus the shared program memory they execute from.
#[derive(Debug)]
pub struct SequencerBank {
    slots: [Option<Sequencer>; SLOT_COUNT],
    program_mem: [u16; PROGRAM_MEMORY_SIZE],
    program_top: usize,
}

impl Default for SequencerBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerBank {
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None],
            program_mem: [0; PROGRAM_MEMORY_SIZE],
            program_top: 0,
        }
    }

    /// Claim a free slot for `kind` and load its program. Exhaustion is
    /// fatal to bring-up; there is no degraded mode.
    pub fn claim(&mut self, kind: SequencerKind) -> BusResult<SlotId> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(BusError::NoFreeSequencer(kind))?;

        let program = kind.program();
        if self.program_top + program.len() > PROGRAM_MEMORY_SIZE {
            return Err(BusError::ProgramMemoryFull);
        }
        let offset = self.program_top;
        self.program_mem[offset..offset + program.len()].copy_from_slice(program);
        self.program_top += program.len();

        self.slots[slot] = Some(Sequencer::new(kind, offset as u8));
        tracing::debug!("Claimed {:?} sequencer in slot {} at offset {}", kind, slot, offset);
        Ok(slot)
    }

    pub fn get(&self, slot: SlotId) -> Option<&Sequencer> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Sequencer> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn release(&mut self, slot: SlotId) {
        if slot < SLOT_COUNT {
            self.slots[slot] = None;
        }
    }

    /// Release every slot and unload all programs. Used only by full bus
    /// resynchronization.
    pub fn release_all(&mut self) {
        self.slots = [None, None, None, None];
        self.program_mem = [0; PROGRAM_MEMORY_SIZE];
        self.program_top = 0;
    }

    /// Restart every claimed sequencer's divider in one step so they come
    /// back phase-aligned.
    pub fn restart_all(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.restart();
        }
    }

    pub(crate) fn release_gates(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.release_gate();
        }
    }

    pub fn claimed_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_all_four() {
        let mut bank = SequencerBank::new();
        let control = bank.claim(SequencerKind::Control).unwrap();
        let data = bank.claim(SequencerKind::Data).unwrap();
        let clock = bank.claim(SequencerKind::Clock).unwrap();
        let delay = bank.claim(SequencerKind::Delay).unwrap();
        assert_eq!(bank.claimed_count(), 4);
        assert_eq!(bank.get(control).unwrap().kind, SequencerKind::Control);
        assert_eq!(bank.get(delay).unwrap().kind, SequencerKind::Delay);
        // Programs are laid out back to back
        assert!(bank.get(data).unwrap().offset > bank.get(control).unwrap().offset);
        assert!(bank.get(clock).unwrap().offset > bank.get(data).unwrap().offset);
    }

    #[test]
    fn test_claim_exhaustion() {
        let mut bank = SequencerBank::new();
        for _ in 0..SLOT_COUNT {
            bank.claim(SequencerKind::Control).unwrap();
        }
        let err = bank.claim(SequencerKind::Delay).unwrap_err();
        assert!(matches!(err, BusError::NoFreeSequencer(SequencerKind::Delay)));
    }

    #[test]
    fn test_release_all_resets_program_memory() {
        let mut bank = SequencerBank::new();
        bank.claim(SequencerKind::Control).unwrap();
        bank.claim(SequencerKind::Data).unwrap();
        bank.release_all();
        assert_eq!(bank.claimed_count(), 0);
        // A fresh claim lands back at offset 0
        let slot = bank.claim(SequencerKind::Control).unwrap();
        assert_eq!(bank.get(slot).unwrap().offset, 0);
    }

    #[test]
    fn test_gate_arm_release() {
        let mut bank = SequencerBank::new();
        let slot = bank.claim(SequencerKind::Control).unwrap();
        bank.get_mut(slot).unwrap().arm_wait_gate();
        assert!(bank.get(slot).unwrap().gate_armed());
        bank.release_gates();
        assert!(!bank.get(slot).unwrap().gate_armed());
    }
}
