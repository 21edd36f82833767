// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Behavioral model of the electrical side of the board: the pin block,
//! the sequencer and channel banks, the chip sockets, and the clock
//! edges that advance them. The controller drives this the same way the
//! firmware drives the real silicon: trigger a transfer, then busy-wait
//! on its completion flag while the hardware runs.

use crate::channel::{ChannelBank, ChannelId};
use crate::pins::{self, PinBlock};
use crate::sequencer::{SequencerBank, SequencerKind};
use crate::word::{ControlWord, DataWord};
use sidbus_config::{BoardConfig, ChipModel, MAX_SOCKETS, REGISTERS_PER_SOCKET};

/// One chip socket: the register latch a real or emulated SID presents
/// on the bus. No synthesis happens here; the latch is exactly what the
/// electrical interface can observe.
#[derive(Debug, Clone)]
pub struct SidSocket {
    pub chip: ChipModel,
    regs: [u8; REGISTERS_PER_SOCKET as usize],
}

impl SidSocket {
    fn new(chip: ChipModel) -> Self {
        Self {
            chip,
            regs: [0; REGISTERS_PER_SOCKET as usize],
        }
    }

    /// One selected bus cycle: latch on write, drive the latched value
    /// on read.
    fn transact(&mut self, is_read: bool, reg: u8, data: u8) -> Option<u8> {
        let reg = usize::from(reg % REGISTERS_PER_SOCKET);
        if is_read {
            Some(self.regs[reg])
        } else {
            self.regs[reg] = data;
            None
        }
    }

    fn reset(&mut self) {
        self.regs = [0; REGISTERS_PER_SOCKET as usize];
    }

    pub fn register(&self, reg: u8) -> u8 {
        self.regs[usize::from(reg % REGISTERS_PER_SOCKET)]
    }
}

#[derive(Debug)]
pub struct Board {
    pub pins: PinBlock,
    pub sequencers: SequencerBank,
    pub channels: ChannelBank,
    sockets: [SidSocket; MAX_SOCKETS],
    /// An in-flight delay countdown: (channel to complete, edges left).
    delay_remaining: Option<(ChannelId, u16)>,
    external_clock_present: bool,
    phi_sample_state: bool,
    edge_count: u64,
}

impl Board {
    pub fn new(config: &BoardConfig) -> Self {
        let socket_model = |i: usize| {
            config
                .socket(i)
                .map(|s| s.chip)
                .unwrap_or(ChipModel::Unknown)
        };
        Self {
            pins: PinBlock::new(),
            sequencers: SequencerBank::new(),
            channels: ChannelBank::new(),
            sockets: [
                SidSocket::new(socket_model(0)),
                SidSocket::new(socket_model(1)),
                SidSocket::new(socket_model(2)),
                SidSocket::new(socket_model(3)),
            ],
            delay_remaining: None,
            external_clock_present: false,
            phi_sample_state: false,
            edge_count: 0,
        }
    }

    pub fn socket(&self, index: usize) -> Option<&SidSocket> {
        self.sockets.get(index)
    }

    pub fn edge_count(&self) -> u64 {
        self.edge_count
    }

    /// Test hook: pretend an external oscillator is wired to PHI.
    pub fn set_external_clock_present(&mut self, present: bool) {
        self.external_clock_present = present;
    }

    /// One sample of the clock-input pin for bring-up detection. An
    /// external oscillator keeps the pin moving between samples.
    pub fn sample_phi_activity(&mut self) -> bool {
        if !self.external_clock_present {
            return false;
        }
        self.phi_sample_state = !self.phi_sample_state;
        self.phi_sample_state
    }

    /// Start a one-word transfer on `id`. A still-busy channel drains
    /// first; hardware serializes back-to-back triggers the same way.
    pub fn trigger(&mut self, id: ChannelId, word: u32) {
        if self.channels.get(id).is_some_and(|ch| ch.is_busy()) {
            self.wait_for_finish_blocking(id);
        }
        if let Some(ch) = self.channels.get_mut(id) {
            ch.trigger(word);
        }
    }

    pub fn arm_capture(&mut self, id: ChannelId) {
        if let Some(ch) = self.channels.get_mut(id) {
            ch.arm_capture();
        }
    }

    pub fn take_captured(&self, id: ChannelId) -> u32 {
        self.channels.get(id).map_or(0, |ch| ch.captured())
    }

    /// Busy-wait on a channel's completion flag. Non-cancellable: a
    /// transfer whose sequencer never consumes it blocks here until a
    /// full bus resynchronization tears the sequencers down.
    pub fn wait_for_finish_blocking(&mut self, id: ChannelId) {
        while self.channels.get(id).is_some_and(|ch| ch.is_busy()) {
            self.tick();
        }
    }

    /// Advance one chip clock edge: release the edge-wait gates, let the
    /// sequencers consume pending transfers, run the delay countdown.
    pub fn tick(&mut self) {
        self.edge_count += 1;
        let phi = self.pins.get(pins::PHI);
        self.pins.put(pins::PHI, !phi);

        // Reset held low clears the chip latches
        if !self.pins.get(pins::RES) {
            for socket in &mut self.sockets {
                socket.reset();
            }
        }

        // Gates release on the edge, so a transfer armed behind a gate
        // executes on this same tick
        self.sequencers.release_gates();

        let mut control: Option<(ChannelId, u16)> = None;
        let mut data: Option<(ChannelId, u32)> = None;
        let mut delay: Option<(ChannelId, u16)> = None;
        for id in 0..crate::channel::CHANNEL_COUNT {
            let Some(ch) = self.channels.get(id) else {
                continue;
            };
            if !ch.config.to_sequencer {
                continue;
            }
            let Some(word) = ch.pending() else {
                continue;
            };
            let Some(sm) = self.sequencers.get(ch.config.dreq_slot) else {
                continue;
            };
            if !sm.enabled || sm.gate_armed() {
                continue;
            }
            match sm.kind {
                SequencerKind::Control => control = Some((id, word as u16)),
                SequencerKind::Data => data = Some((id, word)),
                SequencerKind::Delay => delay = Some((id, word as u16)),
                SequencerKind::Clock => {}
            }
        }

        if let Some((id, count)) = delay {
            if let Some(ch) = self.channels.get_mut(id) {
                ch.complete();
                // the channel owner waits on the delay channel itself, so
                // hold its busy flag through the countdown
                ch.arm_capture();
            }
            self.delay_remaining = Some((id, count));
        }

        match (control, data) {
            (Some((control_id, cw)), data_word) => {
                let dw = data_word.map(|(_, raw)| DataWord::from_raw(raw));
                self.execute_transaction(ControlWord::from_raw(cw), dw);
                if let Some(ch) = self.channels.get_mut(control_id) {
                    ch.complete();
                }
                if let Some((data_id, _)) = data_word {
                    if let Some(ch) = self.channels.get_mut(data_id) {
                        ch.complete();
                    }
                }
            }
            (None, Some((data_id, raw))) => {
                // Data-only transfer (clear-bus): just retarget the pins
                let dw = DataWord::from_raw(raw);
                self.pins.apply_dir_mask(dw.dir_mask());
                self.drive_data_pins(dw);
                if let Some(ch) = self.channels.get_mut(data_id) {
                    ch.complete();
                }
            }
            (None, None) => {}
        }

        if let Some((id, remaining)) = self.delay_remaining {
            if remaining <= 1 {
                self.delay_remaining = None;
                if let Some(ch) = self.channels.get_mut(id) {
                    ch.complete_capture(0);
                }
            } else {
                self.delay_remaining = Some((id, remaining - 1));
            }
        }
    }

    /// Assert one full bus cycle. A control word without a data word is
    /// a pause assertion: both selects stay inactive and no chip is
    /// touched.
    fn execute_transaction(&mut self, cw: ControlWord, dw: Option<DataWord>) {
        let Some(dw) = dw else {
            self.pins.put(pins::CS1, true);
            self.pins.put(pins::CS2, true);
            self.pins.put(pins::RW, false);
            return;
        };

        let is_read = cw.is_read();
        self.pins.put(pins::RW, is_read);
        self.pins.apply_dir_mask(dw.dir_mask());
        self.drive_data_pins(dw);

        let a5 = usize::from(dw.address() >> 5 & 1);
        let reg = dw.address() & 0x1F;

        let mut sample = None;
        if cw.cs1_selected() {
            sample = self.sockets[a5].transact(is_read, reg, dw.data());
        }
        if cw.cs2_selected() {
            let s = self.sockets[2 + a5].transact(is_read, reg, dw.data());
            if sample.is_none() {
                sample = s;
            }
        }
        // Selects pulse low for the cycle and return high
        self.pins.put(pins::CS1, true);
        self.pins.put(pins::CS2, true);

        if is_read {
            let value = u32::from(sample.unwrap_or(0)) << 24;
            for id in 0..crate::channel::CHANNEL_COUNT {
                if let Some(ch) = self.channels.get_mut(id) {
                    if !ch.config.to_sequencer && ch.is_busy() {
                        ch.complete_capture(value);
                    }
                }
            }
        }
    }

    fn drive_data_pins(&mut self, dw: DataWord) {
        let word = u32::from(dw.data()) | (u32::from(dw.address()) << 8);
        for pin in pins::D0..=pins::A5 {
            self.pins.put(pin, word & (1 << pin) != 0);
        }
    }
}
