// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Block-transfer channels feeding the sequencers.
//!
//! Each bus operation is a one-word hardware-triggered transfer: a
//! 16-bit word into the control sequencer, a 32-bit word into the data
//! sequencer, a 16-bit cycle count into the delay sequencer, and a
//! 32-bit read-back capture out of the control sequencer. Completion is
//! hardware-signaled per channel; the blocking wait lives on the board
//! because the wait has to keep the clock edges coming.

use crate::sequencer::SlotId;
use crate::{BusError, BusResult};

pub const CHANNEL_COUNT: usize = 12;

pub type ChannelId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferWidth {
    /// 16-bit transfers (control words, delay counts).
    HalfWord,
    /// 32-bit transfers (data words, read capture).
    Word,
}

#[derive(Debug, Clone, Copy)]
pub struct ChannelConfig {
    pub width: TransferWidth,
    pub read_increment: bool,
    pub write_increment: bool,
    /// The sequencer slot whose data request paces this channel.
    pub dreq_slot: SlotId,
    /// Direction: true pushes words into the sequencer, false captures
    /// words coming back out.
    pub to_sequencer: bool,
}

/// One claimed transfer channel.
#[derive(Debug, Clone)]
pub struct TransferChannel {
    pub config: ChannelConfig,
    busy: bool,
    pending: Option<u32>,
    captured: u32,
}

impl TransferChannel {
    fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            busy: false,
            pending: None,
            captured: 0,
        }
    }

    /// Start a one-word transfer toward the sequencer.
    pub fn trigger(&mut self, word: u32) {
        let word = match self.config.width {
            TransferWidth::HalfWord => word & 0xFFFF,
            TransferWidth::Word => word,
        };
        self.pending = Some(word);
        self.busy = true;
    }

    /// Point the capture side at a fresh result cell.
    pub fn arm_capture(&mut self) {
        self.captured = 0;
        self.busy = true;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn pending(&self) -> Option<u32> {
        self.pending
    }

    pub(crate) fn complete(&mut self) {
        self.pending = None;
        self.busy = false;
    }

    pub(crate) fn complete_capture(&mut self, value: u32) {
        self.captured = value;
        self.busy = false;
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }
}

/// Pool of hardware transfer channels with claim/release.
#[derive(Debug, Default)]
pub struct ChannelBank {
    channels: [Option<TransferChannel>; CHANNEL_COUNT],
}

impl ChannelBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a free channel. Exhaustion is fatal to bring-up.
    pub fn claim(&mut self, config: ChannelConfig) -> BusResult<ChannelId> {
        let id = self
            .channels
            .iter()
            .position(Option::is_none)
            .ok_or(BusError::NoFreeChannel)?;
        self.channels[id] = Some(TransferChannel::new(config));
        tracing::debug!(
            "Claimed channel {} ({:?}, dreq slot {})",
            id,
            config.width,
            config.dreq_slot
        );
        Ok(id)
    }

    pub fn get(&self, id: ChannelId) -> Option<&TransferChannel> {
        self.channels.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut TransferChannel> {
        self.channels.get_mut(id).and_then(Option::as_mut)
    }

    pub fn release(&mut self, id: ChannelId) {
        if id < CHANNEL_COUNT {
            self.channels[id] = None;
        }
    }

    pub fn release_all(&mut self) {
        self.channels = Default::default();
    }

    pub fn claimed_count(&self) -> usize {
        self.channels.iter().flatten().count()
    }
}
