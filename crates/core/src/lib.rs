// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod board;
pub mod channel;
pub mod clock;
pub mod controller;
pub mod lifecycle;
pub mod pins;
pub mod router;
pub mod sequencer;
pub mod shadow;
pub mod word;

pub use board::Board;
pub use clock::ClockSource;
pub use controller::{BusCommand, BusController, SYNC_TAG};
pub use router::RegionMap;
pub use sequencer::SequencerKind;

/// Bring-up failures. Everything that can go wrong after bring-up is
/// absorbed as a neutral zero result, never an error (the command layer
/// sees a uniform "operation completed, possibly inert" contract).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("no free sequencer slot for the {0:?} sequencer")]
    NoFreeSequencer(SequencerKind),
    #[error("no free transfer channel")]
    NoFreeChannel,
    #[error("sequencer program memory exhausted")]
    ProgramMemoryFull,
}

pub type BusResult<T> = Result<T, BusError>;
