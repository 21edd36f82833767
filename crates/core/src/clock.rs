// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Chip clock management: sequencer divider math and external clock
//! detection.

use crate::board::Board;
use serde::Serialize;

/// System clock the sequencer dividers are derived from.
pub const SYSTEM_CLOCK_HZ: u32 = 125_000_000;

/// Samples taken of the clock-input pin at bring-up. Coarse and not
/// glitch-filtered; only suitable before playback starts.
pub const CLOCK_DETECT_SAMPLES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    Internal,
    External,
}

/// Divider for the control/data/delay sequencers, 16.8 fixed point.
/// Each bus sequencer steps 32 times per chip cycle, two system ticks
/// per step. Rates below the supported range saturate the divider
/// instead of wrapping.
pub fn bus_clock_divider(system_hz: u32, clock_rate: u32) -> u32 {
    let rate = u64::from(clock_rate).max(1);
    u32::try_from((u64::from(system_hz) << 8) / (rate * 32 * 2)).unwrap_or(u32::MAX)
}

/// Divider for the clock-generator sequencer, 16.8 fixed point: two
/// steps per PHI period. Saturates like [`bus_clock_divider`].
pub fn phi_clock_divider(system_hz: u32, clock_rate: u32) -> u32 {
    let rate = u64::from(clock_rate).max(1);
    u32::try_from((u64::from(system_hz) << 8) / (rate * 2)).unwrap_or(u32::MAX)
}

/// Sample the clock-input pin a fixed number of times; any observed
/// activity means an external oscillator is driving PHI.
pub fn detect_external_clock(board: &mut Board) -> ClockSource {
    for _ in 0..CLOCK_DETECT_SAMPLES {
        if board.sample_phi_activity() {
            tracing::info!("External clock detected on PHI");
            return ClockSource::External;
        }
    }
    tracing::info!("No external clock, generating PHI internally");
    ClockSource::Internal
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divider_values() {
        // 1 MHz: 125e6 / (1e6 * 64) = 1.953125 -> 1.95 in 16.8
        assert_eq!(bus_clock_divider(SYSTEM_CLOCK_HZ, 1_000_000), 500);
        // PHI generator: 125e6 / (1e6 * 2) = 62.5
        assert_eq!(phi_clock_divider(SYSTEM_CLOCK_HZ, 1_000_000), 16_000);
    }

    #[test]
    fn test_divider_monotonic() {
        // PAL < NTSC < 1 MHz: faster chip clock, smaller divider
        let pal = bus_clock_divider(SYSTEM_CLOCK_HZ, 985_248);
        let ntsc = bus_clock_divider(SYSTEM_CLOCK_HZ, 1_022_727);
        let mhz = bus_clock_divider(SYSTEM_CLOCK_HZ, 1_000_000);
        assert!(pal > mhz);
        assert!(mhz > ntsc);

        let pal_phi = phi_clock_divider(SYSTEM_CLOCK_HZ, 985_248);
        let ntsc_phi = phi_clock_divider(SYSTEM_CLOCK_HZ, 1_022_727);
        assert!(pal_phi > ntsc_phi);
    }

    #[test]
    fn test_divider_saturates_below_supported_range() {
        // 125e6 << 8 / 2 overflows u32 for rates under ~4 Hz
        assert_eq!(phi_clock_divider(SYSTEM_CLOCK_HZ, 1), u32::MAX);
        assert_eq!(phi_clock_divider(SYSTEM_CLOCK_HZ, 0), u32::MAX);
        assert_eq!(bus_clock_divider(SYSTEM_CLOCK_HZ, 0), 500_000_000);
    }
}
