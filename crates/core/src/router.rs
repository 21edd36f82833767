// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Address routing: 8-bit logical addresses onto up to four 32-register
//! chip regions sharing the physical bus.

use crate::word::SelectPattern;
use sidbus_config::BoardConfig;

pub const REGION_COUNT: usize = 4;
pub const REGION_SIZE: u8 = 0x20;

/// One region's routing policy.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    /// Which of the 5 in-region address bits are physically wired for
    /// this socket. Unwired bits alias high registers onto low ones.
    pub address_mask: u8,
    pub select: SelectPattern,
}

/// A validated address: the 6-bit bus address to drive and the select
/// pattern to OR into the control word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutedAddress {
    pub bus_address: u8,
    pub select: SelectPattern,
}

/// Fixed partition of the logical address space:
/// `[0x00,0x1F] [0x20,0x3F] [0x40,0x5F] [0x60,0x7F]`.
#[derive(Debug, Clone)]
pub struct RegionMap {
    regions: [Region; REGION_COUNT],
}

impl RegionMap {
    /// Derive the routing table from the board config. Regions 0..=1 sit
    /// behind CS1, regions 2..=3 behind CS2; boards that treat the dual
    /// sockets as one select domain assert both lines. A region without
    /// an enabled socket, or past the active chip count, gets a reserved
    /// disabled pattern.
    pub fn from_config(config: &BoardConfig) -> Self {
        let mut regions = [Region {
            address_mask: 0x1F,
            select: SelectPattern::DISABLED,
        }; REGION_COUNT];

        for (i, region) in regions.iter_mut().enumerate() {
            let Some(socket) = config.socket(i) else {
                continue;
            };
            if !socket.enabled || i >= config.active_chips as usize {
                continue;
            }
            region.address_mask = socket.address_mask & 0x1F;
            region.select = if config.mirror_dual_socket {
                SelectPattern::BOTH
            } else if i < 2 {
                SelectPattern::CS1
            } else {
                SelectPattern::CS2
            };
        }

        Self { regions }
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Map a logical address to its region. Disabled regions and
    /// addresses past 0x7F yield `None`; the dispatcher treats both as a
    /// no-op, never an error.
    pub fn route(&self, address: u8) -> Option<RoutedAddress> {
        if address >= 0x80 {
            return None;
        }
        let region_index = usize::from(address / REGION_SIZE);
        let region = &self.regions[region_index];
        if region.select.is_disabled() {
            return None;
        }

        let in_region = address % REGION_SIZE & region.address_mask;
        // A5 splits each select domain into its two regions
        let a5 = (region_index as u8 & 1) << 5;
        Some(RoutedAddress {
            bus_address: a5 | in_region,
            select: region.select,
        })
    }
}
