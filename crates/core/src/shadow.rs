// SidBus - SID Bus Controller Platform
// Copyright (C) 2026 SidBus Contributors
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Host-side mirror of every chip register.
//!
//! Updated on every write and on every successful read. Some regions are
//! write-only on real silicon, so read-back and the mute bookkeeping
//! both depend on this mirror. Never cleared except through explicit
//! register-clear writes.

pub const SHADOW_SIZE: usize = 128;

#[derive(Debug, Clone)]
pub struct ShadowMemory {
    bytes: [u8; SHADOW_SIZE],
}

impl Default for ShadowMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ShadowMemory {
    pub fn new() -> Self {
        Self {
            bytes: [0; SHADOW_SIZE],
        }
    }

    pub fn get(&self, address: u8) -> u8 {
        self.bytes[usize::from(address) % SHADOW_SIZE]
    }

    pub fn set(&mut self, address: u8, value: u8) {
        self.bytes[usize::from(address) % SHADOW_SIZE] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
