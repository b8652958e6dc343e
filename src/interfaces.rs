// src/interfaces.rs

//! Collaborators the engine reads from and pays through.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Pause bitset published by governance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseFlags(pub u8);

impl PauseFlags {
    pub const GLOBAL: u8 = 1 << 0;
    pub const SWAPS: u8 = 1 << 1;

    pub fn is_global_paused(self) -> bool {
        self.0 & Self::GLOBAL != 0
    }

    pub fn is_swaps_paused(self) -> bool {
        self.0 & Self::SWAPS != 0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transfer rejected: {0}")]
pub struct TransferError(pub String);

/// Holds the capital. `capital_value` and `mcr` are 1e18-scaled ETH.
pub trait CapitalPool {
    fn capital_value(&self) -> u128;
    fn mcr(&self) -> u128;
    /// ETH paid in by a buyer, forwarded from the engine.
    fn deposit_eth(&mut self, amount: u128) -> Result<(), TransferError>;
    fn send_eth(&mut self, to: Address, amount: u128) -> Result<(), TransferError>;
}

pub trait TokenController {
    fn total_supply(&self) -> u128;
    fn is_locked_for_voting(&self, member: Address) -> bool;
    fn mint(&mut self, to: Address, amount: u128) -> Result<(), TransferError>;
    fn burn_from(&mut self, from: Address, amount: u128) -> Result<(), TransferError>;
}

pub trait Governance {
    fn pause_flags(&self) -> PauseFlags;
    fn is_governor(&self, caller: Address) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_displays_as_prefixed_hex() {
        let mut raw = [0u8; 20];
        raw[19] = 0xab;
        assert_eq!(
            Address(raw).to_string(),
            "0x00000000000000000000000000000000000000ab"
        );
    }

    #[test]
    fn pause_bits_are_independent() {
        assert!(PauseFlags(PauseFlags::GLOBAL).is_global_paused());
        assert!(!PauseFlags(PauseFlags::GLOBAL).is_swaps_paused());
        assert!(PauseFlags(PauseFlags::SWAPS).is_swaps_paused());
        assert!(!PauseFlags::default().is_global_paused());
    }
}
