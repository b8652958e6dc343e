// src/state.rs

use serde::{Deserialize, Serialize};

use crate::config::GRANULARITY;
use crate::error::{RammError, RammResult};

/// The single persisted reserve record.
///
/// `nxm_a` backs the buy curve (priced above book value), `nxm_b` the sell
/// curve (priced below book value). Both are virtual; `eth` is the real
/// liquidity shared by the two curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub nxm_a: u128,
    pub nxm_b: u128,
    pub eth: u128,
    pub budget: u128,
    pub ratchet_speed_b: u128,
    pub timestamp: u64,
}

/// Cumulative price x time accumulators, closed at `timestamp`.
///
/// The accumulators are 112-bit modular counters; consumers only ever look
/// at differences, which stay correct across wraparound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: u64,
    pub price_cumulative_above: u128,
    pub price_cumulative_below: u128,
}

pub type Observations = [Observation; GRANULARITY];

/// Values pulled from collaborators once per operation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub capital: u128,
    pub supply: u128,
    pub mcr: u128,
}

impl Context {
    pub fn new(capital: u128, supply: u128, mcr: u128) -> RammResult<Self> {
        if capital == 0 || supply == 0 {
            return Err(RammError::InvalidContext);
        }
        Ok(Self {
            capital,
            supply,
            mcr,
        })
    }
}

/// Result of `get_reserves`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub eth_liquidity: u128,
    pub nxm_a: u128,
    pub nxm_b: u128,
    pub budget: u128,
}

impl From<&State> for Reserves {
    fn from(state: &State) -> Self {
        Self {
            eth_liquidity: state.eth,
            nxm_a: state.nxm_a,
            nxm_b: state.nxm_b,
            budget: state.budget,
        }
    }
}

/// Spot prices of both curves in ETH per NXM (1e18-scaled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotPrices {
    pub spot_price_a: u128,
    pub spot_price_b: u128,
}
