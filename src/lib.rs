// src/lib.rs

// Core RAMM math (no wasm, pure Rust).
mod circuit_breaker;
mod config;
mod curve;
mod engine;
mod error;
mod events;
mod interfaces;
mod liquidity;
mod math;
mod price;
mod reserves;
mod state;
mod store;
mod twap;
mod wasm;

pub use crate::circuit_breaker::{CircuitBreaker, ReleaseKind};
pub use crate::config::{RammConfig, GRANULARITY};
pub use crate::curve::{
    eth_in_for_nxm_out, nxm_in_for_eth_out, swap_eth_for_nxm, swap_nxm_for_eth, SwapOutcome,
};
pub use crate::engine::Ramm;
pub use crate::error::{RammError, RammResult};
pub use crate::events::RammEvent;
pub use crate::interfaces::{
    Address, CapitalPool, Governance, PauseFlags, TokenController, TransferError,
};
pub use crate::liquidity::{
    calculate_eth_to_extract, calculate_eth_to_inject, compute_delta, LiquidityDelta,
};
pub use crate::math::{mul_div, mul_div_ceil, ONE, U256};
pub use crate::price::{book_value, internal_price, spot_prices};
pub use crate::reserves::{max_time_on_ratchet_a, max_time_on_ratchet_b, project, Projection};
pub use crate::state::{Context, Observation, Observations, Reserves, SpotPrices, State};
pub use crate::store::{MemoryStore, StateStore, StoreSnapshot};
pub use crate::twap::{
    calculate_twap_above_for_period, calculate_twap_below_for_period, observation_index,
    seed_observations, update_twap, TwapUpdate, CUMULATIVE_MASK,
};
pub use crate::wasm::{WasmRamm, WasmReserves, WasmSwapQuote};
