// src/liquidity.rs

//! Liquidity regulation: drift the ETH reserve toward `target_liquidity`.
//!
//! Below target the reserve is topped up, first from the budget at the fast
//! speed, then from the permanent slow stream once the budget runs out.
//! Above target ETH is handed back to the capital pool at `liq_speed_a`.
//! Neither direction ever crosses the target.

use crate::config::RammConfig;
use crate::error::{RammError, RammResult};
use crate::math::mul_div;
use crate::state::State;

/// Outcome of regulating liquidity over an elapsed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityDelta {
    pub eth: u128,
    pub budget: u128,
    pub injected: u128,
    pub extracted: u128,
}

fn elapsed(state: &State, timestamp: u64) -> RammResult<u128> {
    timestamp
        .checked_sub(state.timestamp)
        .map(u128::from)
        .ok_or(RammError::TimestampInPast {
            now: timestamp,
            last: state.timestamp,
        })
}

/// ETH returned to the capital pool between `state.timestamp` and `timestamp`.
pub fn calculate_eth_to_extract(
    state: &State,
    timestamp: u64,
    cfg: &RammConfig,
) -> RammResult<u128> {
    let elapsed = elapsed(state, timestamp)?;
    let above_target = state.eth.saturating_sub(cfg.target_liquidity);
    let max_to_extract = mul_div(elapsed, cfg.liq_speed_a, u128::from(cfg.liq_speed_period))?;
    Ok(max_to_extract.min(above_target))
}

/// ETH injected between `state.timestamp` and `timestamp`, and the budget
/// left afterwards.
pub fn calculate_eth_to_inject(
    state: &State,
    timestamp: u64,
    cfg: &RammConfig,
) -> RammResult<(u128, u128)> {
    let elapsed = elapsed(state, timestamp)?;
    let period = u128::from(cfg.liq_speed_period);
    let max_to_inject = cfg.target_liquidity.saturating_sub(state.eth);
    let time_left_on_budget = mul_div(state.budget, period, cfg.fast_liquidity_speed)?;

    if elapsed <= time_left_on_budget {
        let injected = mul_div(elapsed, cfg.fast_liquidity_speed, period)?.min(max_to_inject);
        return Ok((injected, state.budget - injected.min(state.budget)));
    }

    let injected_fast = mul_div(time_left_on_budget, cfg.fast_liquidity_speed, period)?;
    let injected_slow = mul_div(elapsed - time_left_on_budget, cfg.liq_speed_b, period)?;
    let injected = injected_fast
        .checked_add(injected_slow)
        .ok_or(RammError::Overflow)?
        .min(max_to_inject);
    let budget = if injected > injected_fast {
        0
    } else {
        state.budget.saturating_sub(injected)
    };
    Ok((injected, budget))
}

/// Regulate the reserve of `state` up to `timestamp`.
pub fn apply(state: &State, timestamp: u64, cfg: &RammConfig) -> RammResult<LiquidityDelta> {
    if state.eth < cfg.target_liquidity {
        let (injected, budget) = calculate_eth_to_inject(state, timestamp, cfg)?;
        return Ok(LiquidityDelta {
            eth: state.eth + injected,
            budget,
            injected,
            extracted: 0,
        });
    }

    let extracted = calculate_eth_to_extract(state, timestamp, cfg)?;
    Ok(LiquidityDelta {
        eth: state.eth - extracted,
        budget: state.budget,
        injected: 0,
        extracted,
    })
}

/// Signed ETH change: positive for injection, negative for extraction.
pub fn compute_delta(state: &State, timestamp: u64, cfg: &RammConfig) -> RammResult<i128> {
    let delta = apply(state, timestamp, cfg)?;
    let injected = i128::try_from(delta.injected).map_err(|_| RammError::Overflow)?;
    let extracted = i128::try_from(delta.extracted).map_err(|_| RammError::Overflow)?;
    Ok(injected - extracted)
}
