// src/curve.rs

use crate::error::{RammError, RammResult};
use crate::math::{div_ceil_u256, mul_div, mul_div_ceil, mul_u256, narrow_u256, u256};
use crate::state::State;

/// State after a trade plus what the trader receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOutcome {
    pub state: State,
    pub amount_out: u128,
}

/// CPMM over the real ETH reserve and one virtual NXM reserve.
///
/// Invariant per curve: eth * nxm = k
///   - buying NXM trades against curve A: k = eth * nxm_a
///   - selling NXM trades against curve B: k = eth * nxm_b
///
/// The untraded curve is rescaled with the new ETH reserve so its spot price
/// is unchanged. Every rounding step favors the pool: the output side's new
/// reserve is rounded up, so amounts out are floored and inputs sized by the
/// quote helpers are ceiled.
pub fn swap_eth_for_nxm(state: &State, eth_in: u128) -> RammResult<SwapOutcome> {
    if eth_in == 0 {
        return Err(RammError::ZeroAmount);
    }

    let k = mul_u256(u256(state.eth), u256(state.nxm_a))?;
    let eth = state.eth.checked_add(eth_in).ok_or(RammError::Overflow)?;

    // New nxm_a = ceil(k / eth'), never rounding NXM out in the trader's favor
    let nxm_a = narrow_u256(div_ceil_u256(k, u256(eth))?)?;
    // Keep spot B; round up so the B price doesn't tick up for sellers
    let nxm_b = mul_div_ceil(state.nxm_b, eth, state.eth)?;

    let nxm_out = state.nxm_a.saturating_sub(nxm_a);
    Ok(SwapOutcome {
        state: State {
            nxm_a,
            nxm_b,
            eth,
            ..*state
        },
        amount_out: nxm_out,
    })
}

pub fn swap_nxm_for_eth(state: &State, nxm_in: u128) -> RammResult<SwapOutcome> {
    if nxm_in == 0 {
        return Err(RammError::ZeroAmount);
    }

    let k = mul_u256(u256(state.eth), u256(state.nxm_b))?;
    let nxm_b = state.nxm_b.checked_add(nxm_in).ok_or(RammError::Overflow)?;

    // New eth = ceil(k / nxm_b'), so ETH out is floored
    let eth = narrow_u256(div_ceil_u256(k, u256(nxm_b))?)?;
    // Keep spot A; round down so the A price doesn't tick down for buyers
    let nxm_a = mul_div(state.nxm_a, eth, state.eth)?;

    let eth_out = state.eth.saturating_sub(eth);
    Ok(SwapOutcome {
        state: State {
            nxm_a,
            nxm_b,
            eth,
            ..*state
        },
        amount_out: eth_out,
    })
}

/// Smallest ETH input that buys at least `nxm_out`.
pub fn eth_in_for_nxm_out(state: &State, nxm_out: u128) -> RammResult<u128> {
    if nxm_out == 0 {
        return Ok(0);
    }
    if nxm_out >= state.nxm_a {
        return Err(RammError::InsufficientReserve);
    }

    let k = mul_u256(u256(state.eth), u256(state.nxm_a))?;
    let eth = narrow_u256(div_ceil_u256(k, u256(state.nxm_a - nxm_out))?)?;
    Ok(eth - state.eth)
}

/// Smallest NXM input that sells for at least `eth_out`.
pub fn nxm_in_for_eth_out(state: &State, eth_out: u128) -> RammResult<u128> {
    if eth_out == 0 {
        return Ok(0);
    }
    if eth_out >= state.eth {
        return Err(RammError::InsufficientReserve);
    }

    let k = mul_u256(u256(state.eth), u256(state.nxm_b))?;
    let nxm_b = narrow_u256(div_ceil_u256(k, u256(state.eth - eth_out))?)?;
    Ok(nxm_b - state.nxm_b)
}
