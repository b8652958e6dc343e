// src/twap.rs

//! TWAP oracle over a ring of `GRANULARITY` observations.
//!
//! Slot `ceil(t / period_size) % GRANULARITY` holds the cumulative price x
//! time of both curves up to the end of period `ceil(t / period_size)`, or
//! up to `t` for the period that is still open. Rolling forward closes
//! every intermediate period in turn, so no boundary is ever skipped.
//!
//! Between two states each curve's price moves linearly while ratcheting
//! and is flat once pinned to the buffered book value, so the integral is a
//! trapezoid followed by a rectangle.

use crate::config::{RammConfig, GRANULARITY};
use crate::error::{RammError, RammResult};
use crate::math::{div_ceil, div_u256, mul_u256, narrow_u256, u256, ONE, U256};
use crate::reserves::{
    buffered_capital_a, buffered_capital_b, max_time_on_ratchet_a, max_time_on_ratchet_b, project,
};
use crate::state::{Context, Observation, Observations, State};

/// Cumulative accumulators wrap modulo 2^112.
pub const CUMULATIVE_MASK: u128 = (1u128 << 112) - 1;

/// Observations after rolling forward, plus the slots that were rewritten
/// in the order they were closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwapUpdate {
    pub observations: Observations,
    pub updated: Vec<Observation>,
}

#[inline]
pub fn period_index(timestamp: u64, cfg: &RammConfig) -> u64 {
    div_ceil(timestamp, cfg.period_size)
}

#[inline]
pub fn observation_index(timestamp: u64, cfg: &RammConfig) -> usize {
    (period_index(timestamp, cfg) % GRANULARITY as u64) as usize
}

fn spot(eth: u128, nxm: u128) -> RammResult<U256> {
    div_u256(mul_u256(u256(ONE), u256(eth))?, u256(nxm))
}

fn integrate(
    price_start: U256,
    price_end: U256,
    price_book: U256,
    elapsed: u64,
    max_time_on_ratchet: U256,
) -> RammResult<u128> {
    let elapsed = U256::from(elapsed);
    let two = U256::from(2u8);
    let total = if elapsed <= max_time_on_ratchet {
        div_u256(mul_u256(price_start + price_end, elapsed)?, two)?
    } else {
        let ratchet = div_u256(mul_u256(price_start + price_book, max_time_on_ratchet)?, two)?;
        ratchet + mul_u256(price_book, elapsed - max_time_on_ratchet)?
    };
    // only differences of the 112-bit counters are ever read
    Ok((total & U256::from(CUMULATIVE_MASK)).low_u128())
}

/// Price x time of curve A between `previous` and `state`.
pub fn calculate_twap_above_for_period(
    previous: &State,
    state: &State,
    elapsed: u64,
    ctx: &Context,
    cfg: &RammConfig,
) -> RammResult<u128> {
    let max_time = max_time_on_ratchet_a(previous, ctx, cfg)?;
    let price_book = div_u256(mul_u256(u256(ONE), buffered_capital_a(ctx, cfg)?)?, u256(ctx.supply))?;
    integrate(
        spot(previous.eth, previous.nxm_a)?,
        spot(state.eth, state.nxm_a)?,
        price_book,
        elapsed,
        max_time,
    )
}

/// Price x time of curve B between `previous` and `state`.
pub fn calculate_twap_below_for_period(
    previous: &State,
    state: &State,
    elapsed: u64,
    ctx: &Context,
    cfg: &RammConfig,
) -> RammResult<u128> {
    let max_time = max_time_on_ratchet_b(previous, ctx, cfg)?;
    let price_book = div_u256(mul_u256(u256(ONE), buffered_capital_b(ctx, cfg)?)?, u256(ctx.supply))?;
    integrate(
        spot(previous.eth, previous.nxm_b)?,
        spot(state.eth, state.nxm_b)?,
        price_book,
        elapsed,
        max_time,
    )
}

/// Close an observation at `state.timestamp` on top of `previous_observation`.
pub fn next_observation(
    previous: &State,
    state: &State,
    previous_observation: &Observation,
    ctx: &Context,
    cfg: &RammConfig,
) -> RammResult<Observation> {
    let elapsed = state
        .timestamp
        .checked_sub(previous.timestamp)
        .ok_or(RammError::TimestampInPast {
            now: state.timestamp,
            last: previous.timestamp,
        })?;
    let above = calculate_twap_above_for_period(previous, state, elapsed, ctx, cfg)?;
    let below = calculate_twap_below_for_period(previous, state, elapsed, ctx, cfg)?;

    Ok(Observation {
        timestamp: state.timestamp,
        price_cumulative_above: previous_observation
            .price_cumulative_above
            .wrapping_add(above)
            & CUMULATIVE_MASK,
        price_cumulative_below: previous_observation
            .price_cumulative_below
            .wrapping_add(below)
            & CUMULATIVE_MASK,
    })
}

/// Roll `observations` forward from `initial.timestamp` to `now`.
///
/// Rolling to the timestamp the state already sits at changes nothing.
pub fn update_twap(
    initial: &State,
    observations: &Observations,
    ctx: &Context,
    now: u64,
    cfg: &RammConfig,
) -> RammResult<TwapUpdate> {
    if now < initial.timestamp {
        return Err(RammError::TimestampInPast {
            now,
            last: initial.timestamp,
        });
    }

    let mut result = TwapUpdate {
        observations: *observations,
        updated: Vec::new(),
    };
    if now == initial.timestamp {
        return Ok(result);
    }

    let first_idx = period_index(initial.timestamp, cfg);
    let end_idx = period_index(now, cfg);

    let mut state = *initial;
    let mut previous_observation = observations[(first_idx % GRANULARITY as u64) as usize];

    for idx in first_idx..=end_idx {
        let boundary = idx.checked_mul(cfg.period_size).ok_or(RammError::Overflow)?;
        let observation_timestamp = now.min(boundary);
        if observation_timestamp <= state.timestamp {
            continue;
        }

        let next = project(&state, ctx, observation_timestamp, cfg)?.state;
        let observation = next_observation(&state, &next, &previous_observation, ctx, cfg)?;

        result.observations[(idx % GRANULARITY as u64) as usize] = observation;
        result.updated.push(observation);
        previous_observation = observation;
        state = next;
    }

    Ok(result)
}

/// Synthesize a constant-price history ending at `now` for a fresh
/// deployment, so the internal price is defined from the first block.
pub fn seed_observations(state: &State, now: u64, cfg: &RammConfig) -> RammResult<Observations> {
    let end_idx = period_index(now, cfg);
    let first_idx = end_idx
        .checked_sub(GRANULARITY as u64 - 1)
        .ok_or(RammError::InvalidObservationWindow)?;
    let base = first_idx * cfg.period_size;
    let spot_a = narrow_u256(spot(state.eth, state.nxm_a)?)?;
    let spot_b = narrow_u256(spot(state.eth, state.nxm_b)?)?;

    let mut observations = Observations::default();
    for idx in first_idx..=end_idx {
        let timestamp = now.min(idx * cfg.period_size);
        let elapsed = u128::from(timestamp - base);
        observations[(idx % GRANULARITY as u64) as usize] = Observation {
            timestamp,
            price_cumulative_above: spot_a.wrapping_mul(elapsed) & CUMULATIVE_MASK,
            price_cumulative_below: spot_b.wrapping_mul(elapsed) & CUMULATIVE_MASK,
        };
    }
    Ok(observations)
}
