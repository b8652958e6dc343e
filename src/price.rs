// src/price.rs

//! Spot, book value and the smoothed internal price.

use crate::config::{RammConfig, GRANULARITY};
use crate::error::{RammError, RammResult};
use crate::math::{mul_div, ONE};
use crate::state::{Context, Observations, SpotPrices, State};
use crate::twap::{observation_index, CUMULATIVE_MASK};

/// `capital / supply`, 1e18-scaled.
pub fn book_value(ctx: &Context) -> RammResult<u128> {
    if ctx.supply == 0 {
        return Err(RammError::InvalidContext);
    }
    mul_div(ONE, ctx.capital, ctx.supply)
}

pub fn spot_prices(state: &State) -> RammResult<SpotPrices> {
    Ok(SpotPrices {
        spot_price_a: mul_div(ONE, state.eth, state.nxm_a)?,
        spot_price_b: mul_div(ONE, state.eth, state.nxm_b)?,
    })
}

/// Internal price of NXM in ETH at `now`.
///
/// `state` and `observations` must already be rolled forward to `now`.
/// The TWAP of curve A caps its spot price and the TWAP of curve B floors
/// its spot price, so a single trade can't drag the result past where the
/// spot already is. The sum minus book value is clamped to the configured
/// band around book value.
pub fn internal_price(
    state: &State,
    observations: &Observations,
    ctx: &Context,
    now: u64,
    cfg: &RammConfig,
) -> RammResult<u128> {
    let current_idx = observation_index(now, cfg);
    let previous_idx = (current_idx + 1) % GRANULARITY;
    let current = &observations[current_idx];
    let previous = &observations[previous_idx];

    let elapsed = now
        .checked_sub(previous.timestamp)
        .filter(|&e| e > 0)
        .map(u128::from)
        .ok_or(RammError::InvalidObservationWindow)?;

    let average_a = (current
        .price_cumulative_above
        .wrapping_sub(previous.price_cumulative_above)
        & CUMULATIVE_MASK)
        / elapsed;
    let average_b = (current
        .price_cumulative_below
        .wrapping_sub(previous.price_cumulative_below)
        & CUMULATIVE_MASK)
        / elapsed;

    let spot = spot_prices(state)?;
    let price_a = average_a.min(spot.spot_price_a);
    let price_b = average_b.max(spot.spot_price_b);

    let book_value = book_value(ctx)?;
    let raw = price_a.saturating_add(price_b).saturating_sub(book_value);

    let floor = mul_div(book_value, cfg.internal_price_floor_percent, 100)?;
    let ceiling = mul_div(book_value, cfg.internal_price_ceiling_percent, 100)?;
    Ok(raw.min(ceiling).max(floor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reserves::project;
    use crate::twap::{seed_observations, update_twap};
    use proptest::prelude::*;

    const T0: u64 = 1_700_000_000;

    fn context() -> Context {
        Context::new(145_000 * ONE, 6_750_000 * ONE, 120_000 * ONE).unwrap()
    }

    fn state(spot_a: u128, spot_b: u128) -> State {
        let eth = 5_000 * ONE;
        State {
            nxm_a: mul_div(eth, ONE, spot_a).unwrap(),
            nxm_b: mul_div(eth, ONE, spot_b).unwrap(),
            eth,
            budget: 0,
            ratchet_speed_b: 400,
            timestamp: T0,
        }
    }

    #[test]
    fn book_value_of_fixture_context() {
        // 145_000 / 6_750_000
        assert_eq!(book_value(&context()).unwrap(), 21_481_481_481_481_481);
    }

    #[test]
    fn spot_prices_follow_reserves() {
        let s = state(3 * ONE / 100, ONE / 100);
        let spot = spot_prices(&s).unwrap();
        assert_eq!(spot.spot_price_a, 3 * ONE / 100);
        // nxm_b = 500_000 exactly
        assert_eq!(spot.spot_price_b, ONE / 100);
    }

    #[test]
    fn constant_history_prices_at_spot_sum_minus_book() {
        let cfg = RammConfig::default();
        let ctx = context();
        let s = state(3 * ONE / 100, ONE / 100);
        let obs = seed_observations(&s, T0, &cfg).unwrap();
        let spot = spot_prices(&s).unwrap();
        let bv = book_value(&ctx).unwrap();
        let price = internal_price(&s, &obs, &ctx, T0, &cfg).unwrap();
        assert_eq!(price, spot.spot_price_a + spot.spot_price_b - bv);
    }

    #[test]
    fn wrapped_accumulators_price_the_same() {
        let cfg = RammConfig::default();
        let ctx = context();
        let s = state(3 * ONE / 100, ONE / 100);
        let obs = seed_observations(&s, T0, &cfg).unwrap();

        // shift every counter so the oldest sits just below 2^112 and the
        // newer ones have wrapped past zero
        let offset = CUMULATIVE_MASK - 10;
        let mut wrapped = obs;
        for o in wrapped.iter_mut() {
            o.price_cumulative_above = o.price_cumulative_above.wrapping_add(offset) & CUMULATIVE_MASK;
            o.price_cumulative_below = o.price_cumulative_below.wrapping_add(offset) & CUMULATIVE_MASK;
        }
        let current = wrapped[observation_index(T0, &cfg)];
        let oldest = wrapped[(observation_index(T0, &cfg) + 1) % GRANULARITY];
        assert!(current.price_cumulative_above < oldest.price_cumulative_above);

        let plain = internal_price(&s, &obs, &ctx, T0, &cfg).unwrap();
        assert_eq!(internal_price(&s, &wrapped, &ctx, T0, &cfg).unwrap(), plain);
    }

    #[test]
    fn clamps_to_floor_when_curves_collapse() {
        let cfg = RammConfig::default();
        let ctx = context();
        // both curves far below book value
        let s = state(ONE / 1_000, ONE / 1_000);
        let obs = seed_observations(&s, T0, &cfg).unwrap();
        let bv = book_value(&ctx).unwrap();
        let price = internal_price(&s, &obs, &ctx, T0, &cfg).unwrap();
        assert_eq!(price, bv * 35 / 100);
    }

    #[test]
    fn clamps_to_ceiling_when_curves_spike() {
        let cfg = RammConfig::default();
        let ctx = context();
        let s = state(ONE, ONE);
        let obs = seed_observations(&s, T0, &cfg).unwrap();
        let bv = book_value(&ctx).unwrap();
        assert_eq!(internal_price(&s, &obs, &ctx, T0, &cfg).unwrap(), bv * 3);
    }

    #[test]
    fn spot_dip_on_curve_a_is_taken_immediately() {
        let cfg = RammConfig::default();
        let ctx = context();
        let s = state(3 * ONE / 100, ONE / 100);
        let obs = seed_observations(&s, T0, &cfg).unwrap();
        // spot A below its TWAP wins the min
        let mut dipped = s;
        dipped.nxm_a = s.nxm_a * 5 / 4;
        let spot = spot_prices(&dipped).unwrap();
        let bv = book_value(&ctx).unwrap();
        let price = internal_price(&dipped, &obs, &ctx, T0, &cfg).unwrap();
        assert_eq!(price, spot.spot_price_a + spot.spot_price_b - bv);
    }

    proptest! {
        #[test]
        fn internal_price_stays_in_band(
            spot_a_milli in 1u128..200,
            spot_b_milli in 1u128..200,
            hours in 0u64..2_000,
        ) {
            let cfg = RammConfig::default();
            let ctx = context();
            let s = state(spot_a_milli * ONE / 1_000, spot_b_milli * ONE / 1_000);
            let obs = seed_observations(&s, T0, &cfg).unwrap();
            let now = T0 + hours * 3_600;
            let rolled = project(&s, &ctx, now, &cfg).unwrap().state;
            let obs = update_twap(&s, &obs, &ctx, now, &cfg).unwrap().observations;
            let price = internal_price(&rolled, &obs, &ctx, now, &cfg).unwrap();
            let bv = book_value(&ctx).unwrap();
            prop_assert!(price >= bv * 35 / 100);
            prop_assert!(price <= bv * 3);
        }
    }
}
