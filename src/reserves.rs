// src/reserves.rs

//! Reserve projection.
//!
//! Both virtual NXM reserves ratchet toward book value: for curve A the
//! price falls toward `BV * (1 + buffer)`, for curve B it rises toward
//! `BV * (1 - buffer)`, each linearly at `speed * BV` per ratchet period.
//! Once a curve has ratcheted into its buffer band it is pinned to the
//! buffered book value for the rest of the interval.
//!
//! Liquidity regulation runs first and scales both NXM reserves with the
//! ETH reserve, which leaves both spot prices unchanged.

use crate::config::RammConfig;
use crate::error::{RammError, RammResult};
use crate::liquidity;
use crate::math::{div_u256, mul_u256, narrow_u256, u256, U256};
use crate::state::{Context, State};

/// A state rolled forward in time plus the liquidity moved on the way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub state: State,
    pub injected: u128,
    pub extracted: u128,
}

/// `capital * (D + buffer) / D`
pub fn buffered_capital_a(ctx: &Context, cfg: &RammConfig) -> RammResult<U256> {
    div_u256(
        mul_u256(
            u256(ctx.capital),
            u256(cfg.price_buffer_denominator + cfg.price_buffer),
        )?,
        u256(cfg.price_buffer_denominator),
    )
}

/// `capital * (D - buffer) / D`
pub fn buffered_capital_b(ctx: &Context, cfg: &RammConfig) -> RammResult<U256> {
    div_u256(
        mul_u256(
            u256(ctx.capital),
            u256(cfg.price_buffer_denominator - cfg.price_buffer),
        )?,
        u256(cfg.price_buffer_denominator),
    )
}

/// Seconds curve A can keep ratcheting down from `state` before its price
/// reaches `BV * (1 + buffer)`. Zero if it is already at or below.
pub fn max_time_on_ratchet_a(state: &State, ctx: &Context, cfg: &RammConfig) -> RammResult<U256> {
    let eth_supply = mul_u256(u256(state.eth), u256(ctx.supply))?;
    let buffered = div_u256(
        mul_u256(
            mul_u256(
                u256(cfg.price_buffer_denominator + cfg.price_buffer),
                u256(ctx.capital),
            )?,
            u256(state.nxm_a),
        )?,
        u256(cfg.price_buffer_denominator),
    )?;
    if eth_supply <= buffered {
        return Ok(U256::zero());
    }
    ratchet_time(eth_supply - buffered, state.nxm_a, cfg.normal_ratchet_speed, ctx, cfg)
}

/// Seconds curve B can keep ratcheting up from `state` before its price
/// reaches `BV * (1 - buffer)`. Zero if it is already at or above.
pub fn max_time_on_ratchet_b(state: &State, ctx: &Context, cfg: &RammConfig) -> RammResult<U256> {
    let eth_supply = mul_u256(u256(state.eth), u256(ctx.supply))?;
    let buffered = div_u256(
        mul_u256(
            mul_u256(
                u256(cfg.price_buffer_denominator - cfg.price_buffer),
                u256(ctx.capital),
            )?,
            u256(state.nxm_b),
        )?,
        u256(cfg.price_buffer_denominator),
    )?;
    if buffered <= eth_supply {
        return Ok(U256::zero());
    }
    ratchet_time(buffered - eth_supply, state.nxm_b, state.ratchet_speed_b, ctx, cfg)
}

// inner * RATCHET_DENOMINATOR * RATCHET_PERIOD / capital / nxm / speed
fn ratchet_time(
    inner: U256,
    nxm: u128,
    speed: u128,
    ctx: &Context,
    cfg: &RammConfig,
) -> RammResult<U256> {
    let scaled = mul_u256(
        mul_u256(inner, u256(cfg.ratchet_denominator))?,
        U256::from(cfg.ratchet_period),
    )?;
    let t = div_u256(scaled, u256(ctx.capital))?;
    let t = div_u256(t, u256(nxm))?;
    div_u256(t, u256(speed))
}

// elapsed * speed * capital * nxm / supply / RATCHET_PERIOD / RATCHET_DENOMINATOR
fn ratchet_addend(
    elapsed: u64,
    speed: u128,
    nxm: u128,
    ctx: &Context,
    cfg: &RammConfig,
) -> RammResult<U256> {
    let num = mul_u256(
        mul_u256(
            mul_u256(U256::from(elapsed), u256(speed))?,
            u256(ctx.capital),
        )?,
        u256(nxm),
    )?;
    let x = div_u256(num, u256(ctx.supply))?;
    let x = div_u256(x, U256::from(cfg.ratchet_period))?;
    div_u256(x, u256(cfg.ratchet_denominator))
}

/// Roll `state` forward to `timestamp` without touching storage.
pub fn project(
    state: &State,
    ctx: &Context,
    timestamp: u64,
    cfg: &RammConfig,
) -> RammResult<Projection> {
    if timestamp < state.timestamp {
        return Err(RammError::TimestampInPast {
            now: timestamp,
            last: state.timestamp,
        });
    }
    if timestamp == state.timestamp {
        return Ok(Projection {
            state: *state,
            injected: 0,
            extracted: 0,
        });
    }
    if ctx.capital == 0 || ctx.supply == 0 {
        return Err(RammError::InvalidContext);
    }

    let elapsed = timestamp - state.timestamp;
    let liquidity = liquidity::apply(state, timestamp, cfg)?;
    let eth = u256(liquidity.eth);

    let nxm_a = div_u256(mul_u256(u256(state.nxm_a), eth)?, u256(state.eth))?;
    let nxm_b = div_u256(mul_u256(u256(state.nxm_b), eth)?, u256(state.eth))?;
    let eth_supply = mul_u256(eth, u256(ctx.supply))?;

    let nxm_a = if U256::from(elapsed) <= max_time_on_ratchet_a(state, ctx, cfg)? {
        let addend = ratchet_addend(
            elapsed,
            cfg.normal_ratchet_speed,
            narrow_u256(nxm_a)?,
            ctx,
            cfg,
        )?;
        if addend >= eth {
            return Err(RammError::Overflow);
        }
        div_u256(mul_u256(eth, nxm_a)?, eth - addend)?
    } else {
        div_u256(eth_supply, buffered_capital_a(ctx, cfg)?)?
    };

    let nxm_b = if U256::from(elapsed) <= max_time_on_ratchet_b(state, ctx, cfg)? {
        let addend = ratchet_addend(
            elapsed,
            state.ratchet_speed_b,
            narrow_u256(nxm_b)?,
            ctx,
            cfg,
        )?;
        div_u256(mul_u256(eth, nxm_b)?, eth + addend)?
    } else {
        div_u256(eth_supply, buffered_capital_b(ctx, cfg)?)?
    };

    let ratchet_speed_b = if liquidity.budget == 0 {
        cfg.normal_ratchet_speed
    } else {
        state.ratchet_speed_b
    };

    Ok(Projection {
        state: State {
            nxm_a: narrow_u256(nxm_a)?,
            nxm_b: narrow_u256(nxm_b)?,
            eth: liquidity.eth,
            budget: liquidity.budget,
            ratchet_speed_b,
            timestamp,
        },
        injected: liquidity.injected,
        extracted: liquidity.extracted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ONE;

    const T0: u64 = 1_700_000_000;
    const HOUR: u64 = 3_600;

    fn context() -> Context {
        Context::new(145_000 * ONE, 6_750_000 * ONE, 120_000 * ONE).unwrap()
    }

    // spot A 0.03 ETH, spot B 0.01 ETH, book value ~0.02148 ETH
    fn fixture_state() -> State {
        let eth = 1_675 * ONE;
        State {
            nxm_a: crate::math::mul_div(eth, ONE, 3 * ONE / 100).unwrap(),
            nxm_b: crate::math::mul_div(eth, ONE, ONE / 100).unwrap(),
            eth,
            budget: 575 * ONE,
            ratchet_speed_b: 400,
            timestamp: T0,
        }
    }

    #[test]
    fn six_hour_projection_matches_golden_vector() {
        let cfg = RammConfig::default();
        let p = project(&fixture_state(), &context(), T0 + 6 * HOUR, &cfg).unwrap();
        assert_eq!(p.state.eth, 2_050_000_000_000_000_000_000);
        assert_eq!(p.state.nxm_a, 68_826_162_646_107_933_349_888);
        assert_eq!(p.state.nxm_b, 200_688_905_003_625_815_808_560);
        assert_eq!(p.state.budget, 200_000_000_000_000_000_000);
        assert_eq!(p.injected, 375 * ONE);
        assert_eq!(p.extracted, 0);
        assert_eq!(p.state.timestamp, T0 + 6 * HOUR);
    }

    #[test]
    fn zero_elapsed_returns_state_unchanged() {
        let cfg = RammConfig::default();
        let s = fixture_state();
        let p = project(&s, &context(), T0, &cfg).unwrap();
        assert_eq!(p.state, s);
        assert_eq!((p.injected, p.extracted), (0, 0));
    }

    #[test]
    fn long_interval_pins_both_curves_to_buffered_book_value() {
        let cfg = RammConfig::default();
        let ctx = context();
        let p = project(&fixture_state(), &ctx, T0 + 365 * 24 * HOUR, &cfg).unwrap();
        let eth_supply = u256(p.state.eth) * u256(ctx.supply);
        let expected_a = narrow_u256(eth_supply / buffered_capital_a(&ctx, &cfg).unwrap()).unwrap();
        let expected_b = narrow_u256(eth_supply / buffered_capital_b(&ctx, &cfg).unwrap()).unwrap();
        assert_eq!(p.state.nxm_a, expected_a);
        assert_eq!(p.state.nxm_b, expected_b);
        // a year of injection fills the reserve to target
        assert_eq!(p.state.eth, cfg.target_liquidity);
    }

    #[test]
    fn exhausted_budget_drops_to_normal_ratchet_speed() {
        let cfg = RammConfig::default();
        let mut s = fixture_state();
        s.budget = ONE;
        s.ratchet_speed_b = cfg.fast_ratchet_speed;
        let p = project(&s, &context(), T0 + 24 * HOUR, &cfg).unwrap();
        assert_eq!(p.state.budget, 0);
        assert_eq!(p.state.ratchet_speed_b, cfg.normal_ratchet_speed);
    }

    #[test]
    fn ratchet_window_is_zero_inside_the_buffer_band() {
        let cfg = RammConfig::default();
        let ctx = context();
        let mut s = fixture_state();
        // spot A exactly at book value sits below BV * 1.01
        s.nxm_a = crate::math::mul_div(s.eth, ctx.supply, ctx.capital).unwrap();
        assert!(max_time_on_ratchet_a(&s, &ctx, &cfg).unwrap().is_zero());
        assert!(!max_time_on_ratchet_b(&s, &ctx, &cfg).unwrap().is_zero());
    }

    #[test]
    fn ratchet_moves_prices_toward_book_value() {
        let cfg = RammConfig::default();
        let s = fixture_state();
        let p = project(&s, &context(), T0 + HOUR, &cfg).unwrap();
        // price A falls, price B rises: compare eth/nxm cross products
        assert!(u256(p.state.eth) * u256(s.nxm_a) < u256(s.eth) * u256(p.state.nxm_a));
        assert!(u256(p.state.eth) * u256(s.nxm_b) > u256(s.eth) * u256(p.state.nxm_b));
    }

    #[test]
    fn rejects_past_timestamp_and_empty_context() {
        let cfg = RammConfig::default();
        let s = fixture_state();
        assert!(matches!(
            project(&s, &context(), T0 - 1, &cfg),
            Err(RammError::TimestampInPast { .. })
        ));
        let empty = Context {
            capital: 0,
            supply: 1,
            mcr: 0,
        };
        assert_eq!(
            project(&s, &empty, T0 + 1, &cfg).unwrap_err(),
            RammError::InvalidContext
        );
    }
}
