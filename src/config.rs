// src/config.rs

use serde::{Deserialize, Serialize};

use crate::error::{RammError, RammResult};
use crate::math::ONE;

/// Number of TWAP observation slots.
pub const GRANULARITY: usize = 3;

const DAY: u64 = 24 * 60 * 60;

/// Tunable constants of the engine.
///
/// Amounts are 1e18-scaled ETH, speeds are per `*_period` seconds and the
/// ratchet speeds are expressed over `ratchet_denominator`. Circuit breaker
/// limits are whole tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RammConfig {
    pub liq_speed_period: u64,
    pub ratchet_period: u64,
    pub ratchet_denominator: u128,
    pub price_buffer: u128,
    pub price_buffer_denominator: u128,
    /// Length of one TWAP observation period in seconds.
    pub period_size: u64,
    pub fast_liquidity_speed: u128,
    pub target_liquidity: u128,
    /// Extraction speed while above target.
    pub liq_speed_a: u128,
    /// Permanent injection speed once the budget is spent.
    pub liq_speed_b: u128,
    pub normal_ratchet_speed: u128,
    pub fast_ratchet_speed: u128,
    pub initial_liquidity: u128,
    pub initial_budget: u128,
    pub initial_eth_limit: u128,
    pub initial_nxm_limit: u128,
    pub internal_price_floor_percent: u128,
    pub internal_price_ceiling_percent: u128,
}

impl Default for RammConfig {
    fn default() -> Self {
        Self {
            liq_speed_period: DAY,
            ratchet_period: DAY,
            ratchet_denominator: 10_000,
            price_buffer: 100,
            price_buffer_denominator: 10_000,
            period_size: 3 * DAY,
            fast_liquidity_speed: 1_500 * ONE,
            target_liquidity: 5_000 * ONE,
            liq_speed_a: 100 * ONE,
            liq_speed_b: 100 * ONE,
            normal_ratchet_speed: 400,
            fast_ratchet_speed: 5_000,
            initial_liquidity: 5_000 * ONE,
            initial_budget: 43_835 * ONE,
            initial_eth_limit: 22_000,
            initial_nxm_limit: 250_000,
            internal_price_floor_percent: 35,
            internal_price_ceiling_percent: 300,
        }
    }
}

impl RammConfig {
    /// Parse a JSON document; missing fields keep their deployed values.
    pub fn from_json(json: &str) -> RammResult<Self> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|e| RammError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> RammResult<()> {
        let nonzero_periods = [
            ("liq_speed_period", self.liq_speed_period),
            ("ratchet_period", self.ratchet_period),
            ("period_size", self.period_size),
        ];
        for (name, value) in nonzero_periods {
            if value == 0 {
                return Err(RammError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        let nonzero = [
            ("ratchet_denominator", self.ratchet_denominator),
            ("price_buffer_denominator", self.price_buffer_denominator),
            ("fast_liquidity_speed", self.fast_liquidity_speed),
            ("normal_ratchet_speed", self.normal_ratchet_speed),
            ("fast_ratchet_speed", self.fast_ratchet_speed),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(RammError::InvalidConfig(format!("{name} must be non-zero")));
            }
        }

        if self.price_buffer >= self.price_buffer_denominator {
            return Err(RammError::InvalidConfig(
                "price_buffer must be below price_buffer_denominator".into(),
            ));
        }
        if self.internal_price_floor_percent > self.internal_price_ceiling_percent {
            return Err(RammError::InvalidConfig(
                "internal price floor above ceiling".into(),
            ));
        }
        Ok(())
    }
}
