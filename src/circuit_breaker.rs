// src/circuit_breaker.rs

//! Cumulative release limiter.
//!
//! Two monotone counters of ETH and NXM released by swaps, compared against
//! limits expressed in whole tokens. Counters only go down through an
//! explicit administrative reset.

use serde::{Deserialize, Serialize};

use crate::error::{RammError, RammResult};
use crate::math::ONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    Eth,
    Nxm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    /// Whole ETH.
    pub eth_limit: u128,
    /// Whole NXM.
    pub nxm_limit: u128,
    pub eth_released: u128,
    pub nxm_released: u128,
}

impl CircuitBreaker {
    pub fn new(eth_limit: u128, nxm_limit: u128) -> Self {
        Self {
            eth_limit,
            nxm_limit,
            eth_released: 0,
            nxm_released: 0,
        }
    }

    /// Counters after releasing `amount` of `kind`, or the matching hit error.
    /// `self` is never modified.
    pub fn check_and_accumulate(&self, kind: ReleaseKind, amount: u128) -> RammResult<Self> {
        let mut next = *self;
        match kind {
            ReleaseKind::Eth => {
                next.eth_released = self.eth_released.checked_add(amount).ok_or(RammError::Overflow)?;
                if next.eth_released > self.eth_limit.saturating_mul(ONE) {
                    return Err(RammError::EthCircuitBreakerHit);
                }
            }
            ReleaseKind::Nxm => {
                next.nxm_released = self.nxm_released.checked_add(amount).ok_or(RammError::Overflow)?;
                if next.nxm_released > self.nxm_limit.saturating_mul(ONE) {
                    return Err(RammError::NxmCircuitBreakerHit);
                }
            }
        }
        Ok(next)
    }

    /// Both releases of one swap. ETH is checked first.
    pub fn accumulate(&self, eth: u128, nxm: u128) -> RammResult<Self> {
        self.check_and_accumulate(ReleaseKind::Eth, eth)?
            .check_and_accumulate(ReleaseKind::Nxm, nxm)
    }

    pub fn with_limits(&self, eth_limit: u128, nxm_limit: u128) -> Self {
        Self {
            eth_limit,
            nxm_limit,
            ..*self
        }
    }

    pub fn reset(&self) -> Self {
        Self::new(self.eth_limit, self.nxm_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn limit_is_inclusive_in_whole_tokens() {
        let cb = CircuitBreaker::new(10, 20);
        let at = cb.check_and_accumulate(ReleaseKind::Eth, 10 * ONE).unwrap();
        assert_eq!(at.eth_released, 10 * ONE);
        assert_eq!(
            at.check_and_accumulate(ReleaseKind::Eth, 1).unwrap_err(),
            RammError::EthCircuitBreakerHit
        );
        assert_eq!(
            cb.check_and_accumulate(ReleaseKind::Nxm, 20 * ONE + 1).unwrap_err(),
            RammError::NxmCircuitBreakerHit
        );
    }

    #[test]
    fn failed_check_leaves_counters_alone() {
        let cb = CircuitBreaker::new(1, 1).accumulate(ONE / 2, ONE / 2).unwrap();
        let before = cb;
        assert!(cb.accumulate(ONE, 0).is_err());
        assert_eq!(cb, before);
    }

    #[test]
    fn eth_is_checked_before_nxm() {
        let cb = CircuitBreaker::new(0, 0);
        assert_eq!(cb.accumulate(1, 1).unwrap_err(), RammError::EthCircuitBreakerHit);
        assert_eq!(cb.accumulate(0, 1).unwrap_err(), RammError::NxmCircuitBreakerHit);
    }

    #[test]
    fn new_limits_keep_counters_and_reset_keeps_limits() {
        let cb = CircuitBreaker::new(5, 5).accumulate(3 * ONE, 4 * ONE).unwrap();
        let raised = cb.with_limits(50, 60);
        assert_eq!((raised.eth_released, raised.nxm_released), (3 * ONE, 4 * ONE));
        let reset = raised.reset();
        assert_eq!(reset, CircuitBreaker::new(50, 60));
    }

    proptest! {
        #[test]
        fn counters_never_decrease(
            amounts in proptest::collection::vec((0u128..ONE, 0u128..ONE), 1..30),
        ) {
            let mut cb = CircuitBreaker::new(10, 10);
            for (eth, nxm) in amounts {
                match cb.accumulate(eth, nxm) {
                    Ok(next) => {
                        prop_assert!(next.eth_released >= cb.eth_released);
                        prop_assert!(next.nxm_released >= cb.nxm_released);
                        cb = next;
                    }
                    Err(_) => {
                        prop_assert!(cb.eth_released + eth > 10 * ONE || cb.nxm_released + nxm > 10 * ONE);
                    }
                }
            }
        }
    }
}
