// src/events.rs

use serde::{Deserialize, Serialize};

use crate::interfaces::Address;

/// Domain events emitted by committed operations, in commit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RammEvent {
    EthInjected {
        amount: u128,
    },
    EthExtracted {
        amount: u128,
    },
    /// One per closed TWAP period.
    ObservationUpdated {
        timestamp: u64,
        cumulative_above: u128,
        cumulative_below: u128,
    },
    NxmSwappedForEth {
        member: Address,
        nxm_in: u128,
        eth_out: u128,
    },
    EthSwappedForNxm {
        member: Address,
        eth_in: u128,
        nxm_out: u128,
    },
    BudgetAdded {
        amount: u128,
    },
    BudgetRemoved,
    CircuitBreakerLimitsSet {
        eth_limit: u128,
        nxm_limit: u128,
    },
    CircuitBreakerReset,
}
