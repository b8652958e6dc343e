// src/store.rs

use crate::circuit_breaker::CircuitBreaker;
use crate::error::{RammError, RammResult};
use crate::state::{Observations, State};

/// Everything the engine persists, captured for rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub state: Option<State>,
    pub observations: Observations,
    pub circuit_breaker: CircuitBreaker,
}

/// Persistence seam. The engine is the only writer.
pub trait StateStore {
    /// Fails with `NotInitialized` before the first `store_state`.
    fn load_state(&self) -> RammResult<State>;
    fn store_state(&mut self, state: State);
    fn load_observations(&self) -> Observations;
    fn store_observations(&mut self, observations: Observations);
    fn load_circuit_breaker(&self) -> CircuitBreaker;
    fn store_circuit_breaker(&mut self, circuit_breaker: CircuitBreaker);
    fn snapshot(&self) -> StoreSnapshot;
    fn restore(&mut self, snapshot: StoreSnapshot);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Option<State>,
    observations: Observations,
    circuit_breaker: CircuitBreaker,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> RammResult<State> {
        self.state.ok_or(RammError::NotInitialized)
    }

    fn store_state(&mut self, state: State) {
        self.state = Some(state);
    }

    fn load_observations(&self) -> Observations {
        self.observations
    }

    fn store_observations(&mut self, observations: Observations) {
        self.observations = observations;
    }

    fn load_circuit_breaker(&self) -> CircuitBreaker {
        self.circuit_breaker
    }

    fn store_circuit_breaker(&mut self, circuit_breaker: CircuitBreaker) {
        self.circuit_breaker = circuit_breaker;
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            state: self.state,
            observations: self.observations,
            circuit_breaker: self.circuit_breaker,
        }
    }

    fn restore(&mut self, snapshot: StoreSnapshot) {
        self.state = snapshot.state;
        self.observations = snapshot.observations;
        self.circuit_breaker = snapshot.circuit_breaker;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Observation;

    fn state() -> State {
        State {
            nxm_a: 1,
            nxm_b: 2,
            eth: 3,
            budget: 4,
            ratchet_speed_b: 5,
            timestamp: 6,
        }
    }

    #[test]
    fn empty_store_is_not_initialized() {
        let store = MemoryStore::new();
        assert!(!store.is_initialized());
        assert_eq!(store.load_state().unwrap_err(), RammError::NotInitialized);
    }

    #[test]
    fn restore_undoes_every_write() {
        let mut store = MemoryStore::new();
        store.store_state(state());
        let snap = store.snapshot();

        let mut moved = state();
        moved.eth = 99;
        store.store_state(moved);
        let mut obs = store.load_observations();
        obs[1] = Observation {
            timestamp: 7,
            price_cumulative_above: 8,
            price_cumulative_below: 9,
        };
        store.store_observations(obs);
        store.store_circuit_breaker(CircuitBreaker::new(1, 1));

        store.restore(snap);
        assert_eq!(store.load_state().unwrap(), state());
        assert_eq!(store.load_observations(), Observations::default());
        assert_eq!(store.load_circuit_breaker(), CircuitBreaker::default());
    }
}
