// src/engine.rs

//! The engine: the only component that commits state.
//!
//! Every committing operation follows the same order: gather context, roll
//! reserves and observations forward to `now`, run every check, commit to
//! the store, then talk to collaborators that may run foreign code. A
//! failed transfer restores the pre-commit snapshot so nothing is visible.

use core::mem;

use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::RammConfig;
use crate::curve::{self, SwapOutcome};
use crate::error::{RammError, RammResult};
use crate::events::RammEvent;
use crate::interfaces::{Address, CapitalPool, Governance, TokenController};
use crate::math::{mul_div, ONE};
use crate::price;
use crate::reserves::project;
use crate::state::{Context, Observation, Observations, Reserves, SpotPrices, State};
use crate::store::{MemoryStore, StateStore};
use crate::twap::{seed_observations, update_twap};

/// State and observations rolled forward to one timestamp, not yet stored.
#[derive(Debug, Clone)]
struct Rolled {
    state: State,
    observations: Observations,
    updated: Vec<Observation>,
    injected: u128,
    extracted: u128,
}

/// Collaborator side effect to undo after a failed second transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compensation {
    None,
    RefundEth(u128),
    RemintNxm(u128),
}

pub struct Ramm<P, T, G, S = MemoryStore> {
    config: RammConfig,
    pool: P,
    token: T,
    governance: G,
    store: S,
    events: Vec<RammEvent>,
}

impl<P, T, G, S> Ramm<P, T, G, S>
where
    P: CapitalPool,
    T: TokenController,
    G: Governance,
    S: StateStore,
{
    /// Engine over a possibly empty store. Call `initialize` before use.
    pub fn new(config: RammConfig, pool: P, token: T, governance: G, store: S) -> RammResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool,
            token,
            governance,
            store,
            events: Vec::new(),
        })
    }

    /// Engine over a store that already holds a state.
    pub fn from_parts(
        config: RammConfig,
        pool: P,
        token: T,
        governance: G,
        store: S,
    ) -> RammResult<Self> {
        store.load_state()?;
        Self::new(config, pool, token, governance, store)
    }

    /// Create the reserves at the given spot prices and seed the TWAP with a
    /// flat history at those prices.
    pub fn initialize(
        &mut self,
        caller: Address,
        spot_price_a: u128,
        spot_price_b: u128,
        now: u64,
    ) -> RammResult<()> {
        self.ensure_governor(caller)?;
        if self.store.load_state().is_ok() {
            return Err(RammError::AlreadyInitialized);
        }
        if spot_price_a == 0 || spot_price_b == 0 {
            return Err(RammError::ZeroAmount);
        }

        let eth = self.config.initial_liquidity;
        let state = State {
            nxm_a: mul_div(eth, ONE, spot_price_a)?,
            nxm_b: mul_div(eth, ONE, spot_price_b)?,
            eth,
            budget: self.config.initial_budget,
            ratchet_speed_b: self.config.fast_ratchet_speed,
            timestamp: now,
        };
        let observations = seed_observations(&state, now, &self.config)?;

        self.store.store_state(state);
        self.store.store_observations(observations);
        self.store.store_circuit_breaker(CircuitBreaker::new(
            self.config.initial_eth_limit,
            self.config.initial_nxm_limit,
        ));
        info!(
            "Initialized RAMM: {} ETH liquidity, {} ETH budget, spot A {}, spot B {}",
            eth, state.budget, spot_price_a, spot_price_b
        );
        Ok(())
    }

    /// Swap exactly one of `nxm_in` or `eth_in`. Returns the amount paid out.
    pub fn swap(
        &mut self,
        member: Address,
        nxm_in: u128,
        eth_in: u128,
        min_amount_out: u128,
        deadline: u64,
        now: u64,
    ) -> RammResult<u128> {
        if nxm_in > 0 && eth_in > 0 {
            return Err(RammError::OneInputOnly);
        }
        if nxm_in == 0 && eth_in == 0 {
            return Err(RammError::OneInputRequired);
        }
        if now > deadline {
            return Err(RammError::SwapExpired { deadline, now });
        }
        let flags = self.governance.pause_flags();
        if flags.is_global_paused() {
            return Err(RammError::SystemPaused);
        }
        if flags.is_swaps_paused() {
            return Err(RammError::SwapPaused);
        }
        if nxm_in > 0 && self.token.is_locked_for_voting(member) {
            return Err(RammError::LockedForVoting);
        }

        let ctx = self.context()?;
        let rolled = self.roll(&ctx, now)?;

        let buying = eth_in > 0;
        let SwapOutcome { state, amount_out } = if buying {
            curve::swap_eth_for_nxm(&rolled.state, eth_in)?
        } else {
            curve::swap_nxm_for_eth(&rolled.state, nxm_in)?
        };
        debug!(
            "Swap quote for {}: nxm_in {}, eth_in {}, amount_out {}",
            member, nxm_in, eth_in, amount_out
        );

        let (eth_out, nxm_out) = if buying { (0, amount_out) } else { (amount_out, 0) };
        if !buying && ctx.capital.checked_sub(eth_out).map_or(true, |left| left < ctx.mcr) {
            warn!(
                "Rejected swap: {} ETH out would leave capital {} under MCR {}",
                eth_out, ctx.capital, ctx.mcr
            );
            return Err(RammError::NoSwapsInBufferZone);
        }

        if amount_out < min_amount_out {
            return Err(RammError::InsufficientAmountOut {
                amount_out,
                min_amount_out,
            });
        }

        let released = eth_out.checked_add(rolled.injected).ok_or(RammError::Overflow)?;
        let breaker = self
            .store
            .load_circuit_breaker()
            .accumulate(released, nxm_out)
            .map_err(|e| {
                warn!("Rejected swap: {}", e);
                e
            })?;

        // effects
        let snapshot = self.store.snapshot();
        self.store.store_state(state);
        self.store.store_observations(rolled.observations);
        self.store.store_circuit_breaker(breaker);

        // interactions
        let transferred = if buying {
            self.pay_nxm_for_eth(member, eth_in, nxm_out)
        } else {
            self.pay_eth_for_nxm(member, nxm_in, eth_out)
        };
        if let Err((e, undo)) = transferred {
            warn!("Swap transfer failed for {}, restoring state: {}", member, e);
            self.store.restore(snapshot);
            self.compensate(member, undo);
            return Err(e);
        }

        self.emit_rolled(&rolled);
        if buying {
            info!("Swapped {} ETH for {} NXM ({})", eth_in, nxm_out, member);
            self.events.push(RammEvent::EthSwappedForNxm {
                member,
                eth_in,
                nxm_out,
            });
        } else {
            info!("Swapped {} NXM for {} ETH ({})", nxm_in, eth_out, member);
            self.events.push(RammEvent::NxmSwappedForEth {
                member,
                nxm_in,
                eth_out,
            });
        }
        Ok(amount_out)
    }

    // ETH in, NXM minted. A failed mint needs the deposit refunded.
    fn pay_nxm_for_eth(
        &mut self,
        member: Address,
        eth_in: u128,
        nxm_out: u128,
    ) -> Result<(), (RammError, Compensation)> {
        self.pool
            .deposit_eth(eth_in)
            .map_err(|_| (RammError::EthTransferFailed, Compensation::None))?;
        self.token
            .mint(member, nxm_out)
            .map_err(|_| (RammError::NxmTransferFailed, Compensation::RefundEth(eth_in)))
    }

    // NXM burned, ETH sent. A failed send needs the burned NXM re-minted.
    fn pay_eth_for_nxm(
        &mut self,
        member: Address,
        nxm_in: u128,
        eth_out: u128,
    ) -> Result<(), (RammError, Compensation)> {
        self.token
            .burn_from(member, nxm_in)
            .map_err(|_| (RammError::NxmTransferFailed, Compensation::None))?;
        self.pool
            .send_eth(member, eth_out)
            .map_err(|_| (RammError::EthTransferFailed, Compensation::RemintNxm(nxm_in)))
    }

    // Runs only after the store is restored.
    fn compensate(&mut self, member: Address, undo: Compensation) {
        match undo {
            Compensation::None => {}
            Compensation::RefundEth(amount) => {
                if let Err(e) = self.pool.send_eth(member, amount) {
                    warn!("Refund of {} ETH to {} failed: {}", amount, member, e);
                }
            }
            Compensation::RemintNxm(amount) => {
                if let Err(e) = self.token.mint(member, amount) {
                    warn!("Re-mint of {} NXM to {} failed: {}", amount, member, e);
                }
            }
        }
    }

    /// Reserves projected to `now`.
    pub fn get_reserves(&self, now: u64) -> RammResult<Reserves> {
        let ctx = self.context()?;
        let state = self.store.load_state()?;
        let projection = project(&state, &ctx, now, &self.config)?;
        debug!(
            "Projected reserves to {}: injected {}, extracted {}",
            now, projection.injected, projection.extracted
        );
        Ok(Reserves::from(&projection.state))
    }

    pub fn get_spot_prices(&self, now: u64) -> RammResult<SpotPrices> {
        let ctx = self.context()?;
        let state = self.store.load_state()?;
        price::spot_prices(&project(&state, &ctx, now, &self.config)?.state)
    }

    pub fn get_book_value(&self) -> RammResult<u128> {
        price::book_value(&self.context()?)
    }

    /// Internal price at `now`. Nothing is stored.
    pub fn get_internal_price(&self, now: u64) -> RammResult<u128> {
        let ctx = self.context()?;
        let rolled = self.roll(&ctx, now)?;
        price::internal_price(&rolled.state, &rolled.observations, &ctx, now, &self.config)
    }

    /// Internal price at `now`, storing the rolled state and observations.
    pub fn get_internal_price_and_update_twap(&mut self, now: u64) -> RammResult<u128> {
        let ctx = self.context()?;
        let rolled = self.roll(&ctx, now)?;
        let price =
            price::internal_price(&rolled.state, &rolled.observations, &ctx, now, &self.config)?;
        self.commit(rolled);
        Ok(price)
    }

    /// Roll observations forward to `now`. A no-op when nothing has elapsed.
    pub fn update_twap(&mut self, now: u64) -> RammResult<()> {
        let state = self.store.load_state()?;
        if now == state.timestamp {
            return Ok(());
        }
        let ctx = self.context()?;
        let rolled = self.roll(&ctx, now)?;
        self.commit(rolled);
        Ok(())
    }

    /// Raw persisted state, not projected.
    pub fn load_state(&self) -> RammResult<State> {
        self.store.load_state()
    }

    pub fn observations(&self) -> Observations {
        self.store.load_observations()
    }

    pub fn circuit_breaker(&self) -> CircuitBreaker {
        self.store.load_circuit_breaker()
    }

    /// Top up the injection budget and switch curve B back to the fast
    /// ratchet.
    pub fn add_budget(&mut self, caller: Address, amount: u128, now: u64) -> RammResult<()> {
        self.ensure_governor(caller)?;
        if amount == 0 {
            return Err(RammError::ZeroAmount);
        }
        let ctx = self.context()?;
        let mut rolled = self.roll(&ctx, now)?;
        rolled.state.budget = rolled
            .state
            .budget
            .checked_add(amount)
            .ok_or(RammError::Overflow)?;
        rolled.state.ratchet_speed_b = self.config.fast_ratchet_speed;
        self.commit(rolled);

        info!("Added {} ETH to the injection budget", amount);
        self.events.push(RammEvent::BudgetAdded { amount });
        Ok(())
    }

    pub fn remove_budget(&mut self, caller: Address, now: u64) -> RammResult<()> {
        self.ensure_governor(caller)?;
        let ctx = self.context()?;
        let mut rolled = self.roll(&ctx, now)?;
        rolled.state.budget = 0;
        rolled.state.ratchet_speed_b = self.config.normal_ratchet_speed;
        self.commit(rolled);

        info!("Removed the injection budget");
        self.events.push(RammEvent::BudgetRemoved);
        Ok(())
    }

    /// Limits are whole ETH and whole NXM.
    pub fn set_circuit_breaker_limits(
        &mut self,
        caller: Address,
        eth_limit: u128,
        nxm_limit: u128,
    ) -> RammResult<()> {
        self.ensure_governor(caller)?;
        let breaker = self.store.load_circuit_breaker();
        self.store
            .store_circuit_breaker(breaker.with_limits(eth_limit, nxm_limit));

        info!(
            "Circuit breaker limits set to {} ETH, {} NXM",
            eth_limit, nxm_limit
        );
        self.events.push(RammEvent::CircuitBreakerLimitsSet {
            eth_limit,
            nxm_limit,
        });
        Ok(())
    }

    pub fn reset_circuit_breaker(&mut self, caller: Address) -> RammResult<()> {
        self.ensure_governor(caller)?;
        let breaker = self.store.load_circuit_breaker();
        self.store.store_circuit_breaker(breaker.reset());

        info!(
            "Circuit breaker counters reset from {} ETH, {} NXM released",
            breaker.eth_released, breaker.nxm_released
        );
        self.events.push(RammEvent::CircuitBreakerReset);
        Ok(())
    }

    pub fn events(&self) -> &[RammEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RammEvent> {
        mem::take(&mut self.events)
    }

    pub fn config(&self) -> &RammConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn governance_mut(&mut self) -> &mut G {
        &mut self.governance
    }

    fn ensure_governor(&self, caller: Address) -> RammResult<()> {
        if self.governance.is_governor(caller) {
            Ok(())
        } else {
            Err(RammError::Unauthorized)
        }
    }

    fn context(&self) -> RammResult<Context> {
        Context::new(
            self.pool.capital_value(),
            self.token.total_supply(),
            self.pool.mcr(),
        )
    }

    fn roll(&self, ctx: &Context, now: u64) -> RammResult<Rolled> {
        let initial = self.store.load_state()?;
        let observations = self.store.load_observations();
        let twap = update_twap(&initial, &observations, ctx, now, &self.config)?;
        let projection = project(&initial, ctx, now, &self.config)?;
        debug!(
            "Rolled state from {} to {}: {} observations closed",
            initial.timestamp,
            now,
            twap.updated.len()
        );
        Ok(Rolled {
            state: projection.state,
            observations: twap.observations,
            updated: twap.updated,
            injected: projection.injected,
            extracted: projection.extracted,
        })
    }

    fn commit(&mut self, rolled: Rolled) {
        self.store.store_state(rolled.state);
        self.store.store_observations(rolled.observations);
        self.emit_rolled(&rolled);
    }

    fn emit_rolled(&mut self, rolled: &Rolled) {
        for observation in &rolled.updated {
            self.events.push(RammEvent::ObservationUpdated {
                timestamp: observation.timestamp,
                cumulative_above: observation.price_cumulative_above,
                cumulative_below: observation.price_cumulative_below,
            });
        }
        if rolled.injected > 0 {
            self.events.push(RammEvent::EthInjected {
                amount: rolled.injected,
            });
        }
        if rolled.extracted > 0 {
            self.events.push(RammEvent::EthExtracted {
                amount: rolled.extracted,
            });
        }
    }
}
