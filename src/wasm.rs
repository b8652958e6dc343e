// src/wasm.rs

//! JS bindings. Amounts cross the boundary as decimal strings since JS
//! numbers can't hold 1e18-scaled values; states cross as JSON.

use wasm_bindgen::prelude::*;

use crate::config::RammConfig;
use crate::curve;
use crate::error::{RammError, RammResult};
use crate::price;
use crate::reserves::project;
use crate::state::{Context, State};

impl From<RammError> for JsValue {
    fn from(err: RammError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

fn parse_amount(value: &str) -> RammResult<u128> {
    value
        .trim()
        .parse::<u128>()
        .map_err(|_| RammError::InvalidConfig(format!("not a decimal amount: {value}")))
}

fn parse_state(state_json: &str) -> RammResult<State> {
    serde_json::from_str(state_json).map_err(|e| RammError::InvalidConfig(e.to_string()))
}

fn parse_context(capital: &str, supply: &str, mcr: &str) -> RammResult<Context> {
    Context::new(parse_amount(capital)?, parse_amount(supply)?, parse_amount(mcr)?)
}

#[wasm_bindgen]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmReserves {
    eth_liquidity: u128,
    nxm_a: u128,
    nxm_b: u128,
    budget: u128,
    state_json: String,
}

#[wasm_bindgen]
impl WasmReserves {
    #[wasm_bindgen(getter)]
    pub fn eth_liquidity(&self) -> String {
        self.eth_liquidity.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn nxm_a(&self) -> String {
        self.nxm_a.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn nxm_b(&self) -> String {
        self.nxm_b.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn budget(&self) -> String {
        self.budget.to_string()
    }

    /// Projected state, ready to feed back into the quote functions.
    #[wasm_bindgen(getter)]
    pub fn state_json(&self) -> String {
        self.state_json.clone()
    }
}

#[wasm_bindgen]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WasmSwapQuote {
    amount_in: u128,
    amount_out: u128,
    state_json: String,
}

#[wasm_bindgen]
impl WasmSwapQuote {
    #[wasm_bindgen(getter)]
    pub fn amount_in(&self) -> String {
        self.amount_in.to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn amount_out(&self) -> String {
        self.amount_out.to_string()
    }

    /// State after the trade.
    #[wasm_bindgen(getter)]
    pub fn state_json(&self) -> String {
        self.state_json.clone()
    }
}

/// Stateless pricing over a config. The caller owns the state JSON.
#[wasm_bindgen]
pub struct WasmRamm {
    config: RammConfig,
}

impl WasmRamm {
    fn from_config(config_json: Option<&str>) -> RammResult<Self> {
        let config = match config_json {
            Some(json) => RammConfig::from_json(json)?,
            None => RammConfig::default(),
        };
        Ok(Self { config })
    }

    fn project_inner(
        &self,
        state_json: &str,
        ctx: &Context,
        now: u64,
    ) -> RammResult<(State, WasmReserves)> {
        let state = project(&parse_state(state_json)?, ctx, now, &self.config)?.state;
        let state_json =
            serde_json::to_string(&state).map_err(|e| RammError::InvalidConfig(e.to_string()))?;
        Ok((
            state,
            WasmReserves {
                eth_liquidity: state.eth,
                nxm_a: state.nxm_a,
                nxm_b: state.nxm_b,
                budget: state.budget,
                state_json,
            },
        ))
    }

    fn quote_inner(
        &self,
        state_json: &str,
        ctx: &Context,
        now: u64,
        amount_in: u128,
        buy_nxm: bool,
    ) -> RammResult<WasmSwapQuote> {
        let (state, _) = self.project_inner(state_json, ctx, now)?;
        let outcome = if buy_nxm {
            curve::swap_eth_for_nxm(&state, amount_in)?
        } else {
            curve::swap_nxm_for_eth(&state, amount_in)?
        };
        let state_json = serde_json::to_string(&outcome.state)
            .map_err(|e| RammError::InvalidConfig(e.to_string()))?;
        Ok(WasmSwapQuote {
            amount_in,
            amount_out: outcome.amount_out,
            state_json,
        })
    }

    fn required_inner(
        &self,
        state_json: &str,
        ctx: &Context,
        now: u64,
        amount_out: u128,
        buy_nxm: bool,
    ) -> RammResult<WasmSwapQuote> {
        let (state, _) = self.project_inner(state_json, ctx, now)?;
        let amount_in = if buy_nxm {
            curve::eth_in_for_nxm_out(&state, amount_out)?
        } else {
            curve::nxm_in_for_eth_out(&state, amount_out)?
        };
        let state_json =
            serde_json::to_string(&state).map_err(|e| RammError::InvalidConfig(e.to_string()))?;
        Ok(WasmSwapQuote {
            amount_in,
            amount_out,
            state_json,
        })
    }
}

#[wasm_bindgen]
impl WasmRamm {
    /// `config_json` overrides any subset of the deployed constants.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<WasmRamm, JsValue> {
        Ok(Self::from_config(config_json.as_deref())?)
    }

    pub fn config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.config).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn project_reserves(
        &self,
        state_json: &str,
        capital: &str,
        supply: &str,
        mcr: &str,
        now: u64,
    ) -> Result<WasmReserves, JsValue> {
        let ctx = parse_context(capital, supply, mcr)?;
        Ok(self.project_inner(state_json, &ctx, now)?.1)
    }

    pub fn quote_eth_for_nxm(
        &self,
        state_json: &str,
        capital: &str,
        supply: &str,
        mcr: &str,
        now: u64,
        eth_in: &str,
    ) -> Result<WasmSwapQuote, JsValue> {
        let ctx = parse_context(capital, supply, mcr)?;
        Ok(self.quote_inner(state_json, &ctx, now, parse_amount(eth_in)?, true)?)
    }

    pub fn quote_nxm_for_eth(
        &self,
        state_json: &str,
        capital: &str,
        supply: &str,
        mcr: &str,
        now: u64,
        nxm_in: &str,
    ) -> Result<WasmSwapQuote, JsValue> {
        let ctx = parse_context(capital, supply, mcr)?;
        Ok(self.quote_inner(state_json, &ctx, now, parse_amount(nxm_in)?, false)?)
    }

    pub fn eth_in_for_nxm_out(
        &self,
        state_json: &str,
        capital: &str,
        supply: &str,
        mcr: &str,
        now: u64,
        nxm_out: &str,
    ) -> Result<WasmSwapQuote, JsValue> {
        let ctx = parse_context(capital, supply, mcr)?;
        Ok(self.required_inner(state_json, &ctx, now, parse_amount(nxm_out)?, true)?)
    }

    pub fn nxm_in_for_eth_out(
        &self,
        state_json: &str,
        capital: &str,
        supply: &str,
        mcr: &str,
        now: u64,
        eth_out: &str,
    ) -> Result<WasmSwapQuote, JsValue> {
        let ctx = parse_context(capital, supply, mcr)?;
        Ok(self.required_inner(state_json, &ctx, now, parse_amount(eth_out)?, false)?)
    }

    pub fn book_value(&self, capital: &str, supply: &str) -> Result<String, JsValue> {
        let ctx = parse_context(capital, supply, "0")?;
        Ok(price::book_value(&ctx)?.to_string())
    }
}
