// src/math.rs

use uint::construct_uint;

use crate::error::{RammError, RammResult};

construct_uint! {
    /// Fixed-width 256-bit integer used for intermediate products of reserves,
    /// capital and supply, which routinely exceed `u128`.
    pub struct U256(4);
}

/// Implicit fixed-point scale of every ETH and NXM amount and every price.
pub const ONE: u128 = 1_000_000_000_000_000_000;

#[inline]
pub fn u256(x: u128) -> U256 {
    U256::from(x)
}

pub fn mul_u256(a: U256, b: U256) -> RammResult<U256> {
    let (res, overflow) = a.overflowing_mul(b);
    if overflow {
        Err(RammError::Overflow)
    } else {
        Ok(res)
    }
}

pub fn div_u256(a: U256, b: U256) -> RammResult<U256> {
    if b.is_zero() {
        return Err(RammError::Overflow);
    }
    Ok(a / b)
}

pub fn narrow_u256(value: U256) -> RammResult<u128> {
    if value.bits() > 128 {
        Err(RammError::Overflow)
    } else {
        Ok(value.low_u128())
    }
}

/// floor(a * b / c)
pub fn mul_div(a: u128, b: u128, c: u128) -> RammResult<u128> {
    narrow_u256(div_u256(mul_u256(u256(a), u256(b))?, u256(c))?)
}

/// ceil(a * b / c)
pub fn mul_div_ceil(a: u128, b: u128, c: u128) -> RammResult<u128> {
    if c == 0 {
        return Err(RammError::Overflow);
    }
    let num = mul_u256(u256(a), u256(b))?;
    let c = u256(c);
    let q = num / c;
    let q = if (num % c).is_zero() { q } else { q + U256::one() };
    narrow_u256(q)
}

/// ceil(a / b) for timestamps and period indices.
#[inline]
pub fn div_ceil(a: u64, b: u64) -> u64 {
    if a == 0 {
        0
    } else {
        (a - 1) / b + 1
    }
}

/// ceil(a / b) on 256-bit operands.
pub fn div_ceil_u256(a: U256, b: U256) -> RammResult<U256> {
    let q = div_u256(a, b)?;
    if (a % b).is_zero() {
        Ok(q)
    } else {
        Ok(q + U256::one())
    }
}
