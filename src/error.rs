// src/error.rs

use thiserror::Error;

/// Every rejected operation surfaces one of these, named so callers can
/// discriminate failure causes without parsing messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RammError {
    #[error("Only one of NXM or ETH may be provided")]
    OneInputOnly,

    #[error("One of NXM or ETH must be provided")]
    OneInputRequired,

    #[error("Swap expired: deadline {deadline}, now {now}")]
    SwapExpired { deadline: u64, now: u64 },

    #[error("System is paused")]
    SystemPaused,

    #[error("Swaps are paused")]
    SwapPaused,

    #[error("NXM is locked for voting")]
    LockedForVoting,

    #[error("Insufficient amount out: got {amount_out}, minimum {min_amount_out}")]
    InsufficientAmountOut { amount_out: u128, min_amount_out: u128 },

    #[error("Swap would push capital into the MCR buffer zone")]
    NoSwapsInBufferZone,

    #[error("ETH circuit breaker hit")]
    EthCircuitBreakerHit,

    #[error("NXM circuit breaker hit")]
    NxmCircuitBreakerHit,

    #[error("ETH transfer failed")]
    EthTransferFailed,

    #[error("NXM transfer failed")]
    NxmTransferFailed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("RAMM is not initialized")]
    NotInitialized,

    #[error("RAMM is already initialized")]
    AlreadyInitialized,

    #[error("Timestamp {now} is before last update {last}")]
    TimestampInPast { now: u64, last: u64 },

    #[error("Capital and supply must be non-zero")]
    InvalidContext,

    #[error("Observation window has zero length")]
    InvalidObservationWindow,

    #[error("Zero amount not allowed")]
    ZeroAmount,

    #[error("Requested amount exceeds the reserve")]
    InsufficientReserve,

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for RAMM operations
pub type RammResult<T> = Result<T, RammError>;
