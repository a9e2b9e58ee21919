//! Typed error taxonomy for the derivation engine.
//!
//! Two classes matter to the worker loop: recoverable errors abort the
//! current event's writes and processing continues with the next event;
//! fatal errors indicate a logic or configuration defect and are logged
//! loudly before the event is dropped.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invariant solver failed to converge within the iteration bound.
    #[error("invariant solve did not converge: {0}")]
    NonConvergence(&'static str),

    /// Fixed-point oracle buffer failed structural validation.
    #[error("malformed oracle buffer: {0}")]
    MalformedBuffer(String),

    /// Event referenced a pool absent from the configured registry.
    #[error("unconfigured pool {0}")]
    UnknownPool(String),

    /// Event referenced a token absent from the configured registry.
    #[error("unconfigured token {0}")]
    UnknownToken(String),

    /// Pool registry entry is present but unusable.
    #[error("bad configuration for pool {pool}: {reason}")]
    BadPoolConfig { pool: String, reason: String },

    /// External price service reverted for this block. Expected shortly
    /// after a pool's deployment; the handler aborts with no writes.
    #[error("price service reverted at block {block}")]
    PriceRevert { block: u64 },
}

impl EngineError {
    /// Recoverable errors leave a gap in derived history and processing
    /// moves on; everything else requires operator attention.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EngineError::PriceRevert { .. })
    }
}
