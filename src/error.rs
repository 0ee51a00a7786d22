//! Engine error types
//!
//! Every failure is local and recoverable; nothing here is fatal to the process.

/// Errors returned by ledger, session and table operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Stake is non-positive, non-finite, or above the configured maximum
    #[error("invalid stake: {0}")]
    InvalidStake(f64),
    /// Opening balance is negative or non-finite
    #[error("invalid balance: {0}")]
    InvalidBalance(f64),
    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: f64, available: f64 },
    /// Operation is illegal for the session's current state
    #[error("operation not allowed in the current session state")]
    InvalidState,
    #[error("slot {0} was already revealed")]
    AlreadyRevealed(u32),
    #[error("a session is already active for this player")]
    SessionAlreadyActive,
    /// Manual reveal/cash-out attempted while autoplay drives the session
    #[error("autoplay is driving this session")]
    AutoplayActive,
    #[error("cash-out requires {required} safe reveals, have {hits}")]
    NoProgress { required: u32, hits: u32 },
    #[error("invalid slot {0:?}")]
    InvalidSlot(Option<u32>),
    #[error("invalid variant configuration: {0}")]
    InvalidConfig(&'static str),
}

pub type EngineResult<T> = Result<T, EngineError>;
