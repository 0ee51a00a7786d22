//! Wager Engine - Risk-escalation betting core for mines and dig style mini-games
//!
//! Core modules:
//! - `ledger`: Per-player balance with atomic debit/credit
//! - `game`: Sessions, hazard generation, payout curves, autoplay
//! - `settings`: Data-driven variant presets and demo configuration
//! - `persistence`: Save/load with integrity verification
//! - `platform`: Browser bindings (wasm32 only)

pub mod error;
pub mod game;
pub mod ledger;
pub mod persistence;
#[cfg(target_arch = "wasm32")]
pub mod platform;
pub mod settings;

pub use error::{EngineError, EngineResult};
pub use game::{
    Outcome, Payout, PayoutCurve, RevealResult, SessionHandle, SessionPhase, SessionView,
    StopCondition, Table, VariantConfig,
};
pub use ledger::Ledger;
pub use persistence::SaveData;
pub use settings::{Settings, VariantPreset};

/// Engine configuration constants
pub mod consts {
    /// Balance of a brand-new player
    pub const STARTING_BALANCE: f64 = 1000.0;

    /// Default autoplay pacing
    pub const AUTOPLAY_INTERVAL_MS: u64 = 500;
    /// Maximum autoplay reveals per `advance_autoplay` call to prevent spiral of death
    pub const MAX_AUTOPLAY_STEPS: u32 = 8;

    /// Grid defaults
    pub const GRID_SIZE: u32 = 25;
    pub const DEFAULT_RISK_DENSITY: u32 = 3;
}
