//! Game core
//!
//! Nothing in here touches the clock, the network, or storage. Randomness
//! comes in through `EntropySource`, time through `advance_autoplay` or a
//! `Pacer`.

pub mod autoplay;
pub mod outcome;
pub mod payout;
pub mod rng;
pub mod session;
pub mod table;
pub mod variant;

pub use autoplay::{AutoplayReport, Pacer, StopCondition, StopToken, ThreadPacer, run_autoplay};
pub use outcome::{EscalatingHazard, EscalationParams, GridLayout, HazardReveal, ShaftStep, replay_shaft};
pub use payout::{PayoutCurve, PayoutInput, StepTable};
pub use rng::{EntropySource, OsEntropy, RngState, SeededEntropy};
pub use session::{Outcome, Payout, RevealOutcome, Session, SessionId, SessionPhase};
pub use table::{RevealResult, SessionHandle, SessionView, Table};
pub use variant::{FieldKind, StreakBonus, VariantConfig};
