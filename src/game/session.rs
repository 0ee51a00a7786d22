//! Wager session state machine
//!
//! `Active` (stake debited, hazards committed) → `Resolved` (`Won` or `Lost`).
//! A resolved session is never reused.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::outcome::{EscalatingHazard, GridLayout, HazardField, HazardReveal, ShaftStep};
use super::payout::PayoutInput;
use super::rng::SessionRng;
use super::variant::{FieldKind, VariantConfig};
use crate::error::{EngineError, EngineResult};
use crate::ledger::Ledger;

pub type SessionId = u64;

/// Lifecycle phase. `Idle` means no session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Idle,
    Active,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    None,
    Won,
    Lost,
}

/// Result of one reveal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RevealOutcome {
    Safe { multiplier: f64, hits: u32 },
    Hazard(HazardReveal),
}

/// Settled cash-out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub multiplier: f64,
    /// `stake * multiplier`
    pub base: f64,
    pub bonus: f64,
    /// Credited amount, `base + bonus`
    pub amount: f64,
}

/// One play-through from bet to resolution
pub struct Session {
    id: SessionId,
    stake: f64,
    displayed_risk_density: u32,
    actual_risk_density: u32,
    config: VariantConfig,
    phase: SessionPhase,
    outcome: Outcome,
    /// Grid slots, or shaft step indices, in reveal order
    revealed: Vec<u32>,
    shaft_steps: Vec<ShaftStep>,
    jitters: Vec<f64>,
    field: HazardField,
    multiplier: f64,
    payout: Option<Payout>,
    losing_reveal: Option<HazardReveal>,
    rng: SessionRng,
}

impl fmt::Debug for Session {
    // Hazard positions and RNG state stay out of debug output
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("stake", &self.stake)
            .field("variant", &self.config.name)
            .field("risk_density", &self.displayed_risk_density)
            .field("phase", &self.phase)
            .field("outcome", &self.outcome)
            .field("hits", &self.hits())
            .field("multiplier", &self.multiplier)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Validate the bet, debit the stake, then commit the hazard field.
    ///
    /// Nothing is debited if validation fails, and the layout is drawn only
    /// after the debit succeeds.
    pub fn open(
        ledger: &mut Ledger,
        id: SessionId,
        stake: f64,
        risk_density: u32,
        config: &VariantConfig,
        mut rng: SessionRng,
    ) -> EngineResult<Self> {
        config.validate_stake(stake)?;
        config.validate(risk_density)?;
        ledger.debit(stake)?;

        let actual_risk_density = config.actual_risk_density(risk_density);
        let field = match &config.field {
            FieldKind::Grid { size } => {
                HazardField::Grid(GridLayout::generate(&mut rng, *size, actual_risk_density))
            }
            FieldKind::Shaft(params) => {
                HazardField::Shaft(EscalatingHazard::new(*params, risk_density as f64))
            }
        };

        if actual_risk_density > risk_density {
            log::warn!(
                "Session {}: '{}' shows {} hazards but places {}",
                id,
                config.name,
                risk_density,
                actual_risk_density
            );
        }
        log::info!(
            "Session {} opened: variant={} stake={} risk={}",
            id,
            config.name,
            stake,
            risk_density
        );

        Ok(Self {
            id,
            stake,
            displayed_risk_density: risk_density,
            actual_risk_density,
            config: config.clone(),
            phase: SessionPhase::Active,
            outcome: Outcome::None,
            revealed: Vec::new(),
            shaft_steps: Vec::new(),
            jitters: Vec::new(),
            field,
            multiplier: 1.0,
            payout: None,
            losing_reveal: None,
            rng,
        })
    }

    /// Check one slot (grid) or dig one step (shaft, `slot = None`)
    pub fn reveal(&mut self, slot: Option<u32>) -> EngineResult<RevealOutcome> {
        if self.phase != SessionPhase::Active {
            return Err(EngineError::InvalidState);
        }

        let mut risk_jitter = None;
        let hazard = match &mut self.field {
            HazardField::Grid(layout) => {
                let slot = match slot {
                    Some(s) if s < layout.field_size() => s,
                    _ => return Err(EngineError::InvalidSlot(slot)),
                };
                if self.revealed.contains(&slot) {
                    return Err(EngineError::AlreadyRevealed(slot));
                }
                if layout.is_hazard(slot) {
                    Some(HazardReveal::Grid {
                        hazards: layout.slots(),
                    })
                } else {
                    self.revealed.push(slot);
                    None
                }
            }
            HazardField::Shaft(shaft) => {
                if slot.is_some() {
                    return Err(EngineError::InvalidSlot(slot));
                }
                // The roll is compared against the probability as it stood before this step
                let roll = EscalatingHazard::roll(&mut self.rng);
                if shaft.is_hazard(roll) {
                    Some(HazardReveal::Shaft {
                        roll,
                        probability: shaft.probability(),
                    })
                } else {
                    let step = ShaftStep {
                        roll,
                        multiplier_jitter: self.rng.random(),
                        risk_jitter: self.rng.random(),
                    };
                    self.revealed.push(self.shaft_steps.len() as u32);
                    self.jitters.push(step.multiplier_jitter);
                    self.shaft_steps.push(step);
                    risk_jitter = Some(step.risk_jitter);
                    None
                }
            }
        };

        if let Some(reveal) = hazard {
            self.phase = SessionPhase::Resolved;
            self.outcome = Outcome::Lost;
            self.losing_reveal = Some(reveal.clone());
            log::info!(
                "Session {} lost after {} hits (stake {} forfeited)",
                self.id,
                self.hits(),
                self.stake
            );
            return Ok(RevealOutcome::Hazard(reveal));
        }

        let next = self.config.curve.multiplier(&self.payout_input());
        debug_assert!(next >= self.multiplier);
        self.multiplier = next;
        if let (HazardField::Shaft(shaft), Some(jitter)) = (&mut self.field, risk_jitter) {
            shaft.escalate(jitter, self.multiplier);
        }
        log::debug!(
            "Session {} safe reveal #{}: multiplier {:.4}",
            self.id,
            self.hits(),
            self.multiplier
        );

        Ok(RevealOutcome::Safe {
            multiplier: self.multiplier,
            hits: self.hits(),
        })
    }

    /// Bank the current multiplier. The ledger credit is the last effect.
    pub fn cash_out(&mut self, ledger: &mut Ledger) -> EngineResult<Payout> {
        if self.phase != SessionPhase::Active {
            return Err(EngineError::InvalidState);
        }
        let hits = self.hits();
        if hits < self.config.min_hits_for_cashout {
            return Err(EngineError::NoProgress {
                required: self.config.min_hits_for_cashout,
                hits,
            });
        }

        let base = self.stake * self.multiplier;
        let bonus = self
            .config
            .streak_bonus
            .map(|b| b.bonus(base, hits))
            .unwrap_or(0.0);
        let payout = Payout {
            multiplier: self.multiplier,
            base,
            bonus,
            amount: base + bonus,
        };
        if !payout.amount.is_finite() {
            return Err(EngineError::InvalidConfig("payout is not a finite amount"));
        }

        self.phase = SessionPhase::Resolved;
        self.outcome = Outcome::Won;
        self.payout = Some(payout);
        log::info!(
            "Session {} cashed out: {} hits x{:.4} = {}",
            self.id,
            hits,
            self.multiplier,
            payout.amount
        );
        ledger.credit(payout.amount)?;
        Ok(payout)
    }

    fn payout_input(&self) -> PayoutInput<'_> {
        PayoutInput {
            risk_density: self.displayed_risk_density,
            field_size: self.config.field_size(),
            hits: self.hits(),
            jitters: &self.jitters,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Safe reveals so far
    pub fn hits(&self) -> u32 {
        self.revealed.len() as u32
    }

    pub fn revealed(&self) -> &[u32] {
        &self.revealed
    }

    /// Risk density the player chose and payouts are priced on
    pub fn displayed_risk_density(&self) -> u32 {
        self.displayed_risk_density
    }

    /// Hazards actually committed (grid), or the starting rate (shaft)
    pub fn actual_risk_density(&self) -> u32 {
        self.actual_risk_density
    }

    /// Whether the player is facing more hazards than they were shown
    pub fn is_misrepresented(&self) -> bool {
        self.actual_risk_density > self.displayed_risk_density
    }

    pub fn field_size(&self) -> Option<u32> {
        self.config.field_size()
    }

    /// Current hazard probability in percent (shaft only)
    pub fn hazard_probability(&self) -> Option<f64> {
        match &self.field {
            HazardField::Shaft(shaft) => Some(shaft.probability()),
            HazardField::Grid(_) => None,
        }
    }

    /// Multiplier range one more safe reveal would reach
    pub fn next_multiplier_range(&self) -> (f64, f64) {
        self.config.curve.next_range(&self.payout_input())
    }

    /// Safe slots still hidden (grid only)
    pub fn safe_slots_remaining(&self) -> Option<u32> {
        match &self.field {
            HazardField::Grid(layout) => Some(layout.safe_count() - self.hits()),
            HazardField::Shaft(_) => None,
        }
    }

    /// Slots the player has not revealed yet, hazards included (grid only)
    pub fn unrevealed_slots(&self) -> Vec<u32> {
        match self.field_size() {
            Some(size) => (0..size).filter(|s| !self.revealed.contains(s)).collect(),
            None => Vec::new(),
        }
    }

    /// Draws behind each safe shaft step, for replay audits
    pub fn shaft_steps(&self) -> &[ShaftStep] {
        &self.shaft_steps
    }

    pub fn payout(&self) -> Option<Payout> {
        self.payout
    }

    /// Full hazard information, available only once the session is resolved
    pub fn hazard_layout(&self) -> Option<HazardReveal> {
        if self.phase != SessionPhase::Resolved {
            return None;
        }
        match &self.field {
            HazardField::Grid(layout) => Some(HazardReveal::Grid {
                hazards: layout.slots(),
            }),
            HazardField::Shaft(_) => self.losing_reveal.clone(),
        }
    }
}
