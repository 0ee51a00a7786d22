//! Hazard generation
//!
//! Both strategies commit their hazard model when a session opens and then
//! answer membership per reveal:
//! - `GridLayout`: a fixed set of hazard slots drawn without replacement
//! - `EscalatingHazard`: a per-step hazard probability that grows after each safe step

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::payout::{PayoutCurve, PayoutInput};

/// Hazard slots on a finite board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    field_size: u32,
    hazards: BTreeSet<u32>,
}

impl GridLayout {
    /// Draw `count` distinct slots from `[0, field_size)`.
    ///
    /// Rejection sampling: draw uniformly and discard duplicates. Every subset of
    /// size `count` is equally likely. Callers guarantee `count < field_size`.
    pub fn generate<R: Rng>(rng: &mut R, field_size: u32, count: u32) -> Self {
        debug_assert!(count < field_size);
        let mut hazards = BTreeSet::new();
        while (hazards.len() as u32) < count {
            hazards.insert(rng.random_range(0..field_size));
        }
        Self {
            field_size,
            hazards,
        }
    }

    pub fn field_size(&self) -> u32 {
        self.field_size
    }

    pub fn hazard_count(&self) -> u32 {
        self.hazards.len() as u32
    }

    pub fn safe_count(&self) -> u32 {
        self.field_size - self.hazard_count()
    }

    pub fn is_hazard(&self, slot: u32) -> bool {
        self.hazards.contains(&slot)
    }

    /// Hazard slots in ascending order. Only handed out after resolution.
    pub(crate) fn slots(&self) -> Vec<u32> {
        self.hazards.iter().copied().collect()
    }
}

/// Risk escalation constants for shaft variants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EscalationParams {
    /// Fixed probability increase per safe step (percentage points)
    pub base_increment: f64,
    /// Up to this much extra, scaled by the step's risk jitter
    pub jitter_span: f64,
    /// Probability increase per unit of current multiplier
    pub multiplier_scale: f64,
    /// Probability ceiling
    pub max_rate: f64,
}

impl Default for EscalationParams {
    fn default() -> Self {
        Self {
            base_increment: 5.0,
            jitter_span: 5.0,
            multiplier_scale: 0.5,
            max_rate: 100.0,
        }
    }
}

impl EscalationParams {
    pub fn validate(&self) -> Result<(), &'static str> {
        let all_finite = [
            self.base_increment,
            self.jitter_span,
            self.multiplier_scale,
            self.max_rate,
        ]
        .iter()
        .all(|v| v.is_finite() && *v >= 0.0);
        if !all_finite {
            return Err("escalation parameters must be finite and non-negative");
        }
        if self.max_rate > 100.0 {
            return Err("max hazard rate cannot exceed 100");
        }
        Ok(())
    }
}

/// Random draws consumed by one safe shaft step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShaftStep {
    /// Hazard roll in `[0, 100)`, compared before the probability moves
    pub roll: f64,
    /// Multiplier jitter in `[0, 1)`
    pub multiplier_jitter: f64,
    /// Risk jitter in `[0, 1)`
    pub risk_jitter: f64,
}

/// Hazard probability that grows with every safe step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EscalatingHazard {
    params: EscalationParams,
    probability: f64,
}

impl EscalatingHazard {
    pub fn new(params: EscalationParams, start_rate: f64) -> Self {
        Self {
            params,
            probability: start_rate.clamp(0.0, params.max_rate),
        }
    }

    pub fn params(&self) -> &EscalationParams {
        &self.params
    }

    /// Current hazard probability in percent
    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Fresh, independent hazard roll in `[0, 100)`
    pub fn roll<R: Rng>(rng: &mut R) -> f64 {
        rng.random::<f64>() * 100.0
    }

    pub fn is_hazard(&self, roll: f64) -> bool {
        roll < self.probability
    }

    /// Raise the probability after a safe step. Must run after that step's roll.
    pub fn escalate(&mut self, risk_jitter: f64, multiplier: f64) {
        let p = &self.params;
        let increase =
            p.base_increment + risk_jitter.clamp(0.0, 1.0) * p.jitter_span + multiplier * p.multiplier_scale;
        self.probability = (self.probability + increase).clamp(0.0, p.max_rate);
    }
}

/// A session's committed hazard model
#[derive(Debug, Clone, PartialEq)]
pub enum HazardField {
    Grid(GridLayout),
    Shaft(EscalatingHazard),
}

/// Hazard information handed to the caller once a session is lost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HazardReveal {
    /// Every hazard slot on the board
    Grid { hazards: Vec<u32> },
    /// The losing roll and the probability it was compared against
    Shaft { roll: f64, probability: f64 },
}

/// Multiplier and hazard probability after each recorded shaft step.
///
/// Recomputes a shaft session from its start rate and step history alone, for
/// audits and replay checks.
pub fn replay_shaft(
    params: EscalationParams,
    curve: &PayoutCurve,
    start_rate: f64,
    steps: &[ShaftStep],
) -> Vec<(f64, f64)> {
    let mut hazard = EscalatingHazard::new(params, start_rate);
    let jitters: Vec<f64> = steps.iter().map(|s| s.multiplier_jitter).collect();
    let mut out = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let multiplier = curve.multiplier(&PayoutInput {
            risk_density: start_rate as u32,
            field_size: None,
            hits: i as u32 + 1,
            jitters: &jitters,
        });
        hazard.escalate(step.risk_jitter, multiplier);
        out.push((multiplier, hazard.probability()));
    }
    out
}
