//! Per-variant game configuration
//!
//! A `VariantConfig` is passed to every `open`. Nothing in it is global.

use serde::{Deserialize, Serialize};

use super::outcome::EscalationParams;
use super::payout::PayoutCurve;
use crate::error::{EngineError, EngineResult};

/// Shape of the hazard field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Finite board of `size` slots with a fixed hazard count
    Grid { size: u32 },
    /// Unbounded dig shaft with an escalating hazard probability
    Shaft(EscalationParams),
}

/// Extra payout for long runs of safe reveals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakBonus {
    /// First hit count that earns a bonus
    pub threshold: u32,
    /// Bonus fraction of the base payout per hit at or above the threshold
    pub rate: f64,
}

impl Default for StreakBonus {
    fn default() -> Self {
        Self {
            threshold: 3,
            rate: 0.1,
        }
    }
}

impl StreakBonus {
    pub fn bonus(&self, base: f64, hits: u32) -> f64 {
        if hits < self.threshold {
            return 0.0;
        }
        base * (hits - self.threshold + 1) as f64 * self.rate
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    pub name: String,
    pub field: FieldKind,
    pub curve: PayoutCurve,
    /// Safe reveals required before cash-out is accepted
    #[serde(default)]
    pub min_hits_for_cashout: u32,
    #[serde(default)]
    pub max_stake: Option<f64>,
    /// Hazards placed on the board beyond the density the player chose.
    ///
    /// Payouts are priced on the displayed density while the layout uses
    /// `displayed + hidden_hazards`, so any non-zero value is a house edge the
    /// player is not told about.
    #[serde(default)]
    pub hidden_hazards: u32,
    #[serde(default)]
    pub streak_bonus: Option<StreakBonus>,
}

impl VariantConfig {
    pub fn grid(name: impl Into<String>, size: u32, curve: PayoutCurve) -> Self {
        Self {
            name: name.into(),
            field: FieldKind::Grid { size },
            curve,
            min_hits_for_cashout: 0,
            max_stake: None,
            hidden_hazards: 0,
            streak_bonus: None,
        }
    }

    pub fn shaft(name: impl Into<String>, params: EscalationParams, curve: PayoutCurve) -> Self {
        Self {
            name: name.into(),
            field: FieldKind::Shaft(params),
            curve,
            min_hits_for_cashout: 0,
            max_stake: None,
            hidden_hazards: 0,
            streak_bonus: None,
        }
    }

    pub fn with_min_hits(mut self, hits: u32) -> Self {
        self.min_hits_for_cashout = hits;
        self
    }

    pub fn with_max_stake(mut self, max: f64) -> Self {
        self.max_stake = Some(max);
        self
    }

    pub fn with_hidden_hazards(mut self, hidden: u32) -> Self {
        self.hidden_hazards = hidden;
        self
    }

    pub fn with_streak_bonus(mut self, bonus: StreakBonus) -> Self {
        self.streak_bonus = Some(bonus);
        self
    }

    /// Board size, `None` for shafts
    pub fn field_size(&self) -> Option<u32> {
        match self.field {
            FieldKind::Grid { size } => Some(size),
            FieldKind::Shaft(_) => None,
        }
    }

    /// Hazards actually placed for a displayed density
    pub fn actual_risk_density(&self, displayed: u32) -> u32 {
        match self.field {
            FieldKind::Grid { .. } => displayed.saturating_add(self.hidden_hazards),
            FieldKind::Shaft(_) => displayed,
        }
    }

    /// `0 < stake`, finite, and within `max_stake` when one is set
    pub fn validate_stake(&self, stake: f64) -> EngineResult<()> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(EngineError::InvalidStake(stake));
        }
        if self.max_stake.is_some_and(|max| stake > max) {
            return Err(EngineError::InvalidStake(stake));
        }
        Ok(())
    }

    /// Check the configuration against the requested risk density
    pub fn validate(&self, risk_density: u32) -> EngineResult<()> {
        self.curve.validate().map_err(EngineError::InvalidConfig)?;
        match &self.field {
            FieldKind::Grid { size } => {
                if matches!(self.curve, PayoutCurve::Additive { .. }) {
                    return Err(EngineError::InvalidConfig(
                        "additive curves need a shaft field",
                    ));
                }
                if risk_density == 0 {
                    return Err(EngineError::InvalidConfig("risk density must be positive"));
                }
                let actual = risk_density
                    .checked_add(self.hidden_hazards)
                    .ok_or(EngineError::InvalidConfig("risk density overflow"))?;
                if actual >= *size {
                    return Err(EngineError::InvalidConfig(
                        "risk density must be smaller than the field",
                    ));
                }
                if self.min_hits_for_cashout > size - actual {
                    return Err(EngineError::InvalidConfig(
                        "minimum hits exceed the safe slots on the board",
                    ));
                }
            }
            FieldKind::Shaft(params) => {
                params.validate().map_err(EngineError::InvalidConfig)?;
                if matches!(self.curve, PayoutCurve::Exponential { .. }) {
                    return Err(EngineError::InvalidConfig(
                        "exponential curves need a finite field",
                    ));
                }
                if self.hidden_hazards != 0 {
                    return Err(EngineError::InvalidConfig(
                        "hidden hazards only apply to grids",
                    ));
                }
                if risk_density as f64 > params.max_rate {
                    return Err(EngineError::InvalidConfig(
                        "starting hazard rate exceeds the maximum",
                    ));
                }
            }
        }
        if self
            .streak_bonus
            .is_some_and(|b| !(b.rate.is_finite() && b.rate >= 0.0))
        {
            return Err(EngineError::InvalidConfig("streak bonus rate must be non-negative"));
        }
        Ok(())
    }
}
