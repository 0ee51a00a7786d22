//! Engine settings and variant presets
//!
//! Settings are a flat JSON document. Missing fields take their defaults, so
//! older files keep loading as new knobs are added.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::game::outcome::EscalationParams;
use crate::game::payout::{PayoutCurve, StepTable};
use crate::game::variant::{StreakBonus, VariantConfig};

/// Built-in game variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VariantPreset {
    /// 25-slot board, exponential payouts
    #[default]
    Mines,
    /// 25-slot board, tabulated payouts
    ClassicMines,
    /// Mines with two extra hazards the player is not shown
    ShadowMines,
    /// Endless shaft with escalating risk and a streak bonus
    DeepDig,
}

impl VariantPreset {
    pub const ALL: [VariantPreset; 4] = [
        VariantPreset::Mines,
        VariantPreset::ClassicMines,
        VariantPreset::ShadowMines,
        VariantPreset::DeepDig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantPreset::Mines => "Mines",
            VariantPreset::ClassicMines => "Classic Mines",
            VariantPreset::ShadowMines => "Shadow Mines",
            VariantPreset::DeepDig => "Deep Dig",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "mines" => Some(VariantPreset::Mines),
            "classicmines" | "classic" => Some(VariantPreset::ClassicMines),
            "shadowmines" | "shadow" => Some(VariantPreset::ShadowMines),
            "deepdig" | "dig" => Some(VariantPreset::DeepDig),
            _ => None,
        }
    }

    /// Whether the preset plays on an unbounded shaft
    pub fn is_shaft(&self) -> bool {
        matches!(self, VariantPreset::DeepDig)
    }

    pub fn config(&self) -> VariantConfig {
        match self {
            VariantPreset::Mines => VariantConfig::grid(
                self.as_str(),
                consts::GRID_SIZE,
                PayoutCurve::standard_exponential(),
            ),
            VariantPreset::ClassicMines => VariantConfig::grid(
                self.as_str(),
                consts::GRID_SIZE,
                PayoutCurve::Stepwise(StepTable::classic()),
            ),
            VariantPreset::ShadowMines => VariantConfig::grid(
                self.as_str(),
                consts::GRID_SIZE,
                PayoutCurve::standard_exponential(),
            )
            .with_hidden_hazards(2),
            VariantPreset::DeepDig => VariantConfig::shaft(
                self.as_str(),
                EscalationParams::default(),
                PayoutCurve::standard_additive(),
            )
            .with_streak_bonus(StreakBonus::default()),
        }
    }
}

/// Demo and table settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Balance for a player with no save
    pub starting_balance: f64,
    pub variant: VariantPreset,
    pub stake: f64,
    /// Hazard count (grids) or starting hazard percent (shafts)
    pub risk_density: u32,
    /// Milliseconds between autoplay reveals
    pub autoplay_interval_ms: u64,
    /// Autoplay stops on its own after this many safe reveals
    pub hit_target: Option<u32>,
    /// Fixed seed for reproducible sessions; OS entropy when unset
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_balance: consts::STARTING_BALANCE,
            variant: VariantPreset::Mines,
            stake: 10.0,
            risk_density: consts::DEFAULT_RISK_DENSITY,
            autoplay_interval_ms: consts::AUTOPLAY_INTERVAL_MS,
            hit_target: Some(5),
            seed: None,
        }
    }
}

impl Settings {
    /// Settings for a preset with its usual risk density
    pub fn from_preset(preset: VariantPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Switch variant. Shafts start from zero risk.
    pub fn apply_preset(&mut self, preset: VariantPreset) {
        self.variant = preset;
        self.risk_density = if preset.is_shaft() {
            0
        } else {
            consts::DEFAULT_RISK_DENSITY
        };
    }

    pub fn autoplay_interval(&self) -> Duration {
        Duration::from_millis(self.autoplay_interval_ms)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::info!("Using default settings ({}: {})", path.display(), e);
                return Self::default();
            }
        };
        match Self::from_json(&json) {
            Ok(settings) => {
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings in {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }
}
