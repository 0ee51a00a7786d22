//! Payout curves
//!
//! Every curve is a pure function of the session configuration and its reveal
//! history, so a recorded history always replays to the same multipliers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Inputs a curve may read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutInput<'a> {
    /// Risk density the payout is priced on (the displayed one for hidden-hazard variants)
    pub risk_density: u32,
    /// Total slots, `None` for an unbounded shaft
    pub field_size: Option<u32>,
    /// Safe reveals so far
    pub hits: u32,
    /// Per-step jitter draws in `[0, 1)`, one per safe shaft step
    pub jitters: &'a [f64],
}

/// Ordered multiplier sequences keyed by risk-density tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTable {
    pub tiers: BTreeMap<u32, Vec<f64>>,
    /// Used for densities with no tier
    pub fallback: Vec<f64>,
}

impl StepTable {
    /// Tables for a 25-slot board
    pub fn classic() -> Self {
        let mut tiers = BTreeMap::new();
        tiers.insert(
            1,
            vec![1.0, 1.01, 1.05, 1.10, 1.15, 1.21, 1.27, 1.34, 1.42, 1.51, 1.61],
        );
        tiers.insert(
            3,
            vec![1.0, 1.12, 1.29, 1.48, 1.71, 2.00, 2.35, 2.79, 3.35, 4.07, 5.00],
        );
        tiers.insert(
            5,
            vec![1.0, 1.24, 1.56, 2.00, 2.58, 3.39, 4.52, 6.14, 8.50, 12.04, 17.52],
        );
        tiers.insert(
            10,
            vec![1.0, 1.58, 2.60, 4.39, 7.68, 14.00, 26.60, 53.20, 113.0, 254.0, 610.0],
        );
        Self {
            tiers,
            fallback: vec![1.0, 1.05, 1.10, 1.16, 1.22, 1.28, 1.35, 1.42, 1.50],
        }
    }

    /// Sequence for a density, falling back to the default
    pub fn sequence(&self, risk_density: u32) -> &[f64] {
        self.tiers
            .get(&risk_density)
            .map(Vec::as_slice)
            .unwrap_or(self.fallback.as_slice())
    }

    /// Every sequence must start at 1.0 and never decrease
    pub fn is_well_formed(&self) -> bool {
        let ok = |seq: &Vec<f64>| {
            !seq.is_empty()
                && seq[0] >= 1.0
                && seq.windows(2).all(|w| w[1] >= w[0])
                && seq.iter().all(|m| m.is_finite())
        };
        self.tiers.values().all(|seq| ok(seq)) && ok(&self.fallback)
    }
}

/// Payout curve families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayoutCurve {
    /// `1 + (base^(hits / scale_factor) - 1) * damping`,
    /// `base = 1 + (risk_density / field_size) * risk_weight`
    Exponential {
        risk_weight: f64,
        scale_factor: f64,
        damping: f64,
    },
    /// Precomputed multipliers indexed by `min(hits, len - 1)`
    Stepwise(StepTable),
    /// `1 + sum(base_increment + jitter * jitter_span)` over safe steps
    Additive { base_increment: f64, jitter_span: f64 },
}

impl PayoutCurve {
    /// Grid curve used by the standard mines variants
    pub fn standard_exponential() -> Self {
        PayoutCurve::Exponential {
            risk_weight: 3.0,
            scale_factor: 4.5,
            damping: 0.75,
        }
    }

    /// Shaft curve: each safe dig adds 0.2 plus up to 0.3 of jitter
    pub fn standard_additive() -> Self {
        PayoutCurve::Additive {
            base_increment: 0.2,
            jitter_span: 0.3,
        }
    }

    /// Reject parameters that could produce a decreasing or non-finite curve
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            PayoutCurve::Exponential {
                risk_weight,
                scale_factor,
                damping,
            } => {
                if !(risk_weight.is_finite() && *risk_weight >= 0.0) {
                    return Err("risk weight must be finite and non-negative");
                }
                if !(scale_factor.is_finite() && *scale_factor > 0.0) {
                    return Err("scale factor must be positive");
                }
                if !(damping.is_finite() && *damping >= 0.0) {
                    return Err("damping must be finite and non-negative");
                }
                Ok(())
            }
            PayoutCurve::Stepwise(table) => {
                if table.is_well_formed() {
                    Ok(())
                } else {
                    Err("step tables must start at 1.0 and never decrease")
                }
            }
            PayoutCurve::Additive {
                base_increment,
                jitter_span,
            } => {
                if base_increment.is_finite()
                    && jitter_span.is_finite()
                    && *base_increment >= 0.0
                    && *jitter_span >= 0.0
                {
                    Ok(())
                } else {
                    Err("additive increments must be non-negative")
                }
            }
        }
    }

    /// Multiplier after `input.hits` safe reveals
    pub fn multiplier(&self, input: &PayoutInput<'_>) -> f64 {
        match self {
            PayoutCurve::Exponential {
                risk_weight,
                scale_factor,
                damping,
            } => {
                let field = input.field_size.unwrap_or(0);
                if field == 0 {
                    return 1.0;
                }
                let base = 1.0 + (input.risk_density as f64 / field as f64) * risk_weight;
                let growth = base.powf(input.hits as f64 / scale_factor) - 1.0;
                1.0 + growth * damping
            }
            PayoutCurve::Stepwise(table) => {
                let seq = table.sequence(input.risk_density);
                match seq.len() {
                    0 => 1.0,
                    len => seq[(input.hits as usize).min(len - 1)],
                }
            }
            PayoutCurve::Additive {
                base_increment,
                jitter_span,
            } => {
                let steps = (input.hits as usize).min(input.jitters.len());
                1.0 + input.jitters[..steps]
                    .iter()
                    .map(|j| additive_step(*base_increment, *jitter_span, *j))
                    .sum::<f64>()
            }
        }
    }

    /// Lowest and highest multiplier one more safe reveal could produce
    pub fn next_range(&self, input: &PayoutInput<'_>) -> (f64, f64) {
        match self {
            PayoutCurve::Additive {
                base_increment,
                jitter_span,
            } => {
                let current = self.multiplier(input);
                (current + base_increment, current + base_increment + jitter_span)
            }
            _ => {
                let next = PayoutInput {
                    hits: input.hits + 1,
                    ..*input
                };
                let m = self.multiplier(&next);
                (m, m)
            }
        }
    }
}

/// One additive increment, never negative
pub(crate) fn additive_step(base_increment: f64, jitter_span: f64, jitter: f64) -> f64 {
    base_increment + jitter.clamp(0.0, 1.0) * jitter_span
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(risk_density: u32, hits: u32) -> PayoutInput<'static> {
        PayoutInput {
            risk_density,
            field_size: Some(25),
            hits,
            jitters: &[],
        }
    }

    #[test]
    fn test_exponential_base_and_values() {
        let curve = PayoutCurve::standard_exponential();
        // base = 1 + 3/25 * 3 = 1.36
        let one = curve.multiplier(&grid(3, 1));
        let five = curve.multiplier(&grid(3, 5));
        let expected_one = 1.0 + (1.36f64.powf(1.0 / 4.5) - 1.0) * 0.75;
        let expected_five = 1.0 + (1.36f64.powf(5.0 / 4.5) - 1.0) * 0.75;
        assert!((one - expected_one).abs() < 1e-12);
        assert!((five - expected_five).abs() < 1e-12);
        assert!((one - 1.053).abs() < 0.001);
        assert!((five - 1.3055).abs() < 0.001);
    }

    #[test]
    fn test_exponential_undamped_matches_single_hit_example() {
        let curve = PayoutCurve::Exponential {
            risk_weight: 3.0,
            scale_factor: 4.5,
            damping: 1.0,
        };
        assert!((curve.multiplier(&grid(3, 1)) - 1.07).abs() < 0.005);
    }

    #[test]
    fn test_exponential_strictly_increasing_and_steeper_with_risk() {
        let curve = PayoutCurve::standard_exponential();
        let mut last = curve.multiplier(&grid(3, 0));
        assert_eq!(last, 1.0);
        for hits in 1..22 {
            let m = curve.multiplier(&grid(3, hits));
            assert!(m > last);
            last = m;
        }
        assert!(curve.multiplier(&grid(10, 4)) > curve.multiplier(&grid(3, 4)));
    }

    #[test]
    fn test_stepwise_indexes_and_saturates() {
        let curve = PayoutCurve::Stepwise(StepTable::classic());
        assert_eq!(curve.multiplier(&grid(3, 0)), 1.0);
        assert_eq!(curve.multiplier(&grid(3, 2)), 1.29);
        assert_eq!(curve.multiplier(&grid(3, 10)), 5.00);
        assert_eq!(curve.multiplier(&grid(3, 99)), 5.00);
    }

    #[test]
    fn test_stepwise_fallback_for_untabulated_density() {
        let curve = PayoutCurve::Stepwise(StepTable::classic());
        assert_eq!(curve.multiplier(&grid(7, 1)), 1.05);
        assert_eq!(curve.multiplier(&grid(7, 50)), 1.50);
    }

    #[test]
    fn test_classic_tables_well_formed() {
        assert!(StepTable::classic().is_well_formed());
        let mut bad = StepTable::classic();
        bad.fallback = vec![1.0, 0.9];
        assert!(PayoutCurve::Stepwise(bad).validate().is_err());
    }

    #[test]
    fn test_additive_sums_jitters() {
        let curve = PayoutCurve::standard_additive();
        let jitters = [0.0, 1.0 - f64::EPSILON, 0.5];
        let input = PayoutInput {
            risk_density: 0,
            field_size: None,
            hits: 3,
            jitters: &jitters,
        };
        let m = curve.multiplier(&input);
        assert!((m - (1.0 + 0.2 + 0.5 + 0.35)).abs() < 1e-9);
        let (lo, hi) = curve.next_range(&input);
        assert!((lo - (m + 0.2)).abs() < 1e-12);
        assert!((hi - (m + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_additive_same_history_same_result() {
        let curve = PayoutCurve::standard_additive();
        let jitters = [0.12, 0.93, 0.44, 0.01];
        let input = PayoutInput {
            risk_density: 0,
            field_size: None,
            hits: 4,
            jitters: &jitters,
        };
        assert_eq!(curve.multiplier(&input), curve.multiplier(&input));
    }

    #[test]
    fn test_validate_rejects_negative_damping() {
        let curve = PayoutCurve::Exponential {
            risk_weight: 3.0,
            scale_factor: 4.5,
            damping: -0.1,
        };
        assert!(curve.validate().is_err());
    }
}
