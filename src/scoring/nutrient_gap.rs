use serde_json::json;

use super::{clamp_score, Scorer, ScorerOutput, ScoringContext};
use crate::sources::rules::GapScorerSettings;

/// Rewards meals that land on their template targets.
///
/// Each gap costs `deficit / target_min * priority_weight` and each excess
/// `overage / threshold * excess_penalty_weight`, both ignored within
/// `tolerance_pct`. A meal with nothing penalized earns the perfect-match bonus.
pub struct NutrientGapScorer {
    settings: GapScorerSettings,
}

impl NutrientGapScorer {
    pub fn new(settings: GapScorerSettings) -> Self {
        Self { settings }
    }

    fn priority_weight(&self, priority: u8) -> f64 {
        self.settings
            .gap_penalty_weights
            .get(&priority.to_string())
            .copied()
            .unwrap_or(1.0)
    }
}

impl Scorer for NutrientGapScorer {
    fn name(&self) -> &str {
        "nutrient_gap"
    }

    fn score(&self, context: &ScoringContext<'_>) -> ScorerOutput {
        let Some(analysis) = &context.analysis else {
            return ScorerOutput {
                raw: 0.5,
                details: json!({ "reason": "no template targets to compare against" }),
            };
        };
        let tolerance = self.settings.tolerance_pct;

        let mut gap_penalties = Vec::new();
        for gap in &analysis.gaps {
            if let Some(max) = gap.target_max {
                if gap.current >= gap.target_min && gap.current <= max {
                    continue;
                }
            }
            let deficit_pct = if gap.target_min > 0.0 {
                gap.deficit / gap.target_min
            } else {
                0.0
            };
            if deficit_pct <= tolerance {
                continue;
            }
            let weight = self.priority_weight(gap.priority);
            gap_penalties.push(json!({
                "nutrient": gap.nutrient,
                "current": gap.current,
                "target_min": gap.target_min,
                "deficit_pct": deficit_pct,
                "priority": gap.priority,
                "penalty": deficit_pct * weight,
            }));
        }

        let mut excess_penalties = Vec::new();
        for excess in &analysis.excesses {
            let overage_pct = if excess.threshold > 0.0 {
                excess.overage / excess.threshold
            } else {
                0.0
            };
            if overage_pct <= tolerance {
                continue;
            }
            excess_penalties.push(json!({
                "nutrient": excess.nutrient,
                "current": excess.current,
                "threshold": excess.threshold,
                "overage_pct": overage_pct,
                "penalty": overage_pct * self.settings.excess_penalty_weight,
            }));
        }

        let sum = |penalties: &[serde_json::Value]| -> f64 {
            penalties
                .iter()
                .filter_map(|p| p["penalty"].as_f64())
                .sum()
        };
        let total_gap = sum(&gap_penalties);
        let total_excess = sum(&excess_penalties);
        let bonus = if gap_penalties.is_empty() && excess_penalties.is_empty() {
            self.settings.perfect_match_bonus
        } else {
            0.0
        };
        let raw = clamp_score(1.0 - total_gap - total_excess + bonus);
        ScorerOutput {
            raw,
            details: json!({
                "gap_penalties": gap_penalties,
                "excess_penalties": excess_penalties,
                "total_gap_penalty": total_gap,
                "total_excess_penalty": total_excess,
                "perfect_match_bonus": bonus,
            }),
        }
    }
}
