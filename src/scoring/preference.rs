use serde_json::json;

use super::{clamp_score, Scorer, ScorerOutput, ScoringContext};
use crate::models::CodePattern;
use crate::sources::rules::PreferenceScorerSettings;

/// Nudges toward staples and frozen portions, away from unavailable items.
pub struct PreferenceScorer {
    settings: PreferenceScorerSettings,
}

impl PreferenceScorer {
    pub fn new(settings: PreferenceScorerSettings) -> Self {
        Self { settings }
    }
}

fn count_matches(codes: &[String], list: &[String]) -> Vec<String> {
    let patterns: Vec<CodePattern> = list.iter().map(|c| CodePattern::parse(c)).collect();
    codes
        .iter()
        .filter(|code| patterns.iter().any(|p| p.matches(code)))
        .cloned()
        .collect()
}

impl Scorer for PreferenceScorer {
    fn name(&self) -> &str {
        "preference"
    }

    fn score(&self, context: &ScoringContext<'_>) -> ScorerOutput {
        let codes: Vec<String> = context
            .candidate
            .meal
            .items
            .iter()
            .map(|item| item.key())
            .collect();
        let prefs = context.preferences;
        let frozen = count_matches(&codes, &prefs.frozen_portions);
        let staples = count_matches(&codes, &prefs.staples);
        let unavailable = count_matches(&codes, &prefs.unavailable);

        let s = &self.settings;
        let raw = clamp_score(
            s.base_score + frozen.len() as f64 * s.frozen_bonus + staples.len() as f64 * s.staple_bonus
                - unavailable.len() as f64 * s.unavailable_penalty,
        );
        ScorerOutput {
            raw,
            details: json!({
                "frozen": frozen,
                "staples": staples,
                "unavailable": unavailable,
            }),
        }
    }
}
