//! Pluggable scorers combined into a weighted aggregate.

pub mod analysis;
pub mod nutrient_gap;
pub mod preference;

pub use analysis::{analyze, MealAnalysis, NutrientExcess, NutrientGap};
pub use nutrient_gap::NutrientGapScorer;
pub use preference::PreferenceScorer;

use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{Candidate, ScoreResult, ScorerOutcome};
use crate::sources::{MealTemplate, Preferences, RuleBook};

/// Inputs a scorer may consult for one candidate.
pub struct ScoringContext<'a> {
    pub candidate: &'a Candidate,
    pub template: Option<&'a MealTemplate>,
    pub analysis: Option<MealAnalysis>,
    pub preferences: &'a Preferences,
}

impl<'a> ScoringContext<'a> {
    pub fn new(
        candidate: &'a Candidate,
        template: Option<&'a MealTemplate>,
        preferences: &'a Preferences,
    ) -> Self {
        let analysis = template.map(|t| analyze(&candidate.meal.totals, t));
        Self {
            candidate,
            template,
            analysis,
            preferences,
        }
    }
}

/// Raw score in `[0, 1]` plus free-form details.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerOutput {
    pub raw: f64,
    pub details: serde_json::Value,
}

pub trait Scorer {
    fn name(&self) -> &str;

    fn score(&self, context: &ScoringContext<'_>) -> ScorerOutput;
}

pub(crate) fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Registered scorers and the weight each contributes to the aggregate.
pub struct ScorerRegistry {
    scorers: Vec<Box<dyn Scorer>>,
    weights: BTreeMap<String, f64>,
}

impl ScorerRegistry {
    pub fn new(weights: BTreeMap<String, f64>) -> Self {
        Self {
            scorers: Vec::new(),
            weights,
        }
    }

    /// The standard scorers configured from the rule book.
    pub fn from_rules(rules: &RuleBook) -> Self {
        let mut registry = Self::new(rules.scorer_weights().clone());
        registry.scorers.push(Box::new(NutrientGapScorer::new(
            rules.scoring.nutrient_gap.clone(),
        )));
        registry.scorers.push(Box::new(PreferenceScorer::new(
            rules.scoring.preference.clone(),
        )));
        registry
    }

    pub fn register(&mut self, scorer: Box<dyn Scorer>) -> Result<()> {
        if self.get(scorer.name()).is_some() {
            bail!("Scorer {} is already registered", scorer.name());
        }
        self.scorers.push(scorer);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Scorer> {
        self.scorers
            .iter()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.scorers.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.scorers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scorers.is_empty()
    }

    /// Unconfigured scorers weigh nothing.
    pub fn weight(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(0.0)
    }

    /// Runs every scorer; aggregate is the sum of `raw * weight`.
    pub fn score(&self, context: &ScoringContext<'_>) -> ScoreResult {
        let mut scores = BTreeMap::new();
        let mut aggregate = 0.0;
        for scorer in &self.scorers {
            let output = scorer.score(context);
            let weight = self.weight(scorer.name());
            let weighted = output.raw * weight;
            aggregate += weighted;
            scores.insert(
                scorer.name().to_string(),
                ScorerOutcome {
                    raw: output.raw,
                    weight,
                    weighted,
                    details: output.details,
                },
            );
        }
        ScoreResult {
            aggregate_score: aggregate,
            scores,
            scored_at: Utc::now(),
        }
    }
}

impl fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("scorers", &self.names())
            .field("weights", &self.weights)
            .finish()
    }
}
