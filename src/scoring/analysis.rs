use serde::Serialize;

use crate::models::{canonical_nutrient, NutrientTotals};
use crate::sources::MealTemplate;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientGap {
    pub nutrient: String,
    pub current: f64,
    pub target_min: f64,
    pub target_max: Option<f64>,
    pub deficit: f64,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientExcess {
    pub nutrient: String,
    pub current: f64,
    pub threshold: f64,
    pub overage: f64,
    pub priority: u8,
}

/// Shortfalls and overshoots of a meal against its template targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MealAnalysis {
    pub gaps: Vec<NutrientGap>,
    pub excesses: Vec<NutrientExcess>,
}

impl MealAnalysis {
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty() && self.excesses.is_empty()
    }
}

/// Compares totals with every target; sorted by priority, then largest miss first.
pub fn analyze(totals: &NutrientTotals, template: &MealTemplate) -> MealAnalysis {
    let mut analysis = MealAnalysis::default();
    for (name, target) in &template.targets {
        let nutrient = canonical_nutrient(name);
        let current = totals.get(&nutrient).unwrap_or(0.0);
        if let Some(min) = target.min {
            if current < min {
                analysis.gaps.push(NutrientGap {
                    nutrient: nutrient.clone(),
                    current,
                    target_min: min,
                    target_max: target.max,
                    deficit: min - current,
                    priority: target.priority,
                });
            }
        }
        if let Some(max) = target.max {
            if current > max {
                analysis.excesses.push(NutrientExcess {
                    nutrient,
                    current,
                    threshold: max,
                    overage: current - max,
                    priority: target.priority,
                });
            }
        }
    }
    analysis
        .gaps
        .sort_by(|a, b| a.priority.cmp(&b.priority).then(b.deficit.total_cmp(&a.deficit)));
    analysis
        .excesses
        .sort_by(|a, b| a.priority.cmp(&b.priority).then(b.overage.total_cmp(&a.overage)));
    analysis
}
