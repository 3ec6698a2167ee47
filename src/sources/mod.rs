//! Read-only inputs the pipeline consults: nutrients, history and rules.

pub mod catalog;
pub mod history;
pub mod pools;
pub mod rules;

pub use catalog::{FoodCatalog, FoodEntry, NutrientLookup};
pub use history::{DayLog, HistoryFile, HistoryLog, InMemoryHistory};
pub use pools::{PoolResolver, ResolvedPool};
pub use rules::{
    BoundTemplate, CategoryRules, ConditionalRule, Enforcement, GroupSpec, MealTemplate,
    MutualExclusionRule, NutrientTarget, Preferences, Requirement, RuleBook, TemplateComponent,
    TemplateConstraints,
};

use crate::models::{MealItem, NutrientTotals};

/// Meal totals plus the codes the lookup could not resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalsOutcome {
    pub totals: NutrientTotals,
    pub missing: Vec<String>,
}

/// Sums `nutrients(code) * mult` over the items. Deterministic for a given lookup.
pub fn compute_totals(lookup: &dyn NutrientLookup, items: &[MealItem]) -> TotalsOutcome {
    let mut outcome = TotalsOutcome::default();
    for item in items {
        match lookup.lookup(&item.code) {
            Some(profile) => outcome.totals.add_scaled(&profile, item.mult),
            None => {
                let code = item.key();
                if !outcome.missing.contains(&code) {
                    outcome.missing.push(code);
                }
            }
        }
    }
    outcome
}
