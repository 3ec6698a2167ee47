use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;

use super::{build_meal, GeneratedBatch, GenerationInput, Generator};
use crate::error::PlannerResult;
use crate::models::{GenerationMethod, LogToken, MealCategory, MealItem};
use crate::sources::NutrientLookup;
use crate::workspace::PlannerContext;

/// Samples meals the user actually ate, newest day first.
pub struct HistoryGenerator;

impl Generator for HistoryGenerator {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::HistorySearch
    }

    fn generate(
        &self,
        ctx: &PlannerContext,
        input: &GenerationInput<'_>,
    ) -> PlannerResult<GeneratedBatch> {
        let lookback = i64::from(ctx.config.generation.lookback_days);
        let start = input.reference_date - Duration::days(lookback);
        let mut days = ctx.history().entries_in_range(start, input.reference_date)?;
        days.reverse();
        if let Some(seed) = ctx.config.generation.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            days.shuffle(&mut rng);
        }

        let mut batch = GeneratedBatch::default();
        let mut seen_keys: HashSet<String> = input.existing_keys.clone();
        let mut seen_dates = HashSet::new();
        for day in days {
            if batch.meals.len() >= input.limit {
                break;
            }
            if !seen_dates.insert(day.date) {
                continue;
            }
            let items = extract_meal(&day.tokens, input.meal_type, ctx.catalog());
            if items.is_empty() {
                continue;
            }
            let mut generated = build_meal(
                ctx,
                GenerationMethod::HistorySearch,
                input.meal_type,
                items,
                input.template,
            );
            if !seen_keys.insert(generated.metadata.composition_key.clone()) {
                tracing::debug!(date = %day.date, "skipping duplicate meal composition");
                continue;
            }
            generated.meal.source_date = Some(day.date);
            generated.meal.description = format!("From {}", day.date);
            batch.meals.push(generated);
        }
        Ok(batch)
    }
}

/// Items logged under `target` in one day, with composite codes left out.
///
/// A time marker opens a segment; its category comes from `meal_override`
/// when that names a valid category, otherwise from the clock time.
pub fn extract_meal(
    tokens: &[LogToken],
    target: MealCategory,
    lookup: &dyn NutrientLookup,
) -> Vec<MealItem> {
    let mut current: Option<MealCategory> = None;
    let mut items = Vec::new();
    for token in tokens {
        match token {
            LogToken::Time { meal_override, .. } => {
                current = meal_override
                    .as_deref()
                    .and_then(|raw| raw.parse().ok())
                    .or_else(|| token.parsed_time().map(MealCategory::from_time));
            }
            LogToken::Food(item) if current == Some(target) => {
                if lookup.is_composite(&item.code) {
                    continue;
                }
                items.push(MealItem::new(&item.code, item.mult));
            }
            LogToken::Food(_) => {}
        }
    }
    items
}
