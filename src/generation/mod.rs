//! Candidate generators.
//!
//! Every generator emits raw meals with totals already computed through the
//! nutrient lookup; the pipeline assigns ids and persists them.

pub mod exhaustive;
pub mod genetic;
pub mod history;

pub use exhaustive::{CombinationSpace, ExhaustiveGenerator};
pub use genetic::GeneticGenerator;
pub use history::{extract_meal, HistoryGenerator};

use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::error::PlannerResult;
use crate::candidates::Locks;
use crate::models::{
    composition_key, CandidateMeal, GenerationMetadata, GenerationMethod, MealCategory, MealItem,
};
use crate::sources::{compute_totals, BoundTemplate};
use crate::workspace::PlannerContext;

/// What the caller asks the pipeline to generate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub meal_type: MealCategory,
    pub method: GenerationMethod,
    pub template: Option<String>,
    /// Overrides the configured batch size, history limit or genetic output size.
    pub max_results: Option<usize>,
    /// Exhaustive only: must equal the session cursor when supplied.
    pub cursor: Option<u64>,
    /// Anchor of the history lookback window; today when unset.
    pub reference_date: Option<NaiveDate>,
}

impl GenerationRequest {
    pub fn history(meal_type: MealCategory) -> Self {
        Self::new(meal_type, GenerationMethod::HistorySearch)
    }

    pub fn exhaustive(meal_type: MealCategory) -> Self {
        Self::new(meal_type, GenerationMethod::Exhaustive)
    }

    pub fn genetic(meal_type: MealCategory) -> Self {
        Self::new(meal_type, GenerationMethod::Genetic)
    }

    fn new(meal_type: MealCategory, method: GenerationMethod) -> Self {
        Self {
            meal_type,
            method,
            template: None,
            max_results: None,
            cursor: None,
            reference_date: None,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.max_results = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }
}

/// Resolved inputs handed to a generator for one batch.
pub struct GenerationInput<'a> {
    pub meal_type: MealCategory,
    pub template: Option<&'a BoundTemplate>,
    pub limit: usize,
    pub cursor: u64,
    pub reference_date: NaiveDate,
    /// Composition keys already in the candidate store.
    pub existing_keys: &'a HashSet<String>,
    /// Locks of the candidate document; the genetic generator screens offspring with them.
    pub locks: &'a Locks,
}

#[derive(Debug, Clone)]
pub struct GeneratedMeal {
    pub meal: CandidateMeal,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedBatch {
    pub meals: Vec<GeneratedMeal>,
    pub next_cursor: u64,
    pub total_space: Option<u64>,
    pub warnings: Vec<String>,
}

pub trait Generator {
    fn method(&self) -> GenerationMethod;

    fn generate(&self, ctx: &PlannerContext, input: &GenerationInput<'_>)
        -> PlannerResult<GeneratedBatch>;
}

pub fn generator_for(method: GenerationMethod) -> Box<dyn Generator> {
    match method {
        GenerationMethod::HistorySearch => Box::new(HistoryGenerator),
        GenerationMethod::Exhaustive => Box::new(ExhaustiveGenerator),
        GenerationMethod::Genetic => Box::new(GeneticGenerator),
    }
}

pub(crate) fn build_meal(
    ctx: &PlannerContext,
    method: GenerationMethod,
    meal_type: MealCategory,
    items: Vec<MealItem>,
    template: Option<&BoundTemplate>,
) -> GeneratedMeal {
    let outcome = compute_totals(ctx.catalog(), &items);
    let key = composition_key(&items);
    GeneratedMeal {
        meal: CandidateMeal {
            meal_type,
            items,
            totals: outcome.totals,
            source_date: None,
            description: String::new(),
        },
        metadata: GenerationMetadata {
            method,
            generated_at: Utc::now(),
            template: template.map(BoundTemplate::info),
            component_summary: BTreeMap::new(),
            composition_key: key,
            missing_codes: outcome.missing,
            fitness: None,
        },
    }
}
