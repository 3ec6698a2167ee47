//! Data model shared by the pipeline stages and the plan workspace.

pub mod candidate;
pub mod inventory;
pub mod item;
pub mod meal;
pub mod nutrients;
pub mod plan;

pub use candidate::{
    Candidate, CandidateMeal, CandidateStage, FilterResult, GenerationMetadata, GenerationMethod,
    GenerationState, ScoreResult, ScorerOutcome, TemplateInfo,
};
pub use inventory::{Inventory, InventoryCategory, InventoryItem, RotatingStatus};
pub use item::{
    composition_key, format_mult, normalize_code, valid_mult, CodePattern, LogToken, MealItem,
};
pub use meal::MealCategory;
pub use nutrients::{canonical_nutrient, NutrientProfile, NutrientTotals};
pub use plan::{HistoryEntry, LockedAnalysis, MealPlan, PlanOrigin};
