use chrono::NaiveDate;
use mealplanner::models::{LogToken, NutrientTotals};
use mealplanner::sources::{DayLog, FoodCatalog, InMemoryHistory, RuleBook};
use mealplanner::{
    AppConfig, GenerationRequest, MealCategory, Pipeline, PlannerContext, StageOptions,
    WorkspacePaths,
};
use std::path::Path;
use tempfile::TempDir;

/// Lunch template requiring 25 g of protein; no components, so history generation only.
pub const PROTEIN_RULES: &str = r#"
[templates.lunch.standard]
description = "Everyday lunch"

[templates.lunch.standard.targets.protein_g]
min = 25.0
priority = 1
"#;

pub struct PlannerHarness {
    workspace: TempDir,
    pub ctx: PlannerContext,
}

impl PlannerHarness {
    pub fn new(rules: &str, catalog: FoodCatalog, days: Vec<DayLog>) -> Self {
        let workspace = TempDir::new().expect("failed to create temp workspace");
        let paths = WorkspacePaths::new(workspace.path());
        paths.ensure().expect("failed to create workspace layout");
        let rules = RuleBook::from_toml(rules).expect("test rules must parse");
        let ctx = PlannerContext::with_sources(
            paths,
            AppConfig::default(),
            rules,
            catalog,
            InMemoryHistory::new(days),
        );
        Self { workspace, ctx }
    }

    /// Five distinct lunches, two of which reach 25 g of protein.
    pub fn lunches(rules: &str) -> Self {
        Self::new(rules, lunch_catalog(), lunch_history())
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.ctx)
    }

    /// Generates, filters and scores the lunch history; returns ranked candidate ids.
    pub fn scored_lunches(&self) -> Vec<String> {
        let pipeline = self.pipeline();
        pipeline
            .generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))
            .expect("history generation");
        pipeline.filter(StageOptions::default()).expect("filter");
        pipeline.score(StageOptions::default()).expect("score");
        pipeline
            .ranked()
            .expect("ranked")
            .into_iter()
            .map(|c| c.id)
            .collect()
    }
}

pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).expect("valid date")
}

pub fn protein(grams: f64, calories: f64) -> NutrientTotals {
    NutrientTotals {
        protein_g: grams,
        calories,
        ..Default::default()
    }
}

pub fn lunch_catalog() -> FoodCatalog {
    FoodCatalog::new()
        .with_food("CH.1", "chicken breast", protein(30.0, 165.0))
        .with_food("TF.1", "tofu", protein(12.0, 120.0))
        .with_food("RI.1", "rice", protein(3.0, 200.0))
        .with_food("OA.1", "oats", protein(5.0, 150.0))
}

/// One day with a breakfast and a lunch segment.
pub fn lunch_day(day: u32, lunch: &[(&str, f64)]) -> DayLog {
    let mut tokens = vec![
        LogToken::time("07:30"),
        LogToken::food("OA.1", 1.0),
        LogToken::time("12:30"),
    ];
    tokens.extend(lunch.iter().map(|(code, mult)| LogToken::food(*code, *mult)));
    DayLog {
        date: NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date"),
        tokens,
    }
}

pub fn lunch_history() -> Vec<DayLog> {
    vec![
        lunch_day(1, &[("CH.1", 1.0)]),
        lunch_day(2, &[("TF.1", 1.0)]),
        lunch_day(3, &[("CH.1", 1.0), ("RI.1", 1.0)]),
        lunch_day(4, &[("RI.1", 2.0)]),
        lunch_day(5, &[("TF.1", 1.0), ("RI.1", 1.0)]),
    ]
}

mod acceptance_combo;
mod exhaustive_generation;
mod genetic_generation;
mod inventory_commands;
mod pipeline_end_to_end;
mod pipeline_resume;
mod plans_variants;
