use super::{protein, PlannerHarness};
use anyhow::Result;
use mealplanner::sources::FoodCatalog;
use mealplanner::{GenerationRequest, MealCategory, PlannerError, StageOptions};
use std::collections::HashSet;

const BREAKFAST_RULES: &str = r#"
[pools]
eggs = ["EG."]
grains = ["BR.1", "OA.1"]
base = ["@grains", "XX.9"]
fruit = ["FR.1", "FR.2", "FR.3"]

[templates.breakfast.plate]
description = "Egg plate"
targets.protein_g = { min = 10.5, max = 30.0, enforcement = "soft" }
constraints = { max_total_components = 3 }

[[templates.breakfast.plate.components]]
name = "protein"
pool = "eggs"
required = true
count = { min = 1, max = 2 }

[[templates.breakfast.plate.components]]
name = "base"
pool = "base"
required = true

[[templates.breakfast.plate.components]]
name = "fruit"
pool = "fruit"
count = { min = 0, max = 1 }

[templates.breakfast.light]
description = "Fruit only"

[[templates.breakfast.light.components]]
name = "fruit"
pool = "fruit"
"#;

fn breakfast_catalog() -> FoodCatalog {
    FoodCatalog::new()
        .with_food("EG.1", "boiled egg", protein(6.0, 70.0))
        .with_food("EG.2", "fried egg", protein(6.5, 90.0))
        .with_food("BR.1", "toast", protein(4.0, 80.0))
        .with_food("OA.1", "oats", protein(5.0, 150.0))
        .with_food("FR.1", "apple", protein(0.3, 95.0))
        .with_food("FR.2", "banana", protein(1.3, 105.0))
        .with_food("FR.3", "orange", protein(1.2, 62.0))
}

fn harness() -> PlannerHarness {
    PlannerHarness::new(BREAKFAST_RULES, breakfast_catalog(), Vec::new())
}

#[test]
fn space_size_is_the_product_of_component_choices() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    // eggs: 2 singles + 1 pair; base: 2 grains; fruit: none or one of 3
    assert_eq!(
        pipeline.count_combinations(MealCategory::Breakfast, Some("plate"))?,
        3 * 2 * 4
    );
    assert_eq!(
        pipeline.count_combinations(MealCategory::Breakfast, Some("light"))?,
        3
    );
    Ok(())
}

#[test]
fn templates_must_be_chosen_when_ambiguous() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    let err = pipeline
        .generate(GenerationRequest::exhaustive(MealCategory::Breakfast))
        .expect_err("two breakfast templates");
    assert!(matches!(err, PlannerError::Config { .. }));
    assert!(err.suggestion().unwrap_or_default().contains("light"));

    let missing = pipeline
        .generate(GenerationRequest::exhaustive(MealCategory::Breakfast).with_template("brunch"))
        .expect_err("unknown template");
    assert!(matches!(missing, PlannerError::Config { .. }));
    assert!(pipeline.status()?.session.is_none());

    let no_template = pipeline
        .generate(GenerationRequest::exhaustive(MealCategory::Lunch))
        .expect_err("exhaustive needs a template");
    assert!(matches!(no_template, PlannerError::Config { .. }));
    Ok(())
}

#[test]
fn inverted_component_counts_are_rejected_before_generation() -> Result<()> {
    let rules = r#"
[pools]
fruit = ["FR.1", "FR.2"]

[templates.breakfast.bowl]
[[templates.breakfast.bowl.components]]
name = "fruit"
pool = "fruit"
count = { min = 2, max = 1 }
"#;
    let harness = PlannerHarness::new(rules, breakfast_catalog(), Vec::new());
    let pipeline = harness.pipeline();

    let err = pipeline
        .generate(GenerationRequest::exhaustive(MealCategory::Breakfast))
        .expect_err("max below min");
    assert!(matches!(err, PlannerError::Config { .. }));
    assert!(err.to_string().contains("component 'fruit'"));
    assert!(pipeline
        .count_combinations(MealCategory::Breakfast, Some("bowl"))
        .is_err());
    assert!(pipeline.status()?.session.is_none());
    Ok(())
}

#[test]
fn batches_resume_from_the_cursor_without_duplicates() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    let request = GenerationRequest::exhaustive(MealCategory::Breakfast)
        .with_template("plate")
        .with_limit(5);

    let first = pipeline.generate(request.clone())?;
    assert_eq!(first.added.len(), 5);
    assert_eq!(first.total_space, Some(24));
    assert!(first.warnings.iter().any(|w| w.contains("XX.9")));

    let stale = pipeline
        .generate(request.clone().with_cursor(0))
        .expect_err("cursor 0 is behind the session");
    assert!(matches!(stale, PlannerError::Validation { .. }));

    let cursor = first.session.cursor;
    let mut total_added = first.added.len();
    let mut outcome = pipeline.generate(request.clone().with_cursor(cursor))?;
    while !outcome.exhausted {
        total_added += outcome.added.len();
        outcome = pipeline.generate(request.clone())?;
    }
    total_added += outcome.added.len();

    // Both eggs plus a grain and a fruit is four components.
    assert_eq!(total_added, 24 - 6);
    let doc = pipeline.document()?;
    assert_eq!(doc.candidates.len(), total_added);
    let keys: HashSet<&str> = doc
        .candidates
        .iter()
        .map(|c| c.generation_metadata.composition_key.as_str())
        .collect();
    assert_eq!(keys.len(), total_added);
    assert!(doc.candidates.iter().all(|c| c.meal.items.len() <= 3));

    let again = pipeline.generate(request)?;
    assert!(again.exhausted);
    assert!(again.added.is_empty());
    Ok(())
}

#[test]
fn soft_targets_warn_inside_tolerance() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    pipeline.generate(
        GenerationRequest::exhaustive(MealCategory::Breakfast)
            .with_template("plate")
            .with_limit(24),
    )?;
    pipeline.filter(StageOptions::default())?;

    let doc = pipeline.document()?;
    assert!(doc.candidates.iter().all(|c| c.passed_filters()));

    // One boiled egg on toast: 10 g, under 10.5 but above 10.5 / 1.1.
    let plain = doc
        .candidates
        .iter()
        .find(|c| c.meal.description.ends_with("#1"))
        .expect("first combination");
    let warnings = &plain.filter_result().expect("filtered").warnings;
    assert_eq!(warnings, &vec!["nutrient:protein_g 10.0 below soft min 10.5".to_string()]);

    let summary = &plain.generation_metadata.component_summary;
    assert_eq!(summary["protein"], vec!["EG.1"]);
    assert_eq!(summary["base"], vec!["BR.1"]);
    assert!(!summary.contains_key("fruit"));
    Ok(())
}
