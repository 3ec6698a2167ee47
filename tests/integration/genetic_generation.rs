use super::{protein, PlannerHarness};
use anyhow::Result;
use mealplanner::models::GenerationMethod;
use mealplanner::sources::FoodCatalog;
use mealplanner::workspace::GeneticSettings;
use mealplanner::{GenerationRequest, MealCategory, PlannerError, StageOptions};
use std::collections::HashSet;

const BOWL_RULES: &str = r#"
[pools]
proteins = ["CH.", "TF."]
sides = ["RI.", "VE.", "XX.9"]

[templates.lunch.bowl]
description = "Protein bowl"
targets.protein_g = { min = 30.0, max = 50.0 }
targets.calories = { max = 900.0, enforcement = "soft" }

[[templates.lunch.bowl.components]]
name = "protein"
pool = "proteins"
required = true

[[templates.lunch.bowl.components]]
name = "side"
pool = "sides"
count = { min = 0, max = 2 }

[templates.breakfast.plain]
description = "No targets"

[[templates.breakfast.plain.components]]
name = "side"
pool = "sides"
"#;

fn bowl_catalog() -> FoodCatalog {
    FoodCatalog::new()
        .with_food("CH.1", "chicken breast", protein(30.0, 165.0))
        .with_food("CH.2", "chicken thigh", protein(25.0, 210.0))
        .with_food("TF.1", "tofu", protein(12.0, 120.0))
        .with_food("TF.2", "tempeh", protein(18.0, 190.0))
        .with_food("RI.1", "rice", protein(3.0, 200.0))
        .with_food("RI.2", "brown rice", protein(4.0, 215.0))
        .with_food("VE.1", "broccoli", protein(2.5, 35.0))
        .with_food("VE.2", "spinach", protein(3.0, 25.0))
}

fn small_population() -> GeneticSettings {
    GeneticSettings {
        population_size: 12,
        epochs: 4,
        offspring_per_epoch: 8,
        min_genome_size: 2,
        max_genome_size: 4,
        seed: Some(42),
        candidates_per_run: 5,
        ..GeneticSettings::default()
    }
}

fn harness() -> PlannerHarness {
    let mut harness = PlannerHarness::new(BOWL_RULES, bowl_catalog(), Vec::new());
    harness.ctx.config.genetic = small_population();
    harness
}

fn composition_keys(harness: &PlannerHarness) -> Result<Vec<String>> {
    Ok(harness
        .pipeline()
        .document()?
        .candidates
        .into_iter()
        .map(|c| c.generation_metadata.composition_key)
        .collect())
}

#[test]
fn seeded_run_emits_the_fittest_distinct_members() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    let outcome = pipeline.generate(GenerationRequest::genetic(MealCategory::Lunch))?;
    assert_eq!(outcome.added.len(), 5);
    assert_eq!(outcome.session.method, GenerationMethod::Genetic);
    assert_eq!(outcome.session.cursor, 1);
    assert_eq!(outcome.total_space, None);
    assert!(!outcome.exhausted);
    assert!(outcome.warnings.iter().any(|w| w.contains("XX.9")));

    let doc = pipeline.document()?;
    let mut keys = HashSet::new();
    let mut previous = f64::INFINITY;
    for candidate in &doc.candidates {
        let items = &candidate.meal.items;
        assert!((2..=4).contains(&items.len()), "{}", candidate.id);
        assert!(items.iter().all(|i| i.mult == 1.0));
        assert!(keys.insert(candidate.generation_metadata.composition_key.clone()));
        let fitness = candidate
            .generation_metadata
            .fitness
            .expect("genetic candidates carry fitness");
        assert!(fitness <= previous, "candidates follow fitness order");
        previous = fitness;
        assert!(candidate.meal.description.starts_with("bowl genetic #"));
    }
    Ok(())
}

#[test]
fn the_same_seed_reproduces_the_same_run() -> Result<()> {
    let first = harness();
    let second = harness();
    first
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Lunch))?;
    second
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Lunch))?;
    assert_eq!(composition_keys(&first)?, composition_keys(&second)?);
    Ok(())
}

#[test]
fn later_runs_append_only_new_compositions() -> Result<()> {
    let harness = harness();
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::genetic(MealCategory::Lunch))?;
    let second = pipeline.generate(GenerationRequest::genetic(MealCategory::Lunch))?;
    assert_eq!(second.session.cursor, 2);
    assert_eq!(second.session.batches, 2);

    let keys = composition_keys(&harness)?;
    let unique: HashSet<&String> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len());
    assert_eq!(keys.len(), 5 + second.added.len());

    let filtered = pipeline.filter(StageOptions::default())?;
    assert_eq!(filtered.processed, keys.len());
    Ok(())
}

#[test]
fn unusable_templates_and_settings_are_config_errors() -> Result<()> {
    let mut harness = harness();

    let err = harness
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Breakfast))
        .expect_err("template without targets");
    assert!(matches!(err, PlannerError::Config { .. }));
    assert!(err.to_string().contains("no nutrient targets"));

    let err = harness
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Dinner))
        .expect_err("no dinner template");
    assert!(err.to_string().contains("needs a template"));

    harness.ctx.config.genetic.min_genome_size = 1;
    let err = harness
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Lunch))
        .expect_err("genomes of one code");
    assert!(matches!(err, PlannerError::Config { .. }));
    assert!(err.to_string().contains("min_genome_size must be at least 2"));

    harness.ctx.config.genetic = GeneticSettings {
        min_genome_size: 9,
        max_genome_size: 9,
        ..small_population()
    };
    let err = harness
        .pipeline()
        .generate(GenerationRequest::genetic(MealCategory::Lunch))
        .expect_err("pool smaller than a genome");
    assert!(err.to_string().contains("genomes need at least 9"));
    assert!(harness.pipeline().status()?.session.is_none());
    Ok(())
}
