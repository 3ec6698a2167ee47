use super::{protein, PlannerHarness};
use anyhow::Result;
use mealplanner::models::InventoryCategory;
use mealplanner::sources::FoodCatalog;
use mealplanner::{
    AcceptRequest, GenerationRequest, InventoryManager, MealCategory, MealItem, StageOptions,
};

const COMBO_RULES: &str = r#"
[pools]
bowls = ["CB.1"]

[templates.dinner.bowl]
description = "Single bowl"

[[templates.dinner.bowl.components]]
name = "bowl"
pool = "bowls"
required = true
multiplier = 2.0
"#;

fn combo_catalog() -> FoodCatalog {
    FoodCatalog::new()
        .with_food("A", "rice", protein(3.0, 200.0))
        .with_food("B", "beans", protein(8.0, 120.0))
        .with_combo(
            "CB.1",
            "rice and beans",
            vec![MealItem::new("A", 1.0), MealItem::new("B", 0.5)],
        )
}

fn scored_bowl(harness: &PlannerHarness) -> Result<String> {
    let pipeline = harness.pipeline();
    let generated = pipeline.generate(GenerationRequest::exhaustive(MealCategory::Dinner))?;
    assert_eq!(generated.added.len(), 1);
    pipeline.filter(StageOptions::default())?;
    pipeline.score(StageOptions::default())?;
    Ok(generated.added[0].clone())
}

#[test]
fn accepting_a_combo_stores_its_scaled_constituents() -> Result<()> {
    let harness = PlannerHarness::new(COMBO_RULES, combo_catalog(), Vec::new());
    let candidate_id = scored_bowl(&harness)?;

    let candidate = harness
        .pipeline()
        .document()?
        .find(&candidate_id)
        .cloned()
        .expect("candidate stored");
    assert_eq!(candidate.meal.items, vec![MealItem::new("CB.1", 2.0)]);
    // rice 3 g + beans 0.5 × 8 g, doubled
    assert!((candidate.meal.totals.protein_g - 14.0).abs() < 1e-9);

    let outcome = harness
        .pipeline()
        .accept(AcceptRequest::new(&candidate_id))?;
    assert_eq!(
        outcome.plan.items,
        vec![MealItem::new("A", 2.0), MealItem::new("B", 1.0)]
    );
    assert_eq!(outcome.plan.totals, candidate.meal.totals);
    assert_eq!(outcome.plan.meal_type, Some(MealCategory::Dinner));
    Ok(())
}

#[test]
fn acceptance_updates_inventory_without_blocking_on_depleted_items() -> Result<()> {
    let harness = PlannerHarness::new(COMBO_RULES, combo_catalog(), Vec::new());
    let inventory = InventoryManager::new(&harness.ctx);
    inventory.add(InventoryCategory::Leftovers, "A", 2.0, Some("Sunday rice".into()))?;
    inventory.add(InventoryCategory::Batch, "B", 4.0, None)?;
    inventory.add(InventoryCategory::Rotating, "B", 1.0, None)?;
    inventory.deplete("B")?;

    let candidate_id = scored_bowl(&harness)?;
    let outcome = harness
        .pipeline()
        .accept(AcceptRequest::new(&candidate_id).with_plan_id("bowl"))?;
    assert_eq!(outcome.warnings, vec!["rotating item B is marked depleted"]);

    let snapshot = inventory.snapshot()?;
    let rice = &snapshot.leftovers["A"];
    assert!(rice.reserved);
    assert_eq!(rice.reserved_for.as_deref(), Some("bowl"));
    assert_eq!(snapshot.batch["B"].uses, 1);
    assert!(snapshot.rotating["B"].is_depleted());
    Ok(())
}

#[test]
fn a_reserved_leftover_keeps_its_first_plan() -> Result<()> {
    let harness = PlannerHarness::new(COMBO_RULES, combo_catalog(), Vec::new());
    let inventory = InventoryManager::new(&harness.ctx);
    inventory.add(InventoryCategory::Leftovers, "A", 2.0, None)?;

    let candidate_id = scored_bowl(&harness)?;
    let pipeline = harness.pipeline();
    let first = pipeline.accept(AcceptRequest::new(&candidate_id).with_plan_id("bowl"))?;
    assert!(first.warnings.is_empty());

    let second = pipeline.accept(AcceptRequest::new(&candidate_id).with_plan_id("bowl-2"))?;
    assert_eq!(second.warnings, vec!["leftover A is already reserved for bowl"]);
    assert_eq!(second.plan.id, "bowl-2");

    let rice = &inventory.snapshot()?.leftovers["A"];
    assert!(rice.reserved);
    assert_eq!(rice.reserved_for.as_deref(), Some("bowl"));
    Ok(())
}
