use super::{reference_date, PlannerHarness};
use anyhow::Result;
use chrono::NaiveDate;
use mealplanner::models::{InventoryCategory, RotatingStatus};
use mealplanner::{EventType, GenerationRequest, InventoryManager, MealCategory, StageOptions};

#[test]
fn rotating_items_keep_status_across_updates() -> Result<()> {
    let harness = PlannerHarness::lunches("");
    let inventory = InventoryManager::new(&harness.ctx);

    inventory.add(InventoryCategory::Rotating, "ri.1", 1.0, None)?;
    let depleted = inventory.deplete("RI.1")?;
    assert_eq!(depleted.status, RotatingStatus::Depleted);
    assert!(depleted.depleted_date.is_some());

    let updated = inventory.add(InventoryCategory::Rotating, "RI.1", 3.0, Some("new bag".into()))?;
    assert!(updated.is_depleted());
    assert_eq!(updated.multiplier, 3.0);

    let restored = inventory.restore("RI.1")?;
    assert_eq!(restored.status, RotatingStatus::Available);
    assert!(restored.depleted_date.is_none());

    assert!(inventory.deplete("CH.1").is_err());
    assert!(inventory.add(InventoryCategory::Batch, "CH.1", 0.0, None).is_err());
    assert!(inventory.add(InventoryCategory::Batch, "CH.1", f64::NAN, None).is_err());
    Ok(())
}

#[test]
fn remove_reports_missing_items() -> Result<()> {
    let harness = PlannerHarness::lunches("");
    let inventory = InventoryManager::new(&harness.ctx);
    inventory.add(InventoryCategory::Leftovers, "CH.1", 1.0, None)?;

    let removed = inventory.remove(InventoryCategory::Leftovers, "ch.1")?;
    assert_eq!(removed.multiplier, 1.0);
    assert!(inventory.get(InventoryCategory::Leftovers)?.is_empty());
    assert!(inventory.remove(InventoryCategory::Leftovers, "CH.1").is_err());

    let events = harness.ctx.activity_log().load_events()?;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.event_type == EventType::InventoryChanged));
    assert_eq!(events[1].details["action"], "remove");
    Ok(())
}

#[test]
fn depleted_and_leftover_stock_drive_filtering() -> Result<()> {
    let mut harness = PlannerHarness::lunches("");
    harness.ctx.config.filtering.collect_all = true;
    let inventory = InventoryManager::new(&harness.ctx);
    inventory.add(InventoryCategory::Rotating, "TF.1", 1.0, None)?;
    inventory.deplete("TF.1")?;
    inventory.add(InventoryCategory::Leftovers, "RI.1", 1.5, None)?;

    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;
    let outcome = pipeline.filter(StageOptions::default())?;
    // Only the plain chicken lunch avoids both tofu and a mismatched rice portion.
    assert_eq!(outcome.passed, 1);

    let doc = pipeline.document()?;
    let tofu_rice = doc
        .candidates
        .iter()
        .find(|c| c.meal.source_date == NaiveDate::from_ymd_opt(2024, 3, 5))
        .and_then(|c| c.filter_result())
        .expect("day 5 candidate filtered");
    assert_eq!(
        tofu_rice.violations,
        vec![
            "availability:TF.1 is depleted",
            "leftover:leftover_mismatch: RI.1 uses 1x but 1.5x is stored",
        ]
    );
    Ok(())
}
