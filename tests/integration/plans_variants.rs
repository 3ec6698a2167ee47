use super::{PlannerHarness, PROTEIN_RULES};
use anyhow::Result;
use mealplanner::models::PlanOrigin;
use mealplanner::plans::PlanWorkspace;
use mealplanner::{AcceptRequest, EventType, MealCategory, MealItem, PlanEdit, PlannerError};

fn accepted_plan(harness: &PlannerHarness, plan_id: &str) -> Result<()> {
    let ranked = harness.scored_lunches();
    harness
        .pipeline()
        .accept(AcceptRequest::new(&ranked[0]).with_plan_id(plan_id))?;
    Ok(())
}

#[test]
fn editing_an_immutable_plan_forks_the_next_variant() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    accepted_plan(&harness, "7")?;
    let plans = PlanWorkspace::new(&harness.ctx);
    let original = plans.get("7")?;

    let add_rice = PlanEdit::Add {
        items: vec![MealItem::new("RI.1", 1.0)],
    };
    let first = plans.edit("7", add_rice.clone())?;
    assert_eq!(first.plan.id, "7a");
    assert_eq!(first.forked_from.as_deref(), Some("7"));
    let second = plans.edit("7", add_rice.clone())?;
    assert_eq!(second.plan.id, "7b");
    let third = plans.edit("7", PlanEdit::Remove { index: 0 })?;
    assert_eq!(third.plan.id, "7c");

    // The source is untouched.
    assert_eq!(plans.get("7")?, original);

    let fork = plans.get("7a")?;
    assert!(!fork.immutable);
    assert_eq!(fork.origin, PlanOrigin::Forked);
    assert_eq!(fork.parent_id.as_deref(), Some("7"));
    assert_eq!(fork.ancestor_id, "7");
    assert!(fork.locked_analysis.is_none());
    let commands: Vec<&str> = fork.history.iter().map(|h| h.command.as_str()).collect();
    assert_eq!(commands, vec!["accept", "fork", "add"]);
    assert!((fork.totals.protein_g - (original.totals.protein_g + 3.0)).abs() < 1e-9);
    Ok(())
}

#[test]
fn mutable_plans_are_edited_in_place() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    accepted_plan(&harness, "7")?;
    let plans = PlanWorkspace::new(&harness.ctx);
    let fork = plans.edit(
        "7",
        PlanEdit::Add {
            items: vec![MealItem::new("TF.1", 1.0)],
        },
    )?;

    let outcome = plans.edit(&fork.plan.id, PlanEdit::SetMultiplier { index: 0, mult: 2.0 })?;
    assert_eq!(outcome.plan.id, "7a");
    assert!(outcome.forked_from.is_none());
    assert_eq!(outcome.plan.modification_log.len(), 2);
    assert_eq!(plans.list()?.len(), 2);

    let err = plans
        .edit("7a", PlanEdit::Remove { index: 10 })
        .expect_err("index out of range");
    assert!(matches!(err, PlannerError::Validation { .. }));
    assert_eq!(plans.get("7a")?, outcome.plan);
    Ok(())
}

#[test]
fn variants_of_variants_keep_the_root_ancestor() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    accepted_plan(&harness, "3")?;
    let plans = PlanWorkspace::new(&harness.ctx);

    let child = plans.copy("3", None)?;
    assert_eq!(child.id, "3a");
    let grandchild = plans.copy(&child.id, Some("lunch-variant"))?;
    let great = plans.copy(&grandchild.id, None)?;
    assert_eq!(great.id, "lunch-varianta");

    for id in ["3a", "lunch-variant", "lunch-varianta"] {
        assert_eq!(plans.get(id)?.ancestor_id, "3");
    }
    assert_eq!(
        plans.lineage("lunch-varianta")?,
        vec!["lunch-varianta", "lunch-variant", "3a", "3"]
    );
    assert!(plans.copy("3", Some("3a")).is_err());
    Ok(())
}

#[test]
fn copy_into_a_taken_id_fails_without_writing() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let ranked = harness.scored_lunches();
    let pipeline = harness.pipeline();
    pipeline.accept(AcceptRequest::new(&ranked[0]).with_plan_id("3"))?;
    pipeline.accept(AcceptRequest::new(&ranked[1]).with_plan_id("8"))?;
    let plans = PlanWorkspace::new(&harness.ctx);
    let before = plans.get("8")?;

    let err = plans.copy("3", Some("8")).expect_err("plan 8 exists");
    assert!(matches!(err, PlannerError::Validation { .. }));
    assert!(err.to_string().contains("already exists"));
    assert_eq!(plans.list()?.len(), 2);
    assert_eq!(plans.get("8")?, before);

    let events = harness.ctx.activity_log().load_events()?;
    assert!(events.iter().all(|e| e.event_type != EventType::PlanCopied));
    Ok(())
}

#[test]
fn copies_are_mutable_and_marked() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let ranked = harness.scored_lunches();
    harness.pipeline().accept(
        AcceptRequest::new(&ranked[0])
            .with_plan_id("5")
            .with_description("Chicken lunch"),
    )?;
    let plans = PlanWorkspace::new(&harness.ctx);

    let copy = plans.copy("5", None)?;
    assert!(!copy.immutable);
    assert_eq!(copy.origin, PlanOrigin::Copied);
    assert_eq!(copy.description, "Chicken lunch (copy)");
    assert!(copy.locked_analysis.is_none());
    assert!(plans.get("5")?.locked_analysis.is_some());
    Ok(())
}

#[test]
fn invented_plans_count_up_and_edit_in_place() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let plans = PlanWorkspace::new(&harness.ctx);

    let scratch = plans.invent("Quick snack", Some(MealCategory::AfternoonSnack))?;
    assert_eq!(scratch.id, "N1");
    assert_eq!(plans.invent("Another", None)?.id, "N2");

    let edited = plans.edit(
        "N1",
        PlanEdit::Add {
            items: vec![MealItem::new("oa.1", 1.0), MealItem::new("TF.1", 0.5)],
        },
    )?;
    assert_eq!(edited.plan.id, "N1");
    assert!((edited.plan.totals.protein_g - 11.0).abs() < 1e-9);

    let moved = plans.edit("N1", PlanEdit::Move { from: 1, to: 0 })?;
    let codes: Vec<&str> = moved.plan.items.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["TF.1", "OA.1"]);
    Ok(())
}

#[test]
fn discard_needs_confirmation_and_no_variants() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    accepted_plan(&harness, "4")?;
    let plans = PlanWorkspace::new(&harness.ctx);
    plans.copy("4", None)?;

    assert!(matches!(
        plans.discard("4", true),
        Err(PlannerError::Validation { .. })
    ));
    assert!(matches!(
        plans.discard("4a", false),
        Err(PlannerError::ConfirmationRequired { .. })
    ));
    plans.discard("4a", true)?;
    plans.discard("4", true)?;
    assert!(plans.list()?.is_empty());
    Ok(())
}
