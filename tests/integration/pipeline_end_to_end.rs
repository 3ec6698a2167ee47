use super::{reference_date, PlannerHarness, PROTEIN_RULES};
use anyhow::Result;
use mealplanner::plans::PlanWorkspace;
use mealplanner::{AcceptRequest, EventType, GenerationRequest, MealCategory, StageOptions};

#[test]
fn lunch_pipeline_accepts_top_candidate_as_immutable_plan() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();

    let generated = pipeline
        .generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;
    assert_eq!(generated.added.len(), 5);
    assert_eq!(generated.session.template.as_deref(), Some("standard"));

    let filtered = pipeline.filter(StageOptions::default())?;
    assert_eq!(filtered.processed, 5);
    assert_eq!(filtered.passed, 2);
    assert_eq!(filtered.rejected, 3);

    let doc = pipeline.document()?;
    let rejected = doc
        .candidates
        .iter()
        .find(|c| c.stage_name() == "rejected")
        .expect("a rejected candidate");
    let reasons = &rejected.filter_result().expect("filter result").violations;
    assert!(reasons[0].starts_with("nutrient:protein_g<25.0(hard)"));

    let scored = pipeline.score(StageOptions::default())?;
    assert_eq!(scored.processed, 2);
    let ranked = pipeline.ranked()?;
    assert_eq!(ranked.len(), 2);
    let top = &ranked[0];
    assert_eq!(scored.best.as_ref().map(|(id, _)| id.as_str()), Some(top.id.as_str()));

    let accepted = pipeline.accept(AcceptRequest::new(&top.id).with_plan_id("lunch-v1"))?;
    assert!(accepted.warnings.is_empty());

    let plan = PlanWorkspace::new(&harness.ctx).get("lunch-v1")?;
    assert!(plan.immutable);
    assert_eq!(plan.totals, top.meal.totals);
    assert_eq!(plan.items, top.meal.items);
    assert_eq!(plan.source_candidate.as_deref(), Some(top.id.as_str()));
    assert_eq!(plan.history.last().map(|h| h.command.as_str()), Some("accept"));

    assert!(harness.workspace_path().join("plans.json").exists());
    // The source candidate stays in the pipeline.
    assert!(pipeline.document()?.find(&top.id).is_some());

    let events = harness.ctx.activity_log().load_events()?;
    let kinds: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            EventType::GenerationStarted,
            EventType::CandidatesGenerated,
            EventType::CandidatesFiltered,
            EventType::CandidatesScored,
            EventType::CandidateAccepted,
        ]
    );
    Ok(())
}

#[test]
fn filtering_twice_processes_nothing_new_until_refilter() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    assert_eq!(pipeline.filter(StageOptions::default())?.processed, 5);
    let again = pipeline.filter(StageOptions::default())?;
    assert_eq!(again.processed, 0);
    assert_eq!(again.remaining, 0);

    pipeline.score(StageOptions::default())?;
    let refiltered = pipeline.filter(StageOptions::rerun())?;
    assert_eq!(refiltered.processed, 5);
    assert_eq!(refiltered.passed, 2);
    // Refiltering drops dependent scores.
    assert!(pipeline.ranked()?.is_empty());
    Ok(())
}

#[test]
fn accepting_an_unscored_candidate_fails_without_side_effects() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    let generated = pipeline
        .generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    let err = pipeline
        .accept(AcceptRequest::new(&generated.added[0]))
        .expect_err("raw candidates cannot be accepted");
    assert!(err.suggestion().is_some());
    assert!(PlanWorkspace::new(&harness.ctx).list()?.is_empty());

    assert!(pipeline.accept(AcceptRequest::new("G999")).is_err());
    Ok(())
}

#[test]
fn accepting_into_an_existing_plan_id_collides() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let ranked = harness.scored_lunches();
    let pipeline = harness.pipeline();

    let first = pipeline.accept(AcceptRequest::new(&ranked[0]))?;
    assert_eq!(first.plan.id, "1");
    let second = pipeline.accept(AcceptRequest::new(&ranked[1]))?;
    assert_eq!(second.plan.id, "2");

    let err = pipeline
        .accept(AcceptRequest::new(&ranked[1]).with_plan_id("1"))
        .expect_err("plan id 1 is taken");
    assert!(err.to_string().contains("already exists"));
    assert_eq!(PlanWorkspace::new(&harness.ctx).list()?.len(), 2);
    Ok(())
}
