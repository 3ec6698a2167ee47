use super::{lunch_day, reference_date, PlannerHarness, PROTEIN_RULES};
use anyhow::Result;
use mealplanner::candidates::format_pipeline_status;
use mealplanner::models::GenerationMethod;
use mealplanner::{DiscardStage, GenerationRequest, MealCategory, PlannerError, StageOptions};

#[test]
fn interrupted_scoring_resumes_with_the_remaining_candidates() -> Result<()> {
    // No template: every lunch passes, so all five need scores.
    let harness = PlannerHarness::lunches("");
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;
    assert_eq!(pipeline.filter(StageOptions::default())?.passed, 5);

    let first = pipeline.score(StageOptions::limited(2))?;
    assert_eq!(first.processed, 2);
    assert_eq!(first.remaining, 3);

    let resumed = pipeline.score(StageOptions::default())?;
    assert_eq!(resumed.processed, 3);
    assert_eq!(resumed.remaining, 0);
    assert_eq!(pipeline.score(StageOptions::default())?.processed, 0);

    let rescored = pipeline.score(StageOptions::rerun())?;
    assert_eq!(rescored.processed, 5);
    Ok(())
}

#[test]
fn checkpoints_leave_processed_candidates_finalized() -> Result<()> {
    let mut harness = PlannerHarness::lunches("");
    harness.ctx.config.pipeline.checkpoint_interval = 1;
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    let partial = pipeline.filter(StageOptions::limited(3))?;
    assert_eq!(partial.processed, 3);
    assert_eq!(partial.remaining, 2);

    let counts = pipeline.status()?.counts;
    assert_eq!(counts.raw, 2);
    assert_eq!(counts.passed, 3);
    assert_eq!(pipeline.filter(StageOptions::default())?.processed, 2);
    Ok(())
}

#[test]
fn history_append_skips_compositions_already_stored() -> Result<()> {
    let harness = PlannerHarness::lunches("");
    let pipeline = harness.pipeline();
    let request = GenerationRequest::history(MealCategory::Lunch).on_date(reference_date());

    let first = pipeline.generate(request.clone().with_limit(3))?;
    assert_eq!(first.added, vec!["G1", "G2", "G3"]);
    let second = pipeline.generate(request.clone())?;
    assert_eq!(second.added, vec!["G4", "G5"]);
    assert!(pipeline.generate(request)?.added.is_empty());
    assert_eq!(pipeline.status()?.counts.total(), 5);
    Ok(())
}

#[test]
fn a_different_session_requires_reset() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    let err = pipeline
        .generate(GenerationRequest::history(MealCategory::Breakfast).on_date(reference_date()))
        .expect_err("breakfast session while lunch candidates exist");
    assert!(matches!(err, PlannerError::Validation { .. }));
    assert!(err.describe().contains("reset"));

    assert!(matches!(
        pipeline.reset(false),
        Err(PlannerError::ConfirmationRequired { .. })
    ));
    assert_eq!(pipeline.reset(true)?, 5);
    assert!(pipeline.status()?.session.is_none());

    let breakfast = pipeline
        .generate(GenerationRequest::history(MealCategory::Breakfast).on_date(reference_date()))?;
    // Every day logged the same oats breakfast.
    assert_eq!(breakfast.added, vec!["G1"]);
    Ok(())
}

#[test]
fn switching_generation_method_keeps_the_active_session() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    let err = pipeline
        .generate(GenerationRequest::exhaustive(MealCategory::Lunch))
        .expect_err("exhaustive run while history candidates exist");
    assert!(matches!(err, PlannerError::Validation { .. }));
    assert!(err.to_string().contains("history_search"));

    let status = pipeline.status()?;
    assert_eq!(status.counts.total(), 5);
    assert_eq!(
        status.session.map(|s| s.method),
        Some(GenerationMethod::HistorySearch)
    );
    Ok(())
}

#[test]
fn scoring_without_filtered_candidates_does_nothing() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    let empty = pipeline.score(StageOptions::default())?;
    assert_eq!(empty.processed, 0);
    assert!(empty.best.is_none());

    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;
    let outcome = pipeline.score(StageOptions::default())?;
    assert_eq!(outcome.processed, 0);
    assert_eq!(outcome.remaining, 0);
    assert!(outcome.best.is_none());
    assert_eq!(pipeline.status()?.counts.raw, 5);
    assert!(pipeline.ranked()?.is_empty());
    Ok(())
}

#[test]
fn discarding_a_stage_keeps_the_others() -> Result<()> {
    let harness = PlannerHarness::lunches(PROTEIN_RULES);
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;
    pipeline.filter(StageOptions::default())?;

    assert!(pipeline.discard_stage(DiscardStage::Rejected, false).is_err());
    assert_eq!(pipeline.discard_stage("rejected".parse()?, true)?, 3);
    let status = pipeline.status()?;
    assert_eq!(status.counts.passed, 2);
    assert_eq!(status.counts.rejected, 0);

    let line = format_pipeline_status(&status);
    assert!(line.contains("history_search lunch template standard"));
    assert!(line.contains("2 candidates (raw 0, passed 2, rejected 0, scored 0)"));
    Ok(())
}

#[test]
fn locks_reject_on_the_next_refilter() -> Result<()> {
    let days = vec![
        lunch_day(1, &[("CH.1", 1.0)]),
        lunch_day(2, &[("CH.1", 1.0), ("RI.1", 1.0)]),
        lunch_day(3, &[("TF.1", 1.0), ("RI.1", 1.0)]),
    ];
    let harness = PlannerHarness::new("", super::lunch_catalog(), days);
    let pipeline = harness.pipeline();
    pipeline.generate(GenerationRequest::history(MealCategory::Lunch).on_date(reference_date()))?;

    pipeline.lock_exclude("tf.*")?;
    let locks = pipeline.lock_include("RI.1", Some(1.0))?;
    assert_eq!(locks.exclude, vec!["TF.*"]);

    let outcome = pipeline.filter(StageOptions::default())?;
    assert_eq!(outcome.passed, 1);
    let doc = pipeline.document()?;
    let survivor = doc
        .candidates
        .iter()
        .find(|c| c.passed_filters())
        .expect("one candidate passes");
    assert_eq!(survivor.meal.source_date.map(|d| d.to_string()), Some("2024-03-02".into()));

    pipeline.unlock("TF.*")?;
    assert!(pipeline.unlock("TF.*").is_err());
    assert!(pipeline.clear_locks(false).is_err());
    assert!(pipeline.clear_locks(true)?.is_empty());
    assert_eq!(pipeline.filter(StageOptions::rerun())?.passed, 3);
    Ok(())
}
