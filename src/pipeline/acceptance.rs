//! Promotes a scored candidate into the plan workspace.

use chrono::Utc;
use serde_json::json;
use std::collections::BTreeSet;

use crate::candidates::CandidateDocument;
use crate::error::{PlannerError, PlannerResult};
use crate::events::EventType;
use crate::inventory::InventoryStore;
use crate::models::{LockedAnalysis, MealItem, MealPlan, PlanOrigin};
use crate::plans::PlanStore;
use crate::sources::NutrientLookup;
use crate::workspace::PlannerContext;

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptRequest {
    pub candidate_id: String,
    /// Explicit plan id; the next numeric id when unset.
    pub plan_id: Option<String>,
    pub description: Option<String>,
}

impl AcceptRequest {
    pub fn new(candidate_id: impl Into<String>) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            plan_id: None,
            description: None,
        }
    }

    pub fn with_plan_id(mut self, plan_id: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub plan: MealPlan,
    /// Inventory notes that did not block acceptance.
    pub warnings: Vec<String>,
}

/// Replaces each combo code with its constituents, scaling by the combo's multiplier.
pub fn expand_composites(lookup: &dyn NutrientLookup, items: &[MealItem]) -> Vec<MealItem> {
    let mut expanded = Vec::with_capacity(items.len());
    for item in items {
        match lookup.combo_expansion(&item.code) {
            Some(parts) => expanded.extend(
                parts
                    .iter()
                    .map(|part| MealItem::new(&part.code, part.mult * item.mult)),
            ),
            None => expanded.push(item.clone()),
        }
    }
    expanded
}

pub(crate) fn accept(
    ctx: &PlannerContext,
    candidates: &CandidateDocument,
    request: &AcceptRequest,
) -> PlannerResult<AcceptOutcome> {
    let candidate = candidates.find(&request.candidate_id).ok_or_else(|| {
        PlannerError::validation(format!("Candidate {} not found", request.candidate_id))
            .with_suggestion("list ranked candidates")
    })?;
    let score = candidate.score_result().ok_or_else(|| {
        PlannerError::validation(format!(
            "Candidate {} is {} and has no score",
            candidate.id,
            candidate.stage_name()
        ))
        .with_suggestion("run the score stage first")
    })?;

    let plan_store = PlanStore::new(ctx.paths.plans_file.clone());
    let mut plans = plan_store.load()?;
    let plan_id = match request.plan_id.as_deref().map(str::trim) {
        Some("") => {
            return Err(PlannerError::validation("Plan id must not be empty"));
        }
        Some(id) => id.to_string(),
        None => plans.ids().next_numeric(),
    };

    let items = expand_composites(ctx.catalog(), &candidate.meal.items);
    let mut plan = MealPlan::root(plan_id, PlanOrigin::Accepted, items);
    plan.immutable = true;
    plan.meal_type = Some(candidate.meal.meal_type);
    plan.totals = candidate.meal.totals.clone();
    plan.source_candidate = Some(candidate.id.clone());
    plan.description = request
        .description
        .clone()
        .unwrap_or_else(|| candidate.meal.description.clone());
    plan.locked_analysis = Some(LockedAnalysis {
        locked_at: Utc::now(),
        totals: candidate.meal.totals.clone(),
        aggregate_score: Some(score.aggregate_score),
    });
    plan.push_history(
        "accept",
        format!(
            "accepted candidate {} (score {:.3})",
            candidate.id, score.aggregate_score
        ),
    );
    plans.insert(plan.clone())?;

    let inventory_store = InventoryStore::new(ctx.paths.inventory_file.clone());
    let mut inventory = inventory_store.load()?;
    let mut warnings = Vec::new();
    let mut changed = false;
    let codes: BTreeSet<String> = candidate
        .meal
        .items
        .iter()
        .chain(plan.items.iter())
        .map(MealItem::key)
        .collect();
    for code in &codes {
        if let Some(leftover) = inventory.leftovers.get_mut(code) {
            match leftover.reserved_for.as_deref() {
                Some(owner) if leftover.reserved && owner != plan.id => {
                    warnings.push(format!("leftover {code} is already reserved for {owner}"));
                }
                _ => {
                    leftover.reserved = true;
                    leftover.reserved_for = Some(plan.id.clone());
                    changed = true;
                }
            }
        }
        if let Some(batch) = inventory.batch.get_mut(code) {
            batch.uses += 1;
            changed = true;
        }
        if inventory
            .rotating
            .get(code)
            .is_some_and(|item| item.is_depleted())
        {
            warnings.push(format!("rotating item {code} is marked depleted"));
        }
    }

    plan_store.save(&plans)?;
    if changed {
        inventory_store.save(&inventory)?;
    }
    for warning in &warnings {
        tracing::warn!(plan = %plan.id, "{warning}");
    }
    ctx.log_event(
        EventType::CandidateAccepted,
        json!({
            "candidate_id": candidate.id,
            "plan_id": plan.id,
            "aggregate_score": score.aggregate_score,
            "warnings": warnings,
        }),
    )?;
    Ok(AcceptOutcome { plan, warnings })
}
