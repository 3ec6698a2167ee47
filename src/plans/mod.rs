//! Copy-on-write store of meal plans and their variants.
//!
//! Immutable plans (accepted meals) are never edited in place: an edit forks
//! them into the next free variant id and applies the change to the copy.

pub mod edits;
pub mod lineage;

pub use edits::PlanEdit;
pub use lineage::{base_id, lineage, VariantIds};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;

use crate::error::{invalid, PlannerError, PlannerResult};
use crate::events::EventType;
use crate::models::{MealCategory, MealPlan, PlanOrigin};
use crate::sources::compute_totals;
use crate::storage::{read_json, write_json, WriteOutcome};
use crate::workspace::PlannerContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub plans: Vec<MealPlan>,
}

fn default_version() -> u32 {
    1
}

impl Default for PlanDocument {
    fn default() -> Self {
        Self {
            version: default_version(),
            plans: Vec::new(),
        }
    }
}

impl PlanDocument {
    pub fn get(&self, id: &str) -> Option<&MealPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut MealPlan> {
        self.plans.iter_mut().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> VariantIds<'_> {
        VariantIds::from_plans(&self.plans)
    }

    /// Inserts a new plan; an existing id is a collision.
    pub fn insert(&mut self, plan: MealPlan) -> PlannerResult<()> {
        if self.contains(&plan.id) {
            return Err(
                PlannerError::validation(format!("Plan id {} already exists", plan.id))
                    .with_suggestion("choose another id or omit it to get the next free one"),
            );
        }
        self.plans.push(plan);
        Ok(())
    }

    pub fn require(&self, id: &str) -> PlannerResult<&MealPlan> {
        self.get(id).ok_or_else(|| {
            PlannerError::validation(format!("Plan {id} not found")).with_suggestion("list plans")
        })
    }
}

/// Whole-document store at `plans.json`.
pub struct PlanStore {
    path: PathBuf,
}

impl PlanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<PlanDocument> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, document: &PlanDocument) -> Result<WriteOutcome> {
        write_json(&self.path, document)
    }
}

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub plan: MealPlan,
    /// Id of the immutable plan the edit forked from, if it had to fork.
    pub forked_from: Option<String>,
    pub log_line: String,
}

/// Workspace operations over [`PlanStore`].
pub struct PlanWorkspace<'a> {
    ctx: &'a PlannerContext,
    store: PlanStore,
}

impl<'a> PlanWorkspace<'a> {
    pub fn new(ctx: &'a PlannerContext) -> Self {
        Self {
            ctx,
            store: PlanStore::new(ctx.paths.plans_file.clone()),
        }
    }

    pub fn get(&self, id: &str) -> PlannerResult<MealPlan> {
        Ok(self.store.load()?.require(id)?.clone())
    }

    pub fn list(&self) -> PlannerResult<Vec<MealPlan>> {
        Ok(self.store.load()?.plans)
    }

    pub fn lineage(&self, id: &str) -> PlannerResult<Vec<String>> {
        let doc = self.store.load()?;
        doc.require(id)?;
        lineage(&doc.plans, id)
    }

    /// Starts an empty, mutable scratch plan under the next `N<n>` id.
    pub fn invent(
        &self,
        description: impl Into<String>,
        meal_type: Option<MealCategory>,
    ) -> PlannerResult<MealPlan> {
        let mut doc = self.store.load()?;
        let id = doc.ids().next_invented();
        let mut plan = MealPlan::root(id, PlanOrigin::Invented, Vec::new());
        plan.description = description.into();
        plan.meal_type = meal_type;
        plan.push_history("invent", "created from scratch");
        doc.insert(plan.clone())?;
        self.store.save(&doc)?;
        self.ctx
            .log_event(EventType::PlanInvented, json!({ "plan_id": plan.id }))?;
        Ok(plan)
    }

    /// Forks `source_id` without editing it. The copy is always mutable.
    pub fn copy(&self, source_id: &str, dest_id: Option<&str>) -> PlannerResult<MealPlan> {
        let mut doc = self.store.load()?;
        let source = doc.require(source_id)?.clone();
        let id = match dest_id {
            Some(dest) => {
                let dest = dest.trim();
                if dest.is_empty() {
                    invalid!("Destination id must not be empty");
                }
                dest.to_string()
            }
            None => doc.ids().next_variant(&source.id)?,
        };
        let mut copy = source.fork(id, PlanOrigin::Copied);
        if !copy.description.is_empty() {
            copy.description.push_str(" (copy)");
        }
        copy.push_history("copy", format!("copied from {}", source.id));
        doc.insert(copy.clone())?;
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::PlanCopied,
            json!({ "source": source.id, "plan_id": copy.id }),
        )?;
        Ok(copy)
    }

    /// Applies a structural edit, forking first when the target is immutable.
    pub fn edit(&self, id: &str, edit: PlanEdit) -> PlannerResult<EditOutcome> {
        let mut doc = self.store.load()?;
        let target = doc.require(id)?.clone();

        let (mut plan, forked_from) = if target.immutable {
            let variant_id = doc.ids().next_variant(&target.id)?;
            let mut fork = target.fork(variant_id, PlanOrigin::Forked);
            fork.push_history(
                "fork",
                format!("auto-forked from immutable plan {} for {edit}", target.id),
            );
            (fork, Some(target.id.clone()))
        } else {
            (target, None)
        };

        let log_line = edit.apply(&mut plan)?;
        plan.totals = compute_totals(self.ctx.catalog(), &plan.items).totals;
        plan.modification_log.push(log_line.clone());
        plan.push_history(edit.command(), log_line.clone());

        match &forked_from {
            Some(source) => {
                doc.insert(plan.clone())?;
                self.ctx.log_event(
                    EventType::PlanForked,
                    json!({ "source": source, "plan_id": plan.id, "edit": edit.command() }),
                )?;
            }
            None => {
                if let Some(slot) = doc.get_mut(&plan.id) {
                    *slot = plan.clone();
                }
            }
        }
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::PlanEdited,
            json!({ "plan_id": plan.id, "edit": edit.command(), "detail": log_line }),
        )?;
        tracing::info!(plan = %plan.id, forked = forked_from.is_some(), "plan edited");
        Ok(EditOutcome {
            plan,
            forked_from,
            log_line,
        })
    }

    /// Deletes a plan. Plans with variants cannot be discarded.
    pub fn discard(&self, id: &str, confirm: bool) -> PlannerResult<MealPlan> {
        let mut doc = self.store.load()?;
        doc.require(id)?;
        let children: Vec<&str> = doc
            .plans
            .iter()
            .filter(|p| p.parent_id.as_deref() == Some(id))
            .map(|p| p.id.as_str())
            .collect();
        if !children.is_empty() {
            return Err(PlannerError::validation(format!(
                "Plan {id} has variants ({}) and cannot be discarded",
                children.join(", ")
            ))
            .with_suggestion("discard the variants first"));
        }
        if !confirm {
            return Err(PlannerError::confirmation(format!("discard plan {id}")));
        }
        let position = doc
            .plans
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| PlannerError::validation(format!("Plan {id} not found")))?;
        let removed = doc.plans.remove(position);
        self.store.save(&doc)?;
        self.ctx
            .log_event(EventType::PlanDiscarded, json!({ "plan_id": id }))?;
        Ok(removed)
    }
}
