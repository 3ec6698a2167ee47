//! Generate → filter → score → accept over the persisted candidate document.
//!
//! Every stage loads `candidates.json`, works on the candidates whose result
//! is still unset and writes the document back, checkpointing along the way,
//! so an interrupted run resumes where it stopped.

pub mod acceptance;

pub use acceptance::{expand_composites, AcceptOutcome, AcceptRequest};

use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::candidates::{CandidateDocument, CandidateStore, Locks, PipelineStatus};
use crate::error::{invalid, PlannerError, PlannerResult};
use crate::events::EventType;
use crate::filters::{default_chain, FilterChain};
use crate::generation::{generator_for, CombinationSpace, GenerationInput, GenerationRequest};
use crate::inventory::InventoryStore;
use crate::models::{valid_mult, Candidate, GenerationMethod, GenerationState, MealCategory};
use crate::scoring::{ScorerRegistry, ScoringContext};
use crate::sources::BoundTemplate;
use crate::workspace::PlannerContext;

/// Options shared by the filter and score stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Clear existing results first (refilter / rescore).
    pub rerun: bool,
    /// Stop after this many candidates; the rest stay pending.
    pub limit: Option<usize>,
}

impl StageOptions {
    pub fn rerun() -> Self {
        Self {
            rerun: true,
            limit: None,
        }
    }

    pub fn limited(limit: usize) -> Self {
        Self {
            rerun: false,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub session: GenerationState,
    pub added: Vec<String>,
    pub total_space: Option<u64>,
    pub exhausted: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    pub processed: usize,
    pub passed: usize,
    pub rejected: usize,
    /// Candidates still without a filter result.
    pub remaining: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreOutcome {
    pub processed: usize,
    /// Passing candidates still without a score.
    pub remaining: usize,
    pub best: Option<(String, f64)>,
}

/// Pipeline stage selectable for discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardStage {
    Raw,
    Rejected,
    Passed,
    Scored,
}

impl DiscardStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscardStage::Raw => "raw",
            DiscardStage::Rejected => "rejected",
            DiscardStage::Passed => "passed",
            DiscardStage::Scored => "scored",
        }
    }
}

impl fmt::Display for DiscardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscardStage {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(DiscardStage::Raw),
            "rejected" => Ok(DiscardStage::Rejected),
            "passed" => Ok(DiscardStage::Passed),
            "scored" => Ok(DiscardStage::Scored),
            other => Err(PlannerError::validation(format!("Unknown stage '{other}'"))
                .with_suggestion("use raw, rejected, passed or scored")),
        }
    }
}

pub struct Pipeline<'a> {
    ctx: &'a PlannerContext,
    store: CandidateStore,
    filters: Option<FilterChain>,
    scorers: Option<ScorerRegistry>,
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: &'a PlannerContext) -> Self {
        Self {
            ctx,
            store: CandidateStore::new(ctx.paths.candidates_file.clone()),
            filters: None,
            scorers: None,
        }
    }

    /// Replaces the default filter chain.
    pub fn with_filters(mut self, chain: FilterChain) -> Self {
        self.filters = Some(chain);
        self
    }

    /// Replaces the scorers configured in the rule book.
    pub fn with_scorers(mut self, registry: ScorerRegistry) -> Self {
        self.scorers = Some(registry);
        self
    }

    pub fn document(&self) -> PlannerResult<CandidateDocument> {
        Ok(self.store.load()?)
    }

    /// Appends a batch of raw candidates to the active session, opening one if needed.
    pub fn generate(&self, request: GenerationRequest) -> PlannerResult<GenerationOutcome> {
        let template = self
            .ctx
            .rules
            .resolve_template(request.meal_type, request.template.as_deref())?;
        let template_name = template.as_ref().map(|t| t.name.clone());
        let mut doc = self.store.load()?;

        let mut started = false;
        let mut session = match doc.session.take() {
            Some(existing)
                if existing.matches(request.method, request.meal_type, template_name.as_deref()) =>
            {
                existing
            }
            Some(existing) if !doc.candidates.is_empty() => {
                return Err(PlannerError::validation(format!(
                    "Active session is {} {} but {} {} was requested",
                    existing.method.as_str(),
                    existing.meal_type,
                    request.method.as_str(),
                    request.meal_type
                ))
                .with_suggestion("reset the pipeline before starting a different session"));
            }
            _ => {
                started = true;
                GenerationState::new(request.method, request.meal_type, template_name.clone())
            }
        };

        if let Some(cursor) = request.cursor {
            if request.method == GenerationMethod::Exhaustive && cursor != session.cursor {
                return Err(PlannerError::validation(format!(
                    "Cursor {cursor} does not match the session cursor {}",
                    session.cursor
                ))
                .with_suggestion("omit the cursor to continue where the session stopped"));
            }
        }

        if session.is_exhausted() {
            tracing::info!(cursor = session.cursor, "combination space exhausted");
            return Ok(GenerationOutcome {
                total_space: session.total_space,
                session,
                added: Vec::new(),
                exhausted: true,
                warnings: Vec::new(),
            });
        }

        let settings = &self.ctx.config.generation;
        let limit = request.max_results.unwrap_or(match request.method {
            GenerationMethod::HistorySearch => settings.history_max_candidates,
            GenerationMethod::Exhaustive => settings.exhaustive_batch_size,
            GenerationMethod::Genetic => self.ctx.config.genetic.candidates_per_run,
        });
        let existing_keys = doc.composition_keys();
        let input = GenerationInput {
            meal_type: request.meal_type,
            template: template.as_ref(),
            limit,
            cursor: session.cursor,
            reference_date: request
                .reference_date
                .unwrap_or_else(|| Utc::now().date_naive()),
            existing_keys: &existing_keys,
            locks: &doc.locks,
        };
        let batch = generator_for(request.method).generate(self.ctx, &input)?;

        let prefix = self.ctx.config.pipeline.candidate_prefix.clone();
        let mut added = Vec::with_capacity(batch.meals.len());
        for generated in batch.meals {
            let candidate = doc.push(&prefix, generated.meal, generated.metadata);
            added.push(candidate.id.clone());
        }
        if batch.total_space.is_some() {
            session.total_space = batch.total_space;
        }
        session.advance(batch.next_cursor);
        let exhausted = session.is_exhausted();
        doc.session = Some(session.clone());
        self.store.save(&doc)?;

        if started {
            self.ctx.log_event(
                EventType::GenerationStarted,
                json!({
                    "session_id": session.session_id,
                    "method": session.method,
                    "meal_type": session.meal_type,
                    "template": session.template,
                }),
            )?;
        }
        self.ctx.log_event(
            EventType::CandidatesGenerated,
            json!({
                "session_id": session.session_id,
                "added": added.len(),
                "cursor": session.cursor,
                "total_space": session.total_space,
            }),
        )?;
        Ok(GenerationOutcome {
            total_space: session.total_space,
            session,
            added,
            exhausted,
            warnings: batch.warnings,
        })
    }

    /// Runs the filter chain over candidates without a filter result.
    pub fn filter(&self, options: StageOptions) -> PlannerResult<FilterOutcome> {
        let mut doc = self.store.load()?;
        if doc.candidates.is_empty() {
            return Ok(FilterOutcome::default());
        }
        let (meal_type, template) = self.session_template(&doc)?;
        if options.rerun {
            doc.candidates.iter_mut().for_each(Candidate::clear_results);
        }

        let default;
        let chain = match &self.filters {
            Some(chain) => chain,
            None => {
                let inventory = InventoryStore::new(self.ctx.paths.inventory_file.clone()).load()?;
                default = default_chain(self.ctx, meal_type, template.as_ref(), &doc.locks, &inventory)?;
                &default
            }
        };

        let interval = self.checkpoint_interval();
        let limit = options.limit.unwrap_or(usize::MAX);
        let mut outcome = FilterOutcome::default();
        for index in 0..doc.candidates.len() {
            if outcome.processed >= limit {
                break;
            }
            if !doc.candidates[index].is_unfiltered() {
                continue;
            }
            let result = chain.evaluate(&doc.candidates[index]);
            if result.passed {
                outcome.passed += 1;
            } else {
                outcome.rejected += 1;
            }
            doc.candidates[index].record_filter(result)?;
            outcome.processed += 1;
            if outcome.processed % interval == 0 {
                self.store.save(&doc)?;
                tracing::debug!(processed = outcome.processed, "filter checkpoint");
            }
        }
        outcome.remaining = doc.candidates.iter().filter(|c| c.is_unfiltered()).count();
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::CandidatesFiltered,
            json!({
                "processed": outcome.processed,
                "passed": outcome.passed,
                "rejected": outcome.rejected,
                "remaining": outcome.remaining,
                "rerun": options.rerun,
                "filters": chain.names(),
            }),
        )?;
        Ok(outcome)
    }

    /// Scores passing candidates that have no score yet.
    pub fn score(&self, options: StageOptions) -> PlannerResult<ScoreOutcome> {
        let mut doc = self.store.load()?;
        if doc.candidates.is_empty() {
            return Ok(ScoreOutcome::default());
        }
        let (_, template) = self.session_template(&doc)?;
        if options.rerun {
            doc.candidates.iter_mut().for_each(Candidate::clear_score);
        }

        let default;
        let registry = match &self.scorers {
            Some(registry) => registry,
            None => {
                default = ScorerRegistry::from_rules(&self.ctx.rules);
                &default
            }
        };
        let template = template.as_ref().map(|bound| &bound.template);
        let preferences = &self.ctx.rules.preferences;

        let interval = self.checkpoint_interval();
        let limit = options.limit.unwrap_or(usize::MAX);
        let mut outcome = ScoreOutcome::default();
        for index in 0..doc.candidates.len() {
            if outcome.processed >= limit {
                break;
            }
            if !doc.candidates[index].awaiting_score() {
                continue;
            }
            let result = {
                let context = ScoringContext::new(&doc.candidates[index], template, preferences);
                registry.score(&context)
            };
            doc.candidates[index].record_score(result)?;
            outcome.processed += 1;
            if outcome.processed % interval == 0 {
                self.store.save(&doc)?;
                tracing::debug!(processed = outcome.processed, "score checkpoint");
            }
        }
        outcome.remaining = doc.candidates.iter().filter(|c| c.awaiting_score()).count();
        outcome.best = doc
            .ranked()
            .first()
            .and_then(|c| c.aggregate_score().map(|s| (c.id.clone(), s)));
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::CandidatesScored,
            json!({
                "processed": outcome.processed,
                "remaining": outcome.remaining,
                "rerun": options.rerun,
                "scorers": registry.names(),
            }),
        )?;
        Ok(outcome)
    }

    /// Scored candidates, best first.
    pub fn ranked(&self) -> PlannerResult<Vec<Candidate>> {
        let doc = self.store.load()?;
        Ok(doc.ranked().into_iter().cloned().collect())
    }

    pub fn status(&self) -> PlannerResult<PipelineStatus> {
        let doc = self.store.load()?;
        Ok(PipelineStatus {
            counts: doc.counts(),
            session: doc.session,
            locks: doc.locks,
        })
    }

    /// Size of the combination space a template would enumerate.
    pub fn count_combinations(
        &self,
        meal_type: MealCategory,
        template: Option<&str>,
    ) -> PlannerResult<u64> {
        let bound = self
            .ctx
            .rules
            .resolve_template(meal_type, template)?
            .ok_or_else(|| {
                PlannerError::config(format!("No template configured for {meal_type}"))
                    .with_suggestion("add a template with components to rules.toml")
            })?;
        Ok(CombinationSpace::build(self.ctx, &bound)?.total())
    }

    pub fn accept(&self, request: AcceptRequest) -> PlannerResult<AcceptOutcome> {
        let doc = self.store.load()?;
        acceptance::accept(self.ctx, &doc, &request)
    }

    /// Drops every candidate currently in `stage`. Returns how many were removed.
    pub fn discard_stage(&self, stage: DiscardStage, confirm: bool) -> PlannerResult<usize> {
        if !confirm {
            return Err(PlannerError::confirmation(format!("discard {stage} candidates")));
        }
        let mut doc = self.store.load()?;
        let before = doc.candidates.len();
        doc.candidates.retain(|c| c.stage_name() != stage.as_str());
        let removed = before - doc.candidates.len();
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::StageDiscarded,
            json!({ "stage": stage.as_str(), "removed": removed }),
        )?;
        Ok(removed)
    }

    /// Clears the session and every candidate. Locks survive a reset.
    pub fn reset(&self, confirm: bool) -> PlannerResult<usize> {
        if !confirm {
            return Err(PlannerError::confirmation("reset the pipeline"));
        }
        let doc = self.store.load()?;
        let removed = doc.candidates.len();
        let fresh = CandidateDocument {
            locks: doc.locks,
            ..CandidateDocument::default()
        };
        self.store.save(&fresh)?;
        self.ctx
            .log_event(EventType::PipelineReset, json!({ "removed": removed }))?;
        Ok(removed)
    }

    pub fn lock_include(&self, code: &str, mult: Option<f64>) -> PlannerResult<Locks> {
        if let Some(mult) = mult {
            if !valid_mult(mult) {
                invalid!("Lock multiplier for {code} must be positive, got {mult}");
            }
        }
        self.update_locks("include", code, |locks| {
            locks.include(code, mult);
            Ok(())
        })
    }

    pub fn lock_exclude(&self, code: &str) -> PlannerResult<Locks> {
        self.update_locks("exclude", code, |locks| {
            locks.exclude(code);
            Ok(())
        })
    }

    pub fn unlock(&self, code: &str) -> PlannerResult<Locks> {
        self.update_locks("unlock", code, |locks| {
            if !locks.unlock(code) {
                invalid!("{code} is not locked");
            }
            Ok(())
        })
    }

    pub fn clear_locks(&self, confirm: bool) -> PlannerResult<Locks> {
        if !confirm {
            return Err(PlannerError::confirmation("clear all locks"));
        }
        self.update_locks("clear", "*", |locks| {
            *locks = Locks::default();
            Ok(())
        })
    }

    fn update_locks(
        &self,
        action: &str,
        code: &str,
        change: impl FnOnce(&mut Locks) -> PlannerResult<()>,
    ) -> PlannerResult<Locks> {
        if code.trim().is_empty() {
            invalid!("Lock code must not be empty");
        }
        let mut doc = self.store.load()?;
        change(&mut doc.locks)?;
        self.store.save(&doc)?;
        self.ctx.log_event(
            EventType::LocksChanged,
            json!({ "action": action, "code": code, "locks": doc.locks }),
        )?;
        Ok(doc.locks)
    }

    fn session_template(
        &self,
        doc: &CandidateDocument,
    ) -> PlannerResult<(MealCategory, Option<BoundTemplate>)> {
        let session = doc.session.as_ref().ok_or_else(|| {
            PlannerError::validation("Candidates exist without a generation session")
                .with_suggestion("reset the pipeline and generate again")
        })?;
        let template = match session.template.as_deref() {
            Some(name) => self
                .ctx
                .rules
                .resolve_template(session.meal_type, Some(name))?,
            None => None,
        };
        Ok((session.meal_type, template))
    }

    fn checkpoint_interval(&self) -> usize {
        self.ctx.config.pipeline.checkpoint_interval.max(1) as usize
    }
}
