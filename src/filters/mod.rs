//! Ordered, pluggable rule evaluators run over unfiltered candidates.

pub mod availability;
pub mod conditional;
pub mod exclusion;
pub mod leftover;
pub mod nutrient;

pub use availability::AvailabilityFilter;
pub use conditional::ConditionalRequirementFilter;
pub use exclusion::MutualExclusionFilter;
pub use leftover::LeftoverFilter;
pub use nutrient::NutrientRangeFilter;

use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fmt;

use crate::candidates::Locks;
use crate::error::PlannerResult;
use crate::models::{Candidate, FilterResult, Inventory, MealCategory};
use crate::sources::{BoundTemplate, PoolResolver};
use crate::workspace::PlannerContext;

/// How much work a filter does after the first violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Every filter runs and reports every violation.
    CollectAll,
    /// Stop at the first violation; later filters are skipped.
    FailFast,
}

impl FilterMode {
    pub fn from_collect_all(collect_all: bool) -> Self {
        if collect_all {
            FilterMode::CollectAll
        } else {
            FilterMode::FailFast
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub category: String,
    pub detail: String,
}

impl Violation {
    pub fn new(category: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.detail)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterVerdict {
    pub violations: Vec<Violation>,
    pub warnings: Vec<String>,
}

impl FilterVerdict {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Records a violation; returns true when the caller should stop checking.
    pub fn reject(&mut self, violation: Violation, mode: FilterMode) -> bool {
        self.violations.push(violation);
        mode == FilterMode::FailFast
    }
}

pub trait CandidateFilter {
    fn name(&self) -> &str;

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict;

    /// Splits a batch into passing candidates and rejected ones with their violations.
    fn filter_candidates<'c>(
        &self,
        candidates: &'c [Candidate],
        mode: FilterMode,
    ) -> (Vec<&'c Candidate>, Vec<(&'c Candidate, Vec<Violation>)>) {
        let mut passed = Vec::new();
        let mut rejected = Vec::new();
        for candidate in candidates {
            let verdict = self.check(candidate, mode);
            if verdict.passed() {
                passed.push(candidate);
            } else {
                rejected.push((candidate, verdict.violations));
            }
        }
        (passed, rejected)
    }
}

/// Filters in evaluation order.
pub struct FilterChain {
    filters: Vec<Box<dyn CandidateFilter>>,
    mode: FilterMode,
}

impl FilterChain {
    pub fn new(mode: FilterMode) -> Self {
        Self {
            filters: Vec::new(),
            mode,
        }
    }

    pub fn register(&mut self, filter: Box<dyn CandidateFilter>) -> Result<()> {
        if self.filters.iter().any(|f| f.name() == filter.name()) {
            bail!("Filter {} is already registered", filter.name());
        }
        self.filters.push(filter);
        Ok(())
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn evaluate(&self, candidate: &Candidate) -> FilterResult {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        for filter in &self.filters {
            let verdict = filter.check(candidate, self.mode);
            let failed = !verdict.passed();
            violations.extend(verdict.violations.iter().map(Violation::to_string));
            warnings.extend(verdict.warnings);
            if failed && self.mode == FilterMode::FailFast {
                break;
            }
        }
        FilterResult {
            passed: violations.is_empty(),
            violations,
            warnings,
            filtered_at: Utc::now(),
        }
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.names())
            .field("mode", &self.mode)
            .finish()
    }
}

/// Builds the standard chain for a session:
/// nutrient ranges (when a template is bound), mutual exclusion, conditional
/// requirements, locks and availability, then leftover matching.
pub fn default_chain(
    ctx: &PlannerContext,
    meal_type: MealCategory,
    template: Option<&BoundTemplate>,
    locks: &Locks,
    inventory: &Inventory,
) -> PlannerResult<FilterChain> {
    let mut chain = FilterChain::new(FilterMode::from_collect_all(
        ctx.config.filtering.collect_all,
    ));
    let resolver = PoolResolver::new(&ctx.rules.pools, ctx.catalog().known_codes());
    let rules = ctx.rules.filter_rules(meal_type);

    if let Some(template) = template {
        chain.register(Box::new(NutrientRangeFilter::new(template)))?;
    }
    chain.register(Box::new(MutualExclusionFilter::new(
        &rules.mutual_exclusions,
        &resolver,
    )?))?;
    chain.register(Box::new(ConditionalRequirementFilter::new(
        &rules.conditional_requirements,
        &resolver,
    )?))?;
    chain.register(Box::new(AvailabilityFilter::new(
        locks,
        &ctx.rules.preferences,
        inventory,
    )))?;
    chain.register(Box::new(LeftoverFilter::new(
        inventory,
        ctx.config.filtering.allow_leftover_under_use,
    )))?;
    Ok(chain)
}

pub(crate) fn candidate_codes(candidate: &Candidate) -> BTreeSet<String> {
    candidate.meal.items.iter().map(|item| item.key()).collect()
}
