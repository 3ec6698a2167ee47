//! Plan id arithmetic and ancestry.

use std::collections::{BTreeMap, HashSet};

use crate::error::{PlannerError, PlannerResult};
use crate::models::MealPlan;

/// Strips a variant suffix: trailing lowercase letters directly after a digit.
///
/// `7` and `7c` share base `7`; `N3b` has base `N3`; `lunch` is its own base.
pub fn base_id(id: &str) -> &str {
    let trimmed = id.trim_end_matches(|c: char| c.is_ascii_lowercase());
    if trimmed.len() < id.len() && trimmed.ends_with(|c: char| c.is_ascii_digit()) {
        trimmed
    } else {
        id
    }
}

/// Id generator over a snapshot of the workspace's existing ids.
pub struct VariantIds<'a> {
    existing: HashSet<&'a str>,
}

impl<'a> VariantIds<'a> {
    pub fn from_plans(plans: &'a [MealPlan]) -> Self {
        Self {
            existing: plans.iter().map(|p| p.id.as_str()).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.existing.contains(id)
    }

    /// First free `<base><letter>` for the source's base, `a` through `z`.
    pub fn next_variant(&self, source_id: &str) -> PlannerResult<String> {
        let base = base_id(source_id);
        ('a'..='z')
            .map(|letter| format!("{base}{letter}"))
            .find(|candidate| !self.existing.contains(candidate.as_str()))
            .ok_or_else(|| {
                PlannerError::validation(format!("All 26 variant ids of {base} are in use"))
                    .with_suggestion(format!("copy {source_id} to an explicit id"))
            })
    }

    /// One past the largest purely numeric id.
    pub fn next_numeric(&self) -> String {
        let max = self
            .existing
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    /// Next `N<n>` id for a scratch-built plan.
    pub fn next_invented(&self) -> String {
        let max = self
            .existing
            .iter()
            .filter_map(|id| id.strip_prefix('N'))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("N{}", max + 1)
    }
}

/// Parent chain from `id` up to its root, inclusive on both ends.
pub fn lineage(plans: &[MealPlan], id: &str) -> PlannerResult<Vec<String>> {
    let by_id: BTreeMap<&str, &MealPlan> = plans.iter().map(|p| (p.id.as_str(), p)).collect();
    let mut chain = Vec::new();
    let mut current = id;
    loop {
        let plan = by_id.get(current).ok_or_else(|| {
            PlannerError::validation(format!("Plan {current} not found while tracing lineage"))
        })?;
        if chain.iter().any(|seen| seen == current) {
            return Err(PlannerError::validation(format!(
                "Lineage of {id} loops at {current}"
            )));
        }
        chain.push(current.to_string());
        match plan.parent_id.as_deref() {
            Some(parent) => current = parent,
            None => return Ok(chain),
        }
    }
}
