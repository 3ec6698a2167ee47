use super::{candidate_codes, CandidateFilter, FilterMode, FilterVerdict, Violation};
use crate::error::PlannerResult;
use crate::models::{Candidate, CodePattern};
use crate::sources::{ConditionalRule, PoolResolver};

struct ResolvedRequirement {
    name: String,
    triggers: Vec<CodePattern>,
    required: Vec<CodePattern>,
    min: usize,
    max: Option<usize>,
}

/// "If X is present, then between `min` and `max` codes from Y must be too."
pub struct ConditionalRequirementFilter {
    rules: Vec<ResolvedRequirement>,
}

impl ConditionalRequirementFilter {
    pub fn new(rules: &[ConditionalRule], resolver: &PoolResolver<'_>) -> PlannerResult<Self> {
        let mut resolved = Vec::new();
        for rule in rules {
            resolved.push(ResolvedRequirement {
                name: rule.name.clone(),
                triggers: resolver.group_patterns(&rule.if_present.entries())?,
                required: resolver.group_patterns(&rule.then_require.from.entries())?,
                min: rule.then_require.min,
                max: rule.then_require.max,
            });
        }
        Ok(Self { rules: resolved })
    }
}

impl CandidateFilter for ConditionalRequirementFilter {
    fn name(&self) -> &str {
        "conditional_requirement"
    }

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict {
        let codes = candidate_codes(candidate);
        let mut verdict = FilterVerdict::pass();
        for rule in &self.rules {
            let triggered = codes
                .iter()
                .any(|c| rule.triggers.iter().any(|p| p.matches(c)));
            if !triggered {
                continue;
            }
            let count = codes
                .iter()
                .filter(|c| rule.required.iter().any(|p| p.matches(c)))
                .count();
            let detail = if count < rule.min {
                Some(format!(
                    "{}: trigger present but only {count} required items found, need at least {}",
                    rule.name, rule.min
                ))
            } else {
                match rule.max {
                    Some(max) if count > max => Some(format!(
                        "{}: trigger present and {count} required items found, max allowed is {max}",
                        rule.name
                    )),
                    _ => None,
                }
            };
            if let Some(detail) = detail {
                if verdict.reject(Violation::new("conditional_requirement", detail), mode) {
                    break;
                }
            }
        }
        verdict
    }
}
