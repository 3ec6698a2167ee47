use super::{candidate_codes, CandidateFilter, FilterMode, FilterVerdict, Violation};
use crate::error::PlannerResult;
use crate::models::{Candidate, CodePattern};
use crate::sources::{MutualExclusionRule, PoolResolver};

struct ResolvedExclusion {
    name: String,
    groups: Vec<Vec<CodePattern>>,
}

/// Rejects candidates mixing codes from two or more groups of one rule.
pub struct MutualExclusionFilter {
    rules: Vec<ResolvedExclusion>,
}

impl MutualExclusionFilter {
    pub fn new(rules: &[MutualExclusionRule], resolver: &PoolResolver<'_>) -> PlannerResult<Self> {
        let mut resolved = Vec::new();
        for rule in rules {
            let mut groups = Vec::new();
            for group in &rule.groups {
                groups.push(resolver.group_patterns(&group.entries())?);
            }
            resolved.push(ResolvedExclusion {
                name: rule.name.clone(),
                groups,
            });
        }
        Ok(Self { rules: resolved })
    }
}

impl CandidateFilter for MutualExclusionFilter {
    fn name(&self) -> &str {
        "mutual_exclusion"
    }

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict {
        let codes = candidate_codes(candidate);
        let mut verdict = FilterVerdict::pass();
        for rule in &self.rules {
            let present: Vec<usize> = rule
                .groups
                .iter()
                .enumerate()
                .filter(|(_, group)| codes.iter().any(|c| group.iter().any(|p| p.matches(c))))
                .map(|(idx, _)| idx + 1)
                .collect();
            if present.len() > 1 {
                let detail = format!(
                    "{}: items from {} groups present (groups {:?}), max allowed is 1",
                    rule.name,
                    present.len(),
                    present
                );
                if verdict.reject(Violation::new("mutual_exclusion", detail), mode) {
                    break;
                }
            }
        }
        verdict
    }
}
