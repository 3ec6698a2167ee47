use super::{CandidateFilter, FilterMode, FilterVerdict, Violation};
use crate::candidates::Locks;
use crate::models::{format_mult, normalize_code, Candidate, CodePattern, Inventory};
use crate::sources::Preferences;

const MULT_TOLERANCE: f64 = 0.001;

/// Lock constraints plus anything the user has marked unavailable.
///
/// Exclude locks reject any matching item. Include locks require at least one
/// item to match some lock, honouring a lock's multiplier when it has one.
pub struct AvailabilityFilter {
    include: Vec<(String, CodePattern, Option<f64>)>,
    exclude: Vec<(String, CodePattern)>,
    not_recommended: Vec<CodePattern>,
    depleted: Vec<String>,
}

impl AvailabilityFilter {
    pub fn new(locks: &Locks, preferences: &Preferences, inventory: &Inventory) -> Self {
        let exclusions = &preferences.exclude_from_recommendations;
        let not_recommended = exclusions
            .patterns
            .iter()
            .map(|p| CodePattern::parse(p))
            .chain(
                exclusions
                    .items
                    .iter()
                    .map(|c| CodePattern::Exact(normalize_code(c))),
            )
            .collect();
        Self {
            include: locks
                .include
                .iter()
                .map(|(raw, mult)| (raw.clone(), CodePattern::parse(raw), *mult))
                .collect(),
            exclude: locks
                .exclude
                .iter()
                .map(|raw| (raw.clone(), CodePattern::parse(raw)))
                .collect(),
            not_recommended,
            depleted: inventory.depleted_rotating().map(normalize_code).collect(),
        }
    }
}

impl CandidateFilter for AvailabilityFilter {
    fn name(&self) -> &str {
        "availability"
    }

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict {
        let mut verdict = FilterVerdict::pass();
        let items = &candidate.meal.items;

        for item in items {
            let code = item.key();
            if let Some((raw, _)) = self.exclude.iter().find(|(_, p)| p.matches(&code)) {
                let v = Violation::new("lock", format!("{code} matches exclude lock {raw}"));
                if verdict.reject(v, mode) {
                    return verdict;
                }
            }
        }

        if !self.include.is_empty() {
            let satisfied = self.include.iter().any(|(_, pattern, mult)| {
                items.iter().any(|item| {
                    pattern.matches(&item.code)
                        && mult.map_or(true, |m| (item.mult - m).abs() <= MULT_TOLERANCE)
                })
            });
            if !satisfied {
                let wanted: Vec<String> = self
                    .include
                    .iter()
                    .map(|(raw, _, mult)| match mult {
                        Some(m) => format!("{raw}x{}", format_mult(*m)),
                        None => raw.clone(),
                    })
                    .collect();
                let v = Violation::new(
                    "lock",
                    format!("no item matches include locks [{}]", wanted.join(", ")),
                );
                if verdict.reject(v, mode) {
                    return verdict;
                }
            }
        }

        for item in items {
            let code = item.key();
            if self.not_recommended.iter().any(|p| p.matches(&code)) {
                let v = Violation::new(
                    "availability",
                    format!("{code} is excluded from recommendations"),
                );
                if verdict.reject(v, mode) {
                    return verdict;
                }
            }
            if self.depleted.contains(&code) {
                let v = Violation::new("availability", format!("{code} is depleted"));
                if verdict.reject(v, mode) {
                    return verdict;
                }
            }
        }
        verdict
    }
}
