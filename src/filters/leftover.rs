use std::collections::BTreeMap;

use super::{CandidateFilter, FilterMode, FilterVerdict, Violation};
use crate::models::{format_mult, Candidate, Inventory, InventoryItem};

const MATCH_TOLERANCE: f64 = 0.001;

/// Candidates using a leftover must use exactly what is stored.
///
/// Over-use always rejects. Under-use rejects unless allowed, in which case
/// the wasted share is recorded as a warning. A reservation by an accepted
/// plan does not change the check.
pub struct LeftoverFilter {
    leftovers: BTreeMap<String, InventoryItem>,
    allow_under_use: bool,
}

impl LeftoverFilter {
    pub fn new(inventory: &Inventory, allow_under_use: bool) -> Self {
        Self {
            leftovers: inventory.leftovers.clone(),
            allow_under_use,
        }
    }
}

impl CandidateFilter for LeftoverFilter {
    fn name(&self) -> &str {
        "leftover"
    }

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict {
        let mut verdict = FilterVerdict::pass();
        for item in &candidate.meal.items {
            let code = item.key();
            let Some(stored) = self.leftovers.get(&code) else {
                continue;
            };
            let available = stored.multiplier;
            if (item.mult - available).abs() <= MATCH_TOLERANCE {
                continue;
            }
            if item.mult > available {
                let v = Violation::new(
                    "leftover",
                    format!(
                        "leftover_overuse: {code} needs {}x but only {}x available",
                        format_mult(item.mult),
                        format_mult(available)
                    ),
                );
                if verdict.reject(v, mode) {
                    return verdict;
                }
            } else if self.allow_under_use {
                let waste = if available > 0.0 {
                    (available - item.mult) / available * 100.0
                } else {
                    0.0
                };
                verdict.warnings.push(format!(
                    "leftover:{code} uses {}x of {}x ({waste:.1}% waste)",
                    format_mult(item.mult),
                    format_mult(available)
                ));
            } else {
                let v = Violation::new(
                    "leftover",
                    format!(
                        "leftover_mismatch: {code} uses {}x but {}x is stored",
                        format_mult(item.mult),
                        format_mult(available)
                    ),
                );
                if verdict.reject(v, mode) {
                    return verdict;
                }
            }
        }
        verdict
    }
}
