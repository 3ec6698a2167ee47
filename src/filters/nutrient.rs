use std::collections::BTreeMap;

use super::{CandidateFilter, FilterMode, FilterVerdict, Violation};
use crate::models::Candidate;
use crate::sources::{BoundTemplate, Enforcement, NutrientTarget};

/// Rejects candidates whose totals fall outside the bound template's targets.
///
/// Hard bounds reject anything outside `[min, max]`. Soft bounds only reject
/// beyond `min / tolerance` or `max * tolerance`; inside that band the miss is a warning.
pub struct NutrientRangeFilter {
    targets: BTreeMap<String, NutrientTarget>,
}

impl NutrientRangeFilter {
    pub fn new(template: &BoundTemplate) -> Self {
        Self {
            targets: template.template.targets.clone(),
        }
    }

    pub fn from_targets(targets: BTreeMap<String, NutrientTarget>) -> Self {
        Self { targets }
    }
}

impl CandidateFilter for NutrientRangeFilter {
    fn name(&self) -> &str {
        "nutrient"
    }

    fn check(&self, candidate: &Candidate, mode: FilterMode) -> FilterVerdict {
        let mut verdict = FilterVerdict::pass();
        let totals = &candidate.meal.totals;
        for (nutrient, target) in &self.targets {
            if target.enforcement == Enforcement::Ignore {
                continue;
            }
            let value = totals.get(nutrient).unwrap_or(0.0);
            let soft = target.enforcement == Enforcement::Soft;
            let tolerance = if target.tolerance > 0.0 {
                target.tolerance
            } else {
                1.0
            };

            if let Some(min) = target.min {
                if value < min {
                    let floor = min / tolerance;
                    if !soft {
                        let v = Violation::new("nutrient", format!("{nutrient}<{min:.1}(hard)"));
                        if verdict.reject(v, mode) {
                            return verdict;
                        }
                    } else if value < floor {
                        let v = Violation::new(
                            "nutrient",
                            format!("{nutrient}<{floor:.1}(soft_limit)"),
                        );
                        if verdict.reject(v, mode) {
                            return verdict;
                        }
                    } else {
                        verdict.warnings.push(format!(
                            "nutrient:{nutrient} {value:.1} below soft min {min:.1}"
                        ));
                    }
                }
            }

            if let Some(max) = target.max {
                if value > max {
                    let ceiling = max * tolerance;
                    if !soft {
                        let v = Violation::new("nutrient", format!("{nutrient}>{max:.1}(hard)"));
                        if verdict.reject(v, mode) {
                            return verdict;
                        }
                    } else if value > ceiling {
                        let v = Violation::new(
                            "nutrient",
                            format!("{nutrient}>{ceiling:.1}(soft_limit)"),
                        );
                        if verdict.reject(v, mode) {
                            return verdict;
                        }
                    } else {
                        verdict.warnings.push(format!(
                            "nutrient:{nutrient} {value:.1} above soft max {max:.1}"
                        ));
                    }
                }
            }
        }
        verdict
    }
}
