use std::collections::{BTreeMap, HashSet};

use super::{build_meal, GeneratedBatch, GenerationInput, Generator};
use crate::error::{PlannerError, PlannerResult};
use crate::models::{GenerationMethod, MealItem};
use crate::sources::{BoundTemplate, PoolResolver, TemplateConstraints};
use crate::workspace::PlannerContext;

/// Enumerates every combination a template's component pools allow.
pub struct ExhaustiveGenerator;

impl Generator for ExhaustiveGenerator {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::Exhaustive
    }

    fn generate(
        &self,
        ctx: &PlannerContext,
        input: &GenerationInput<'_>,
    ) -> PlannerResult<GeneratedBatch> {
        let template = input.template.ok_or_else(|| {
            PlannerError::config(format!(
                "Exhaustive generation needs a template for {}",
                input.meal_type
            ))
            .with_suggestion("add a template with components to rules.toml")
        })?;
        let space = CombinationSpace::build(ctx, template)?;
        let total = space.total();

        let mut batch = GeneratedBatch {
            total_space: Some(total),
            warnings: space.warnings.clone(),
            ..GeneratedBatch::default()
        };
        let mut seen_keys: HashSet<String> = input.existing_keys.clone();
        let mut index = input.cursor;
        while index < total && batch.meals.len() < input.limit {
            let picks = space.picks_at(index);
            index += 1;
            let Some((items, summary)) = space.assemble(&picks) else {
                continue;
            };
            let mut generated = build_meal(
                ctx,
                GenerationMethod::Exhaustive,
                input.meal_type,
                items,
                Some(template),
            );
            if !seen_keys.insert(generated.metadata.composition_key.clone()) {
                continue;
            }
            generated.meal.description = format!("{} #{}", template.name, index);
            generated.metadata.component_summary = summary;
            batch.meals.push(generated);
        }
        batch.next_cursor = index;
        tracing::debug!(
            template = %template.name,
            from = input.cursor,
            to = index,
            total,
            produced = batch.meals.len(),
            "exhaustive batch"
        );
        Ok(batch)
    }
}

struct ComponentOptions {
    name: String,
    multiplier: f64,
    /// Every allowed pick for this component, each a set of distinct codes.
    options: Vec<Vec<String>>,
}

/// Mixed-radix view over the cartesian product of component picks.
///
/// Index `i` always maps to the same combination, so a cursor is just a count.
pub struct CombinationSpace {
    components: Vec<ComponentOptions>,
    constraints: TemplateConstraints,
    pub warnings: Vec<String>,
}

impl CombinationSpace {
    pub fn build(ctx: &PlannerContext, template: &BoundTemplate) -> PlannerResult<Self> {
        if template.template.components.is_empty() {
            return Err(PlannerError::config(format!(
                "Template '{}' has no components to combine",
                template.name
            )));
        }
        let resolver = PoolResolver::new(&ctx.rules.pools, ctx.catalog().known_codes());
        let mut warnings = Vec::new();
        let mut components = Vec::new();
        for component in &template.template.components {
            let resolved = resolver.resolve(&component.pool)?;
            if !resolved.unknown.is_empty() {
                warnings.push(format!(
                    "pool '{}' dropped unknown entries: {}",
                    component.pool,
                    resolved.unknown.join(", ")
                ));
            }
            let mut options = Vec::new();
            for k in component.min_count()..=component.max_count() {
                options.extend(combinations(&resolved.codes, k));
            }
            components.push(ComponentOptions {
                name: component.name.clone(),
                multiplier: component.multiplier,
                options,
            });
        }
        Ok(Self {
            components,
            constraints: template.template.constraints.clone(),
            warnings,
        })
    }

    /// Size of the unconstrained product; constraints may reject some indices.
    pub fn total(&self) -> u64 {
        self.components
            .iter()
            .map(|c| c.options.len() as u64)
            .fold(1u64, |acc, n| acc.saturating_mul(n))
    }

    fn picks_at(&self, mut index: u64) -> Vec<usize> {
        let mut picks = vec![0; self.components.len()];
        for (slot, component) in self.components.iter().enumerate().rev() {
            let radix = component.options.len() as u64;
            picks[slot] = (index % radix) as usize;
            index /= radix;
        }
        picks
    }

    fn assemble(&self, picks: &[usize]) -> Option<(Vec<MealItem>, BTreeMap<String, Vec<String>>)> {
        let mut items = Vec::new();
        let mut summary = BTreeMap::new();
        let mut codes = HashSet::new();
        let mut bases = HashSet::new();
        for (component, &pick) in self.components.iter().zip(picks) {
            let chosen = &component.options[pick];
            for code in chosen {
                if !codes.insert(code.clone()) {
                    return None;
                }
                if self.constraints.base_code_uniqueness && !bases.insert(base_code(code)) {
                    return None;
                }
                items.push(MealItem::new(code, component.multiplier));
            }
            if !chosen.is_empty() {
                summary.insert(component.name.clone(), chosen.clone());
            }
        }
        if let Some(max) = self.constraints.max_total_components {
            if items.len() > max {
                return None;
            }
        }
        if items.is_empty() {
            return None;
        }
        Some((items, summary))
    }
}

/// `SO.1a` and `SO.1b` share base `SO.1`; codes without a dot are their own base.
pub fn base_code(code: &str) -> String {
    if code.contains('.') && code.ends_with(|c: char| c.is_ascii_alphabetic()) {
        code[..code.len() - 1].to_string()
    } else {
        code.to_string()
    }
}

/// All `k`-element subsets of `pool`, in lexicographic index order.
pub fn combinations(pool: &[String], k: usize) -> Vec<Vec<String>> {
    if k > pool.len() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut idx: Vec<usize> = (0..k).collect();
    loop {
        out.push(idx.iter().map(|&i| pool[i].clone()).collect());
        let mut pos = k;
        loop {
            if pos == 0 {
                return out;
            }
            pos -= 1;
            if idx[pos] != pos + pool.len() - k {
                break;
            }
            if pos == 0 {
                return out;
            }
        }
        idx[pos] += 1;
        for next in pos + 1..k {
            idx[next] = idx[next - 1] + 1;
        }
    }
}
