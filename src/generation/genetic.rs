//! Evolutionary search over the union of a template's component pools.
//!
//! A member is a set of distinct codes at unit portions. Fitness rewards
//! nutrient totals near the middle of each template target; bred offspring
//! and immigrants must also clear the category's structural filters before
//! they join the population.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet, VecDeque};

use super::{build_meal, GeneratedBatch, GenerationInput, Generator};
use crate::error::{PlannerError, PlannerResult};
use crate::filters::{default_chain, FilterChain};
use crate::inventory::InventoryStore;
use crate::models::{
    canonical_nutrient, Candidate, GenerationMethod, MealCategory, MealItem, NutrientTotals,
};
use crate::sources::{BoundTemplate, Enforcement, PoolResolver};
use crate::workspace::{GeneticSettings, PlannerContext};

/// Identities remembered after they leave the population.
const HISTORY_LIMIT: usize = 1000;
const SEED_ATTEMPTS_PER_SLOT: usize = 10;

pub struct GeneticGenerator;

impl Generator for GeneticGenerator {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::Genetic
    }

    fn generate(
        &self,
        ctx: &PlannerContext,
        input: &GenerationInput<'_>,
    ) -> PlannerResult<GeneratedBatch> {
        let template = input.template.ok_or_else(|| {
            PlannerError::config(format!(
                "Genetic generation needs a template for {}",
                input.meal_type
            ))
            .with_suggestion("add a template with targets and components to rules.toml")
        })?;
        let settings = &ctx.config.genetic;
        settings.validate()?;
        let fitness = FitnessModel::from_template(template, &settings.scoring_weights)?;

        let mut warnings = Vec::new();
        let pool = gene_pool(ctx, template, &mut warnings)?;
        if pool.len() < settings.min_genome_size {
            return Err(PlannerError::config(format!(
                "Template '{}' pools hold {} codes but genomes need at least {}",
                template.name,
                pool.len(),
                settings.min_genome_size
            ))
            .with_suggestion("widen the component pools or lower genetic.min_genome_size"));
        }

        // Nutrient ranges are left to fitness so offspring can climb toward them.
        let inventory = InventoryStore::new(ctx.paths.inventory_file.clone()).load()?;
        let chain = default_chain(ctx, input.meal_type, None, input.locks, &inventory)?;

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(input.cursor)),
            None => StdRng::from_entropy(),
        };
        let mut evolution = Evolution {
            ctx,
            meal_type: input.meal_type,
            template,
            settings,
            fitness,
            chain,
            pool,
            population: Population::default(),
            stats: EpochStats::default(),
        };

        let seeded = evolution.seed(&mut rng);
        if seeded < settings.population_size {
            warnings.push(format!(
                "genetic population seeded {seeded} of {} members",
                settings.population_size
            ));
        }
        for epoch in 1..=settings.epochs {
            let stats = evolution.run_epoch(epoch, &mut rng);
            tracing::debug!(
                epoch,
                bred = stats.bred,
                immigrants = stats.immigrants,
                filtered = stats.filtered,
                duplicates = stats.duplicates,
                graduated = stats.graduated,
                culled = stats.culled,
                best = evolution.population.best_fitness(),
                "genetic epoch"
            );
        }

        let mut batch = GeneratedBatch {
            warnings,
            next_cursor: input.cursor + 1,
            ..GeneratedBatch::default()
        };
        for (rank, member) in evolution.population.ranked().into_iter().enumerate() {
            if batch.meals.len() >= input.limit {
                break;
            }
            let mut generated = build_meal(
                ctx,
                GenerationMethod::Genetic,
                input.meal_type,
                member.items(),
                Some(template),
            );
            if input
                .existing_keys
                .contains(&generated.metadata.composition_key)
            {
                continue;
            }
            generated.meal.description = format!("{} genetic #{}", template.name, rank + 1);
            generated.metadata.fitness = Some(member.fitness);
            batch.meals.push(generated);
        }
        tracing::info!(
            template = %template.name,
            run = input.cursor,
            produced = batch.meals.len(),
            "genetic run finished"
        );
        Ok(batch)
    }
}

/// Every code any component may draw from, in pool order without repeats.
fn gene_pool(
    ctx: &PlannerContext,
    template: &BoundTemplate,
    warnings: &mut Vec<String>,
) -> PlannerResult<Vec<String>> {
    if template.template.components.is_empty() {
        return Err(PlannerError::config(format!(
            "Template '{}' has no components to draw genes from",
            template.name
        )));
    }
    let resolver = PoolResolver::new(&ctx.rules.pools, ctx.catalog().known_codes());
    let mut seen = HashSet::new();
    let mut pool = Vec::new();
    for component in &template.template.components {
        let resolved = resolver.resolve(&component.pool)?;
        if !resolved.unknown.is_empty() {
            warnings.push(format!(
                "pool '{}' dropped unknown entries: {}",
                component.pool,
                resolved.unknown.join(", ")
            ));
        }
        for code in resolved.codes {
            if seen.insert(code.clone()) {
                pool.push(code);
            }
        }
    }
    Ok(pool)
}

#[derive(Debug, Clone, PartialEq)]
struct FitnessTarget {
    nutrient: String,
    min: Option<f64>,
    max: Option<f64>,
    weight: f64,
}

impl FitnessTarget {
    /// 1.0 at the ideal point, falling linearly with distance; may go negative.
    fn raw(&self, value: f64) -> f64 {
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                let half = (max - min) / 2.0;
                let mid = (max + min) / 2.0;
                if half <= 0.0 {
                    if (value - mid).abs() < 1e-3 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    1.0 - (value - mid).abs() / half
                }
            }
            (None, Some(max)) if max > 0.0 => 1.0 - value / max,
            (Some(min), None) if value >= min => 1.0,
            (Some(min), None) if min > 0.0 => 1.0 - (min - value) / min,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct FitnessModel {
    targets: Vec<FitnessTarget>,
}

impl FitnessModel {
    fn from_template(
        template: &BoundTemplate,
        weights: &BTreeMap<String, f64>,
    ) -> PlannerResult<Self> {
        let weights: BTreeMap<String, f64> = weights
            .iter()
            .map(|(name, weight)| (canonical_nutrient(name), *weight))
            .collect();
        let targets: Vec<FitnessTarget> = template
            .template
            .targets
            .iter()
            .filter(|(_, target)| target.enforcement != Enforcement::Ignore)
            .filter(|(_, target)| target.min.is_some() || target.max.is_some())
            .map(|(name, target)| {
                let nutrient = canonical_nutrient(name);
                FitnessTarget {
                    weight: weights.get(&nutrient).copied().unwrap_or(1.0),
                    nutrient,
                    min: target.min,
                    max: target.max,
                }
            })
            .collect();
        if targets.is_empty() {
            return Err(PlannerError::config(format!(
                "Template '{}' has no nutrient targets to score fitness against",
                template.name
            ))
            .with_suggestion("add at least one bounded target to the template"));
        }
        Ok(Self { targets })
    }

    fn score(&self, totals: &NutrientTotals) -> f64 {
        self.targets
            .iter()
            .map(|t| t.raw(totals.get(&t.nutrient).unwrap_or(0.0)) * t.weight)
            .sum()
    }
}

#[derive(Debug, Clone)]
struct Member {
    /// Sorted and distinct.
    codes: Vec<String>,
    fitness: f64,
    birth_epoch: u32,
}

impl Member {
    fn items(&self) -> Vec<MealItem> {
        self.codes.iter().map(|code| MealItem::new(code, 1.0)).collect()
    }
}

fn identity(codes: &[String]) -> String {
    codes.join(",")
}

fn genome(mut codes: Vec<String>) -> Vec<String> {
    codes.sort();
    codes.dedup();
    codes
}

/// Best first; shorter genomes win ties.
fn by_rank(a: &Member, b: &Member) -> Ordering {
    b.fitness
        .total_cmp(&a.fitness)
        .then_with(|| a.codes.len().cmp(&b.codes.len()))
}

#[derive(Default)]
struct Population {
    general: Vec<Member>,
    immigrants: Vec<Member>,
    live: HashSet<String>,
    history: VecDeque<String>,
    history_set: HashSet<String>,
}

impl Population {
    fn is_known(&self, id: &str) -> bool {
        self.live.contains(id) || self.history_set.contains(id)
    }

    fn remember(&mut self, id: String) {
        if !self.history_set.insert(id.clone()) {
            return;
        }
        self.history.push_back(id);
        if self.history.len() > HISTORY_LIMIT {
            if let Some(old) = self.history.pop_front() {
                self.history_set.remove(&old);
            }
        }
    }

    fn admit(&mut self, member: Member, immigrant: bool) {
        let id = identity(&member.codes);
        self.live.insert(id.clone());
        self.remember(id);
        if immigrant {
            self.immigrants.push(member);
        } else {
            self.general.push(member);
        }
    }

    /// Ranks the general population and drops the tail beyond `size`.
    fn cull(&mut self, size: usize) -> usize {
        self.general.sort_by(by_rank);
        if self.general.len() <= size {
            return 0;
        }
        let dropped: Vec<Member> = self.general.drain(size..).collect();
        for member in &dropped {
            self.live.remove(&identity(&member.codes));
        }
        dropped.len()
    }

    /// Moves immigrants that served their tenure into the general population.
    fn graduate(&mut self, epoch: u32, tenure: u32) -> usize {
        let (ready, waiting): (Vec<Member>, Vec<Member>) = self
            .immigrants
            .drain(..)
            .partition(|m| epoch.saturating_sub(m.birth_epoch) >= tenure);
        self.immigrants = waiting;
        let graduated = ready.len();
        self.general.extend(ready);
        graduated
    }

    fn ranked(&self) -> Vec<&Member> {
        let mut all: Vec<&Member> = self.general.iter().chain(&self.immigrants).collect();
        all.sort_by(|a, b| by_rank(a, b));
        all
    }

    fn best_fitness(&self) -> f64 {
        self.ranked().first().map_or(0.0, |m| m.fitness)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct EpochStats {
    bred: usize,
    immigrants: usize,
    filtered: usize,
    duplicates: usize,
    graduated: usize,
    culled: usize,
}

struct Evolution<'a> {
    ctx: &'a PlannerContext,
    meal_type: MealCategory,
    template: &'a BoundTemplate,
    settings: &'a GeneticSettings,
    fitness: FitnessModel,
    chain: FilterChain,
    pool: Vec<String>,
    population: Population,
    stats: EpochStats,
}

impl Evolution<'_> {
    /// Fills the general population with random members; returns its size.
    fn seed(&mut self, rng: &mut StdRng) -> usize {
        let target = self.settings.population_size;
        let mut attempts = 0;
        while self.population.general.len() < target && attempts < target * SEED_ATTEMPTS_PER_SLOT
        {
            attempts += 1;
            let codes = random_genome(&self.pool, self.settings, rng);
            self.try_admit(codes, 0, false, false);
        }
        self.population.cull(target);
        self.population.general.len()
    }

    fn run_epoch(&mut self, epoch: u32, rng: &mut StdRng) -> EpochStats {
        self.stats = EpochStats::default();
        self.stats.graduated = self
            .population
            .graduate(epoch, self.settings.immigrant_tenure_epochs);

        let capacity = self.settings.max_immigrants();
        for _ in 0..self.settings.immigrants_per_epoch() {
            if self.population.immigrants.len() >= capacity {
                break;
            }
            let codes = random_genome(&self.pool, self.settings, rng);
            if self.try_admit(codes, epoch, true, true) {
                self.stats.immigrants += 1;
            }
        }

        for _ in 0..self.settings.offspring_per_epoch {
            let children = if rng.gen_bool(self.settings.random_rate) {
                vec![random_genome(&self.pool, self.settings, rng)]
            } else {
                self.breed(rng)
            };
            for codes in children {
                if self.try_admit(codes, epoch, false, true) {
                    self.stats.bred += 1;
                }
            }
        }
        self.stats.culled = self.population.cull(self.settings.population_size);
        self.stats
    }

    fn breed(&self, rng: &mut StdRng) -> Vec<Vec<String>> {
        let ranked = self.population.ranked();
        let Some((a, b)) = select_pair(&ranked, self.settings.selection_pressure, rng) else {
            return Vec::new();
        };
        let operators = self.settings.crossover_rate + self.settings.mutation_rate;
        if operators <= 0.0 || rng.gen::<f64>() < self.settings.crossover_rate / operators {
            crossover(&a.codes, &b.codes, self.settings, rng)
        } else {
            let parent = if rng.gen_bool(0.5) { a } else { b };
            mutate(&parent.codes, &self.pool, rng).into_iter().collect()
        }
    }

    /// Scores a genome and adds it unless it is out of bounds, already seen or filtered out.
    fn try_admit(&mut self, codes: Vec<String>, epoch: u32, immigrant: bool, screen: bool) -> bool {
        let codes = genome(codes);
        if !self.settings.fits(codes.len()) {
            return false;
        }
        let id = identity(&codes);
        if self.population.is_known(&id) {
            self.stats.duplicates += 1;
            return false;
        }
        let items = codes.iter().map(|code| MealItem::new(code, 1.0)).collect();
        let generated = build_meal(
            self.ctx,
            GenerationMethod::Genetic,
            self.meal_type,
            items,
            Some(self.template),
        );
        if screen {
            let candidate = Candidate::new(String::new(), generated.meal.clone(), generated.metadata);
            if !self.chain.evaluate(&candidate).passed {
                self.stats.filtered += 1;
                self.population.remember(id);
                return false;
            }
        }
        let fitness = self.fitness.score(&generated.meal.totals);
        self.population.admit(
            Member {
                codes,
                fitness,
                birth_epoch: epoch,
            },
            immigrant,
        );
        true
    }
}

fn random_genome(pool: &[String], settings: &GeneticSettings, rng: &mut StdRng) -> Vec<String> {
    let max = settings.max_genome_size.min(pool.len());
    let size = rng.gen_range(settings.min_genome_size.min(max)..=max);
    genome(pool.choose_multiple(rng, size).cloned().collect())
}

/// Rank roulette: member `i` of `n` weighs `(n - i)^pressure`. Returns two distinct members.
fn select_pair<'m>(
    ranked: &[&'m Member],
    pressure: f64,
    rng: &mut StdRng,
) -> Option<(&'m Member, &'m Member)> {
    if ranked.len() < 2 {
        return None;
    }
    let n = ranked.len();
    let weights: Vec<(usize, f64)> = (0..n).map(|i| (i, ((n - i) as f64).powf(pressure))).collect();
    let first = weights.choose_weighted(rng, |(_, w)| *w).ok()?.0;
    let rest: Vec<(usize, f64)> = weights.iter().copied().filter(|(i, _)| *i != first).collect();
    let second = rest.choose_weighted(rng, |(_, w)| *w).ok()?.0;
    Some((ranked[first], ranked[second]))
}

/// One-point crossover, or two-point when both parents carry at least four genes.
/// Children outside the genome size bounds are dropped.
fn crossover(
    a: &[String],
    b: &[String],
    settings: &GeneticSettings,
    rng: &mut StdRng,
) -> Vec<Vec<String>> {
    if a.len() < 2 || b.len() < 2 {
        return Vec::new();
    }
    let (left, right) = if a.len() >= 4 && b.len() >= 4 && rng.gen_bool(0.5) {
        let (a1, a2) = two_cuts(a.len(), rng);
        let (b1, b2) = two_cuts(b.len(), rng);
        (
            [&a[..a1], &b[b1..b2], &a[a2..]].concat(),
            [&b[..b1], &a[a1..a2], &b[b2..]].concat(),
        )
    } else {
        let ca = rng.gen_range(1..a.len());
        let cb = rng.gen_range(1..b.len());
        ([&a[..ca], &b[cb..]].concat(), [&b[..cb], &a[ca..]].concat())
    };
    [left, right]
        .into_iter()
        .map(genome)
        .filter(|child| settings.fits(child.len()))
        .collect()
}

fn two_cuts(len: usize, rng: &mut StdRng) -> (usize, usize) {
    let positions: Vec<usize> = (1..len).collect();
    let mut cuts: Vec<usize> = positions.choose_multiple(rng, 2).copied().collect();
    cuts.sort_unstable();
    match cuts.as_slice() {
        [first, second] => (*first, *second),
        _ => (1, len - 1),
    }
}

/// Swaps one gene for a pool code the genome does not already carry.
fn mutate(codes: &[String], pool: &[String], rng: &mut StdRng) -> Option<Vec<String>> {
    if codes.is_empty() {
        return None;
    }
    let replacements: Vec<&String> = pool.iter().filter(|code| !codes.contains(code)).collect();
    let replacement = replacements.choose(rng)?;
    let mut next = codes.to_vec();
    next[rng.gen_range(0..codes.len())] = (*replacement).clone();
    Some(genome(next))
}
