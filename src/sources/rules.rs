//! Declarative planning rules: templates, pools, filter rules, scorer settings, preferences.
//!
//! Loaded from `rules.toml` and treated as a read-only snapshot for a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{PlannerError, PlannerResult};
use crate::models::{MealCategory, TemplateInfo};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBook {
    /// Named code pools; entries are codes, `PREFIX.` patterns or `@pool` references.
    #[serde(default)]
    pub pools: BTreeMap<String, Vec<String>>,
    /// Templates keyed by meal category, then template name.
    #[serde(default)]
    pub templates: BTreeMap<String, BTreeMap<String, MealTemplate>>,
    /// Filter rules keyed by meal category.
    #[serde(default)]
    pub rules: BTreeMap<String, CategoryRules>,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealTemplate {
    #[serde(default)]
    pub description: String,
    /// Nutrient name to target range.
    #[serde(default)]
    pub targets: BTreeMap<String, NutrientTarget>,
    #[serde(default)]
    pub components: Vec<TemplateComponent>,
    #[serde(default)]
    pub constraints: TemplateConstraints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    #[default]
    Hard,
    Soft,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientTarget {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// 1 is most important.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub enforcement: Enforcement,
    /// Soft bounds stretch to `max * tolerance` and `min / tolerance`.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl NutrientTarget {
    pub fn range(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min,
            max,
            priority: default_priority(),
            enforcement: Enforcement::Hard,
            tolerance: default_tolerance(),
        }
    }
}

const fn default_priority() -> u8 {
    2
}

const fn default_tolerance() -> f64 {
    1.1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateComponent {
    pub name: String,
    pub pool: String,
    #[serde(default)]
    pub count: ComponentCount,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl TemplateComponent {
    /// Lower bound on picks; a required component always contributes at least one code.
    pub fn min_count(&self) -> usize {
        if self.required {
            self.count.min.max(1)
        } else {
            self.count.min
        }
    }

    pub fn max_count(&self) -> usize {
        self.count.max
    }
}

impl MealTemplate {
    /// Rejects component counts that describe an empty or inverted range.
    pub fn validate(&self, name: &str) -> PlannerResult<()> {
        for component in &self.components {
            let count = component.count;
            let problem = if count.max < count.min {
                format!("count.max {} is below count.min {}", count.max, count.min)
            } else if component.required && count.max == 0 {
                "is required but count.max is 0".to_string()
            } else {
                continue;
            };
            return Err(PlannerError::config(format!(
                "Template '{name}': component '{}' {problem}",
                component.name
            ))
            .with_suggestion("fix the component count in rules.toml"));
        }
        Ok(())
    }
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCount {
    #[serde(default = "default_count")]
    pub min: usize,
    #[serde(default = "default_count")]
    pub max: usize,
}

impl Default for ComponentCount {
    fn default() -> Self {
        Self {
            min: default_count(),
            max: default_count(),
        }
    }
}

const fn default_count() -> usize {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConstraints {
    #[serde(default)]
    pub max_total_components: Option<usize>,
    /// Reject combinations using two variants of one base code (`SO.1a` with `SO.1b`).
    #[serde(default)]
    pub base_code_uniqueness: bool,
}

/// A rule group written as one entry or a list; entries are codes, patterns or `pool:` refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupSpec {
    One(String),
    Many(Vec<String>),
}

impl GroupSpec {
    pub fn entries(&self) -> Vec<String> {
        match self {
            GroupSpec::One(entry) => vec![entry.clone()],
            GroupSpec::Many(entries) => entries.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionPolicy {
    #[default]
    MaxOneGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutualExclusionRule {
    pub name: String,
    #[serde(default)]
    pub policy: ExclusionPolicy,
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub from: GroupSpec,
    #[serde(default = "default_count")]
    pub min: usize,
    #[serde(default)]
    pub max: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub name: String,
    pub if_present: GroupSpec,
    pub then_require: Requirement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRules {
    #[serde(default)]
    pub mutual_exclusions: Vec<MutualExclusionRule>,
    #[serde(default)]
    pub conditional_requirements: Vec<ConditionalRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Scorer name to aggregate weight. Unlisted scorers weigh 0.0.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub nutrient_gap: GapScorerSettings,
    #[serde(default)]
    pub preference: PreferenceScorerSettings,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            nutrient_gap: GapScorerSettings::default(),
            preference: PreferenceScorerSettings::default(),
        }
    }
}

fn default_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("nutrient_gap".to_string(), 1.0),
        ("preference".to_string(), 0.5),
    ])
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapScorerSettings {
    /// Priority (as a string key) to penalty multiplier.
    #[serde(default = "default_gap_penalty_weights")]
    pub gap_penalty_weights: BTreeMap<String, f64>,
    #[serde(default = "default_excess_penalty_weight")]
    pub excess_penalty_weight: f64,
    #[serde(default = "default_perfect_match_bonus")]
    pub perfect_match_bonus: f64,
    /// Fractional deviation ignored before a gap or excess is penalized.
    #[serde(default = "default_tolerance_pct")]
    pub tolerance_pct: f64,
}

impl Default for GapScorerSettings {
    fn default() -> Self {
        Self {
            gap_penalty_weights: default_gap_penalty_weights(),
            excess_penalty_weight: default_excess_penalty_weight(),
            perfect_match_bonus: default_perfect_match_bonus(),
            tolerance_pct: default_tolerance_pct(),
        }
    }
}

fn default_gap_penalty_weights() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("1".to_string(), 3.0),
        ("2".to_string(), 2.0),
        ("3".to_string(), 1.0),
    ])
}

const fn default_excess_penalty_weight() -> f64 {
    0.5
}

const fn default_perfect_match_bonus() -> f64 {
    0.1
}

const fn default_tolerance_pct() -> f64 {
    0.10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceScorerSettings {
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    #[serde(default = "default_frozen_bonus")]
    pub frozen_bonus: f64,
    #[serde(default = "default_staple_bonus")]
    pub staple_bonus: f64,
    #[serde(default = "default_unavailable_penalty")]
    pub unavailable_penalty: f64,
}

impl Default for PreferenceScorerSettings {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            frozen_bonus: default_frozen_bonus(),
            staple_bonus: default_staple_bonus(),
            unavailable_penalty: default_unavailable_penalty(),
        }
    }
}

const fn default_base_score() -> f64 {
    0.5
}

const fn default_frozen_bonus() -> f64 {
    0.05
}

const fn default_staple_bonus() -> f64 {
    0.03
}

const fn default_unavailable_penalty() -> f64 {
    0.5
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub staples: Vec<String>,
    #[serde(default)]
    pub frozen_portions: Vec<String>,
    #[serde(default)]
    pub unavailable: Vec<String>,
    #[serde(default)]
    pub exclude_from_recommendations: RecommendationExclusions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationExclusions {
    /// Prefixes such as `DN.`.
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
}

/// A template selected for a generation session.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTemplate {
    pub category: MealCategory,
    pub name: String,
    pub template: MealTemplate,
}

impl BoundTemplate {
    pub fn info(&self) -> TemplateInfo {
        TemplateInfo {
            category: self.category,
            name: self.name.clone(),
        }
    }
}

impl RuleBook {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "rule book missing; using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule book {:?}", path))?;
        Self::from_toml(&data).with_context(|| format!("Failed to parse rule book {:?}", path))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn templates_for(&self, category: MealCategory) -> Vec<(&str, &MealTemplate)> {
        self.templates
            .get(category.as_str())
            .map(|named| named.iter().map(|(n, t)| (n.as_str(), t)).collect())
            .unwrap_or_default()
    }

    pub fn get_template(&self, category: MealCategory, name: &str) -> Option<&MealTemplate> {
        self.templates.get(category.as_str())?.get(name)
    }

    /// Picks the template for a session without guessing.
    ///
    /// A named template must exist. Without a name, a category with exactly one
    /// template binds it, none binds nothing, and several is an error.
    pub fn resolve_template(
        &self,
        category: MealCategory,
        name: Option<&str>,
    ) -> PlannerResult<Option<BoundTemplate>> {
        let available = self.templates_for(category);
        if let Some(name) = name {
            let template = self.get_template(category, name).ok_or_else(|| {
                PlannerError::config(format!(
                    "No template named '{name}' for {category}"
                ))
                .with_suggestion(list_hint(&available))
            })?;
            return bind(category, name, template).map(Some);
        }
        match available.as_slice() {
            [] => Ok(None),
            [(name, template)] => bind(category, name, template).map(Some),
            _ => Err(PlannerError::config(format!(
                "{} templates exist for {category}; choose one",
                available.len()
            ))
            .with_suggestion(list_hint(&available))),
        }
    }

    pub fn filter_rules(&self, category: MealCategory) -> CategoryRules {
        self.rules
            .get(category.as_str())
            .cloned()
            .unwrap_or_default()
    }

    pub fn scorer_weights(&self) -> &BTreeMap<String, f64> {
        &self.scoring.weights
    }
}

fn bind(
    category: MealCategory,
    name: &str,
    template: &MealTemplate,
) -> PlannerResult<BoundTemplate> {
    template.validate(name)?;
    Ok(BoundTemplate {
        category,
        name: name.to_string(),
        template: template.clone(),
    })
}

fn list_hint(available: &[(&str, &MealTemplate)]) -> String {
    if available.is_empty() {
        return "add a template for this category to rules.toml".into();
    }
    let names: Vec<&str> = available.iter().map(|(n, _)| *n).collect();
    format!("pass one of: {}", names.join(", "))
}
