//! Food master data: per-code nutrients and combo expansions.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::{normalize_code, MealItem, NutrientProfile, NutrientTotals};

/// Read-only nutrient source consulted by generators, the workspace and acceptance.
pub trait NutrientLookup {
    fn lookup(&self, code: &str) -> Option<NutrientProfile>;

    fn known_codes(&self) -> Vec<String>;

    /// Constituents of a combo code, each with its per-portion multiplier.
    fn combo_expansion(&self, code: &str) -> Option<Vec<MealItem>>;

    fn is_composite(&self, code: &str) -> bool {
        self.combo_expansion(code).is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nutrients: NutrientTotals,
    /// Non-empty for combo codes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expansion: Vec<MealItem>,
}

/// JSON-backed catalog: `{"foods": {"EG.1": {"name": ..., "nutrients": {...}}}}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FoodCatalog {
    #[serde(default)]
    foods: BTreeMap<String, FoodEntry>,
}

impl FoodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "food catalog missing; using an empty catalog");
            return Ok(Self::default());
        }
        let data = fs::read(path).with_context(|| format!("Failed reading catalog {:?}", path))?;
        let raw: FoodCatalog = serde_json::from_slice(&data)
            .with_context(|| format!("Failed parsing catalog {:?}", path))?;
        let mut catalog = FoodCatalog::new();
        for (code, entry) in raw.foods {
            catalog.insert(&code, entry);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, code: &str, mut entry: FoodEntry) {
        for item in &mut entry.expansion {
            item.code = normalize_code(&item.code);
        }
        self.foods.insert(normalize_code(code), entry);
    }

    pub fn with_food(mut self, code: &str, name: &str, nutrients: NutrientTotals) -> Self {
        self.insert(
            code,
            FoodEntry {
                name: name.into(),
                nutrients,
                expansion: Vec::new(),
            },
        );
        self
    }

    pub fn with_combo(mut self, code: &str, name: &str, expansion: Vec<MealItem>) -> Self {
        self.insert(
            code,
            FoodEntry {
                name: name.into(),
                nutrients: NutrientTotals::default(),
                expansion,
            },
        );
        self
    }

    pub fn name_of(&self, code: &str) -> Option<&str> {
        self.foods.get(&normalize_code(code)).map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

impl NutrientLookup for FoodCatalog {
    fn lookup(&self, code: &str) -> Option<NutrientProfile> {
        let entry = self.foods.get(&normalize_code(code))?;
        if entry.expansion.is_empty() {
            return Some(entry.nutrients.clone());
        }
        // Combos resolve one level deep.
        let mut totals = NutrientTotals::default();
        for part in &entry.expansion {
            if let Some(food) = self.foods.get(&part.code) {
                totals.add_scaled(&food.nutrients, part.mult);
            }
        }
        Some(totals)
    }

    fn known_codes(&self) -> Vec<String> {
        self.foods.keys().cloned().collect()
    }

    fn combo_expansion(&self, code: &str) -> Option<Vec<MealItem>> {
        self.foods
            .get(&normalize_code(code))
            .filter(|entry| !entry.expansion.is_empty())
            .map(|entry| entry.expansion.clone())
    }
}
