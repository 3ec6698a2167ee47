use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Macro and micro nutrient amounts for one portion or a whole meal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    #[serde(default, alias = "cal")]
    pub calories: f64,
    #[serde(default, alias = "protein")]
    pub protein_g: f64,
    #[serde(default, alias = "carbs")]
    pub carbs_g: f64,
    #[serde(default, alias = "fat")]
    pub fat_g: f64,
    #[serde(default, alias = "sugar")]
    pub sugar_g: f64,
    #[serde(default, alias = "fiber")]
    pub fiber_g: f64,
    #[serde(default, alias = "gl")]
    pub glycemic_load: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub micros: BTreeMap<String, f64>,
}

/// Per-portion values as returned by a nutrient lookup.
pub type NutrientProfile = NutrientTotals;

impl NutrientTotals {
    pub fn add_scaled(&mut self, other: &NutrientTotals, mult: f64) {
        self.calories += other.calories * mult;
        self.protein_g += other.protein_g * mult;
        self.carbs_g += other.carbs_g * mult;
        self.fat_g += other.fat_g * mult;
        self.sugar_g += other.sugar_g * mult;
        self.fiber_g += other.fiber_g * mult;
        self.glycemic_load += other.glycemic_load * mult;
        for (name, value) in &other.micros {
            *self.micros.entry(name.clone()).or_insert(0.0) += value * mult;
        }
    }

    /// Reads a nutrient by its canonical or short name; unknown names fall through to micros.
    pub fn get(&self, nutrient: &str) -> Option<f64> {
        match canonical_nutrient(nutrient).as_str() {
            "calories" => Some(self.calories),
            "protein_g" => Some(self.protein_g),
            "carbs_g" => Some(self.carbs_g),
            "fat_g" => Some(self.fat_g),
            "sugar_g" => Some(self.sugar_g),
            "fiber_g" => Some(self.fiber_g),
            "glycemic_load" => Some(self.glycemic_load),
            other => self.micros.get(other).copied(),
        }
    }
}

pub fn canonical_nutrient(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "cal" | "kcal" | "calories" => "calories".into(),
        "protein" | "prot" | "protein_g" => "protein_g".into(),
        "carbs" | "carbs_g" => "carbs_g".into(),
        "fat" | "fat_g" => "fat_g".into(),
        "sugar" | "sugars" | "sugar_g" => "sugar_g".into(),
        "fiber" | "fibre" | "fiber_g" => "fiber_g".into(),
        "gl" | "glycemic_load" => "glycemic_load".into(),
        _ => lower,
    }
}
