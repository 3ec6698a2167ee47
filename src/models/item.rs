use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::storage::compute_hash;

/// One food code with a portion multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealItem {
    pub code: String,
    #[serde(default = "default_mult")]
    pub mult: f64,
}

fn default_mult() -> f64 {
    1.0
}

impl MealItem {
    pub fn new(code: impl AsRef<str>, mult: f64) -> Self {
        Self {
            code: normalize_code(code.as_ref()),
            mult,
        }
    }

    pub fn key(&self) -> String {
        normalize_code(&self.code)
    }
}

/// Portions must be finite and strictly positive; NaN never qualifies.
pub fn valid_mult(mult: f64) -> bool {
    mult.is_finite() && mult > 0.0
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Renders a multiplier without float noise: `2` rather than `2.0000000001`.
pub fn format_mult(mult: f64) -> String {
    let rounded = (mult * 1000.0).round() / 1000.0;
    format!("{}", rounded)
}

/// One entry of a parsed day log: either a time marker or a food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogToken {
    Time {
        time: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meal_override: Option<String>,
    },
    Food(MealItem),
}

impl LogToken {
    pub fn time(time: impl Into<String>) -> Self {
        LogToken::Time {
            time: time.into(),
            meal_override: None,
        }
    }

    pub fn food(code: impl AsRef<str>, mult: f64) -> Self {
        LogToken::Food(MealItem::new(code, mult))
    }

    /// Parses the marker's clock time; accepts `HH:MM` and `H:MM`.
    pub fn parsed_time(&self) -> Option<NaiveTime> {
        match self {
            LogToken::Time { time, .. } => NaiveTime::parse_from_str(time.trim(), "%H:%M").ok(),
            LogToken::Food(_) => None,
        }
    }
}

/// Fingerprint of a meal's composition, independent of item order.
///
/// Codes are uppercased and multipliers rounded to two decimals before hashing,
/// so `[A×1, B×0.5]` and `[b×0.501, a×1.0]` collide.
pub fn composition_key(items: &[MealItem]) -> String {
    let mut parts: Vec<String> = items
        .iter()
        .map(|item| format!("{}:{:.2}", item.key(), item.mult))
        .collect();
    parts.sort();
    compute_hash(parts.join("|").as_bytes())
}

/// Code selector used by locks, pools, rule groups and preferences.
///
/// `XX.` and `XX.*` match every code starting with `XX.`; anything else is exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodePattern {
    Exact(String),
    Prefix(String),
}

impl CodePattern {
    pub fn parse(raw: &str) -> Self {
        let code = normalize_code(raw);
        if let Some(prefix) = code.strip_suffix(".*") {
            CodePattern::Prefix(format!("{prefix}."))
        } else if code.ends_with('.') {
            CodePattern::Prefix(code)
        } else {
            CodePattern::Exact(code)
        }
    }

    pub fn matches(&self, code: &str) -> bool {
        let code = normalize_code(code);
        match self {
            CodePattern::Exact(exact) => *exact == code,
            CodePattern::Prefix(prefix) => code.starts_with(prefix.as_str()),
        }
    }
}
