use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PlannerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryCategory {
    Leftovers,
    Batch,
    Rotating,
}

impl InventoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCategory::Leftovers => "leftovers",
            InventoryCategory::Batch => "batch",
            InventoryCategory::Rotating => "rotating",
        }
    }
}

impl fmt::Display for InventoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryCategory {
    type Err = PlannerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "leftover" | "leftovers" => Ok(InventoryCategory::Leftovers),
            "batch" => Ok(InventoryCategory::Batch),
            "rotating" => Ok(InventoryCategory::Rotating),
            _ => Err(
                PlannerError::validation(format!("Unknown inventory category '{raw}'"))
                    .with_suggestion("use leftovers, batch or rotating"),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RotatingStatus {
    #[default]
    Available,
    Depleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub multiplier: f64,
    pub added: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
    /// Rotating items only.
    #[serde(default)]
    pub status: RotatingStatus,
    #[serde(default)]
    pub depleted_date: Option<NaiveDate>,
    /// Leftovers promised to an accepted plan.
    #[serde(default)]
    pub reserved: bool,
    #[serde(default)]
    pub reserved_for: Option<String>,
    /// Batch items: number of accepted plans that drew on this batch.
    #[serde(default)]
    pub uses: u32,
}

impl InventoryItem {
    pub fn new(multiplier: f64, note: Option<String>) -> Self {
        Self {
            multiplier,
            added: Utc::now(),
            note,
            status: RotatingStatus::Available,
            depleted_date: None,
            reserved: false,
            reserved_for: None,
            uses: 0,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.status == RotatingStatus::Depleted
    }
}

/// Stock the planner may draw on: leftovers, batch-cooked items and rotating staples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub leftovers: BTreeMap<String, InventoryItem>,
    #[serde(default)]
    pub batch: BTreeMap<String, InventoryItem>,
    #[serde(default)]
    pub rotating: BTreeMap<String, InventoryItem>,
}

impl Inventory {
    pub fn section(&self, category: InventoryCategory) -> &BTreeMap<String, InventoryItem> {
        match category {
            InventoryCategory::Leftovers => &self.leftovers,
            InventoryCategory::Batch => &self.batch,
            InventoryCategory::Rotating => &self.rotating,
        }
    }

    pub fn section_mut(
        &mut self,
        category: InventoryCategory,
    ) -> &mut BTreeMap<String, InventoryItem> {
        match category {
            InventoryCategory::Leftovers => &mut self.leftovers,
            InventoryCategory::Batch => &mut self.batch,
            InventoryCategory::Rotating => &mut self.rotating,
        }
    }

    pub fn depleted_rotating(&self) -> impl Iterator<Item = &str> {
        self.rotating
            .iter()
            .filter(|(_, item)| item.is_depleted())
            .map(|(code, _)| code.as_str())
    }
}
