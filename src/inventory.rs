//! Leftover, batch and rotating stock, persisted at `inventory.json`.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{invalid, PlannerError, PlannerResult};
use crate::events::EventType;
use crate::models::{
    normalize_code, valid_mult, Inventory, InventoryCategory, InventoryItem, RotatingStatus,
};
use crate::storage::{read_json, write_json, WriteOutcome};
use crate::workspace::PlannerContext;

pub struct InventoryStore {
    path: PathBuf,
}

impl InventoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<Inventory> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, inventory: &Inventory) -> Result<WriteOutcome> {
        write_json(&self.path, inventory)
    }
}

/// Inventory commands. Acceptance updates the same document for its side effects.
pub struct InventoryManager<'a> {
    ctx: &'a PlannerContext,
    store: InventoryStore,
}

impl<'a> InventoryManager<'a> {
    pub fn new(ctx: &'a PlannerContext) -> Self {
        Self {
            ctx,
            store: InventoryStore::new(ctx.paths.inventory_file.clone()),
        }
    }

    pub fn snapshot(&self) -> PlannerResult<Inventory> {
        Ok(self.store.load()?)
    }

    pub fn get(&self, category: InventoryCategory) -> PlannerResult<BTreeMap<String, InventoryItem>> {
        Ok(self.store.load()?.section(category).clone())
    }

    /// Adds or replaces an item; a rotating item keeps its availability status.
    pub fn add(
        &self,
        category: InventoryCategory,
        code: &str,
        multiplier: f64,
        note: Option<String>,
    ) -> PlannerResult<InventoryItem> {
        if !valid_mult(multiplier) {
            invalid!("Multiplier for {code} must be positive, got {multiplier}");
        }
        let code = normalize_code(code);
        let mut inventory = self.store.load()?;
        let section = inventory.section_mut(category);
        let mut item = InventoryItem::new(multiplier, note);
        if let Some(existing) = section.get(&code) {
            if category == InventoryCategory::Rotating {
                item.status = existing.status;
                item.depleted_date = existing.depleted_date;
            }
        }
        section.insert(code.clone(), item.clone());
        self.store.save(&inventory)?;
        self.ctx.log_event(
            EventType::InventoryChanged,
            json!({ "action": "add", "category": category, "code": code, "multiplier": multiplier }),
        )?;
        Ok(item)
    }

    pub fn remove(&self, category: InventoryCategory, code: &str) -> PlannerResult<InventoryItem> {
        let code = normalize_code(code);
        let mut inventory = self.store.load()?;
        let Some(removed) = inventory.section_mut(category).remove(&code) else {
            invalid!("{code} is not in {category}");
        };
        self.store.save(&inventory)?;
        self.ctx.log_event(
            EventType::InventoryChanged,
            json!({ "action": "remove", "category": category, "code": code }),
        )?;
        Ok(removed)
    }

    pub fn deplete(&self, code: &str) -> PlannerResult<InventoryItem> {
        self.set_rotating_status(code, RotatingStatus::Depleted)
    }

    pub fn restore(&self, code: &str) -> PlannerResult<InventoryItem> {
        self.set_rotating_status(code, RotatingStatus::Available)
    }

    fn set_rotating_status(&self, code: &str, status: RotatingStatus) -> PlannerResult<InventoryItem> {
        let code = normalize_code(code);
        let mut inventory = self.store.load()?;
        let Some(item) = inventory.rotating.get_mut(&code) else {
            return Err(PlannerError::validation(format!(
                "{code} is not a rotating item"
            ))
            .with_suggestion(format!("add it first: inventory add rotating {code}")));
        };
        item.status = status;
        item.depleted_date = match status {
            RotatingStatus::Depleted => Some(Utc::now().date_naive()),
            RotatingStatus::Available => None,
        };
        let updated = item.clone();
        self.store.save(&inventory)?;
        self.ctx.log_event(
            EventType::InventoryChanged,
            json!({ "action": "status", "code": code, "status": status }),
        )?;
        Ok(updated)
    }
}
