use std::fmt;

use crate::error::{invalid, PlannerResult};
use crate::models::{format_mult, valid_mult, MealItem, MealPlan};

/// A structural change to a plan's item list. Positions are zero-based.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEdit {
    Add { items: Vec<MealItem> },
    Insert { index: usize, items: Vec<MealItem> },
    Remove { index: usize },
    Move { from: usize, to: usize },
    SetMultiplier { index: usize, mult: f64 },
}

impl PlanEdit {
    pub fn command(&self) -> &'static str {
        match self {
            PlanEdit::Add { .. } => "add",
            PlanEdit::Insert { .. } => "insert",
            PlanEdit::Remove { .. } => "remove",
            PlanEdit::Move { .. } => "move",
            PlanEdit::SetMultiplier { .. } => "set_multiplier",
        }
    }

    /// Applies the edit to the item list and returns a log line describing it.
    pub(crate) fn apply(&self, plan: &mut MealPlan) -> PlannerResult<String> {
        let len = plan.items.len();
        match self {
            PlanEdit::Add { items } => {
                if items.is_empty() {
                    invalid!("Nothing to add to plan {}", plan.id);
                }
                check_items(items)?;
                plan.items.extend(items.iter().cloned());
                Ok(format!("added {}", describe(items)))
            }
            PlanEdit::Insert { index, items } => {
                if items.is_empty() {
                    invalid!("Nothing to insert into plan {}", plan.id);
                }
                if *index > len {
                    invalid!("Insert position {index} is past the end of plan {} ({len} items)", plan.id);
                }
                check_items(items)?;
                for (offset, item) in items.iter().enumerate() {
                    plan.items.insert(index + offset, item.clone());
                }
                Ok(format!("inserted {} at {index}", describe(items)))
            }
            PlanEdit::Remove { index } => {
                check_index(plan, *index)?;
                let removed = plan.items.remove(*index);
                Ok(format!("removed {}", describe(std::slice::from_ref(&removed))))
            }
            PlanEdit::Move { from, to } => {
                check_index(plan, *from)?;
                check_index(plan, *to)?;
                let item = plan.items.remove(*from);
                plan.items.insert(*to, item.clone());
                Ok(format!("moved {} from {from} to {to}", item.code))
            }
            PlanEdit::SetMultiplier { index, mult } => {
                check_index(plan, *index)?;
                if !valid_mult(*mult) {
                    invalid!("Multiplier must be positive, got {mult}");
                }
                let item = &mut plan.items[*index];
                let before = item.mult;
                item.mult = *mult;
                Ok(format!(
                    "{} multiplier {} -> {}",
                    item.code,
                    format_mult(before),
                    format_mult(*mult)
                ))
            }
        }
    }
}

impl fmt::Display for PlanEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

fn check_index(plan: &MealPlan, index: usize) -> PlannerResult<()> {
    if index >= plan.items.len() {
        invalid!(
            "Position {index} is out of range for plan {} ({} items)",
            plan.id,
            plan.items.len()
        );
    }
    Ok(())
}

fn check_items(items: &[MealItem]) -> PlannerResult<()> {
    if let Some(bad) = items.iter().find(|i| !valid_mult(i.mult)) {
        invalid!("Multiplier for {} must be positive, got {}", bad.code, bad.mult);
    }
    Ok(())
}

fn describe(items: &[MealItem]) -> String {
    items
        .iter()
        .map(|i| format!("{}x{}", i.code, format_mult(i.mult)))
        .collect::<Vec<_>>()
        .join(", ")
}
