use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PlannerError;

/// Canonical meal slots of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealCategory {
    Breakfast,
    MorningSnack,
    Lunch,
    AfternoonSnack,
    Dinner,
    EveningSnack,
}

impl MealCategory {
    pub const ALL: [MealCategory; 6] = [
        MealCategory::Breakfast,
        MealCategory::MorningSnack,
        MealCategory::Lunch,
        MealCategory::AfternoonSnack,
        MealCategory::Dinner,
        MealCategory::EveningSnack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealCategory::Breakfast => "breakfast",
            MealCategory::MorningSnack => "morning_snack",
            MealCategory::Lunch => "lunch",
            MealCategory::AfternoonSnack => "afternoon_snack",
            MealCategory::Dinner => "dinner",
            MealCategory::EveningSnack => "evening_snack",
        }
    }

    /// Maps a clock time onto its meal slot.
    pub fn from_time(time: NaiveTime) -> Self {
        let minutes = time.hour() * 60 + time.minute();
        match minutes {
            300..=629 => MealCategory::Breakfast,
            630..=719 => MealCategory::MorningSnack,
            720..=869 => MealCategory::Lunch,
            870..=1019 => MealCategory::AfternoonSnack,
            1020..=1199 => MealCategory::Dinner,
            _ => MealCategory::EveningSnack,
        }
    }
}

impl fmt::Display for MealCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealCategory {
    type Err = PlannerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase().replace([' ', '-'], "_");
        MealCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = MealCategory::ALL.iter().map(|c| c.as_str()).collect();
                PlannerError::validation(format!("Unknown meal category '{raw}'"))
                    .with_suggestion(format!("use one of: {}", valid.join(", ")))
            })
    }
}
