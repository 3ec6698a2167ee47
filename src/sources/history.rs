//! Read access to the historical food log.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::LogToken;
use crate::storage::{append_jsonl, read_jsonl};

/// One logged day, already parsed into time markers and items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayLog {
    pub date: NaiveDate,
    pub tokens: Vec<LogToken>,
}

pub trait HistoryLog {
    /// Days within `[start, end]`, oldest first.
    fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayLog>>;
}

/// JSONL log with one [`DayLog`] per line.
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, day: &DayLog) -> Result<()> {
        append_jsonl(&self.path, day)
    }
}

impl HistoryLog for HistoryFile {
    fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayLog>> {
        let days: Vec<DayLog> = read_jsonl(&self.path)?;
        Ok(select_range(days, start, end))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    days: Vec<DayLog>,
}

impl InMemoryHistory {
    pub fn new(days: Vec<DayLog>) -> Self {
        Self { days }
    }
}

impl HistoryLog for InMemoryHistory {
    fn entries_in_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DayLog>> {
        Ok(select_range(self.days.clone(), start, end))
    }
}

fn select_range(days: Vec<DayLog>, start: NaiveDate, end: NaiveDate) -> Vec<DayLog> {
    let mut selected: Vec<DayLog> = days
        .into_iter()
        .filter(|day| day.date >= start && day.date <= end)
        .collect();
    selected.sort_by_key(|day| day.date);
    selected
}
