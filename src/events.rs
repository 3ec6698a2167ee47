//! Append-only activity log (`events.jsonl`) for state-changing operations.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::storage::{append_jsonl, read_jsonl};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    GenerationStarted,
    CandidatesGenerated,
    CandidatesFiltered,
    CandidatesScored,
    CandidateAccepted,
    StageDiscarded,
    PipelineReset,
    LocksChanged,
    PlanInvented,
    PlanCopied,
    PlanForked,
    PlanEdited,
    PlanDiscarded,
    InventoryChanged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}

impl ActivityEvent {
    pub fn new(event_type: EventType, details: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type,
            timestamp: Utc::now(),
            details,
        }
    }
}

pub struct ActivityLog {
    path: PathBuf,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, event: &ActivityEvent) -> Result<()> {
        append_jsonl(&self.path, event)
    }

    pub fn load_events(&self) -> Result<Vec<ActivityEvent>> {
        read_jsonl(&self.path)
    }

    pub fn load_events_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityEvent>> {
        Ok(self
            .load_events()?
            .into_iter()
            .filter(|event| event.timestamp >= since)
            .collect())
    }
}
