use serde::Serialize;

use super::Locks;
use crate::models::GenerationState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub raw: usize,
    pub passed: usize,
    pub rejected: usize,
    pub scored: usize,
}

impl StageCounts {
    pub fn total(&self) -> usize {
        self.raw + self.passed + self.rejected + self.scored
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub session: Option<GenerationState>,
    pub counts: StageCounts,
    pub locks: Locks,
}

pub fn format_pipeline_status(status: &PipelineStatus) -> String {
    let counts = &status.counts;
    let session = match &status.session {
        Some(s) => {
            let template = s
                .template
                .as_deref()
                .map(|t| format!(" template {t}"))
                .unwrap_or_default();
            let progress = match s.total_space {
                Some(total) => format!(", cursor {}/{}", s.cursor, total),
                None => String::new(),
            };
            format!(
                "Session {} ({} {}{template}{progress}, {} batches)",
                s.session_id,
                s.method.as_str(),
                s.meal_type,
                s.batches
            )
        }
        None => "No active session".to_string(),
    };
    let mut line = format!(
        "{session}: {} candidates (raw {}, passed {}, rejected {}, scored {}).",
        counts.total(),
        counts.raw,
        counts.passed,
        counts.rejected,
        counts.scored
    );
    if !status.locks.is_empty() {
        line.push_str(&format!(
            " Locks: {} include, {} exclude.",
            status.locks.include.len(),
            status.locks.exclude.len()
        ));
    }
    line
}
