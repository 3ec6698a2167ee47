//! Persisted candidate list, generation session and recommendation locks.

pub mod status;

pub use status::{format_pipeline_status, PipelineStatus, StageCounts};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use crate::models::{
    normalize_code, Candidate, CandidateMeal, CodePattern, GenerationMetadata, GenerationState,
};
use crate::storage::{read_json, write_json, WriteOutcome};

const DOCUMENT_VERSION: u32 = 1;

/// Include/exclude constraints applied by the availability filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Locks {
    /// Code or pattern to an optional required multiplier.
    #[serde(default)]
    pub include: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Locks {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    pub fn include(&mut self, code: &str, mult: Option<f64>) {
        self.include.insert(normalize_code(code), mult);
    }

    pub fn exclude(&mut self, code: &str) {
        let code = normalize_code(code);
        if !self.exclude.contains(&code) {
            self.exclude.push(code);
        }
    }

    /// Removes the code from both lists; returns whether anything was removed.
    pub fn unlock(&mut self, code: &str) -> bool {
        let code = normalize_code(code);
        let before = self.exclude.len();
        self.exclude.retain(|c| *c != code);
        self.include.remove(&code).is_some() || self.exclude.len() != before
    }

    pub fn include_patterns(&self) -> Vec<(CodePattern, Option<f64>)> {
        self.include
            .iter()
            .map(|(code, mult)| (CodePattern::parse(code), *mult))
            .collect()
    }

    pub fn exclude_patterns(&self) -> Vec<CodePattern> {
        self.exclude.iter().map(|c| CodePattern::parse(c)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub session: Option<GenerationState>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default = "default_next_id")]
    pub next_id: u64,
    #[serde(default)]
    pub locks: Locks,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

fn default_next_id() -> u64 {
    1
}

impl Default for CandidateDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            session: None,
            candidates: Vec::new(),
            next_id: default_next_id(),
            locks: Locks::default(),
        }
    }
}

impl CandidateDocument {
    /// Appends a raw candidate under the next sequential id.
    pub fn push(
        &mut self,
        prefix: &str,
        meal: CandidateMeal,
        metadata: GenerationMetadata,
    ) -> &Candidate {
        let id = format!("{prefix}{}", self.next_id);
        self.next_id += 1;
        self.candidates.push(Candidate::new(id, meal, metadata));
        &self.candidates[self.candidates.len() - 1]
    }

    pub fn find(&self, id: &str) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id.trim()))
    }

    pub fn composition_keys(&self) -> HashSet<String> {
        self.candidates
            .iter()
            .map(|c| c.generation_metadata.composition_key.clone())
            .collect()
    }

    pub fn counts(&self) -> StageCounts {
        let mut counts = StageCounts::default();
        for candidate in &self.candidates {
            match candidate.stage_name() {
                "raw" => counts.raw += 1,
                "passed" => counts.passed += 1,
                "rejected" => counts.rejected += 1,
                _ => counts.scored += 1,
            }
        }
        counts
    }

    /// Scored candidates, best first. Ties keep generation order.
    pub fn ranked(&self) -> Vec<&Candidate> {
        let mut scored: Vec<&Candidate> = self
            .candidates
            .iter()
            .filter(|c| c.score_result().is_some())
            .collect();
        scored.sort_by(|a, b| {
            let a = a.aggregate_score().unwrap_or(0.0);
            let b = b.aggregate_score().unwrap_or(0.0);
            b.total_cmp(&a)
        });
        scored
    }
}

/// Whole-document store at `candidates.json`.
pub struct CandidateStore {
    path: PathBuf,
}

impl CandidateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<CandidateDocument> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    pub fn save(&self, document: &CandidateDocument) -> Result<WriteOutcome> {
        write_json(&self.path, document)
    }
}
