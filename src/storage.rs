//! Whole-document JSON persistence and JSONL logs.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Result returned after writing a document.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub path: PathBuf,
    pub hash: String,
}

/// Loads a JSON document if it exists.
pub fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Option<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let data = fs::read(path).with_context(|| format!("Failed reading document {:?}", path))?;
    let value = serde_json::from_slice(&data)
        .with_context(|| format!("Failed parsing document {:?}", path))?;
    Ok(Some(value))
}

/// Writes a JSON document through a sibling temp file and rename, returning its hash.
pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<WriteOutcome> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed creating directory {:?}", parent))?;
    }
    let payload = serde_json::to_vec_pretty(value)
        .with_context(|| format!("Failed serializing document {:?}", path))?;
    let hash = compute_hash(&payload);
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed opening temp file {:?}", tmp))?;
        file.write_all(&payload)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("Failed replacing document {:?}", path))?;
    Ok(WriteOutcome {
        path: path.to_path_buf(),
        hash,
    })
}

/// Reads every non-empty line of a JSONL file.
pub fn read_jsonl<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data =
        fs::read_to_string(path).with_context(|| format!("Unable to read {:?}", path))?;
    let mut records = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse line {} of {:?}", idx + 1, path))?;
        records.push(record);
    }
    Ok(records)
}

pub fn append_jsonl<T: Serialize, P: AsRef<Path>>(path: P, record: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed opening log {:?}", path))?;
    file.write_all(serde_json::to_string(record)?.as_bytes())?;
    file.write_all(b"\n")?;
    Ok(())
}

/// Computes a lowercase hex SHA-256 hash of the provided bytes.
pub fn compute_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{:x}", digest)
}
