//! Resolution of component pools and rule groups into concrete codes.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PlannerError, PlannerResult};
use crate::models::{normalize_code, CodePattern};

const MAX_REFERENCE_DEPTH: usize = 10;

/// Resolved pool contents plus the entries that could not be matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPool {
    pub codes: Vec<String>,
    pub unknown: Vec<String>,
}

/// Expands pool definitions against the catalog's known codes.
pub struct PoolResolver<'a> {
    pools: &'a BTreeMap<String, Vec<String>>,
    known: BTreeSet<String>,
}

impl<'a> PoolResolver<'a> {
    pub fn new(pools: &'a BTreeMap<String, Vec<String>>, known_codes: Vec<String>) -> Self {
        Self {
            pools,
            known: known_codes.iter().map(|c| normalize_code(c)).collect(),
        }
    }

    /// Resolves `@pool` references transitively, expands `PREFIX.` patterns and
    /// drops codes the catalog does not know. Order of first appearance is kept.
    pub fn resolve(&self, pool_name: &str) -> PlannerResult<ResolvedPool> {
        let mut entries = Vec::new();
        self.flatten(pool_name, &mut Vec::new(), &mut entries)?;

        let mut seen = BTreeSet::new();
        let mut resolved = ResolvedPool::default();
        for entry in entries {
            match CodePattern::parse(&entry) {
                CodePattern::Prefix(prefix) => {
                    let matches: Vec<&String> =
                        self.known.iter().filter(|c| c.starts_with(&prefix)).collect();
                    if matches.is_empty() {
                        resolved.unknown.push(entry);
                    }
                    for code in matches {
                        if seen.insert(code.clone()) {
                            resolved.codes.push(code.clone());
                        }
                    }
                }
                CodePattern::Exact(code) => {
                    if !self.known.contains(&code) {
                        resolved.unknown.push(code);
                    } else if seen.insert(code.clone()) {
                        resolved.codes.push(code);
                    }
                }
            }
        }
        if !resolved.unknown.is_empty() {
            tracing::warn!(
                pool = pool_name,
                unknown = ?resolved.unknown,
                "pool entries not found in catalog were dropped"
            );
        }
        Ok(resolved)
    }

    fn flatten(
        &self,
        pool_name: &str,
        stack: &mut Vec<String>,
        out: &mut Vec<String>,
    ) -> PlannerResult<()> {
        if stack.iter().any(|p| p == pool_name) {
            return Err(PlannerError::config(format!(
                "Pool reference cycle: {} -> {pool_name}",
                stack.join(" -> ")
            )));
        }
        if stack.len() >= MAX_REFERENCE_DEPTH {
            return Err(PlannerError::config(format!(
                "Pool '{pool_name}' nests more than {MAX_REFERENCE_DEPTH} references deep"
            )));
        }
        let entries = self.pools.get(pool_name).ok_or_else(|| {
            PlannerError::config(format!("Pool '{pool_name}' is not defined"))
                .with_suggestion("add it under [pools] in rules.toml")
        })?;
        stack.push(pool_name.to_string());
        for entry in entries {
            match pool_reference(entry) {
                Some(nested) => self.flatten(nested, stack, out)?,
                None => out.push(entry.clone()),
            }
        }
        stack.pop();
        Ok(())
    }

    /// Turns rule group entries into matchers; `pool:` and `@` entries expand to the pool's codes.
    pub fn group_patterns(&self, entries: &[String]) -> PlannerResult<Vec<CodePattern>> {
        let mut patterns = Vec::new();
        for entry in entries {
            match pool_reference(entry) {
                Some(pool) => {
                    let resolved = self.resolve(pool)?;
                    patterns.extend(resolved.codes.into_iter().map(CodePattern::Exact));
                }
                None => patterns.push(CodePattern::parse(entry)),
            }
        }
        Ok(patterns)
    }
}

fn pool_reference(entry: &str) -> Option<&str> {
    let entry = entry.trim();
    entry
        .strip_prefix('@')
        .or_else(|| entry.strip_prefix("pool:"))
        .map(str::trim)
}
