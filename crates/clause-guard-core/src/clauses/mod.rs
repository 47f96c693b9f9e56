use std::{
    collections::{hash_map::DefaultHasher, HashSet},
    fmt,
    hash::{Hash, Hasher},
};

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod file_source;

/// Risk tier assigned to a clause by the upstream analysis engine.
///
/// Serialized with the exact, case-sensitive labels `Low`, `Medium` and `High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// All tiers in display order (highest first).
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Whether clauses at this tier are flagged for an AI rewrite.
    pub fn needs_rewrite(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Medium)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis result for a single contract clause, as produced upstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClauseRecord {
    /// Identifier, unique within one analysis session.
    #[serde(deserialize_with = "clause_id_from_any")]
    pub clause_id: String,
    /// Original clause text.
    pub clause: String,
    /// Free-text label of the implicated regulation(s), e.g. `GDPR, HIPAA`.
    #[serde(default)]
    pub regulation: String,
    pub risk_level: RiskLevel,
    /// Explanation of the finding.
    #[serde(default)]
    pub summary: String,
    /// Free-text tag/category string.
    #[serde(default)]
    pub key_clauses: String,
    #[serde(
        rename = "AI-Modified Clause",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_modified_clause: Option<String>,
    #[serde(
        rename = "AI-Modified Risk Level",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ai_modified_risk_level: Option<RiskLevel>,
}

// Upstream emits ids either as strings or as bare integers.
fn clause_id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Raised by every derived component when there is nothing to analyze.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Nothing to analyze: load an analyzed contract first.")]
pub struct EmptyInput;

/// Errors emitted while validating the records handed over by upstream.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClauseValidationError {
    #[error("clause at position {index} has a blank clause_id")]
    BlankId { index: usize },
    #[error("clause id `{clause_id}` appears more than once")]
    DuplicateId { clause_id: String },
}

/// Frequency of each risk tier across a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskDistribution {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ClauseRecord>) -> Self {
        let mut distribution = Self::default();
        for record in records {
            match record.risk_level {
                RiskLevel::High => distribution.high += 1,
                RiskLevel::Medium => distribution.medium += 1,
                RiskLevel::Low => distribution.low += 1,
            }
        }
        distribution
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    /// Percentage of clauses not flagged High-risk (`100 - high/total*100`).
    ///
    /// Returns `None` for an empty distribution.
    pub fn compliance_rate(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        Some(100.0 - (self.high as f64 / total as f64 * 100.0))
    }
}

/// Read-only snapshot of the clause records for one analysis session.
///
/// Order is significant: it defines row order in every table and report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClauseStore {
    records: Vec<ClauseRecord>,
}

impl ClauseStore {
    /// Build a store, checking that every `clause_id` is present and unique.
    pub fn new(records: Vec<ClauseRecord>) -> Result<Self, ClauseValidationError> {
        let mut seen = HashSet::new();
        for (index, record) in records.iter().enumerate() {
            if record.clause_id.trim().is_empty() {
                return Err(ClauseValidationError::BlankId { index });
            }
            if !seen.insert(record.clause_id.as_str()) {
                return Err(ClauseValidationError::DuplicateId {
                    clause_id: record.clause_id.clone(),
                });
            }
        }
        Ok(Self { records })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ClauseRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClauseRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Short-circuit helper for consumers that cannot operate on an empty store.
    pub fn require_non_empty(&self) -> Result<&Self, EmptyInput> {
        if self.records.is_empty() {
            Err(EmptyInput)
        } else {
            Ok(self)
        }
    }

    pub fn distribution(&self) -> RiskDistribution {
        RiskDistribution::from_records(&self.records)
    }

    /// Content hash of the snapshot, stable within a process.
    ///
    /// Derived entities are pure functions of the store, so this is the only
    /// cache key they need.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.records.hash(&mut hasher);
        hasher.finish()
    }
}

impl<'a> IntoIterator for &'a ClauseStore {
    type Item = &'a ClauseRecord;
    type IntoIter = std::slice::Iter<'a, ClauseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Upstream collaborator that hands over analyzed clause records.
#[async_trait]
pub trait ClauseSource: Send + Sync {
    /// Load the full store for the current analysis.
    async fn load_store(&self) -> AnyResult<ClauseStore>;

    /// Fetch a single record by identifier if it exists.
    async fn get_clause(&self, clause_id: &str) -> AnyResult<Option<ClauseRecord>> {
        let store = self.load_store().await?;
        Ok(store
            .iter()
            .find(|record| record.clause_id == clause_id)
            .cloned())
    }
}
