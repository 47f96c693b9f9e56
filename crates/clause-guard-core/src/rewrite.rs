use serde::{Deserialize, Serialize};

use crate::clauses::{ClauseRecord, ClauseStore, RiskLevel};

/// Maximum number of characters of a clause summary shown in the results table.
pub const COMMENT_WIDTH: usize = 50;

/// One clause flagged for remediation, projected to the rewrite table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRow {
    #[serde(rename = "Clause ID")]
    pub clause_id: String,
    #[serde(rename = "Original Clause")]
    pub original_clause: String,
    #[serde(rename = "AI-Modified Clause")]
    pub ai_modified_clause: String,
    #[serde(rename = "New Risk Level")]
    pub new_risk_level: Option<RiskLevel>,
}

impl From<&ClauseRecord> for RewriteRow {
    fn from(record: &ClauseRecord) -> Self {
        Self {
            clause_id: record.clause_id.clone(),
            original_clause: record.clause.clone(),
            ai_modified_clause: record.ai_modified_clause.clone().unwrap_or_default(),
            new_risk_level: record.ai_modified_risk_level,
        }
    }
}

/// Clauses at High or Medium risk, in store order. May be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteSelection {
    rows: Vec<RewriteRow>,
}

impl RewriteSelection {
    pub fn rows(&self) -> &[RewriteRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Filter the store down to clauses needing a rewrite.
///
/// An empty result is a valid outcome ("no high-risk clauses to rewrite"),
/// including for an empty store.
pub fn select_rewrites(store: &ClauseStore) -> RewriteSelection {
    let rows = store
        .iter()
        .filter(|record| record.risk_level.needs_rewrite())
        .map(RewriteRow::from)
        .collect();
    RewriteSelection { rows }
}

/// Row of the per-clause results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Clause ID")]
    pub clause_id: String,
    #[serde(rename = "Risk Level")]
    pub risk_level: RiskLevel,
    #[serde(rename = "Compliant", with = "compliance_mark")]
    pub compliant: bool,
    #[serde(rename = "Comments")]
    pub comments: String,
}

impl ResultRow {
    pub fn compliant_mark(&self) -> &'static str {
        compliance_mark::symbol(self.compliant)
    }
}

/// `Compliant` is exchanged as the ✓/✗ mark shown in the results table.
mod compliance_mark {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const YES: &str = "✓";
    const NO: &str = "✗";

    pub fn symbol(compliant: bool) -> &'static str {
        if compliant {
            YES
        } else {
            NO
        }
    }

    pub fn serialize<S: Serializer>(compliant: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(symbol(*compliant))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let mark = String::deserialize(deserializer)?;
        match mark.as_str() {
            YES => Ok(true),
            NO => Ok(false),
            other => Err(D::Error::custom(format!(
                "expected `{YES}` or `{NO}`, got `{other}`"
            ))),
        }
    }
}

impl From<&ClauseRecord> for ResultRow {
    fn from(record: &ClauseRecord) -> Self {
        Self {
            clause_id: record.clause_id.clone(),
            risk_level: record.risk_level,
            compliant: record.risk_level == RiskLevel::Low,
            comments: truncate_comment(&record.summary),
        }
    }
}

pub fn results_table(store: &ClauseStore) -> Vec<ResultRow> {
    store.iter().map(ResultRow::from).collect()
}

/// Keep the first [`COMMENT_WIDTH`] characters, appending `...` when cut.
pub fn truncate_comment(text: &str) -> String {
    match text.char_indices().nth(COMMENT_WIDTH) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
