use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::debug;

use super::{ClauseRecord, ClauseSource, ClauseStore};

/// Loads analyzed clause records from a JSON file written by the analysis engine.
///
/// Accepts either a bare array of records or an object with a `clauses` array.
pub struct FileClauseSource {
    path: PathBuf,
    cache: OnceCell<ClauseStore>,
}

impl FileClauseSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn read_store(&self) -> Result<ClauseStore> {
        let raw = fs::read_to_string(&self.path).with_context(|| {
            format!("failed to read clause records at {}", self.path.display())
        })?;
        let document: StoreDocument = serde_json::from_str(&raw).with_context(|| {
            format!(
                "invalid JSON structure in clause records at {}",
                self.path.display()
            )
        })?;
        let records = match document {
            StoreDocument::Bare(records) => records,
            StoreDocument::Wrapped { clauses } => clauses,
        };
        debug!(count = records.len(), path = %self.path.display(), "loaded clause records");
        let store = ClauseStore::new(records)
            .with_context(|| format!("invalid clause records in {}", self.path.display()))?;
        Ok(store)
    }
}

#[async_trait::async_trait]
impl ClauseSource for FileClauseSource {
    async fn load_store(&self) -> Result<ClauseStore> {
        let store = self.cache.get_or_try_init(|| self.read_store())?;
        Ok(store.clone())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoreDocument {
    Bare(Vec<ClauseRecord>),
    Wrapped { clauses: Vec<ClauseRecord> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clauses::RiskLevel;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_bare_array_in_order() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clauses.json");
        write(
            &path,
            r#"
[
    {"clause_id": "C2", "clause": "Second", "risk_level": "Low"},
    {"clause_id": "C1", "clause": "First", "risk_level": "High", "regulation": "GDPR"}
]
"#,
        );

        let source = FileClauseSource::new(&path);
        let store = futures::executor::block_on(ClauseSource::load_store(&source)).unwrap();
        let ids: Vec<_> = store.iter().map(|r| r.clause_id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C1"]);
        assert_eq!(store.records()[1].risk_level, RiskLevel::High);
    }

    #[test]
    fn loads_wrapped_document() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("analysis.json");
        write(
            &path,
            r#"{"clauses": [{"clause_id": 1, "clause": "Only", "risk_level": "Medium"}]}"#,
        );
        let source = FileClauseSource::new(&path);
        let record = futures::executor::block_on(source.get_clause("1"))
            .unwrap()
            .expect("clause 1 should exist");
        assert_eq!(record.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn empty_array_is_a_valid_store() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clauses.json");
        write(&path, "[]");
        let source = FileClauseSource::new(&path);
        let store = futures::executor::block_on(source.load_store()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_risk_level_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clauses.json");
        write(
            &path,
            r#"[{"clause_id": "C1", "clause": "x", "risk_level": "critical"}]"#,
        );
        let source = FileClauseSource::new(&path);
        let err = futures::executor::block_on(source.load_store()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON structure"));
    }

    #[test]
    fn duplicate_ids_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clauses.json");
        write(
            &path,
            r#"[
                {"clause_id": "DUP", "clause": "a", "risk_level": "Low"},
                {"clause_id": "DUP", "clause": "b", "risk_level": "Low"}
            ]"#,
        );
        let source = FileClauseSource::new(&path);
        let err = futures::executor::block_on(source.load_store()).unwrap_err();
        assert!(format!("{err:#}").contains("clause id `DUP` appears more than once"));
    }

    #[test]
    fn missing_file_reports_path() {
        let source = FileClauseSource::new("/definitely/not/here.json");
        let err = futures::executor::block_on(source.load_store()).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
