//! Read-only case catalogue. Cases are authored elsewhere and dropped into
//! the cases directory as one JSON file each.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Case;

#[derive(Error, Debug)]
pub enum CaseError {
    #[error("Cannot read cases from {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed case file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Case lookup used by the orchestrator.
pub trait CaseProvider: Send + Sync {
    fn get_case(&self, case_id: &str) -> Option<Case>;
}

/// Unknown ids resolve to a placeholder rather than failing the caller.
pub fn case_or_placeholder(provider: &dyn CaseProvider, case_id: &str) -> Case {
    provider.get_case(case_id).unwrap_or_else(|| {
        tracing::warn!(case_id, "Case not found, using placeholder");
        Case::placeholder(case_id)
    })
}

/// Cases held in memory, keyed by `case_id`.
#[derive(Debug, Default, Clone)]
pub struct JsonCaseLibrary {
    cases: HashMap<String, Case>,
}

impl JsonCaseLibrary {
    pub fn from_cases(cases: impl IntoIterator<Item = Case>) -> Self {
        Self {
            cases: cases.into_iter().map(|c| (c.case_id.clone(), c)).collect(),
        }
    }

    /// Loads every `*.json` file in `dir`. A missing directory gives an empty
    /// library; unreadable or malformed files are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, CaseError> {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "Cases directory missing, library is empty");
            return Ok(Self::default());
        }

        let entries = fs::read_dir(dir).map_err(|source| CaseError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut cases = HashMap::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match load_case_file(&path) {
                Ok(case) => {
                    cases.insert(case.case_id.clone(), case);
                }
                Err(e) => tracing::warn!(error = %e, "Skipping case file"),
            }
        }

        tracing::info!(count = cases.len(), dir = %dir.display(), "Cases loaded");
        Ok(Self { cases })
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Sorted case ids.
    pub fn case_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.cases.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// A file without a `case_id` takes its file stem as id.
fn load_case_file(path: &Path) -> Result<Case, CaseError> {
    let text = fs::read_to_string(path).map_err(|source| CaseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut case: Case = serde_json::from_str(&text).map_err(|source| CaseError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if case.case_id.is_empty() {
        case.case_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
    }
    Ok(case)
}

impl CaseProvider for JsonCaseLibrary {
    fn get_case(&self, case_id: &str) -> Option<Case> {
        self.cases.get(case_id).cloned()
    }
}
