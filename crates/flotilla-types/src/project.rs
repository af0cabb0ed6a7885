//! Per-project reconciliation state

use crate::snapshot::SourceRevision;
use serde::{Deserialize, Serialize};

/// State a project coordinator carries between passes.
///
/// Mutated only by the coordinator, and only after a pass fully succeeded;
/// a partial pass leaves it untouched so the whole pass is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Project name
    pub project: String,

    /// Configuration-repository commit hash at the last fully absorbed
    /// reconciliation; `None` before the first successful pass
    pub last_observed_source_commit: Option<SourceRevision>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProjectState {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            last_observed_source_commit: None,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Whether `tip` is a revision this project has not absorbed yet
    pub fn revision_advanced(&self, tip: &SourceRevision) -> bool {
        self.last_observed_source_commit.as_ref() != Some(tip)
    }
}
