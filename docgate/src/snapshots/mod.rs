//! Iteration snapshots for audit and debugging
//!
//! Layout under the base directory:
//!
//! ```text
//! <base>/<package>/<YYYYMMDD_HHMMSS>/
//!   000_structure_iter1.md
//!   000_structure_iter1_meta.json
//!   001_structure_iter2.md
//!   ...
//!   final.md
//!   audit_report.md
//!   summary.json
//! ```
//!
//! Every failure is a [`PersistenceError`]; callers log it and carry on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PersistenceError, PersistenceResult};
use crate::model::{ValidationResult, ValidationStage};
use crate::session::RefinementSession;

/// Where and whether to write snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub enabled: bool,
    pub base_dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dir: PathBuf::from(".docgate/snapshots"),
        }
    }
}

/// Metadata written next to each iteration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub timestamp: DateTime<Utc>,
    pub stage: ValidationStage,
    pub iteration: u32,
    pub file_path: PathBuf,
    pub meta_path: PathBuf,
    pub content_length: usize,
    pub valid: bool,
    pub issue_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ValidationResult>,
}

/// A loaded snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Missing when the metadata file was absent
    pub metadata: Option<SnapshotMetadata>,
    pub content: String,
}

/// `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub package_name: String,
    pub timestamp: DateTime<Utc>,
    pub approved: bool,
    pub total_iterations: u32,
    pub snapshots: Vec<SnapshotMetadata>,
    pub final_content_length: usize,
}

impl SessionSummary {
    pub fn load(path: &Path) -> PersistenceResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Differences between two snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub before_stage: Option<ValidationStage>,
    pub after_stage: Option<ValidationStage>,
    pub content_changed: bool,
    pub length_delta: i64,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub validity_changed: bool,
    pub issues_delta: i64,
}

/// Compare two snapshots line by line
pub fn compare_snapshots(before: &Snapshot, after: &Snapshot) -> SnapshotDiff {
    use std::collections::HashSet;

    let before_lines: HashSet<&str> = before.content.lines().collect();
    let after_lines: HashSet<&str> = after.content.lines().collect();
    let meta = |s: &Snapshot| s.metadata.as_ref().map(|m| (m.stage, m.valid, m.issue_count));

    let (validity_changed, issues_delta) = match (meta(before), meta(after)) {
        (Some((_, bv, bi)), Some((_, av, ai))) => (bv != av, ai as i64 - bi as i64),
        _ => (false, 0),
    };

    SnapshotDiff {
        before_stage: meta(before).map(|m| m.0),
        after_stage: meta(after).map(|m| m.0),
        content_changed: before.content != after.content,
        length_delta: after.content.len() as i64 - before.content.len() as i64,
        lines_added: after_lines.difference(&before_lines).count(),
        lines_removed: before_lines.difference(&after_lines).count(),
        validity_changed,
        issues_delta,
    }
}

/// Writes one session's snapshots
#[derive(Debug)]
pub struct SnapshotManager {
    base_dir: PathBuf,
    package: String,
    session_id: String,
    enabled: AtomicBool,
    written: Mutex<Vec<SnapshotMetadata>>,
}

impl SnapshotManager {
    pub fn new(base_dir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            package: package.into(),
            session_id: Utc::now().format("%Y%m%d_%H%M%S").to_string(),
            enabled: AtomicBool::new(true),
            written: Mutex::new(Vec::new()),
        }
    }

    pub fn from_config(config: &SnapshotConfig, package: &str) -> Self {
        let manager = Self::new(config.base_dir.clone(), package);
        manager.enabled.store(config.enabled, Ordering::SeqCst);
        manager
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn session_dir(&self) -> PathBuf {
        self.base_dir.join(&self.package).join(&self.session_id)
    }

    /// Metadata of every snapshot written so far, in order
    pub fn list(&self) -> PersistenceResult<Vec<SnapshotMetadata>> {
        let written = self.written.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        Ok(written.clone())
    }

    /// Write the content checked in one iteration. Returns the content path,
    /// or `None` when disabled.
    pub fn record_iteration(
        &self,
        iteration: u32,
        content: &str,
        result: &ValidationResult,
    ) -> PersistenceResult<Option<PathBuf>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let dir = self.session_dir();
        std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let mut written = self.written.lock().map_err(|_| PersistenceError::LockPoisoned)?;
        let base_name = format!("{:03}_{}_iter{}", written.len(), result.stage, iteration);
        let file_path = dir.join(format!("{}.md", base_name));
        let meta_path = dir.join(format!("{}_meta.json", base_name));

        let meta = SnapshotMetadata {
            timestamp: Utc::now(),
            stage: result.stage,
            iteration,
            file_path: file_path.clone(),
            meta_path: meta_path.clone(),
            content_length: content.len(),
            valid: result.valid,
            issue_count: result.issues.len(),
            result: Some(result.clone()),
        };

        std::fs::write(&file_path, content).map_err(|e| PersistenceError::io(&file_path, e))?;
        let json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(&meta_path, json).map_err(|e| PersistenceError::io(&meta_path, e))?;

        debug!(snapshot = %base_name, bytes = content.len(), "saved snapshot");
        written.push(meta);
        Ok(Some(file_path))
    }

    /// Write `final.md`, `audit_report.md` and `summary.json`. Returns the
    /// session directory, or `None` when disabled.
    pub fn finalize(&self, session: &RefinementSession) -> PersistenceResult<Option<PathBuf>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let dir = self.session_dir();
        std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

        let final_path = dir.join("final.md");
        std::fs::write(&final_path, &session.final_document)
            .map_err(|e| PersistenceError::io(&final_path, e))?;

        let audit_path = dir.join("audit_report.md");
        std::fs::write(&audit_path, session.audit_report())
            .map_err(|e| PersistenceError::io(&audit_path, e))?;

        let summary = SessionSummary {
            session_id: session.session_id.clone(),
            package_name: self.package.clone(),
            timestamp: Utc::now(),
            approved: session.approved,
            total_iterations: session.total_iterations,
            snapshots: self.list()?,
            final_content_length: session.final_document.len(),
        };
        let summary_path = dir.join("summary.json");
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(&summary_path, json).map_err(|e| PersistenceError::io(&summary_path, e))?;

        debug!(dir = %dir.display(), "saved final snapshot and audit report");
        Ok(Some(dir))
    }

    /// Load a snapshot by base name, e.g. `001_structure_iter2`. The metadata
    /// file is optional.
    pub fn load_snapshot(&self, name: &str) -> PersistenceResult<Snapshot> {
        let dir = self.session_dir();
        let content_path = dir.join(format!("{}.md", name));
        let content = match std::fs::read_to_string(&content_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(name.to_string()))
            }
            Err(e) => return Err(PersistenceError::io(&content_path, e)),
        };

        let meta_path = dir.join(format!("{}_meta.json", name));
        let metadata = match std::fs::read_to_string(&meta_path) {
            Ok(raw) => Some(serde_json::from_str(&raw)?),
            Err(_) => None,
        };

        Ok(Snapshot { metadata, content })
    }

    /// Markdown table of every snapshot written so far
    pub fn progress_report(&self) -> PersistenceResult<String> {
        let written = self.list()?;
        let mut report = String::from("# Workflow Progress Report\n\n");
        report.push_str(&format!("**Session**: {}\n", self.session_id));
        report.push_str(&format!("**Package**: {}\n", self.package));
        report.push_str(&format!("**Snapshots**: {}\n\n", written.len()));
        report.push_str("## Stage Progression\n\n");
        report.push_str("| # | Stage | Iteration | Valid | Issues | Length |\n");
        report.push_str("|---|-------|-----------|-------|--------|--------|\n");
        for (i, snap) in written.iter().enumerate() {
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                i,
                snap.stage,
                snap.iteration,
                if snap.valid { "✅" } else { "❌" },
                snap.issue_count,
                snap.content_length
            ));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, ValidationIssue};

    fn failing(stage: ValidationStage) -> ValidationResult {
        ValidationResult::from_issues(
            stage,
            40,
            vec![ValidationIssue::critical(Category::Structure, "Document", "missing")],
        )
    }

    #[test]
    fn test_disabled_manager_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path(), "pkg");
        manager.disable();
        let path = manager
            .record_iteration(1, "# Doc", &failing(ValidationStage::Structure))
            .unwrap();
        assert!(path.is_none());
        assert!(!manager.session_dir().exists());
    }

    #[test]
    fn test_iteration_files_and_naming() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path(), "pkg");

        let first = manager
            .record_iteration(1, "# One", &failing(ValidationStage::Structure))
            .unwrap()
            .unwrap();
        let second = manager
            .record_iteration(2, "# Two\nmore", &ValidationResult::pass(ValidationStage::Structure))
            .unwrap()
            .unwrap();

        assert!(first.ends_with("000_structure_iter1.md"));
        assert!(second.ends_with("001_structure_iter2.md"));
        assert!(manager.session_dir().join("000_structure_iter1_meta.json").exists());

        let loaded = manager.load_snapshot("000_structure_iter1").unwrap();
        assert_eq!(loaded.content, "# One");
        let meta = loaded.metadata.as_ref().unwrap();
        assert!(!meta.valid);
        assert_eq!(meta.issue_count, 1);

        let diff = compare_snapshots(
            &loaded,
            &manager.load_snapshot("001_structure_iter2").unwrap(),
        );
        assert!(diff.content_changed);
        assert!(diff.validity_changed);
        assert_eq!(diff.issues_delta, -1);
        assert_eq!(diff.lines_added, 2);
        assert_eq!(diff.lines_removed, 1);

        let report = manager.progress_report().unwrap();
        assert!(report.contains("| 1 | structure | 2 | ✅ | 0 | 10 |"));
    }

    #[test]
    fn test_missing_snapshot_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path(), "pkg");
        assert!(matches!(
            manager.load_snapshot("999_structure_iter1"),
            Err(PersistenceError::NotFound(_))
        ));
    }
}
