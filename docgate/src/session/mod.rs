//! Refinement sessions
//!
//! [`SessionOrchestrator`] runs every configured stage in order, feeding
//! each stage's output document into the next, and assembles a
//! [`RefinementSession`]. The session record is append-only while the run is
//! in progress and is handed to the caller exactly once.

mod orchestrator;
mod report;
mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::{IterationRecord, StageVerdict};
use crate::model::{ValidationResult, ValidationStage};

pub use orchestrator::SessionOrchestrator;
pub use store::{
    ContextStore, SharedContextStore, KEY_APPROVED, KEY_CONTENT, KEY_FEEDBACK, KEY_STAGE,
};

/// Final state of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: ValidationStage,
    pub verdict: StageVerdict,
    pub result: ValidationResult,
    pub iterations: u32,
    pub bonus_granted: bool,
}

/// Outcome of a refinement session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSession {
    pub session_id: String,
    pub final_document: String,
    /// Every stage passed
    pub approved: bool,
    /// Sum of iterations across stages
    pub total_iterations: u32,
    /// One report per completed stage, in stage order
    pub stage_reports: Vec<StageReport>,
    /// Critical plus major count of every iteration, in run order
    pub issue_history: Vec<usize>,
    /// Some stage was given a bonus iteration
    pub convergence_bonus_granted: bool,
    /// Feedback of every failing stage, in stage order
    pub final_feedback: String,
    pub iterations: Vec<IterationRecord>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RefinementSession {
    pub(crate) fn start(document: String) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            final_document: document,
            approved: false,
            total_iterations: 0,
            stage_reports: Vec::new(),
            issue_history: Vec::new(),
            convergence_bonus_granted: false,
            final_feedback: String::new(),
            iterations: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn stage_result(&self, stage: ValidationStage) -> Option<&ValidationResult> {
        self.stage_reports
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.result)
    }

    /// Per-stage results keyed by stage
    pub fn stage_results(&self) -> BTreeMap<ValidationStage, &ValidationResult> {
        self.stage_reports
            .iter()
            .map(|r| (r.stage, &r.result))
            .collect()
    }

    pub fn failed_stages(&self) -> Vec<ValidationStage> {
        self.stage_reports
            .iter()
            .filter(|r| !r.result.valid)
            .map(|r| r.stage)
            .collect()
    }

    /// Short id for log lines
    pub fn short_id(&self) -> &str {
        &self.session_id[..8.min(self.session_id.len())]
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stage: ValidationStage, valid: bool) -> StageReport {
        let mut result = ValidationResult::pass(stage);
        result.valid = valid;
        StageReport {
            stage,
            verdict: if valid {
                StageVerdict::Passed
            } else {
                StageVerdict::Exhausted
            },
            result,
            iterations: 1,
            bonus_granted: false,
        }
    }

    #[test]
    fn test_stage_lookup() {
        let mut session = RefinementSession::start("# Doc".into());
        session.stage_reports = vec![
            report(ValidationStage::Structure, true),
            report(ValidationStage::Quality, false),
        ];
        assert!(session.stage_result(ValidationStage::Structure).unwrap().valid);
        assert!(session.stage_result(ValidationStage::Urls).is_none());
        assert_eq!(session.failed_stages(), vec![ValidationStage::Quality]);
        assert_eq!(session.stage_results().len(), 2);
        assert_eq!(session.short_id().len(), 8);
    }
}
