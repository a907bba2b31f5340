//! Convergence-driven iteration controller
//!
//! Runs one stage to completion:
//!
//! ```text
//! doc ─► deterministic ──fail──────────────┐
//!            │ pass / no opinion           │
//!            ▼                             ▼
//!         semantic ─► merge ─────────► decide ─► Passed
//!                                          │
//!                                          ├─► regenerate ─► (next iteration)
//!                                          └─► Exhausted
//! ```
//!
//! The budget is `max_iterations`. When the last budgeted iteration still
//! fails but the blocking-issue count just went down, exactly one bonus
//! iteration is granted. Only the previous count is compared, so an
//! oscillating count (3, 2, 3) can still earn the bonus.
//!
//! A failed deterministic check skips the semantic check for that turn, but
//! the turn still counts: its blocking count is appended to the issue
//! history and it goes through the same decide step. A failure on the last
//! iteration does not regenerate; the stage ends `Exhausted` with the
//! document as it was checked.

pub mod phase;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{GenerationError, StoreError};
use crate::generator::{GenerationRequest, Generator};
use crate::judge::SemanticAdapter;
use crate::merge::merge;
use crate::model::{Document, PackageContext, ValidationResult, ValidationStage};
use crate::session::{SharedContextStore, KEY_STAGE};
use crate::snapshots::SnapshotManager;
use crate::validators::Validator;

pub use phase::{ControllerPhase, PhaseTracker};

/// Loop budget and which checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    pub max_iterations: u32,
    pub enable_deterministic: bool,
    pub enable_semantic: bool,
    pub allow_convergence_bonus: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 2,
            enable_deterministic: true,
            enable_semantic: true,
            allow_convergence_bonus: true,
        }
    }
}

/// One controller turn, append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Session-wide sequence number, 1-based
    pub index: u32,
    pub stage: ValidationStage,
    /// Iteration within the stage, 1-based
    pub iteration: u32,
    /// Critical plus major issues in the merged result
    pub issue_count: usize,
    pub valid: bool,
    pub score: u8,
    pub content_length: usize,
    /// Snapshot of the checked content, when snapshots are enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<PathBuf>,
    pub deterministic_checked: bool,
    pub semantic_checked: bool,
    pub recorded_at: DateTime<Utc>,
}

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageVerdict {
    Passed,
    Exhausted,
}

impl std::fmt::Display for StageVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Everything a stage accumulated, finished or not
#[derive(Debug, Clone)]
pub struct StageRun {
    pub stage: ValidationStage,
    /// Latest document, possibly regenerated but not yet checked
    pub document: Document,
    /// Document behind `last_result`
    pub last_checked: Option<Document>,
    pub last_result: Option<ValidationResult>,
    pub iterations: u32,
    pub issue_history: Vec<usize>,
    pub records: Vec<IterationRecord>,
    pub bonus_granted: bool,
    pub phases: PhaseTracker,
}

impl StageRun {
    fn new(stage: ValidationStage, document: Document) -> Self {
        Self {
            stage,
            document,
            last_checked: None,
            last_result: None,
            iterations: 0,
            issue_history: Vec::new(),
            records: Vec::new(),
            bonus_granted: false,
            phases: PhaseTracker::default(),
        }
    }
}

/// Completed stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub verdict: StageVerdict,
    pub result: ValidationResult,
    pub run: StageRun,
}

/// Why a stage stopped early
#[derive(Debug)]
pub enum InterruptCause {
    Regeneration(GenerationError),
    Cancelled,
    Store(StoreError),
}

/// Early stop, with the progress made so far
#[derive(Debug)]
pub struct StageInterrupt {
    pub cause: InterruptCause,
    pub iteration: u32,
    pub run: StageRun,
}

/// `true` iff the last blocking count is strictly below the one before it
pub fn is_converging(history: &[usize]) -> bool {
    match history {
        [.., prev, last] => last < prev,
        _ => false,
    }
}

/// Drives one stage through check, decide and regenerate turns
pub struct IterationController {
    validator: Arc<dyn Validator>,
    generator: Arc<dyn Generator>,
    adapter: Option<SemanticAdapter>,
    snapshots: Option<Arc<SnapshotManager>>,
    settings: ControllerSettings,
}

impl IterationController {
    pub fn new(
        validator: Arc<dyn Validator>,
        generator: Arc<dyn Generator>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            validator,
            generator,
            adapter: None,
            snapshots: None,
            settings,
        }
    }

    pub fn with_adapter(mut self, adapter: Option<SemanticAdapter>) -> Self {
        self.adapter = adapter;
        self
    }

    pub fn with_snapshots(mut self, snapshots: Option<Arc<SnapshotManager>>) -> Self {
        self.snapshots = snapshots;
        self
    }

    /// Run the stage. `first_index` numbers the first [`IterationRecord`].
    pub async fn run_stage(
        &self,
        document: Document,
        ctx: &PackageContext,
        store: &SharedContextStore,
        cancel: &CancellationToken,
        first_index: u32,
    ) -> Result<StageOutcome, Box<StageInterrupt>> {
        let stage = self.validator.stage();
        let max = self.settings.max_iterations.max(1);
        let mut effective_max = max;
        let mut feedback: Vec<String> = Vec::new();
        let mut run = StageRun::new(stage, document);

        if let Err(e) = store.set(KEY_STAGE, &stage) {
            return Err(interrupt(InterruptCause::Store(e), 0, run));
        }

        info!(stage = %stage, max_iterations = max, "stage started");

        loop {
            let iteration = run.iterations + 1;
            if cancel.is_cancelled() {
                run.phases.enter(ControllerPhase::Aborted);
                return Err(interrupt(InterruptCause::Cancelled, iteration, run));
            }

            run.phases.enter(ControllerPhase::CheckingDeterministic);
            let det = match self.check_deterministic(&run.document, ctx, cancel).await {
                Ok(det) => det,
                Err(()) => {
                    run.phases.enter(ControllerPhase::Aborted);
                    return Err(interrupt(InterruptCause::Cancelled, iteration, run));
                }
            };

            let det_failed = det.as_ref().is_some_and(|d| !d.valid);
            let mut semantic_checked = false;
            let mut result = if det_failed {
                debug!(stage = %stage, iteration, "deterministic check failed, skipping semantic");
                merge(stage, det.as_ref(), None)
            } else {
                run.phases.enter(ControllerPhase::CheckingSemantic);
                let sem = match self.check_semantic(&run.document, ctx, cancel).await {
                    Ok(sem) => sem,
                    Err(()) => {
                        run.phases.enter(ControllerPhase::Aborted);
                        return Err(interrupt(InterruptCause::Cancelled, iteration, run));
                    }
                };
                semantic_checked = sem.is_some();
                merge(stage, det.as_ref(), sem.as_ref())
            };
            result.iterations_used = iteration;

            run.phases.enter(ControllerPhase::Deciding);
            let blocking = result.blocking_count();
            run.iterations = iteration;
            run.issue_history.push(blocking);
            let content_ref = self.snapshot(&run.document, &result, iteration);
            run.records.push(IterationRecord {
                index: first_index + run.records.len() as u32,
                stage,
                iteration,
                issue_count: blocking,
                valid: result.valid,
                score: result.score,
                content_length: run.document.content().len(),
                content_ref,
                deterministic_checked: det.is_some(),
                semantic_checked,
                recorded_at: Utc::now(),
            });
            run.last_checked = Some(run.document.clone());
            run.last_result = Some(result.clone());

            info!(
                stage = %stage,
                iteration,
                valid = result.valid,
                score = result.score,
                blocking,
                "iteration checked"
            );

            if result.valid {
                run.phases.enter(ControllerPhase::Passed);
                return Ok(StageOutcome {
                    verdict: StageVerdict::Passed,
                    result,
                    run,
                });
            }

            let regenerate = if iteration < effective_max {
                true
            } else if iteration == max
                && self.settings.allow_convergence_bonus
                && !run.bonus_granted
                && blocking > 0
                && is_converging(&run.issue_history)
            {
                effective_max = max + 1;
                run.bonus_granted = true;
                info!(
                    stage = %stage,
                    history = ?run.issue_history,
                    "issues converging, granting bonus iteration"
                );
                true
            } else {
                false
            };

            if !regenerate {
                run.phases.enter(ControllerPhase::Exhausted);
                warn!(
                    stage = %stage,
                    iterations = iteration,
                    blocking,
                    "stage exhausted its iteration budget"
                );
                return Ok(StageOutcome {
                    verdict: StageVerdict::Exhausted,
                    result,
                    run,
                });
            }

            run.phases.enter(ControllerPhase::Regenerating);
            feedback.push(result.feedback_for_generator());
            if let Err(e) = store.set_feedback(feedback.last().map(String::as_str).unwrap_or("")) {
                return Err(interrupt(InterruptCause::Store(e), iteration, run));
            }

            let request = GenerationRequest {
                stage,
                iteration,
                document: run.document.content().to_string(),
                feedback: feedback.clone(),
                context: ctx.clone(),
                store: store.clone(),
            };
            let generated = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    run.phases.enter(ControllerPhase::Aborted);
                    return Err(interrupt(InterruptCause::Cancelled, iteration, run));
                }
                generated = self.generator.generate(&request) => generated,
            };

            match generated {
                Ok(content) => {
                    debug!(stage = %stage, iteration, content_len = content.len(), "document regenerated");
                    if let Err(e) = store.set_content(&content) {
                        return Err(interrupt(InterruptCause::Store(e), iteration, run));
                    }
                    run.document = Document::new(content);
                }
                Err(e) => {
                    warn!(stage = %stage, iteration, error = %e, "regeneration failed");
                    run.phases.enter(ControllerPhase::Aborted);
                    return Err(interrupt(InterruptCause::Regeneration(e), iteration, run));
                }
            }
        }
    }

    /// `Err(())` means the session was cancelled during the check.
    async fn check_deterministic(
        &self,
        doc: &Document,
        ctx: &PackageContext,
        cancel: &CancellationToken,
    ) -> Result<Option<ValidationResult>, ()> {
        if !self.settings.enable_deterministic || !self.validator.supports_deterministic() {
            return Ok(None);
        }

        let checked = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(()),
            checked = self.validator.check_deterministic(doc, ctx, cancel) => checked,
        };
        // Probes report cancellation as outcomes; the session must still stop.
        if cancel.is_cancelled() {
            return Err(());
        }

        match checked {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!(
                    stage = %self.validator.stage(),
                    error = %e,
                    "deterministic check failed internally, treating as no opinion"
                );
                Ok(None)
            }
        }
    }

    async fn check_semantic(
        &self,
        doc: &Document,
        ctx: &PackageContext,
        cancel: &CancellationToken,
    ) -> Result<Option<ValidationResult>, ()> {
        let Some(adapter) = &self.adapter else {
            return Ok(None);
        };
        if !self.settings.enable_semantic || !self.validator.supports_semantic() {
            return Ok(None);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(()),
            judged = adapter.evaluate(self.validator.stage(), self.validator.instruction(), doc, ctx) => Ok(judged),
        }
    }

    fn snapshot(&self, doc: &Document, result: &ValidationResult, iteration: u32) -> Option<PathBuf> {
        let snapshots = self.snapshots.as_ref()?;
        match snapshots.record_iteration(iteration, doc.content(), result) {
            Ok(path) => path,
            Err(e) => {
                warn!(stage = %result.stage, iteration, error = %e, "failed to write snapshot");
                None
            }
        }
    }
}

fn interrupt(cause: InterruptCause, iteration: u32, run: StageRun) -> Box<StageInterrupt> {
    Box::new(StageInterrupt {
        cause,
        iteration,
        run,
    })
}
