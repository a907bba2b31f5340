//! Session orchestrator: stages in order, one controller per stage

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{ContextStore, RefinementSession, SharedContextStore, StageReport};
use crate::config::HarnessConfig;
use crate::controller::{
    InterruptCause, IterationController, StageInterrupt, StageOutcome, StageVerdict,
};
use crate::error::{SessionError, SessionResult};
use crate::generator::Generator;
use crate::judge::{Judge, SemanticAdapter};
use crate::model::{Document, PackageContext};
use crate::probe::LinkChecker;
use crate::snapshots::SnapshotManager;
use crate::validators::ValidatorRegistry;

/// Runs a full refinement session
pub struct SessionOrchestrator {
    config: HarnessConfig,
    registry: ValidatorRegistry,
    generator: Arc<dyn Generator>,
    adapter: Option<SemanticAdapter>,
}

impl SessionOrchestrator {
    /// Orchestrator with the standard validators. Link probing uses the
    /// reqwest prober when enabled in `config.probe`.
    pub fn new(config: HarnessConfig, generator: Arc<dyn Generator>) -> Self {
        let config = config.normalized();
        let checker = if config.probe.enabled {
            match LinkChecker::http(config.probe.clone()) {
                Ok(checker) => Some(checker),
                Err(e) => {
                    warn!(error = %e, "failed to build link prober, probing disabled");
                    None
                }
            }
        } else {
            None
        };
        let registry = ValidatorRegistry::standard(Arc::new(config.rule_set()), checker);
        Self {
            config,
            registry,
            generator,
            adapter: None,
        }
    }

    /// Enable semantic checks through `judge`
    pub fn with_judge(mut self, judge: Arc<dyn Judge>) -> Self {
        self.adapter = Some(SemanticAdapter::new(judge));
        self
    }

    pub fn with_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub async fn run(
        &self,
        document: impl Into<String>,
        ctx: &PackageContext,
    ) -> SessionResult<RefinementSession> {
        self.run_with_cancel(document, ctx, CancellationToken::new())
            .await
    }

    /// Run every configured stage. `cancel` aborts the session; the
    /// configured session timeout does the same and is reported as
    /// [`SessionError::TimedOut`].
    pub async fn run_with_cancel(
        &self,
        document: impl Into<String>,
        ctx: &PackageContext,
        cancel: CancellationToken,
    ) -> SessionResult<RefinementSession> {
        let mut session = RefinementSession::start(document.into());
        let store: SharedContextStore = ContextStore::new().shared();
        store.set_content(&session.final_document)?;
        store.set_approved(false)?;

        let package = if ctx.name().is_empty() { "document" } else { ctx.name() };
        let snapshots = self
            .config
            .snapshots
            .enabled
            .then(|| Arc::new(SnapshotManager::from_config(&self.config.snapshots, package)));

        let token = cancel.child_token();
        let timed_out = CancellationToken::new();
        let timer = self.config.session_timeout().map(|timeout| {
            let token = token.clone();
            let timed_out = timed_out.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                timed_out.cancel();
                token.cancel();
            })
        });

        info!(
            session = %session.short_id(),
            package,
            stages = self.config.stages.len(),
            "refinement session started"
        );

        let outcome = self
            .run_stages(&mut session, ctx, &store, &token, snapshots.clone())
            .await;
        if let Some(timer) = timer {
            timer.abort();
        }

        if let Err(interrupt) = outcome {
            return Err(self.fail(session, *interrupt, timed_out.is_cancelled()));
        }

        session.approved = session.stage_reports.iter().all(|r| r.result.valid);
        session.final_feedback = session
            .stage_reports
            .iter()
            .filter(|r| !r.result.valid)
            .map(|r| r.result.feedback_for_generator())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        session.finished_at = Some(Utc::now());
        store.set_approved(session.approved)?;

        if let Some(snapshots) = &snapshots {
            if let Err(e) = snapshots.finalize(&session) {
                warn!(session = %session.short_id(), error = %e, "failed to write final snapshot");
            }
        }

        info!(
            session = %session.short_id(),
            approved = session.approved,
            total_iterations = session.total_iterations,
            bonus = session.convergence_bonus_granted,
            "refinement session finished"
        );
        Ok(session)
    }

    async fn run_stages(
        &self,
        session: &mut RefinementSession,
        ctx: &PackageContext,
        store: &SharedContextStore,
        cancel: &CancellationToken,
        snapshots: Option<Arc<SnapshotManager>>,
    ) -> Result<(), Box<StageInterrupt>> {
        let settings = self.config.controller_settings();
        for stage in &self.config.stages {
            let Some(validator) = self.registry.get(*stage) else {
                warn!(stage = %stage, "no validator registered, skipping stage");
                continue;
            };

            let controller = IterationController::new(validator, self.generator.clone(), settings)
                .with_adapter(self.adapter.clone())
                .with_snapshots(snapshots.clone());

            let document = Document::new(session.final_document.clone());
            let first_index = session.iterations.len() as u32 + 1;
            let outcome = controller
                .run_stage(document, ctx, store, cancel, first_index)
                .await?;
            record_stage(session, outcome);
        }
        Ok(())
    }

    /// Fold an interrupted stage's progress into the session and build the
    /// fatal error.
    fn fail(
        &self,
        mut session: RefinementSession,
        interrupt: StageInterrupt,
        timed_out: bool,
    ) -> SessionError {
        let StageInterrupt {
            cause,
            iteration,
            run,
        } = interrupt;
        let stage = run.stage;

        session.total_iterations += run.iterations;
        session.issue_history.extend(run.issue_history.iter().copied());
        session.iterations.extend(run.records.iter().cloned());
        session.convergence_bonus_granted |= run.bonus_granted;
        session.final_document = run
            .last_checked
            .unwrap_or(run.document)
            .into_content();
        session.approved = false;
        session.finished_at = Some(Utc::now());

        match cause {
            InterruptCause::Regeneration(source) => {
                warn!(stage = %stage, iteration, error = %source, "session aborted by generator failure");
                SessionError::Regeneration {
                    stage,
                    iteration,
                    source,
                }
            }
            InterruptCause::Store(e) => SessionError::Store(e),
            InterruptCause::Cancelled if timed_out => {
                warn!(stage = %stage, iteration, "session timed out");
                SessionError::TimedOut {
                    stage,
                    iteration,
                    partial: Box::new(session),
                }
            }
            InterruptCause::Cancelled => {
                warn!(stage = %stage, iteration, "session cancelled");
                SessionError::Cancelled {
                    stage,
                    iteration,
                    partial: Box::new(session),
                }
            }
        }
    }
}

fn record_stage(session: &mut RefinementSession, outcome: StageOutcome) {
    let StageOutcome {
        verdict,
        result,
        run,
    } = outcome;

    if verdict == StageVerdict::Exhausted {
        warn!(stage = %run.stage, score = result.score, "stage did not pass");
    }

    session.total_iterations += run.iterations;
    session.issue_history.extend(run.issue_history.iter().copied());
    session.iterations.extend(run.records);
    session.convergence_bonus_granted |= run.bonus_granted;
    session.final_document = run.document.into_content();
    session.stage_reports.push(StageReport {
        stage: run.stage,
        verdict,
        result,
        iterations: run.iterations,
        bonus_granted: run.bonus_granted,
    });
}
