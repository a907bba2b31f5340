//! docgate: staged validation and refinement for generated documentation
//!
//! This library provides:
//! - Deterministic rule families (structure, accuracy, completeness,
//!   quality, placeholders, links) and an optional link prober
//! - A semantic judgment seam that turns a judge's JSON into validation
//!   results
//! - An iteration controller per validation stage, with a convergence
//!   bonus when the issue count is still falling
//! - A session orchestrator that chains stages and reports the outcome
//! - Composite quality scoring and golden-baseline regression comparison
//!
//! # Flow
//!
//! ```text
//! SessionOrchestrator ──► IterationController (per stage)
//!                            ├─► Validator::check_deterministic
//!                            ├─► SemanticAdapter::evaluate ─► Judge
//!                            ├─► merge
//!                            └─► Generator::generate (on failure)
//! ```
//!
//! Scoring and golden comparison run independently of the loop.

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod controller;
pub mod error;
pub mod generator;
pub mod golden;
pub mod judge;
pub mod merge;
pub mod model;
pub mod probe;
pub mod rules;
pub mod scoring;
pub mod session;
pub mod snapshots;
pub mod validators;

// Re-export key session types
pub use config::HarnessConfig;
pub use controller::{
    is_converging, ControllerPhase, ControllerSettings, IterationController, IterationRecord,
    StageOutcome, StageVerdict,
};
pub use error::{
    ConfigError, GenerationError, JudgmentError, PersistenceError, PersistenceResult,
    RuleCheckError, RuleResult, SessionError, SessionResult, StoreError,
};
pub use session::{
    ContextStore, RefinementSession, SessionOrchestrator, SharedContextStore, StageReport,
};

// Re-export collaborator seams
pub use generator::{GenerationRequest, Generator};
pub use judge::{Judge, SemanticAdapter};
pub use probe::{LinkChecker, LinkProbe, ProbeConfig};
pub use validators::{StageValidator, Validator, ValidatorRegistry};

// Re-export model types
pub use model::{
    Category, Document, IssueSource, PackageContext, Severity, ValidationIssue, ValidationResult,
    ValidationStage,
};

// Re-export scoring and golden comparison
pub use golden::{compare, ComparisonResult, GoldenBaseline, GoldenFile, GoldenStore};
pub use merge::merge;
pub use scoring::{score_document, QualityMetrics};
pub use snapshots::{SnapshotConfig, SnapshotManager};
