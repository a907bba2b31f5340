//! Shared vocabulary: stages, issues, results, documents and package context

pub mod context;
pub mod document;
pub mod issue;
pub mod result;
pub mod stage;

pub use context::{DataStreamInfo, PackageContext, PackageManifest};
pub use document::{CodeBlock, Document, Heading, Section};
pub use issue::{Category, IssueSource, Severity, ValidationIssue};
pub use result::{penalty_score, ValidationResult};
pub use stage::ValidationStage;
