//! Document generator seam
//!
//! The generator is an opaque collaborator: given the current document and
//! the feedback accumulated for the stage, it returns a new document. Any
//! error it returns aborts the session.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::model::{PackageContext, ValidationStage};
use crate::session::SharedContextStore;

/// Everything a generator is given for one regeneration
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub stage: ValidationStage,
    /// Iteration whose result triggered this regeneration (1-based)
    pub iteration: u32,
    pub document: String,
    /// Feedback blocks, oldest first. The last entry is the newest.
    pub feedback: Vec<String>,
    pub context: PackageContext,
    /// Session context store, for collaborators running in their own task
    pub store: SharedContextStore,
}

impl GenerationRequest {
    /// Newest feedback block, if any
    pub fn latest_feedback(&self) -> Option<&str> {
        self.feedback.last().map(String::as_str)
    }
}

/// Produces a revised document from feedback
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
