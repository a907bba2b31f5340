//! Semantic judgment adapter
//!
//! Wraps the opaque [`Judge`] collaborator. The adapter builds nothing itself:
//! it hands the collaborator the stage instruction, the document and the
//! package context, then validates the JSON that comes back against a fixed
//! shape. Transport and parse failures are logged and reported as "no
//! opinion" (`None`); they never abort a session.

mod parse;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::JudgmentError;
use crate::model::{Document, PackageContext, ValidationResult, ValidationStage};

pub use parse::{extract_json, parse_judgment};

/// External semantic judgment capability.
///
/// Implementations return the raw structured response, expected to be a JSON
/// object of the shape shown in [`RESPONSE_FORMAT`].
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        instruction: &str,
        document: &str,
        ctx: &PackageContext,
    ) -> Result<String, JudgmentError>;
}

/// Response contract appended to every judgment prompt
pub const RESPONSE_FORMAT: &str = r#"Respond with a JSON object in this exact format:
{
  "valid": true/false,
  "score": 0-100,
  "issues": [
    {
      "severity": "critical|major|minor",
      "category": "<category>",
      "location": "Section or line description",
      "message": "Description of the issue",
      "suggestion": "How to fix it"
    }
  ],
  "warnings": ["..."]
}

Be thorough but fair. Only flag real issues that would confuse users or violate documentation standards."#;

/// Render a complete judgment prompt for collaborators that talk to a model.
/// Without a stage the response format lists every category.
pub fn build_prompt(
    stage: Option<ValidationStage>,
    instruction: &str,
    document: &str,
    ctx: &PackageContext,
) -> String {
    let context = ctx.prompt_summary();
    let category = match stage {
        Some(stage) => stage.category().to_string(),
        None => ValidationStage::ALL
            .iter()
            .map(|s| s.category().to_string())
            .collect::<Vec<_>>()
            .join("|"),
    };
    let format = RESPONSE_FORMAT.replace("<category>", &category);
    format!(
        "{instruction}\n\n{context}\nDocument to validate:\n---\n{document}\n---\n\n{format}",
        instruction = instruction.trim(),
        context = context,
        document = document,
        format = format,
    )
}

/// Runs semantic checks through a [`Judge`]
#[derive(Clone)]
pub struct SemanticAdapter {
    judge: Arc<dyn Judge>,
}

impl SemanticAdapter {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self { judge }
    }

    /// Judge `doc` for `stage`. Returns `None` when the instruction is empty
    /// or when the call or its response fails.
    pub async fn evaluate(
        &self,
        stage: ValidationStage,
        instruction: &str,
        doc: &Document,
        ctx: &PackageContext,
    ) -> Option<ValidationResult> {
        if instruction.trim().is_empty() {
            return None;
        }

        let raw = match self.judge.judge(instruction, doc.content(), ctx).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(stage = %stage, error = %e, "semantic judgment failed, ignoring");
                return None;
            }
        };

        match parse_judgment(&raw, stage) {
            Ok(result) => {
                debug!(
                    stage = %stage,
                    valid = result.valid,
                    score = result.score,
                    issues = result.issues.len(),
                    "semantic judgment parsed"
                );
                Some(result)
            }
            Err(e) => {
                warn!(
                    stage = %stage,
                    error = %e,
                    response_len = raw.len(),
                    "semantic judgment unparseable, ignoring"
                );
                None
            }
        }
    }
}
