//! Stage validators
//!
//! A validator is bound to one [`ValidationStage`], composes any subset of
//! the rule families for its deterministic check, and carries the
//! instruction used for the semantic check (empty means no semantic check).

pub mod instructions;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::RuleResult;
use crate::model::{Document, PackageContext, ValidationIssue, ValidationResult, ValidationStage};
use crate::probe::LinkChecker;
use crate::rules::{
    check_accuracy, check_completeness, check_links, check_placeholders, check_quality,
    check_structure, RuleSet,
};

pub use instructions::default_instruction;

/// A quality gate for one stage
#[async_trait]
pub trait Validator: Send + Sync {
    fn stage(&self) -> ValidationStage;

    fn supports_deterministic(&self) -> bool;

    /// Semantic judgment instruction; empty disables the semantic check
    fn instruction(&self) -> &str;

    fn supports_semantic(&self) -> bool {
        !self.instruction().trim().is_empty()
    }

    /// Rule-based check. Must not panic; failures are returned as errors and
    /// treated as "no opinion" by the caller.
    async fn check_deterministic(
        &self,
        doc: &Document,
        ctx: &PackageContext,
        cancel: &CancellationToken,
    ) -> RuleResult<ValidationResult>;
}

/// Rule families a [`StageValidator`] can compose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFamily {
    Structure,
    Accuracy,
    Completeness,
    Links,
    Quality,
    Placeholders,
}

impl RuleFamily {
    /// Family a stage uses by default
    pub fn for_stage(stage: ValidationStage) -> Self {
        match stage {
            ValidationStage::Structure => Self::Structure,
            ValidationStage::Accuracy => Self::Accuracy,
            ValidationStage::Completeness => Self::Completeness,
            ValidationStage::Urls => Self::Links,
            ValidationStage::Quality => Self::Quality,
            ValidationStage::Placeholders => Self::Placeholders,
        }
    }
}

/// Rule-family backed validator
pub struct StageValidator {
    stage: ValidationStage,
    families: Vec<RuleFamily>,
    instruction: String,
    rules: Arc<RuleSet>,
    links: Option<LinkChecker>,
}

impl StageValidator {
    /// Validator with the stage's default family and instruction
    pub fn new(stage: ValidationStage, rules: Arc<RuleSet>) -> Self {
        Self {
            stage,
            families: vec![RuleFamily::for_stage(stage)],
            instruction: default_instruction(stage).to_string(),
            rules,
            links: None,
        }
    }

    pub fn with_families(mut self, families: Vec<RuleFamily>) -> Self {
        self.families = families;
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    /// Probe extracted links over the network after the static link rules
    pub fn with_link_checker(mut self, checker: LinkChecker) -> Self {
        self.links = Some(checker);
        self
    }

    async fn run_family(
        &self,
        family: RuleFamily,
        doc: &Document,
        ctx: &PackageContext,
        cancel: &CancellationToken,
        warnings: &mut Vec<String>,
    ) -> RuleResult<(u8, Vec<ValidationIssue>)> {
        let (score, issues) = match family {
            RuleFamily::Structure => {
                let o = check_structure(doc, &self.rules.structure);
                (o.rounded_score(), o.issues)
            }
            RuleFamily::Accuracy => {
                let o = check_accuracy(doc, ctx)?;
                (o.rounded_score(), o.issues)
            }
            RuleFamily::Completeness => {
                let o = check_completeness(doc, ctx);
                (o.rounded_score(), o.issues)
            }
            RuleFamily::Quality => {
                let o = check_quality(doc, &self.rules.quality)?;
                (o.rounded_score(), o.issues)
            }
            RuleFamily::Placeholders => {
                let o = check_placeholders(doc);
                (o.rounded_score(), o.issues)
            }
            RuleFamily::Links => {
                let o = check_links(doc);
                let mut issues = o.issues;
                if let Some(checker) = &self.links {
                    if checker.config().enabled && !o.details.probe_urls.is_empty() {
                        debug!(urls = o.details.probe_urls.len(), "probing links");
                        let report = checker.check_all(&o.details.probe_urls, cancel).await;
                        issues.extend(report.issues());
                        warnings.extend(report.warnings());
                    }
                }
                (crate::model::penalty_score(&issues), issues)
            }
        };
        Ok((score, issues))
    }
}

#[async_trait]
impl Validator for StageValidator {
    fn stage(&self) -> ValidationStage {
        self.stage
    }

    fn supports_deterministic(&self) -> bool {
        !self.families.is_empty()
    }

    fn instruction(&self) -> &str {
        &self.instruction
    }

    async fn check_deterministic(
        &self,
        doc: &Document,
        ctx: &PackageContext,
        cancel: &CancellationToken,
    ) -> RuleResult<ValidationResult> {
        let mut score = 100u8;
        let mut issues = Vec::new();
        let mut warnings = Vec::new();
        for family in &self.families {
            let (family_score, family_issues) =
                self.run_family(*family, doc, ctx, cancel, &mut warnings).await?;
            score = score.min(family_score);
            issues.extend(family_issues);
        }
        Ok(ValidationResult::from_issues(self.stage, score, issues).with_warnings(warnings))
    }
}

/// Ordered set of validators keyed by stage
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`StageValidator`] per stage. The urls validator probes links when
    /// a checker is supplied.
    pub fn standard(rules: Arc<RuleSet>, links: Option<LinkChecker>) -> Self {
        let mut registry = Self::new();
        for stage in ValidationStage::ALL {
            let mut validator = StageValidator::new(stage, rules.clone());
            if stage == ValidationStage::Urls {
                if let Some(checker) = links.clone() {
                    validator = validator.with_link_checker(checker);
                }
            }
            registry = registry.register(Arc::new(validator));
        }
        registry
    }

    /// Add a validator, replacing any existing one for the same stage
    pub fn register(mut self, validator: Arc<dyn Validator>) -> Self {
        let stage = validator.stage();
        self.validators.retain(|v| v.stage() != stage);
        self.validators.push(validator);
        self
    }

    pub fn get(&self, stage: ValidationStage) -> Option<Arc<dyn Validator>> {
        self.validators.iter().find(|v| v.stage() == stage).cloned()
    }

    pub fn stages(&self) -> Vec<ValidationStage> {
        self.validators.iter().map(|v| v.stage()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Severity};

    fn validator(stage: ValidationStage) -> StageValidator {
        StageValidator::new(stage, Arc::new(RuleSet::default()))
    }

    #[tokio::test]
    async fn test_structure_stage_on_minimal_document() {
        let doc = Document::new("# Title\n## Overview\n### Compatibility\n## Reference\n");
        let result = validator(ValidationStage::Structure)
            .check_deterministic(&doc, &PackageContext::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.valid);
        assert_eq!(result.score, 80);
        assert_eq!(result.blocking_count(), 0);
    }

    #[tokio::test]
    async fn test_urls_stage_flags_anchor() {
        let doc = Document::new("See [X](#x).");
        let result = validator(ValidationStage::Urls)
            .check_deterministic(&doc, &PackageContext::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!result.valid);
        assert!(result.issues.iter().any(|i| i.category == Category::Urls
            && i.severity == Severity::Critical
            && i.message.contains("Anchor link found")));
    }

    #[tokio::test]
    async fn test_composed_families_take_min_score() {
        let doc = Document::new("# Title\nTODO finish\n");
        let result = validator(ValidationStage::Quality)
            .with_families(vec![RuleFamily::Quality, RuleFamily::Structure])
            .check_deterministic(&doc, &PackageContext::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.issues.iter().any(|i| i.category == Category::Structure));
        assert!(result.issues.iter().any(|i| i.category == Category::Quality));
        // structure: no required or recommended sections, hierarchy valid -> 20
        assert_eq!(result.score, 20);
    }

    #[test]
    fn test_registry_standard_and_replace() {
        let rules = Arc::new(RuleSet::default());
        let registry = ValidatorRegistry::standard(rules.clone(), None);
        assert_eq!(registry.stages(), ValidationStage::ALL.to_vec());
        assert!(!registry.get(ValidationStage::Urls).unwrap().supports_semantic());
        assert!(registry.get(ValidationStage::Quality).unwrap().supports_semantic());

        let registry = registry.register(Arc::new(
            StageValidator::new(ValidationStage::Quality, rules).with_instruction(""),
        ));
        assert_eq!(registry.len(), 6);
        assert!(!registry.get(ValidationStage::Quality).unwrap().supports_semantic());
    }
}
