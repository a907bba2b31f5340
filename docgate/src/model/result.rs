//! Per-stage validation result

use serde::{Deserialize, Serialize};

use super::issue::{Severity, ValidationIssue};
use super::stage::ValidationStage;

/// Verdict of one stage for one iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub stage: ValidationStage,
    pub valid: bool,
    /// 0-100
    pub score: u8,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Iterations the controller spent before this result was produced
    #[serde(default)]
    pub iterations_used: u32,
}

impl ValidationResult {
    /// A passing result with no findings
    pub fn pass(stage: ValidationStage) -> Self {
        Self {
            stage,
            valid: true,
            score: 100,
            issues: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            iterations_used: 0,
        }
    }

    /// Build a result whose validity follows from the issues: any critical or
    /// major issue fails the stage.
    pub fn from_issues(stage: ValidationStage, score: u8, issues: Vec<ValidationIssue>) -> Self {
        let valid = !issues.iter().any(ValidationIssue::is_blocking);
        Self {
            stage,
            valid,
            score: score.min(100),
            issues,
            warnings: Vec::new(),
            suggestions: Vec::new(),
            iterations_used: 0,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Number of critical plus major issues
    pub fn blocking_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_blocking()).count()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Feedback block handed to the generator. Empty when the stage passed.
    ///
    /// ```text
    /// ## Structure Validation Issues
    ///
    /// - [CRITICAL] Document: Missing required section: Overview
    ///   → Fix: Add a '## Overview' section
    /// ```
    pub fn feedback_for_generator(&self) -> String {
        if self.valid {
            return String::new();
        }

        let mut ordered: Vec<&ValidationIssue> = self.issues.iter().collect();
        ordered.sort_by(|a, b| b.severity.cmp(&a.severity));

        let mut parts = vec![format!("## {} Validation Issues\n", self.stage.title())];
        for issue in ordered {
            parts.push(format!(
                "- [{}] {}: {}",
                issue.severity.label(),
                issue.location,
                issue.message
            ));
            if let Some(suggestion) = issue.suggestion.as_deref().filter(|s| !s.is_empty()) {
                parts.push(format!("  → Fix: {}", suggestion));
            }
        }
        parts.join("\n")
    }

    /// One-line summary for logs and reports
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} score={} critical={} major={} minor={}",
            self.stage,
            if self.valid { "PASS" } else { "FAIL" },
            self.score,
            self.count_severity(Severity::Critical),
            self.count_severity(Severity::Major),
            self.count_severity(Severity::Minor),
        )
    }
}

/// Score derived purely from issue severities, for rule families that have
/// no scoring axis of their own.
pub fn penalty_score(issues: &[ValidationIssue]) -> u8 {
    let penalty: u32 = issues
        .iter()
        .map(|i| match i.severity {
            Severity::Critical => 25,
            Severity::Major => 10,
            Severity::Minor => 2,
        })
        .sum();
    100u32.saturating_sub(penalty) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    #[test]
    fn test_from_issues_validity() {
        let minor_only = ValidationResult::from_issues(
            ValidationStage::Quality,
            90,
            vec![ValidationIssue::minor(Category::Quality, "Document", "vague")],
        );
        assert!(minor_only.valid);

        let with_major = ValidationResult::from_issues(
            ValidationStage::Quality,
            90,
            vec![ValidationIssue::major(Category::Quality, "Document", "misleading")],
        );
        assert!(!with_major.valid);
        assert_eq!(with_major.blocking_count(), 1);
    }

    #[test]
    fn test_feedback_empty_when_valid() {
        assert!(ValidationResult::pass(ValidationStage::Structure)
            .feedback_for_generator()
            .is_empty());
    }

    #[test]
    fn test_feedback_format_orders_by_severity() {
        let result = ValidationResult::from_issues(
            ValidationStage::Structure,
            40,
            vec![
                ValidationIssue::minor(Category::Structure, "Code block 1", "No language"),
                ValidationIssue::critical(
                    Category::Structure,
                    "Document",
                    "Missing required section: Overview",
                )
                .with_suggestion("Add a '## Overview' section"),
            ],
        );

        let feedback = result.feedback_for_generator();
        assert!(feedback.starts_with("## Structure Validation Issues\n\n- [CRITICAL]"));
        assert!(feedback.contains("  → Fix: Add a '## Overview' section"));
        let critical_at = feedback.find("[CRITICAL]").unwrap();
        let minor_at = feedback.find("[MINOR]").unwrap();
        assert!(critical_at < minor_at);
    }

    #[test]
    fn test_penalty_score_floors_at_zero() {
        let issues: Vec<ValidationIssue> = (0..5)
            .map(|i| ValidationIssue::critical(Category::Urls, "Document", format!("bad {i}")))
            .collect();
        assert_eq!(penalty_score(&issues), 0);
        assert_eq!(penalty_score(&[]), 100);
    }
}
