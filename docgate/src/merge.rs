//! Merge deterministic and semantic verdicts for one stage
//!
//! Validity is the conjunction of the present sides, issues are a union
//! deduplicated by `(category, location, message)` with the deterministic
//! copy kept, and the score is the lower of the present scores.

use std::collections::HashSet;

use crate::model::{ValidationIssue, ValidationResult, ValidationStage};

/// Combine up to two results for `stage`. With neither side present the
/// stage passes with a score of 100.
pub fn merge(
    stage: ValidationStage,
    deterministic: Option<&ValidationResult>,
    semantic: Option<&ValidationResult>,
) -> ValidationResult {
    let sides: Vec<&ValidationResult> = deterministic.into_iter().chain(semantic).collect();
    if sides.is_empty() {
        return ValidationResult::pass(stage);
    }

    let mut seen: HashSet<(crate::model::Category, String, String)> = HashSet::new();
    let mut issues: Vec<ValidationIssue> = Vec::new();
    for issue in sides.iter().flat_map(|r| r.issues.iter()) {
        let (category, location, message) = issue.dedup_key();
        if seen.insert((category, location.to_string(), message.to_string())) {
            issues.push(issue.clone());
        }
    }

    ValidationResult {
        stage,
        valid: sides.iter().all(|r| r.valid),
        score: sides.iter().map(|r| r.score).min().unwrap_or(100),
        issues,
        warnings: union_strings(sides.iter().map(|r| r.warnings.as_slice())),
        suggestions: union_strings(sides.iter().map(|r| r.suggestions.as_slice())),
        iterations_used: sides.iter().map(|r| r.iterations_used).max().unwrap_or(0),
    }
}

fn union_strings<'a>(lists: impl Iterator<Item = &'a [String]>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in lists.flatten() {
        if seen.insert(item.as_str()) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, IssueSource};

    const STAGE: ValidationStage = ValidationStage::Quality;

    fn det(valid: bool, score: u8, issues: Vec<ValidationIssue>) -> ValidationResult {
        ValidationResult {
            valid,
            ..ValidationResult::from_issues(STAGE, score, issues)
        }
    }

    #[test]
    fn test_neither_side_passes() {
        let merged = merge(STAGE, None, None);
        assert!(merged.valid);
        assert_eq!(merged.score, 100);
        assert!(merged.issues.is_empty());
    }

    #[test]
    fn test_single_side_is_kept() {
        let issue = ValidationIssue::major(Category::Quality, "Setup", "misleading");
        let only = det(false, 70, vec![issue.clone()]);
        let merged = merge(STAGE, Some(&only), None);
        assert!(!merged.valid);
        assert_eq!(merged.score, 70);
        assert_eq!(merged.issues, vec![issue]);
    }

    #[test]
    fn test_duplicate_issue_appears_once_deterministic_wins() {
        let d = ValidationIssue::minor(Category::Quality, "Document", "vague")
            .with_suggestion("be precise");
        let s = ValidationIssue::minor(Category::Quality, "Document", "vague")
            .with_source(IssueSource::Semantic);
        let extra = ValidationIssue::minor(Category::Quality, "Setup", "filler")
            .with_source(IssueSource::Semantic);

        let merged = merge(
            STAGE,
            Some(&det(true, 90, vec![d.clone()])),
            Some(&det(true, 80, vec![s, extra.clone()])),
        );
        assert_eq!(merged.issues, vec![d, extra]);
        assert_eq!(merged.score, 80);
        assert!(merged.valid);
    }

    #[test]
    fn test_validity_is_conjunction() {
        let merged = merge(
            STAGE,
            Some(&det(true, 95, Vec::new())),
            Some(&det(false, 60, Vec::new())),
        );
        assert!(!merged.valid);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut r = det(
            false,
            55,
            vec![
                ValidationIssue::critical(Category::Quality, "Document", "TODO"),
                ValidationIssue::minor(Category::Quality, "Document", "vague"),
            ],
        );
        r.warnings = vec!["w".into()];
        let merged = merge(STAGE, Some(&r), Some(&r));
        assert_eq!(merged.issues, r.issues);
        assert_eq!(merged.score, r.score);
        assert_eq!(merged.valid, r.valid);
        assert_eq!(merged.warnings, r.warnings);
    }
}
