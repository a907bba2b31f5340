//! Quality family: writing heuristics.
//!
//! Starts at 100 and deducts:
//! - 20 per TODO-style marker, capped at 40
//! - 5 per vague phrase, capped at 20
//! - 10 flat when passive-voice constructions exceed 10
//! - 5 per H2 section with only one or two content lines, capped at 20

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{QualityRules, RuleOutcome};
use crate::error::{RuleCheckError, RuleResult};
use crate::model::{Category, Document, ValidationIssue};

const TODO_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\bTODO\b", "TODO"),
    (r"(?i)\bFIXME\b", "FIXME"),
    (r"(?i)\bHACK\b", "HACK"),
    (r"(?i)\bTBD\b", "TBD"),
];

const VAGUE_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\bsimply\s+", "simply"),
    (r"(?i)\bjust\s+", "just"),
    (r"(?i)\beasily\s+", "easily"),
    (r"(?i)\bobviously\s+", "obviously"),
    (r"(?i)\bclearly\s+", "clearly"),
];

const MISLEADING_PATTERNS: &[(&str, &str)] = &[
    (
        r"(?i)choose\s+your\s+destination",
        "'choose your destination' suggests the reader picks where data goes; the destination is fixed during vendor setup",
    ),
    (
        r"(?i)select\s+your\s+destination",
        "'select your destination' suggests the reader picks where data goes; the destination is fixed during vendor setup",
    ),
];

static TODO_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| compile_table(TODO_PATTERNS));
static VAGUE_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| compile_table(VAGUE_PATTERNS));
static MISLEADING_RES: LazyLock<Vec<(Regex, &'static str)>> =
    LazyLock::new(|| compile_table(MISLEADING_PATTERNS));

static PASSIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:is|are|was|were|be|been|being)\s+(?:configured|installed|enabled|set|defined|used|required|needed|supported)\b",
    )
    .expect("PASSIVE regex should compile")
});

const PASSIVE_THRESHOLD: usize = 10;

fn compile_table(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, label)| {
            (
                Regex::new(pattern).expect("quality pattern table should compile"),
                *label,
            )
        })
        .collect()
}

/// Raw counts behind the quality score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDetails {
    pub todo_markers_found: usize,
    pub vague_phrases_found: usize,
    pub passive_voice_instances: usize,
    pub short_sections_count: usize,
}

/// Run the quality family. Fails if a configured extra pattern is invalid.
pub fn check_quality(doc: &Document, rules: &QualityRules) -> RuleResult<RuleOutcome<QualityDetails>> {
    let content = doc.content();
    let mut details = QualityDetails::default();
    let mut issues = Vec::new();

    for (re, label) in TODO_RES.iter() {
        let count = re.find_iter(content).count();
        if count > 0 {
            details.todo_markers_found += count;
            issues.push(
                ValidationIssue::critical(
                    Category::Quality,
                    "Document",
                    format!("Found TODO/development marker: {}", label),
                )
                .with_suggestion("Replace the marker with finished content"),
            );
        }
    }

    let mut extra = Vec::with_capacity(rules.extra_vague_patterns.len());
    for pattern in &rules.extra_vague_patterns {
        let re = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| RuleCheckError::invalid_pattern(pattern, e.to_string()))?;
        extra.push((re, pattern.as_str()));
    }
    let mut vague: Vec<(&Regex, &str)> = VAGUE_RES.iter().map(|(re, label)| (re, *label)).collect();
    vague.extend(extra.iter().map(|(re, label)| (re, *label)));
    for (re, label) in vague {
        let count = re.find_iter(content).count();
        if count > 0 {
            details.vague_phrases_found += count;
            issues.push(
                ValidationIssue::minor(
                    Category::Quality,
                    "Document",
                    format!("Vague phrase '{}' used {} time(s)", label, count),
                )
                .with_suggestion("Replace with specific, actionable language"),
            );
        }
    }

    for (re, message) in MISLEADING_RES.iter() {
        if re.is_match(content) {
            issues.push(
                ValidationIssue::major(Category::Quality, "Setup", *message)
                    .with_suggestion("Say which configuration instructions to follow instead"),
            );
        }
    }

    details.passive_voice_instances = PASSIVE.find_iter(content).count();
    if details.passive_voice_instances > PASSIVE_THRESHOLD {
        issues.push(
            ValidationIssue::minor(
                Category::Quality,
                "Document",
                format!(
                    "Excessive passive voice ({} instances)",
                    details.passive_voice_instances
                ),
            )
            .with_suggestion("Rewrite instructions in the active voice"),
        );
    }

    for section in doc.sections() {
        let lines = section.content_lines();
        if (1..3).contains(&lines) {
            details.short_sections_count += 1;
            issues.push(
                ValidationIssue::minor(
                    Category::Quality,
                    section.title.clone(),
                    format!("Section is too short ({} line(s))", lines),
                )
                .with_suggestion("Expand the section or merge it into a neighbour"),
            );
        }
    }

    let mut score = 100.0;
    score -= (details.todo_markers_found as f64 * 20.0).min(40.0);
    score -= (details.vague_phrases_found as f64 * 5.0).min(20.0);
    if details.passive_voice_instances > PASSIVE_THRESHOLD {
        score -= 10.0;
    }
    score -= (details.short_sections_count as f64 * 5.0).min(20.0);

    Ok(RuleOutcome::new(score.max(0.0), issues, details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn run(content: &str) -> RuleOutcome<QualityDetails> {
        check_quality(&Document::new(content), &QualityRules::default()).unwrap()
    }

    #[test]
    fn test_clean_document() {
        let outcome = run("# T\n## Overview\nLine one.\nLine two.\nLine three.\n");
        assert_eq!(outcome.score, 100.0);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_todo_deduction_capped() {
        let outcome = run("# T\nTODO one\nFIXME two\nHACK three\n");
        assert_eq!(outcome.details.todo_markers_found, 3);
        assert_eq!(outcome.score, 60.0);
        let todo = outcome
            .issues
            .iter()
            .find(|i| i.message == "Found TODO/development marker: TODO")
            .unwrap();
        assert_eq!(todo.severity, Severity::Critical);
    }

    #[test]
    fn test_vague_and_passive() {
        let passive = "It is configured. ".repeat(11);
        let outcome = run(&format!("# T\nSimply run it. Just do it.\n{}\n", passive));
        assert_eq!(outcome.details.vague_phrases_found, 2);
        assert_eq!(outcome.details.passive_voice_instances, 11);
        assert_eq!(outcome.score, 100.0 - 10.0 - 10.0);
    }

    #[test]
    fn test_short_sections() {
        let outcome = run("# T\n## A\none\n## B\none\ntwo\n## C\n");
        assert_eq!(outcome.details.short_sections_count, 2);
        assert!(outcome.issues.iter().any(|i| i.location == "A"));
        assert!(!outcome.issues.iter().any(|i| i.location == "C"));
    }

    #[test]
    fn test_extra_patterns() {
        let rules = QualityRules {
            extra_vague_patterns: vec![r"\betc\b".into()],
        };
        let outcome = check_quality(&Document::new("# T\nlogs, metrics, etc.\n"), &rules).unwrap();
        assert_eq!(outcome.details.vague_phrases_found, 1);

        let bad = QualityRules {
            extra_vague_patterns: vec!["(unclosed".into()],
        };
        assert!(matches!(
            check_quality(&Document::new("x"), &bad),
            Err(RuleCheckError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_score_floor() {
        let mut content = String::from("# T\nTODO TODO FIXME\n");
        content.push_str(&"Simply go. ".repeat(6));
        content.push_str(&"It is set. ".repeat(12));
        for i in 0..5 {
            content.push_str(&format!("\n## S{}\nshort\n", i));
        }
        let outcome = run(&content);
        assert_eq!(outcome.score, 10.0);
    }
}
