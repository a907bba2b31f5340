//! Structure family: required sections, heading hierarchy, code fences and
//! markdown hygiene.
//!
//! Scoring: required sections and subsections 60 (proportional), recommended
//! sections 20 (proportional), valid heading hierarchy 20.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{RuleOutcome, StructureRules};
use crate::model::{Category, Document, Heading, ValidationIssue};

static MALFORMED_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\s+\(").expect("MALFORMED_LINK regex should compile"));

/// Raw counts behind the structure score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDetails {
    pub required_sections_found: usize,
    pub required_sections_total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_sections: Vec<String>,
    pub recommended_sections_found: usize,
    pub recommended_sections_total: usize,
    pub heading_hierarchy_valid: bool,
}

/// Run the structure family
pub fn check_structure(
    doc: &Document,
    rules: &StructureRules,
) -> RuleOutcome<StructureDetails> {
    let headings = doc.headings();
    let mut details = StructureDetails::default();
    let mut issues = Vec::new();

    check_required(&headings, rules, &mut details, &mut issues);
    check_recommended(&headings, rules, &mut details, &mut issues);
    details.heading_hierarchy_valid = check_hierarchy(&headings, &mut issues);
    check_code_blocks(doc, &mut issues);
    check_formatting(doc, &mut issues);
    check_duplicates(&headings, rules, &mut issues);

    let mut score = if details.required_sections_total > 0 {
        details.required_sections_found as f64 / details.required_sections_total as f64 * 60.0
    } else {
        60.0
    };
    score += if details.recommended_sections_total > 0 {
        details.recommended_sections_found as f64 / details.recommended_sections_total as f64
            * 20.0
    } else {
        20.0
    };
    if details.heading_hierarchy_valid {
        score += 20.0;
    }

    RuleOutcome::new(score, issues, details)
}

fn check_required(
    headings: &[Heading],
    rules: &StructureRules,
    details: &mut StructureDetails,
    issues: &mut Vec<ValidationIssue>,
) {
    for rule in &rules.required {
        details.required_sections_total += 1;
        if headings.iter().any(|h| h.level == 2 && rule.matches(&h.text)) {
            details.required_sections_found += 1;
        } else {
            details.missing_sections.push(rule.name.clone());
            issues.push(
                ValidationIssue::critical(
                    Category::Structure,
                    "Document",
                    format!("Missing required section: {}", rule.name),
                )
                .with_suggestion(format!("Add a '## {}' section", rule.name)),
            );
        }

        for sub in &rule.subsections {
            details.required_sections_total += 1;
            let wanted = sub.trim().to_lowercase();
            let found = headings
                .iter()
                .any(|h| h.level >= 3 && h.text.to_lowercase().starts_with(&wanted));
            if found {
                details.required_sections_found += 1;
            } else {
                details.missing_sections.push(sub.clone());
                issues.push(
                    ValidationIssue::major(
                        Category::Structure,
                        rule.name.clone(),
                        format!("Missing required subsection: {}", sub),
                    )
                    .with_suggestion(format!("Add a '### {}' subsection under {}", sub, rule.name)),
                );
            }
        }
    }
}

fn check_recommended(
    headings: &[Heading],
    rules: &StructureRules,
    details: &mut StructureDetails,
    issues: &mut Vec<ValidationIssue>,
) {
    for rule in &rules.recommended {
        details.recommended_sections_total += 1;
        if headings.iter().any(|h| h.level == 2 && rule.matches(&h.text)) {
            details.recommended_sections_found += 1;
        } else {
            issues.push(
                ValidationIssue::minor(
                    Category::Structure,
                    "Document",
                    format!("Missing recommended section: {}", rule.name),
                )
                .with_suggestion(format!("Consider adding a '## {}' section", rule.name)),
            );
        }
    }
}

/// Returns whether the hierarchy is valid: at least one heading, first is H1,
/// and no level increases by more than one.
fn check_hierarchy(headings: &[Heading], issues: &mut Vec<ValidationIssue>) -> bool {
    let Some(first) = headings.first() else {
        issues.push(
            ValidationIssue::critical(Category::Structure, "Document", "Document has no headings")
                .with_suggestion("Start with a '# Title' heading followed by '##' sections"),
        );
        return false;
    };

    let mut valid = true;
    if first.level != 1 {
        valid = false;
        issues.push(
            ValidationIssue::major(
                Category::Structure,
                first.text.clone(),
                format!("First heading should be H1, found H{}", first.level),
            )
            .with_suggestion("Begin the document with a single '# Title' heading"),
        );
    }

    for pair in headings.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.level > prev.level + 1 {
            valid = false;
            issues.push(
                ValidationIssue::major(
                    Category::Structure,
                    next.text.clone(),
                    format!(
                        "Heading level jumps from H{} to H{}",
                        prev.level, next.level
                    ),
                )
                .with_suggestion(format!("Use H{} here", prev.level + 1)),
            );
        }
    }
    valid
}

fn check_code_blocks(doc: &Document, issues: &mut Vec<ValidationIssue>) {
    for block in doc.code_blocks() {
        let location = format!("Line {}", block.line);
        if block.body.trim().is_empty() {
            issues.push(
                ValidationIssue::critical(Category::Structure, location, "Empty code block")
                    .with_suggestion("Remove the block or fill in the example"),
            );
        } else if block.language.is_none() {
            issues.push(
                ValidationIssue::minor(
                    Category::Structure,
                    location,
                    "Code block without language specifier",
                )
                .with_suggestion("Add a language after the opening fence, e.g. ```yaml"),
            );
        }
    }
}

fn check_formatting(doc: &Document, issues: &mut Vec<ValidationIssue>) {
    let prose = doc.strip_code_blocks();
    let count = MALFORMED_LINK.find_iter(&prose).count();
    if count > 0 {
        issues.push(
            ValidationIssue::major(
                Category::Structure,
                "Document",
                format!("Malformed markdown link ({} with a space between ] and ()", count),
            )
            .with_suggestion("Write links as [text](url) with no space"),
        );
    }
}

fn check_duplicates(headings: &[Heading], rules: &StructureRules, issues: &mut Vec<ValidationIssue>) {
    let h1_count = headings.iter().filter(|h| h.level == 1).count();
    if h1_count > 1 {
        issues.push(
            ValidationIssue::critical(
                Category::Structure,
                "Document",
                format!("Multiple H1 headings found ({})", h1_count),
            )
            .with_suggestion("Keep a single '# Title' and demote the rest"),
        );
    }

    let mut h2_seen: HashMap<String, usize> = HashMap::new();
    let mut h3_seen: HashMap<String, (usize, &str)> = HashMap::new();
    for heading in headings {
        let key = heading.text.to_lowercase();
        match heading.level {
            2 => *h2_seen.entry(key).or_default() += 1,
            3 => h3_seen.entry(key).or_insert((0, heading.text.as_str())).0 += 1,
            _ => {}
        }
    }

    let mut duplicate_h2: Vec<&String> = h2_seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(name, _)| name)
        .collect();
    duplicate_h2.sort();
    for name in duplicate_h2 {
        issues.push(
            ValidationIssue::critical(
                Category::Structure,
                name.clone(),
                format!("Duplicate section: {}", name),
            )
            .with_suggestion("Merge the duplicated sections"),
        );
    }

    let mut repeated_h3: Vec<(usize, &str)> = h3_seen
        .values()
        .filter(|(count, _)| *count > rules.max_repeated_subsection)
        .copied()
        .collect();
    repeated_h3.sort_by(|a, b| a.1.cmp(b.1));
    for (count, text) in repeated_h3 {
        issues.push(ValidationIssue::major(
            Category::Structure,
            text.to_string(),
            format!("Subsection '{}' repeated {} times", text, count),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn run(content: &str) -> RuleOutcome<StructureDetails> {
        check_structure(&Document::new(content), &StructureRules::default())
    }

    fn blocking(outcome: &RuleOutcome<StructureDetails>) -> Vec<&ValidationIssue> {
        outcome.issues.iter().filter(|i| i.is_blocking()).collect()
    }

    #[test]
    fn test_minimal_complete_document_scores_80() {
        let outcome = run("# Title\n## Overview\n### Compatibility\n## Reference\n");
        assert!(outcome.score >= 80.0, "score was {}", outcome.score);
        assert!(blocking(&outcome).is_empty(), "{:?}", outcome.issues);
        assert!(outcome.details.heading_hierarchy_valid);
        assert_eq!(outcome.details.required_sections_found, 3);
    }

    #[test]
    fn test_full_document_scores_100() {
        let outcome = run(
            "# Title\n## Overview\n### Compatibility\n## Setup\n## Troubleshooting\n## Reference\n",
        );
        assert_eq!(outcome.score, 100.0);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_missing_required_section_is_critical() {
        let outcome = run("# Title\n## Overview\n### Compatibility\n");
        let issue = outcome
            .issues
            .iter()
            .find(|i| i.message == "Missing required section: Reference")
            .unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(outcome.details.missing_sections, vec!["Reference".to_string()]);
    }

    #[test]
    fn test_alias_satisfies_requirement() {
        let outcome = run("# Title\n## Introduction\n### Compatibility\n## Exported fields\n");
        assert!(blocking(&outcome).is_empty(), "{:?}", outcome.issues);
    }

    #[test]
    fn test_heading_jump_is_major() {
        let outcome = run("# Title\n### Deep\n## Overview\n### Compatibility\n## Reference\n");
        assert!(!outcome.details.heading_hierarchy_valid);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Heading level jumps from H1 to H3" && i.severity == Severity::Major));
    }

    #[test]
    fn test_no_headings_is_critical() {
        let outcome = run("just text\n");
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Document has no headings" && i.severity == Severity::Critical));
        assert!(!outcome.details.heading_hierarchy_valid);
    }

    #[test]
    fn test_code_block_rules() {
        let outcome = run("# T\n```\n```\n```\nls\n```\n");
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Empty code block" && i.severity == Severity::Critical));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Code block without language specifier"
                && i.severity == Severity::Minor));
    }

    #[test]
    fn test_duplicate_headings() {
        let outcome = run("# A\n# B\n## Overview\n## Overview\n");
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.starts_with("Multiple H1 headings")));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Duplicate section: overview"));
    }

    #[test]
    fn test_malformed_link() {
        let outcome = run("# T\nSee [docs] (https://x.io).\n");
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.starts_with("Malformed markdown link")));
    }
}
