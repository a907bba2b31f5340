//! Placeholder family.
//!
//! Generators mark information they could not find with
//! [`STANDARD_PLACEHOLDER`]. A few markers are acceptable; informal variants,
//! markers in code and markers in key sections are not.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RuleOutcome;
use crate::model::{Category, Document, ValidationIssue};

/// The one accepted marker for missing information
pub const STANDARD_PLACEHOLDER: &str = "<< INFORMATION NOT AVAILABLE - PLEASE UPDATE >>";

/// More markers than this flags the document as incomplete
const MAX_PLACEHOLDERS: usize = 5;

const INFORMAL_PATTERNS: &[(&str, &str)] = &[
    (r"(?i)\[TBD\]", "[TBD]"),
    (r"(?i)\[TODO\]", "[TODO]"),
    (r"(?i)\[PLACEHOLDER\]", "[PLACEHOLDER]"),
    (r"(?i)\[INSERT.*?\]", "[INSERT...]"),
    (r"(?i)\[ADD.*?\]", "[ADD...]"),
    (r"(?i)\[FILL.*?\]", "[FILL...]"),
    (r"(?i)\[YOUR.*?\]", "[YOUR...]"),
    (r"(?i)<INSERT.*?>", "<INSERT...>"),
    (r"(?i)<ADD.*?>", "<ADD...>"),
    (r"(?i)<YOUR.*?>", "<YOUR...>"),
    (r"(?i)<TBD>", "<TBD>"),
    (r"(?i)<PLACEHOLDER>", "<PLACEHOLDER>"),
    (r"___+", "blank line (___)"),
    (r"(?i)\.\.\.\s*\(to be added\)", "...(to be added)"),
    (r"\?\?\?", "???"),
];

const VARIANT_PATTERNS: &[&str] = &[
    r"(?i)<<\s*INFORMATION\s+NOT\s+AVAILABLE\s*>>",
    r"(?i)<\s*INFORMATION\s+NOT\s+AVAILABLE\s*>",
    r"(?i)\[\s*INFORMATION\s+NOT\s+AVAILABLE\s*\]",
    r"(?i)<<\s*INFORMATION\s+NOT\s+AVAILABLE\s*-\s*PLEASE\s+UPDATE\s*>>",
];

/// Sections that must never rely on placeholders
const KEY_SECTIONS: &[&str] = &["overview", "setup", "prerequisites"];

static INFORMAL_RES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    INFORMAL_PATTERNS
        .iter()
        .map(|(p, label)| (Regex::new(p).expect("informal placeholder regex should compile"), *label))
        .collect()
});

static VARIANT_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    VARIANT_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("placeholder variant regex should compile"))
        .collect()
});

/// Raw counts behind the placeholder score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderDetails {
    pub placeholder_count: usize,
    pub informal_placeholders: usize,
    pub placeholders_in_code: usize,
}

/// Number of standard markers in `content`
pub fn count_placeholders(content: &str) -> usize {
    content.matches(STANDARD_PLACEHOLDER).count()
}

/// `100 - min(100, 5 * count)`
pub fn placeholder_score(count: usize) -> f64 {
    100.0 - (count as f64 * 5.0).min(100.0)
}

/// Run the placeholder family
pub fn check_placeholders(doc: &Document) -> RuleOutcome<PlaceholderDetails> {
    let content = doc.content();
    let mut details = PlaceholderDetails {
        placeholder_count: count_placeholders(content),
        ..PlaceholderDetails::default()
    };
    let mut issues = Vec::new();

    for (re, label) in INFORMAL_RES.iter() {
        let count = re.find_iter(content).count();
        if count == 0 {
            continue;
        }
        details.informal_placeholders += count;
        let mut message = format!("Found informal placeholder: {}", label);
        if count > 1 {
            message.push_str(" (and more)");
        }
        issues.push(
            ValidationIssue::critical(Category::Placeholders, "Document", message)
                .with_suggestion(format!("Use the standard marker: {}", STANDARD_PLACEHOLDER)),
        );
    }

    if details.placeholder_count > MAX_PLACEHOLDERS {
        issues.push(
            ValidationIssue::major(
                Category::Placeholders,
                "Document",
                format!("High number of placeholders found: {}", details.placeholder_count),
            )
            .with_suggestion("Research and fill in missing information where possible"),
        );
    }

    let variant_count: usize = VARIANT_RES.iter().map(|re| re.find_iter(content).count()).sum();
    if variant_count > details.placeholder_count {
        issues.push(
            ValidationIssue::major(
                Category::Placeholders,
                "Document",
                "Non-standard placeholder format detected",
            )
            .with_suggestion(format!("Use exact format: {}", STANDARD_PLACEHOLDER)),
        );
    }

    for block in doc.code_blocks() {
        if block.body.contains(STANDARD_PLACEHOLDER) {
            details.placeholders_in_code += 1;
            issues.push(
                ValidationIssue::critical(
                    Category::Placeholders,
                    format!("Code block at line {}", block.line),
                    "Placeholder found inside code block (invalid syntax)",
                )
                .with_suggestion("Move the marker outside the code block or provide a real value"),
            );
        }
    }

    for section in doc.sections() {
        let title = section.title.to_lowercase();
        let is_key = KEY_SECTIONS.iter().any(|k| title.starts_with(k));
        if is_key && section.body.contains(STANDARD_PLACEHOLDER) {
            issues.push(
                ValidationIssue::major(
                    Category::Placeholders,
                    section.title.clone(),
                    "Critical section contains placeholder",
                )
                .with_suggestion(format!(
                    "The {} section should not have missing information",
                    section.title
                )),
            );
        }
    }

    RuleOutcome::new(placeholder_score(details.placeholder_count), issues, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    #[test]
    fn test_placeholder_score_formula() {
        assert_eq!(placeholder_score(0), 100.0);
        assert_eq!(placeholder_score(3), 85.0);
        assert_eq!(placeholder_score(20), 0.0);
        assert_eq!(placeholder_score(50), 0.0);
    }

    #[test]
    fn test_informal_placeholders_are_critical() {
        let outcome = check_placeholders(&Document::new("# T\nPort: [TBD]\nHost: <INSERT host>\n"));
        let informal: Vec<_> = outcome
            .issues
            .iter()
            .filter(|i| i.message.starts_with("Found informal placeholder"))
            .collect();
        assert_eq!(informal.len(), 2);
        assert!(informal.iter().all(|i| i.severity == Severity::Critical));
    }

    #[test]
    fn test_standard_marker_in_code_and_overview() {
        let content = format!(
            "# T\n## Overview\n{p}\n## Usage\n```yaml\nport: {p}\n```\n",
            p = STANDARD_PLACEHOLDER
        );
        let outcome = check_placeholders(&Document::new(content));
        assert_eq!(outcome.details.placeholder_count, 2);
        assert_eq!(outcome.score, 90.0);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.location == "Overview" && i.severity == Severity::Major));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.contains("inside code block") && i.severity == Severity::Critical));
        assert!(!outcome
            .issues
            .iter()
            .any(|i| i.message == "Non-standard placeholder format detected"));
    }

    #[test]
    fn test_non_standard_variant() {
        let outcome = check_placeholders(&Document::new("# T\n<< information not available >>\n"));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "Non-standard placeholder format detected"));
    }

    #[test]
    fn test_too_many_markers() {
        let content = format!("# T\n{}\n", STANDARD_PLACEHOLDER.repeat(6));
        let outcome = check_placeholders(&Document::new(content));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message == "High number of placeholders found: 6"));
    }
}
