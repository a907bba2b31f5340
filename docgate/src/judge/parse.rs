//! Strict parsing of judgment responses into [`ValidationResult`]

use serde::Deserialize;
use tracing::debug;

use crate::error::JudgmentError;
use crate::model::{
    Category, IssueSource, Severity, ValidationIssue, ValidationResult, ValidationStage,
};

#[derive(Debug, Deserialize)]
struct JudgmentPayload {
    valid: bool,
    score: f64,
    #[serde(default)]
    issues: Option<Vec<IssuePayload>>,
    #[serde(default)]
    warnings: Option<Vec<String>>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssuePayload {
    severity: String,
    category: String,
    message: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
}

const REQUIRED_FIELDS: &[&str] = &["valid", "score"];
const REQUIRED_ISSUE_FIELDS: &[&str] = &["severity", "category", "message"];

/// Pull the JSON object out of a model response: strips markdown fences and
/// any prose around the outermost braces.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (end > start).then(|| &unfenced[start..=end])
}

/// Parse a judgment response for `stage`.
///
/// `valid` and `score` are required, as are `severity`, `category` and
/// `message` on each issue. Unknown fields are ignored and `null` lists or
/// locations read as empty. An unrecognised issue category falls back to the
/// stage's own category; an unrecognised severity reads as major.
pub fn parse_judgment(
    raw: &str,
    stage: ValidationStage,
) -> Result<ValidationResult, JudgmentError> {
    let json = extract_json(raw).ok_or_else(|| JudgmentError::parse("no JSON object found"))?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| JudgmentError::parse(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| JudgmentError::parse("response is not a JSON object"))?;
    for field in REQUIRED_FIELDS {
        if !object.contains_key(*field) {
            return Err(JudgmentError::MissingField((*field).to_string()));
        }
    }
    if let Some(issues) = object.get("issues").and_then(|v| v.as_array()) {
        for (i, issue) in issues.iter().enumerate() {
            for field in REQUIRED_ISSUE_FIELDS {
                if issue.get(*field).is_none() {
                    return Err(JudgmentError::MissingField(format!("issues[{}].{}", i, field)));
                }
            }
        }
    }

    let payload: JudgmentPayload =
        serde_json::from_value(value).map_err(|e| JudgmentError::parse(e.to_string()))?;

    let issues = payload
        .issues
        .unwrap_or_default()
        .into_iter()
        .map(|p| to_issue(p, stage))
        .collect();

    let mut suggestions = payload.suggestions.unwrap_or_default();
    if let Some(summary) = payload.summary.filter(|s| !s.trim().is_empty()) {
        suggestions.push(summary);
    }

    Ok(ValidationResult {
        stage,
        valid: payload.valid,
        score: payload.score.round().clamp(0.0, 100.0) as u8,
        issues,
        warnings: payload.warnings.unwrap_or_default(),
        suggestions,
        iterations_used: 0,
    })
}

fn to_issue(p: IssuePayload, stage: ValidationStage) -> ValidationIssue {
    let severity: Severity = p.severity.parse().unwrap_or_else(|e| {
        debug!(%stage, error = %e, "unrecognised judgment severity, treating as major");
        Severity::Major
    });
    let category: Category = p.category.parse().unwrap_or_else(|_| stage.category());
    let location = match p.location {
        Some(location) if !location.trim().is_empty() => location,
        _ => "Document".to_string(),
    };

    let mut issue = ValidationIssue::new(severity, category, location, p.message)
        .with_source(IssueSource::Semantic);
    issue.suggestion = p.suggestion.filter(|s| !s.trim().is_empty());
    issue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fenced_response() {
        let raw = "```json\n{\"valid\": true, \"score\": 91, \"issues\": [], \"extra\": 1}\n```";
        let result = parse_judgment(raw, ValidationStage::Structure).unwrap();
        assert!(result.valid);
        assert_eq!(result.score, 91);
    }

    #[test]
    fn test_issues_are_tagged_semantic() {
        let raw = r#"Here you go: {"valid": false, "score": 40, "issues": [
            {"severity": "CRITICAL", "category": "links", "location": "", "message": "Dead link", "suggestion": "Remove it"}
        ], "warnings": ["slow"]}"#;
        let result = parse_judgment(raw, ValidationStage::Urls).unwrap();
        let issue = &result.issues[0];
        assert_eq!(issue.source, IssueSource::Semantic);
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.category, Category::Urls);
        assert_eq!(issue.location, "Document");
        assert_eq!(issue.suggestion.as_deref(), Some("Remove it"));
        assert_eq!(result.warnings, vec!["slow".to_string()]);
    }

    #[test]
    fn test_unknown_category_falls_back_to_stage() {
        let raw = r#"{"valid": false, "score": 50, "issues": [
            {"severity": "minor", "category": "style", "message": "Wordy"}
        ]}"#;
        let result = parse_judgment(raw, ValidationStage::Quality).unwrap();
        assert_eq!(result.issues[0].category, Category::Quality);
    }

    #[test]
    fn test_missing_required_fields() {
        let err = parse_judgment(r#"{"score": 10}"#, ValidationStage::Quality).unwrap_err();
        assert!(matches!(err, JudgmentError::MissingField(ref f) if f == "valid"));

        let err = parse_judgment(
            r#"{"valid": false, "score": 10, "issues": [{"severity": "minor", "category": "quality"}]}"#,
            ValidationStage::Quality,
        )
        .unwrap_err();
        assert!(matches!(err, JudgmentError::MissingField(ref f) if f == "issues[0].message"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_judgment("not json", ValidationStage::Quality),
            Err(JudgmentError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_severity_reads_as_major() {
        let raw = r#"{"valid": false, "score": 10, "issues": [{"severity": "high", "category": "quality", "message": "x"}]}"#;
        let result = parse_judgment(raw, ValidationStage::Quality).unwrap();
        assert!(!result.valid);
        assert_eq!(result.issues[0].severity, Severity::Major);
        assert!(result.issues[0].is_blocking());
    }

    #[test]
    fn test_null_location_keeps_rejection() {
        let raw = r#"{"valid": false, "score": 35, "issues": [
            {"severity": "major", "category": "quality", "location": null, "message": "Vague"}
        ]}"#;
        let result = parse_judgment(raw, ValidationStage::Quality).unwrap();
        assert!(!result.valid);
        assert_eq!(result.score, 35);
        assert_eq!(result.issues[0].location, "Document");
    }

    #[test]
    fn test_null_lists_read_as_empty() {
        let raw = r#"{"valid": false, "score": 20, "issues": null, "warnings": null, "suggestions": null}"#;
        let result = parse_judgment(raw, ValidationStage::Accuracy).unwrap();
        assert!(!result.valid);
        assert_eq!(result.score, 20);
        assert!(result.issues.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_score_is_clamped() {
        let result = parse_judgment(r#"{"valid": true, "score": 140}"#, ValidationStage::Quality)
            .unwrap();
        assert_eq!(result.score, 100);
    }
}
