//! Accuracy family: does the document agree with the package metadata?
//!
//! Scoring (with a manifest): package name 20, package title 20, data
//! streams 40 proportional, dotted field references 20 proportional to the
//! valid/total ratio. Without a manifest the axis is a neutral 50.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RuleOutcome;
use crate::error::{RuleCheckError, RuleResult};
use crate::model::{Category, Document, PackageContext, ValidationIssue};

static FIELD_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([a-z][a-z0-9_\.]+)`").expect("FIELD_REF regex should compile"));

/// Substrings that mark a backticked token as a file or path, not a field
const NON_FIELD_MARKERS: &[&str] = &[
    ".yml",
    ".yaml",
    ".json",
    ".md",
    ".log",
    "data_stream",
    "_dev",
    "_meta",
    "/",
];

/// Namespaces accepted without being declared by the package
const COMMON_FIELD_PREFIXES: &[&str] = &[
    "event.",
    "host.",
    "agent.",
    "ecs.",
    "message.",
    "log.",
    "error.",
    "source.",
    "destination.",
    "network.",
    "process.",
    "file.",
    "user.",
    "url.",
    "http.",
    "dns.",
    "tls.",
    "service.",
    "cloud.",
    "container.",
    "@timestamp",
];

/// Raw counts behind the accuracy score
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyDetails {
    pub context_available: bool,
    pub package_name_found: bool,
    pub package_title_found: bool,
    pub data_streams_documented: usize,
    pub data_streams_total: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_data_streams: Vec<String>,
    pub field_references_valid: usize,
    pub field_references_invalid: usize,
}

fn is_common_non_field(token: &str) -> bool {
    NON_FIELD_MARKERS.iter().any(|m| token.contains(m))
}

fn has_common_prefix(token: &str) -> bool {
    COMMON_FIELD_PREFIXES.iter().any(|p| token.starts_with(p))
}

/// Run the accuracy family.
///
/// Fails only if a version pattern built from the package name cannot be
/// compiled.
pub fn check_accuracy(
    doc: &Document,
    ctx: &PackageContext,
) -> RuleResult<RuleOutcome<AccuracyDetails>> {
    let Some(manifest) = ctx.manifest.as_ref() else {
        return Ok(RuleOutcome::new(50.0, Vec::new(), AccuracyDetails::default()));
    };

    let content = doc.content();
    let lower = content.to_lowercase();
    let mut details = AccuracyDetails {
        context_available: true,
        ..AccuracyDetails::default()
    };
    let mut issues = Vec::new();
    let mut score = 0.0;

    if !manifest.name.is_empty() && lower.contains(&manifest.name.to_lowercase()) {
        details.package_name_found = true;
        score += 20.0;
    }

    if !manifest.title.is_empty() {
        if content.contains(&manifest.title) {
            details.package_title_found = true;
            score += 20.0;
        } else {
            issues.push(
                ValidationIssue::major(
                    Category::Accuracy,
                    "Document",
                    format!("Package title '{}' not found in documentation", manifest.title),
                )
                .with_suggestion(format!("Mention '{}' in the title or overview", manifest.title)),
            );
        }
    }

    details.data_streams_total = ctx.data_streams.len();
    for ds in &ctx.data_streams {
        let by_name = lower.contains(&ds.name.to_lowercase());
        let by_title = !ds.title.is_empty() && lower.contains(&ds.title.to_lowercase());
        if by_name || by_title {
            details.data_streams_documented += 1;
        } else {
            details.missing_data_streams.push(ds.name.clone());
            issues.push(
                ValidationIssue::critical(
                    Category::Accuracy,
                    "Data streams",
                    format!("Data stream '{}' ({}) not documented", ds.name, ds.kind),
                )
                .with_suggestion(format!("Describe the '{}' data stream", ds.name)),
            );
        }
    }
    score += if details.data_streams_total > 0 {
        details.data_streams_documented as f64 / details.data_streams_total as f64 * 40.0
    } else {
        40.0
    };

    let known = ctx.all_field_names();
    let mut reported: HashSet<&str> = HashSet::new();
    for caps in FIELD_REF.captures_iter(content) {
        let Some(token) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if !token.contains('.') || is_common_non_field(token) {
            continue;
        }
        if known.contains(token) || has_common_prefix(token) {
            details.field_references_valid += 1;
            continue;
        }
        details.field_references_invalid += 1;
        if !known.is_empty() && reported.insert(token) {
            issues.push(
                ValidationIssue::minor(
                    Category::Accuracy,
                    "Field references",
                    format!("Field '{}' referenced but not declared by the package", token),
                )
                .with_suggestion("Verify the field name or use a common namespace field"),
            );
        }
    }
    let total_refs = details.field_references_valid + details.field_references_invalid;
    score += if total_refs > 0 {
        details.field_references_valid as f64 / total_refs as f64 * 20.0
    } else {
        20.0
    };

    issues.extend(check_version(&lower, ctx)?);

    Ok(RuleOutcome::new(score, issues, details))
}

/// Explicit mentions of the package version must match the manifest
fn check_version(lower: &str, ctx: &PackageContext) -> RuleResult<Vec<ValidationIssue>> {
    let version = ctx.version();
    if version.is_empty() {
        return Ok(Vec::new());
    }

    let tail = r#"\s+version\s*[:\s]+["']?(\d+\.\d+\.\d+)["']?"#;
    let mut patterns = vec![format!(r"(?:package|integration){}", tail)];
    let name = ctx.name().to_lowercase();
    let title = ctx.title().to_lowercase();
    if !name.is_empty() {
        patterns.push(format!("{}{}", regex::escape(&name), tail));
    }
    if !title.is_empty() && title != name {
        patterns.push(format!("{}{}", regex::escape(&title), tail));
    }

    let mut issues = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for pattern in patterns {
        let re = Regex::new(&pattern)
            .map_err(|e| RuleCheckError::invalid_pattern(&pattern, e.to_string()))?;
        for caps in re.captures_iter(lower) {
            let Some(mentioned) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if mentioned != version && seen.insert(mentioned.to_string()) {
                issues.push(
                    ValidationIssue::minor(
                        Category::Accuracy,
                        "Version",
                        format!(
                            "Package version '{}' mentioned doesn't match manifest version '{}'",
                            mentioned, version
                        ),
                    )
                    .with_suggestion(format!("Use version {}", version)),
                );
            }
        }
    }
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataStreamInfo, PackageManifest, Severity};

    fn ctx() -> PackageContext {
        PackageContext::new(PackageManifest {
            name: "nginx".into(),
            title: "Nginx".into(),
            version: "1.2.0".into(),
            description: String::new(),
        })
        .with_data_stream(DataStreamInfo {
            name: "access".into(),
            kind: "logs".into(),
            title: "Access logs".into(),
            ..DataStreamInfo::default()
        })
        .with_data_stream(DataStreamInfo {
            name: "stubstatus".into(),
            kind: "metrics".into(),
            ..DataStreamInfo::default()
        })
        .with_fields("access", vec!["nginx.access.remote_ip".into()])
    }

    #[test]
    fn test_no_manifest_is_neutral() {
        let outcome = check_accuracy(&Document::new("# Anything"), &PackageContext::default()).unwrap();
        assert_eq!(outcome.score, 50.0);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_full_marks() {
        let doc = Document::new(
            "# Nginx\nThe nginx integration collects access logs and stubstatus metrics.\n\
             Fields: `nginx.access.remote_ip`, `event.dataset`.\n",
        );
        let outcome = check_accuracy(&doc, &ctx()).unwrap();
        assert_eq!(outcome.score, 100.0);
        assert!(outcome.issues.is_empty(), "{:?}", outcome.issues);
        assert_eq!(outcome.details.field_references_valid, 2);
    }

    #[test]
    fn test_missing_stream_and_unknown_field() {
        let doc = Document::new("# Nginx\nnginx access. See `nginx.bogus.field` and `manifest.yml`.\n");
        let outcome = check_accuracy(&doc, &ctx()).unwrap();

        let missing = outcome
            .issues
            .iter()
            .find(|i| i.message.starts_with("Data stream 'stubstatus'"))
            .unwrap();
        assert_eq!(missing.severity, Severity::Critical);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.contains("nginx.bogus.field") && i.severity == Severity::Minor));
        assert_eq!(outcome.details.field_references_invalid, 1);
        // 20 + 20 + 20 (one of two streams) + 0 (no valid refs)
        assert_eq!(outcome.score, 60.0);
    }

    #[test]
    fn test_version_mismatch() {
        let doc = Document::new("# Nginx\nnginx version: 1.1.0\npackage version 1.2.0\n");
        let outcome = check_accuracy(&doc, &ctx()).unwrap();
        let mismatches: Vec<_> = outcome
            .issues
            .iter()
            .filter(|i| i.location == "Version")
            .collect();
        assert_eq!(mismatches.len(), 1);
        assert!(mismatches[0].message.contains("'1.1.0'"));
    }
}
