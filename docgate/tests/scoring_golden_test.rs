//! Standard validators, composite scoring and golden baselines working
//! together on realistic documents.

use std::sync::Arc;

use async_trait::async_trait;

use docgate::golden::GoldenMetadata;
use docgate::model::{DataStreamInfo, PackageManifest};
use docgate::rules::STANDARD_PLACEHOLDER;
use docgate::{
    compare, merge, score_document, Category, GenerationError, GenerationRequest, Generator,
    GoldenBaseline, GoldenFile, GoldenStore, HarnessConfig, IssueSource, PackageContext,
    SessionOrchestrator, StageVerdict, ValidationIssue, ValidationResult, ValidationStage,
};

const GOOD_DOC: &str = "# Nginx Integration

## Overview

The Nginx integration collects access logs from Nginx web servers.

### Compatibility

Tested with Nginx 1.19 and later.

## Setup

### Vendor prerequisites

Enable access logging in the Nginx configuration file.
Restart the Nginx service after editing the configuration.
Confirm that the log file is being written.

### Onboard the integration

Add the Nginx integration from the integrations page.
Set the path to the access log file.
Save the policy and deploy the agent.

### Validation

Open Discover and filter on the nginx.access dataset.
Confirm new events arrive within a few minutes.
Check that the dashboards show recent data.

## Troubleshooting

If no data arrives, check file permissions on the log path.
Confirm the agent can read the log directory.
Review the agent logs for parsing errors.

## Reference

### access

The `access` data stream collects Nginx access logs.
Each event carries the request method and response status.
Events also record the number of bytes sent.
";

fn nginx_ctx() -> PackageContext {
    PackageContext::new(PackageManifest {
        name: "nginx".into(),
        title: "Nginx".into(),
        version: "1.2.0".into(),
        description: "Nginx logs".into(),
    })
    .with_data_stream(DataStreamInfo {
        name: "access".into(),
        kind: "logs".into(),
        title: "Nginx access logs".into(),
        ..Default::default()
    })
}

/// Generator that always answers with the finished document
struct FixedGenerator;

#[async_trait]
impl Generator for FixedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        Ok(GOOD_DOC.to_string())
    }
}

// ── Standard validators in a session ───────────────────────────────

#[tokio::test]
async fn test_structure_stage_repairs_draft() {
    let config = HarnessConfig {
        stages: vec![ValidationStage::Structure],
        enable_semantic: false,
        ..HarnessConfig::default()
    };
    let orch = SessionOrchestrator::new(config, Arc::new(FixedGenerator));

    let session = orch
        .run("# Nginx\n\nSome notes.\n", &nginx_ctx())
        .await
        .unwrap();

    assert!(session.approved);
    assert_eq!(session.final_document, GOOD_DOC);
    assert_eq!(session.total_iterations, 2);
    let report = &session.stage_reports[0];
    assert_eq!(report.verdict, StageVerdict::Passed);
    assert!(report.result.score >= 80);
    assert!(session.issue_history[0] > 0);
    assert_eq!(session.issue_history[1], 0);
}

#[tokio::test]
async fn test_anchor_links_fail_urls_stage() {
    let config = HarnessConfig {
        stages: vec![ValidationStage::Urls],
        enable_semantic: false,
        ..HarnessConfig::quick()
    };
    let orch = SessionOrchestrator::new(config, Arc::new(FixedGenerator));
    let doc = format!("{}\nSee [setup](#setup) for details.\n", GOOD_DOC);

    let session = orch.run(doc, &nginx_ctx()).await.unwrap();

    let result = session.stage_result(ValidationStage::Urls).unwrap();
    assert!(!result.valid);
    assert!(result
        .issues
        .iter()
        .any(|i| i.category == Category::Urls && i.is_blocking()));
    assert_eq!(session.total_iterations, 1);
}

// ── Composite scoring ──────────────────────────────────────────────

#[test]
fn test_good_document_scores_above_draft() {
    let ctx = nginx_ctx();
    let good = score_document(GOOD_DOC, &ctx);
    let draft = score_document("# Nginx\n\nTODO write docs\n", &ctx);

    assert!(good.structure_score >= 80.0);
    assert!(good.composite_score > draft.composite_score);
    assert_eq!(good.details.accuracy.data_streams_documented, 1);
    for metrics in [&good, &draft] {
        assert!((0.0..=100.0).contains(&metrics.composite_score));
    }
}

#[test]
fn test_placeholders_lower_composite() {
    let ctx = nginx_ctx();
    let clean = score_document(GOOD_DOC, &ctx);
    let marked = score_document(
        &format!("{}\n{}\n{}\n", GOOD_DOC, STANDARD_PLACEHOLDER, STANDARD_PLACEHOLDER),
        &ctx,
    );
    assert_eq!(marked.placeholder_count, 2);
    assert_eq!(marked.placeholder_score, 90.0);
    assert!(marked.composite_score < clean.composite_score);
}

// ── Merge ──────────────────────────────────────────────────────────

#[test]
fn test_merge_keeps_deterministic_copy_of_duplicate() {
    let det = ValidationResult::from_issues(
        ValidationStage::Quality,
        80,
        vec![ValidationIssue::major(Category::Quality, "Setup", "Vague wording")],
    );
    let mut semantic_issue = ValidationIssue::major(Category::Quality, "Setup", "Vague wording")
        .with_source(IssueSource::Semantic);
    semantic_issue.suggestion = Some("Be specific".into());
    let sem = ValidationResult::from_issues(ValidationStage::Quality, 60, vec![semantic_issue]);

    let merged = merge(ValidationStage::Quality, Some(&det), Some(&sem));
    assert_eq!(merged.issues.len(), 1);
    assert_eq!(merged.issues[0].source, IssueSource::Deterministic);
    assert_eq!(merged.score, 60);
    assert!(!merged.valid);
}

// ── Golden baselines ───────────────────────────────────────────────

#[test]
fn test_self_comparison_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = GoldenStore::new(dir.path());
    let ctx = nginx_ctx();
    store
        .save(&GoldenFile::new("nginx", GOOD_DOC).with_metadata(GoldenMetadata::new("fixture")))
        .unwrap();

    let comparison = store.compare_with_golden("nginx", GOOD_DOC, &ctx).unwrap();
    let result = &comparison.result;
    assert_eq!(result.section_coverage, 100.0);
    assert_eq!(result.content_similarity, 100.0);
    assert_eq!(result.score_delta, 0.0);
    assert!(result.passed);

    let (valid, invalid) = store.validate_all();
    assert_eq!(valid, vec!["nginx".to_string()]);
    assert!(invalid.is_empty());
}

#[test]
fn test_regressed_candidate_fails() {
    let ctx = nginx_ctx();
    let baseline = GoldenBaseline::new(GOOD_DOC, &ctx);
    let result = compare("# Nginx\n\n## Overview\n\nTBD\n", &baseline, &ctx);

    assert!(!result.passed);
    assert!(result.score_delta < 0.0);
    assert!(result.percent_change < 0.0);
    assert!(result.missing_sections.contains(&"setup".to_string()));
    assert!(result.section_coverage < 100.0);
    assert!(result.content_similarity < 100.0);
}
