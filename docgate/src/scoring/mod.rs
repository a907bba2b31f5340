//! Composite quality scoring
//!
//! Scores a whole document on four axes plus a placeholder penalty, using
//! the same rule families the stage validators run, and blends them with
//! fixed weights:
//!
//! ```text
//! composite = 0.20·structure + 0.30·accuracy + 0.25·completeness
//!           + 0.15·quality   + 0.10·placeholder_score
//! placeholder_score = 100 − min(100, 5·markers)
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::{Document, PackageContext};
use crate::rules::{
    check_accuracy, check_completeness, check_placeholders, check_quality, check_structure,
    placeholders::placeholder_score, AccuracyDetails, CompletenessDetails, PlaceholderDetails,
    QualityDetails, RuleSet, StructureDetails,
};

pub const WEIGHT_STRUCTURE: f64 = 0.20;
pub const WEIGHT_ACCURACY: f64 = 0.30;
pub const WEIGHT_COMPLETENESS: f64 = 0.25;
pub const WEIGHT_QUALITY: f64 = 0.15;
pub const WEIGHT_PLACEHOLDERS: f64 = 0.10;

/// Raw counts behind each axis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsDetails {
    pub structure: StructureDetails,
    pub accuracy: AccuracyDetails,
    pub completeness: CompletenessDetails,
    pub quality: QualityDetails,
    pub placeholders: PlaceholderDetails,
    pub total_word_count: usize,
    pub total_line_count: usize,
    pub code_block_count: usize,
}

/// Scores for one document, each in `[0, 100]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub structure_score: f64,
    pub accuracy_score: f64,
    pub completeness_score: f64,
    pub quality_score: f64,
    pub placeholder_count: usize,
    pub placeholder_score: f64,
    pub composite_score: f64,
    #[serde(default)]
    pub details: MetricsDetails,
}

impl QualityMetrics {
    /// Weighted blend of the axis scores, clamped to `[0, 100]`
    pub fn composite(
        structure: f64,
        accuracy: f64,
        completeness: f64,
        quality: f64,
        placeholder: f64,
    ) -> f64 {
        (structure * WEIGHT_STRUCTURE
            + accuracy * WEIGHT_ACCURACY
            + completeness * WEIGHT_COMPLETENESS
            + quality * WEIGHT_QUALITY
            + placeholder * WEIGHT_PLACEHOLDERS)
            .clamp(0.0, 100.0)
    }

    /// One-line summary for logs and CLI output
    pub fn summary_line(&self) -> String {
        format!(
            "composite={:.1} structure={:.1} accuracy={:.1} completeness={:.1} quality={:.1} placeholders={}",
            self.composite_score,
            self.structure_score,
            self.accuracy_score,
            self.completeness_score,
            self.quality_score,
            self.placeholder_count
        )
    }
}

/// Score `content` with the default rule set
pub fn score_document(content: &str, ctx: &PackageContext) -> QualityMetrics {
    score_with_rules(&Document::new(content), ctx, &RuleSet::default())
}

/// Score a document. An axis whose rule family fails internally scores 0.
pub fn score_with_rules(doc: &Document, ctx: &PackageContext, rules: &RuleSet) -> QualityMetrics {
    let mut details = MetricsDetails::default();

    let structure = check_structure(doc, &rules.structure);
    details.structure = structure.details;

    let accuracy_score = match check_accuracy(doc, ctx) {
        Ok(outcome) => {
            details.accuracy = outcome.details;
            outcome.score
        }
        Err(e) => {
            warn!(error = %e, "accuracy scoring failed");
            0.0
        }
    };

    let completeness = check_completeness(doc, ctx);
    details.completeness = completeness.details;

    let quality_score = match check_quality(doc, &rules.quality) {
        Ok(outcome) => {
            details.quality = outcome.details;
            outcome.score
        }
        Err(e) => {
            warn!(error = %e, "quality scoring failed");
            0.0
        }
    };

    let placeholders = check_placeholders(doc);
    let placeholder_count = placeholders.details.placeholder_count;
    let placeholder = placeholder_score(placeholder_count);
    details.placeholders = placeholders.details;

    details.total_word_count = doc.word_count();
    details.total_line_count = doc.line_count();
    details.code_block_count = doc.code_blocks().len();

    QualityMetrics {
        structure_score: structure.score,
        accuracy_score,
        completeness_score: completeness.score,
        quality_score,
        placeholder_count,
        placeholder_score: placeholder,
        composite_score: QualityMetrics::composite(
            structure.score,
            accuracy_score,
            completeness.score,
            quality_score,
            placeholder,
        ),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataStreamInfo, PackageManifest};
    use crate::rules::STANDARD_PLACEHOLDER;

    const GOOD_DOC: &str = "# Nginx Integration

## Overview

The Nginx integration collects access and error logs from Nginx servers.

### Compatibility

Tested with Nginx 1.19 and later on Linux.

## Setup

### Vendor prerequisites

Enable the stub_status module in the Nginx configuration file.
Restart the Nginx service after editing the configuration.
Confirm the status page responds on the configured port.

### Onboard the integration

Add the Nginx integration from the integrations page.
Set the log paths for access and error logs.
Save the policy and deploy the agent.

### Validation

Open Discover and filter on the nginx.access dataset.
Confirm new events arrive within a few minutes.
Check that the dashboards show recent data.

## Troubleshooting

If no data arrives, check file permissions on the log paths.
Confirm the agent runs with read access to the log directory.
Review the agent logs for parsing errors.

## Reference

### access

The `access` data stream collects Nginx access logs.
It parses request method, status and bytes.
Each event carries the source address.
";

    fn nginx_ctx() -> PackageContext {
        PackageContext::new(PackageManifest {
            name: "nginx".into(),
            title: "Nginx".into(),
            version: "1.0.0".into(),
            description: String::new(),
        })
        .with_data_stream(DataStreamInfo {
            name: "access".into(),
            kind: "logs".into(),
            title: "Nginx access logs".into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = WEIGHT_STRUCTURE
            + WEIGHT_ACCURACY
            + WEIGHT_COMPLETENESS
            + WEIGHT_QUALITY
            + WEIGHT_PLACEHOLDERS;
        assert!((sum - 1.0).abs() < 1e-12, "weights sum to {}", sum);
    }

    #[test]
    fn test_composite_bounds() {
        assert_eq!(QualityMetrics::composite(100.0, 100.0, 100.0, 100.0, 100.0), 100.0);
        assert_eq!(QualityMetrics::composite(0.0, 0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(QualityMetrics::composite(500.0, 500.0, 0.0, 0.0, 0.0), 100.0);
    }

    #[test]
    fn test_good_document_scores_high() {
        let metrics = score_document(GOOD_DOC, &nginx_ctx());
        assert!(metrics.structure_score >= 80.0, "{}", metrics.summary_line());
        assert!(metrics.composite_score > 70.0, "{}", metrics.summary_line());
        assert!(metrics.composite_score <= 100.0);
        assert_eq!(metrics.placeholder_count, 0);
        assert_eq!(metrics.placeholder_score, 100.0);
        assert!(metrics.details.completeness.has_setup_section);
    }

    #[test]
    fn test_empty_document_stays_in_range() {
        let metrics = score_document("", &PackageContext::default());
        assert!((0.0..=100.0).contains(&metrics.composite_score));
        assert_eq!(metrics.details.total_word_count, 0);
    }

    #[test]
    fn test_placeholder_penalty_caps() {
        let content = format!("# T\n{}", STANDARD_PLACEHOLDER.repeat(30));
        let metrics = score_document(&content, &PackageContext::default());
        assert_eq!(metrics.placeholder_count, 30);
        assert_eq!(metrics.placeholder_score, 0.0);
    }
}
