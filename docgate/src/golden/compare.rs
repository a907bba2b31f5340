//! Candidate versus baseline comparison

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{Document, PackageContext};
use crate::scoring::{score_document, QualityMetrics};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{3,}\b").expect("WORD regex should compile"));

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "have", "been", "from", "this", "that", "with", "they", "will", "would",
];

/// Candidate must reach this share of the baseline composite to pass
pub const PASS_RATIO: f64 = 0.9;

/// A stored reference document and its metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenBaseline {
    pub reference_document: String,
    pub reference_metrics: QualityMetrics,
}

impl GoldenBaseline {
    /// Baseline scored against `ctx`
    pub fn new(reference_document: impl Into<String>, ctx: &PackageContext) -> Self {
        let reference_document = reference_document.into();
        let reference_metrics = score_document(&reference_document, ctx);
        Self {
            reference_document,
            reference_metrics,
        }
    }
}

/// Per-axis `candidate - reference`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisDeltas {
    pub structure: f64,
    pub accuracy: f64,
    pub completeness: f64,
    pub quality: f64,
    pub placeholders: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub candidate_metrics: QualityMetrics,
    pub reference_metrics: QualityMetrics,
    pub score_delta: f64,
    /// `score_delta` relative to the reference composite; 0 when the
    /// reference scored 0
    pub percent_change: f64,
    pub axis_deltas: AxisDeltas,
    /// Share of reference H2 sections present in the candidate, `[0, 100]`
    pub section_coverage: f64,
    /// Word overlap, `[0, 100]`
    pub content_similarity: f64,
    pub matching_sections: Vec<String>,
    pub missing_sections: Vec<String>,
    pub extra_sections: Vec<String>,
    pub passed: bool,
}

/// Compare `candidate` against `baseline`. Candidate metrics are computed
/// with `ctx`; the baseline's stored metrics are used as-is.
pub fn compare(candidate: &str, baseline: &GoldenBaseline, ctx: &PackageContext) -> ComparisonResult {
    let candidate_metrics = score_document(candidate, ctx);
    let reference_metrics = baseline.reference_metrics.clone();

    let candidate_doc = Document::new(candidate);
    let reference_doc = Document::new(baseline.reference_document.as_str());

    let score_delta = candidate_metrics.composite_score - reference_metrics.composite_score;
    let percent_change = if reference_metrics.composite_score > 0.0 {
        score_delta / reference_metrics.composite_score * 100.0
    } else {
        0.0
    };

    let axis_deltas = AxisDeltas {
        structure: candidate_metrics.structure_score - reference_metrics.structure_score,
        accuracy: candidate_metrics.accuracy_score - reference_metrics.accuracy_score,
        completeness: candidate_metrics.completeness_score - reference_metrics.completeness_score,
        quality: candidate_metrics.quality_score - reference_metrics.quality_score,
        placeholders: candidate_metrics.placeholder_count as i64
            - reference_metrics.placeholder_count as i64,
    };

    let candidate_sections = section_titles(&candidate_doc);
    let reference_sections = section_titles(&reference_doc);
    let matching_sections: Vec<String> = reference_sections
        .intersection(&candidate_sections)
        .cloned()
        .collect();
    let missing_sections: Vec<String> = reference_sections
        .difference(&candidate_sections)
        .cloned()
        .collect();
    let extra_sections: Vec<String> = candidate_sections
        .difference(&reference_sections)
        .cloned()
        .collect();
    let section_coverage = if reference_sections.is_empty() {
        100.0
    } else {
        matching_sections.len() as f64 / reference_sections.len() as f64 * 100.0
    };

    let passed =
        candidate_metrics.composite_score >= reference_metrics.composite_score * PASS_RATIO;

    ComparisonResult {
        content_similarity: content_similarity(&candidate_doc, &reference_doc),
        candidate_metrics,
        reference_metrics,
        score_delta,
        percent_change,
        axis_deltas,
        section_coverage,
        matching_sections,
        missing_sections,
        extra_sections,
        passed,
    }
}

/// Lowercased H2 titles
fn section_titles(doc: &Document) -> BTreeSet<String> {
    doc.h2_titles()
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .collect()
}

/// Distinct lowercased words of three or more letters outside code, minus
/// stop words
fn significant_words(doc: &Document) -> BTreeSet<String> {
    let text = doc.strip_code_blocks();
    WORD.find_iter(&text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// `|common| / max(|a|, |b|) * 100`; two documents without words are
/// identical
fn content_similarity(a: &Document, b: &Document) -> f64 {
    let words_a = significant_words(a);
    let words_b = significant_words(b);
    let max = words_a.len().max(words_b.len());
    if max == 0 {
        return 100.0;
    }
    let common = words_a.intersection(&words_b).count();
    common as f64 / max as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: &str = "# Demo\n\n## Overview\n\nCollects metrics from demo servers.\n\n\
        ## Setup\n\nInstall the agent and configure the endpoint.\n\n\
        ## Reference\n\nExported fields are listed below.\n";

    #[test]
    fn test_self_comparison_is_perfect() {
        let ctx = PackageContext::default();
        let baseline = GoldenBaseline::new(REFERENCE, &ctx);
        let result = compare(REFERENCE, &baseline, &ctx);
        assert_eq!(result.section_coverage, 100.0);
        assert_eq!(result.content_similarity, 100.0);
        assert_eq!(result.score_delta, 0.0);
        assert_eq!(result.percent_change, 0.0);
        assert!(result.passed);
        assert!(result.missing_sections.is_empty());
        assert!(result.extra_sections.is_empty());
    }

    #[test]
    fn test_missing_and_extra_sections() {
        let ctx = PackageContext::default();
        let baseline = GoldenBaseline::new(REFERENCE, &ctx);
        let candidate = "# Demo\n\n## OVERVIEW\n\nCollects metrics.\n\n## Changelog\n\nNothing.\n";
        let result = compare(candidate, &baseline, &ctx);
        assert_eq!(result.matching_sections, vec!["overview".to_string()]);
        assert_eq!(
            result.missing_sections,
            vec!["reference".to_string(), "setup".to_string()]
        );
        assert_eq!(result.extra_sections, vec!["changelog".to_string()]);
        assert!((result.section_coverage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_ignores_code_and_stop_words() {
        let a = Document::new("alpha beta gamma\n```\nzeta\n```\nthe and for\n");
        let b = Document::new("alpha beta delta\n");
        assert!((content_similarity(&a, &b) - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(content_similarity(&Document::new(""), &Document::new("")), 100.0);
        assert_eq!(content_similarity(&Document::new("word"), &Document::new("")), 0.0);
    }

    #[test]
    fn test_pass_threshold() {
        let ctx = PackageContext::default();
        let baseline = GoldenBaseline::new(REFERENCE, &ctx);
        let empty = compare("", &baseline, &ctx);
        assert!(empty.score_delta < 0.0);
        assert_eq!(
            empty.passed,
            empty.candidate_metrics.composite_score
                >= baseline.reference_metrics.composite_score * PASS_RATIO
        );
    }
}
