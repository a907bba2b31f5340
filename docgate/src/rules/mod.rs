//! Deterministic rule families
//!
//! Each family inspects a [`Document`](crate::model::Document) (plus package
//! context where relevant) and returns a [`RuleOutcome`]: a 0-100 axis score,
//! the issues it found and a details record of raw counts. Stage validators
//! turn outcomes into issues; the scoring engine reads the same outcomes for
//! its axis scores, so a document is judged identically in both places.
//!
//! ```text
//! Document ─┬─► structure     ─► RuleOutcome<StructureDetails>
//!           ├─► accuracy      ─► RuleOutcome<AccuracyDetails>
//!           ├─► completeness  ─► RuleOutcome<CompletenessDetails>
//!           ├─► quality       ─► RuleOutcome<QualityDetails>
//!           ├─► placeholders  ─► RuleOutcome<PlaceholderDetails>
//!           └─► links         ─► RuleOutcome<LinkDetails>
//! ```
//!
//! No family performs I/O. Network reachability lives in [`crate::probe`].

pub mod accuracy;
pub mod completeness;
pub mod links;
pub mod placeholders;
pub mod quality;
pub mod structure;

use serde::{Deserialize, Serialize};

use crate::model::ValidationIssue;

pub use accuracy::{check_accuracy, AccuracyDetails};
pub use completeness::{check_completeness, CompletenessDetails};
pub use links::{check_links, LinkDetails};
pub use placeholders::{check_placeholders, PlaceholderDetails, STANDARD_PLACEHOLDER};
pub use quality::{check_quality, QualityDetails};
pub use structure::{check_structure, StructureDetails};

/// Output of one rule family
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome<D> {
    /// Axis score in `[0, 100]`
    pub score: f64,
    pub issues: Vec<ValidationIssue>,
    pub details: D,
}

impl<D> RuleOutcome<D> {
    pub fn new(score: f64, issues: Vec<ValidationIssue>, details: D) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            issues,
            details,
        }
    }

    /// Score rounded for a [`ValidationResult`](crate::model::ValidationResult)
    pub fn rounded_score(&self) -> u8 {
        self.score.round().clamp(0.0, 100.0) as u8
    }
}

/// A section the document is expected to carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRule {
    pub name: String,
    /// Subsection titles expected under any heading level below H2
    #[serde(default)]
    pub subsections: Vec<String>,
    /// Alternative titles accepted in place of `name`
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl SectionRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subsections: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_subsections(mut self, subsections: &[&str]) -> Self {
        self.subsections = subsections.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether a heading title satisfies this rule (case-insensitive prefix
    /// match against the name or any alias)
    pub fn matches(&self, heading: &str) -> bool {
        let heading = heading.trim().to_lowercase();
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .any(|candidate| heading.starts_with(&candidate.trim().to_lowercase()))
    }
}

/// Section expectations for the structure family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRules {
    pub required: Vec<SectionRule>,
    #[serde(default)]
    pub recommended: Vec<SectionRule>,
    /// Same H3 title allowed this many times before it is flagged
    #[serde(default = "default_max_repeated_subsection")]
    pub max_repeated_subsection: usize,
}

fn default_max_repeated_subsection() -> usize {
    3
}

impl Default for StructureRules {
    fn default() -> Self {
        Self {
            required: vec![
                SectionRule::new("Overview")
                    .with_subsections(&["Compatibility"])
                    .with_aliases(&["Introduction", "About"]),
                SectionRule::new("Reference").with_aliases(&[
                    "Appendix",
                    "Field reference",
                    "Fields",
                    "Exported fields",
                ]),
            ],
            recommended: vec![
                SectionRule::new("Setup").with_aliases(&[
                    "Installation",
                    "Getting started",
                    "Configuration",
                    "How do I deploy",
                ]),
                SectionRule::new("Troubleshooting").with_aliases(&["Common issues", "FAQ"]),
            ],
            max_repeated_subsection: default_max_repeated_subsection(),
        }
    }
}

/// Extra tuning for the quality family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRules {
    /// Additional vague-phrase regexes, matched case-insensitively
    #[serde(default)]
    pub extra_vague_patterns: Vec<String>,
}

/// Tunable inputs to every rule family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub structure: StructureRules,
    #[serde(default)]
    pub quality: QualityRules,
}
