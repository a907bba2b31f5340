//! Issue vocabulary shared by every validator, the merger and the scorer

use serde::{Deserialize, Serialize};

/// Issue severity, totally ordered `Minor < Major < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// Critical and major issues block a stage and feed convergence tracking
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::Major)
    }

    /// Upper-case label used in generator feedback
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::Major => "MAJOR",
            Self::Minor => "MINOR",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// What an issue is about. Independent of the stage that reported it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Structure,
    Accuracy,
    Completeness,
    Urls,
    Quality,
    Placeholders,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structure => write!(f, "structure"),
            Self::Accuracy => write!(f, "accuracy"),
            Self::Completeness => write!(f, "completeness"),
            Self::Urls => write!(f, "urls"),
            Self::Quality => write!(f, "quality"),
            Self::Placeholders => write!(f, "placeholders"),
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structure" => Ok(Self::Structure),
            "accuracy" => Ok(Self::Accuracy),
            "completeness" => Ok(Self::Completeness),
            "urls" | "links" => Ok(Self::Urls),
            "quality" => Ok(Self::Quality),
            "placeholders" => Ok(Self::Placeholders),
            other => Err(format!("unknown category: {other}")),
        }
    }
}

/// Which kind of check produced an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSource {
    Deterministic,
    Semantic,
}

impl std::fmt::Display for IssueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deterministic => write!(f, "deterministic"),
            Self::Semantic => write!(f, "semantic"),
        }
    }
}

/// A single finding against a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: Category,
    /// Free-text section or line reference
    pub location: String,
    pub message: String,
    /// How to fix it, if the check knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub source: IssueSource,
}

impl ValidationIssue {
    /// Create a deterministic issue without a suggestion
    pub fn new(
        severity: Severity,
        category: Category,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            location: location.into(),
            message: message.into(),
            suggestion: None,
            source: IssueSource::Deterministic,
        }
    }

    pub fn critical(
        category: Category,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Critical, category, location, message)
    }

    pub fn major(
        category: Category,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Major, category, location, message)
    }

    pub fn minor(
        category: Category,
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Minor, category, location, message)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: IssueSource) -> Self {
        self.source = source;
        self
    }

    /// Identity used for deduplication
    pub fn dedup_key(&self) -> (Category, &str, &str) {
        (self.category, self.location.as_str(), self.message.as_str())
    }

    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);

        let mut severities = vec![Severity::Minor, Severity::Critical, Severity::Major];
        severities.sort_by(|a, b| b.cmp(a));
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Major, Severity::Minor]
        );
    }

    #[test]
    fn test_category_parse_accepts_links_alias() {
        assert_eq!("links".parse::<Category>().unwrap(), Category::Urls);
        assert_eq!(" Quality ".parse::<Category>().unwrap(), Category::Quality);
        assert!("style".parse::<Category>().is_err());
    }

    #[test]
    fn test_dedup_key_ignores_suggestion_and_severity() {
        let a = ValidationIssue::major(Category::Structure, "Overview", "Missing")
            .with_suggestion("add it");
        let b = ValidationIssue::minor(Category::Structure, "Overview", "Missing")
            .with_suggestion("something else");
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_issue_serde_snake_case() {
        let issue = ValidationIssue::critical(Category::Urls, "Document", "Anchor link found: #x");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["category"], "urls");
        assert_eq!(json["source"], "deterministic");
        assert!(json.get("suggestion").is_none());
    }
}
