//! Validation stages and their fixed order

use serde::{Deserialize, Serialize};

use super::issue::Category;

/// A named quality gate. Variant order is the default pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    Structure,
    Accuracy,
    Completeness,
    Urls,
    Quality,
    Placeholders,
}

impl ValidationStage {
    /// All stages in default order
    pub const ALL: [ValidationStage; 6] = [
        Self::Structure,
        Self::Accuracy,
        Self::Completeness,
        Self::Urls,
        Self::Quality,
        Self::Placeholders,
    ];

    /// Declared position in the default pipeline
    pub fn order(self) -> usize {
        match self {
            Self::Structure => 0,
            Self::Accuracy => 1,
            Self::Completeness => 2,
            Self::Urls => 3,
            Self::Quality => 4,
            Self::Placeholders => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Accuracy => "accuracy",
            Self::Completeness => "completeness",
            Self::Urls => "urls",
            Self::Quality => "quality",
            Self::Placeholders => "placeholders",
        }
    }

    /// Issue category this stage reports under by default
    pub fn category(self) -> Category {
        match self {
            Self::Structure => Category::Structure,
            Self::Accuracy => Category::Accuracy,
            Self::Completeness => Category::Completeness,
            Self::Urls => Category::Urls,
            Self::Quality => Category::Quality,
            Self::Placeholders => Category::Placeholders,
        }
    }

    /// Capitalised name used in feedback headings and reports
    pub fn title(self) -> &'static str {
        match self {
            Self::Structure => "Structure",
            Self::Accuracy => "Accuracy",
            Self::Completeness => "Completeness",
            Self::Urls => "URLs",
            Self::Quality => "Quality",
            Self::Placeholders => "Placeholders",
        }
    }
}

impl std::fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == wanted)
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}
