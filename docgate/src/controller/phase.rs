//! Per-stage controller state machine

use serde::{Deserialize, Serialize};

/// Phase of one stage's refinement loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPhase {
    /// Document handed in by the previous stage or the caller
    Generating,
    CheckingDeterministic,
    CheckingSemantic,
    /// Merged result is being compared against the budget
    Deciding,
    /// Generator is producing the next iteration
    Regenerating,
    Passed,
    Exhausted,
    /// Session cancelled or generator failed
    Aborted,
}

impl ControllerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Exhausted | Self::Aborted)
    }

    /// Valid transitions from this phase.
    ///
    /// A failed deterministic check goes straight to `Deciding`; the
    /// semantic check is skipped for that iteration.
    pub fn valid_transitions(self) -> &'static [ControllerPhase] {
        match self {
            Self::Generating => &[Self::CheckingDeterministic, Self::Aborted],
            Self::CheckingDeterministic => &[Self::CheckingSemantic, Self::Deciding, Self::Aborted],
            Self::CheckingSemantic => &[Self::Deciding, Self::Aborted],
            Self::Deciding => &[Self::Passed, Self::Regenerating, Self::Exhausted],
            Self::Regenerating => &[Self::CheckingDeterministic, Self::Aborted],
            Self::Passed | Self::Exhausted | Self::Aborted => &[],
        }
    }

    pub fn can_transition_to(self, to: ControllerPhase) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generating => write!(f, "generating"),
            Self::CheckingDeterministic => write!(f, "checking_deterministic"),
            Self::CheckingSemantic => write!(f, "checking_semantic"),
            Self::Deciding => write!(f, "deciding"),
            Self::Regenerating => write!(f, "regenerating"),
            Self::Passed => write!(f, "passed"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Current phase plus the path taken to reach it
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    phase: ControllerPhase,
    path: Vec<ControllerPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            phase: ControllerPhase::Generating,
            path: vec![ControllerPhase::Generating],
        }
    }
}

impl PhaseTracker {
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn path(&self) -> &[ControllerPhase] {
        &self.path
    }

    /// Move to `to`. The controller only ever requests valid transitions.
    pub fn enter(&mut self, to: ControllerPhase) {
        debug_assert!(
            self.phase.can_transition_to(to),
            "invalid controller transition {} -> {}",
            self.phase,
            to
        );
        self.phase = to;
        self.path.push(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_phases_have_no_transitions() {
        for phase in [
            ControllerPhase::Passed,
            ControllerPhase::Exhausted,
            ControllerPhase::Aborted,
        ] {
            assert!(phase.is_terminal());
            assert!(phase.valid_transitions().is_empty());
        }
    }

    #[test]
    fn test_failed_deterministic_skips_semantic() {
        assert!(ControllerPhase::CheckingDeterministic.can_transition_to(ControllerPhase::Deciding));
        assert!(!ControllerPhase::Regenerating.can_transition_to(ControllerPhase::Deciding));
    }

    #[test]
    fn test_tracker_records_path() {
        let mut tracker = PhaseTracker::default();
        tracker.enter(ControllerPhase::CheckingDeterministic);
        tracker.enter(ControllerPhase::CheckingSemantic);
        tracker.enter(ControllerPhase::Deciding);
        tracker.enter(ControllerPhase::Passed);
        assert_eq!(tracker.phase(), ControllerPhase::Passed);
        assert_eq!(tracker.path().len(), 5);
        assert_eq!(ControllerPhase::CheckingSemantic.to_string(), "checking_semantic");
    }
}
