//! Markdown audit report for a finished session

use super::RefinementSession;

impl RefinementSession {
    /// Human-readable audit of the session, ending with the raw session as
    /// JSON for tooling.
    pub fn audit_report(&self) -> String {
        let mut report = String::from("# Staged Validation Audit Report\n\n");
        report.push_str(&format!("**Session**: {}\n", self.session_id));
        report.push_str(&format!(
            "**Overall Status**: {}\n",
            if self.approved {
                "✅ APPROVED"
            } else {
                "❌ NEEDS REVISION"
            }
        ));
        report.push_str(&format!("**Total Iterations**: {}\n", self.total_iterations));
        report.push_str(&format!(
            "**Convergence Bonus Granted**: {}\n",
            if self.convergence_bonus_granted { "yes" } else { "no" }
        ));
        let history: Vec<String> = self.issue_history.iter().map(|n| n.to_string()).collect();
        report.push_str(&format!("**Issue History**: [{}]\n\n", history.join(", ")));

        report.push_str("## Stage Results\n\n");
        for stage in &self.stage_reports {
            let result = &stage.result;
            report.push_str(&format!(
                "### {} {}\n",
                if result.valid { "✅" } else { "❌" },
                stage.stage
            ));
            report.push_str(&format!("- Valid: {}\n", result.valid));
            report.push_str(&format!("- Verdict: {}\n", stage.verdict));
            report.push_str(&format!("- Score: {}/100\n", result.score));
            report.push_str(&format!("- Iterations: {}\n", stage.iterations));
            report.push_str(&format!("- Issues: {}\n", result.issues.len()));

            if !result.issues.is_empty() {
                report.push_str("\n**Issues:**\n");
                for issue in &result.issues {
                    report.push_str(&format!(
                        "- [{}] {}: {}\n",
                        issue.severity, issue.location, issue.message
                    ));
                }
            }
            if !result.warnings.is_empty() {
                report.push_str("\n**Warnings:**\n");
                for warning in &result.warnings {
                    report.push_str(&format!("- {}\n", warning));
                }
            }
            report.push('\n');
        }

        if !self.final_feedback.is_empty() {
            report.push_str("## Remaining Feedback\n\n");
            report.push_str(&self.final_feedback);
            report.push('\n');
        }

        report.push_str("\n## Raw Results (JSON)\n\n```json\n");
        match serde_json::to_string_pretty(self) {
            Ok(json) => report.push_str(&json),
            Err(e) => report.push_str(&format!("{{\"error\": \"{}\"}}", e)),
        }
        report.push_str("\n```\n");
        report
    }
}
