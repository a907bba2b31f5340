//! Completeness family: does the document cover everything a reader needs?
//!
//! Each topic is detected by case-insensitive substring match and worth a
//! fixed number of points: setup 25, vendor configuration 15, consumer
//! onboarding 15, validation steps 15, troubleshooting 15, reference 15.

use serde::{Deserialize, Serialize};

use super::RuleOutcome;
use crate::model::{Category, Document, PackageContext, Severity, ValidationIssue};

const SETUP_MARKERS: &[&str] = &["## setup", "## installation", "## getting started"];

const VENDOR_MARKERS: &[&str] = &[
    "configure",
    "enable logging",
    "syslog",
    "api key",
    "credentials",
    "prerequisite",
    "vendor",
    "service",
];

const CONSUMER_MARKERS: &[&str] = &[
    "kibana",
    "elastic agent",
    "fleet",
    "add integration",
    "enroll",
    "policy",
    "index pattern",
];

const VALIDATION_MARKERS: &[&str] = &[
    "verify",
    "validate",
    "confirm",
    "check",
    "test",
    "discover",
    "data appears",
    "logs are",
    "metrics are",
];

const TROUBLESHOOTING_MARKERS: &[&str] = &["## troubleshooting", "### troubleshooting"];

const REFERENCE_MARKERS: &[&str] = &["## reference", "## fields", "## exported fields", "exported fields"];

/// Which topics were found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessDetails {
    pub has_setup_section: bool,
    pub has_vendor_setup: bool,
    pub has_consumer_setup: bool,
    pub has_validation_steps: bool,
    pub has_troubleshooting: bool,
    pub has_reference_section: bool,
}

struct Topic {
    markers: &'static [&'static str],
    points: f64,
    severity: Severity,
    location: &'static str,
    message: &'static str,
    suggestion: &'static str,
}

const TOPICS: [Topic; 6] = [
    Topic {
        markers: SETUP_MARKERS,
        points: 25.0,
        severity: Severity::Critical,
        location: "Setup",
        message: "Missing deployment/setup section",
        suggestion: "Add a '## Setup' section with installation and configuration instructions",
    },
    Topic {
        markers: VENDOR_MARKERS,
        points: 15.0,
        severity: Severity::Major,
        location: "Setup",
        message: "Setup section may be missing vendor-side configuration steps",
        suggestion: "Describe how to configure the source system (credentials, logging, API access)",
    },
    Topic {
        markers: CONSUMER_MARKERS,
        points: 15.0,
        severity: Severity::Major,
        location: "Setup",
        message: "Setup section may be missing consumer-side onboarding steps",
        suggestion: "Describe how to add the integration and enroll the collecting agent",
    },
    Topic {
        markers: VALIDATION_MARKERS,
        points: 15.0,
        severity: Severity::Major,
        location: "Validation",
        message: "Missing validation steps",
        suggestion: "Explain how to verify that data is arriving",
    },
    Topic {
        markers: TROUBLESHOOTING_MARKERS,
        points: 15.0,
        severity: Severity::Minor,
        location: "Troubleshooting",
        message: "Missing troubleshooting section",
        suggestion: "Add a '## Troubleshooting' section covering common failures",
    },
    Topic {
        markers: REFERENCE_MARKERS,
        points: 15.0,
        severity: Severity::Minor,
        location: "Reference",
        message: "Missing reference section",
        suggestion: "Add a '## Reference' section listing exported fields",
    },
];

/// Run the completeness family
pub fn check_completeness(doc: &Document, ctx: &PackageContext) -> RuleOutcome<CompletenessDetails> {
    let lower = doc.content().to_lowercase();
    let mut issues = Vec::new();
    let mut score = 0.0;
    let mut found = [false; 6];

    for (idx, topic) in TOPICS.iter().enumerate() {
        if topic.markers.iter().any(|m| lower.contains(m)) {
            found[idx] = true;
            score += topic.points;
        } else {
            issues.push(
                ValidationIssue::new(topic.severity, Category::Completeness, topic.location, topic.message)
                    .with_suggestion(topic.suggestion),
            );
        }
    }

    let details = CompletenessDetails {
        has_setup_section: found[0],
        has_vendor_setup: found[1],
        has_consumer_setup: found[2],
        has_validation_steps: found[3],
        has_troubleshooting: found[4],
        has_reference_section: found[5],
    };

    if let Some(reference) = doc.section_containing("reference") {
        let body = reference.body.to_lowercase();
        for ds in &ctx.data_streams {
            let covered = body.contains(&ds.name.to_lowercase())
                || (!ds.title.is_empty() && body.contains(&ds.title.to_lowercase()));
            if !covered {
                issues.push(
                    ValidationIssue::major(
                        Category::Completeness,
                        "Reference",
                        format!("Data stream '{}' missing from reference section", ds.name),
                    )
                    .with_suggestion(format!("Add a '### {}' subsection with its fields", ds.name)),
                );
            }
        }
    }

    RuleOutcome::new(score, issues, details)
}
