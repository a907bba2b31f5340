//! Static link rules.
//!
//! Same-document anchors and the internal `docs-content://` scheme can never
//! resolve where the document is published, so both are always critical.
//! Placeholder and localhost URLs are major. Remaining http(s) URLs are
//! collected for the network prober.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::RuleOutcome;
use crate::model::{penalty_score, Category, Document, ValidationIssue};

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s\)>\]"']+"#).expect("URL regex should compile")
});

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("MARKDOWN_LINK regex should compile")
});

static INTERNAL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"docs-content://[^\s\)>\]"']+"#).expect("INTERNAL_LINK regex should compile")
});

const PLACEHOLDER_URL_MARKERS: &[&str] = &["example.com", "placeholder", "your-", "xxx", "YOUR_"];

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

/// What the link scan found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDetails {
    pub anchor_links: usize,
    pub internal_links: usize,
    /// Unique http(s) URLs worth probing, in first-seen order
    pub probe_urls: Vec<String>,
}

/// Whether a URL is an obvious placeholder
pub fn is_placeholder_url(url: &str) -> bool {
    PLACEHOLDER_URL_MARKERS.iter().any(|m| url.contains(m))
}

/// Whether a URL points at the local machine
pub fn is_local_url(url: &str) -> bool {
    let Some(rest) = url.split("://").nth(1) else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = host.rsplit('@').next().unwrap_or(host);
    LOCAL_HOSTS
        .iter()
        .any(|local| host == *local || host.starts_with(&format!("{}:", local)))
}

fn clean_url(raw: &str) -> &str {
    raw.trim_end_matches(['.', ',', ';', ':', '!', '?'])
}

/// Unique http(s) URLs from plain text and markdown link targets
pub fn extract_urls(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let plain = URL.find_iter(content).map(|m| clean_url(m.as_str()));
    let linked = MARKDOWN_LINK
        .captures_iter(content)
        .filter_map(|c| c.get(2).map(|m| m.as_str().trim()))
        .filter(|target| target.starts_with("http://") || target.starts_with("https://"))
        .map(|target| clean_url(target.split_whitespace().next().unwrap_or(target)));

    for url in plain.chain(linked) {
        if !url.is_empty() && seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }
    urls
}

/// Run the static link rules
pub fn check_links(doc: &Document) -> RuleOutcome<LinkDetails> {
    let content = doc.content();
    let mut details = LinkDetails::default();
    let mut issues = Vec::new();

    for caps in MARKDOWN_LINK.captures_iter(content) {
        let (Some(text), Some(target)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let target = target.as_str().trim();
        if target.starts_with('#') {
            details.anchor_links += 1;
            issues.push(
                ValidationIssue::critical(
                    Category::Urls,
                    "Document",
                    format!("Anchor link found: [{}]({})", text.as_str(), target),
                )
                .with_suggestion(
                    "Same-page anchors do not resolve where the document is published; reference the section by name or use a full URL",
                ),
            );
        }
    }

    let mut internal_seen = HashSet::new();
    for m in INTERNAL_LINK.find_iter(content) {
        details.internal_links += 1;
        if internal_seen.insert(m.as_str()) {
            issues.push(
                ValidationIssue::critical(
                    Category::Urls,
                    "Document",
                    format!("Internal link found: {}", m.as_str()),
                )
                .with_suggestion("Replace the internal link with its public https:// equivalent"),
            );
        }
    }

    for url in extract_urls(content) {
        if is_placeholder_url(&url) {
            issues.push(
                ValidationIssue::major(
                    Category::Urls,
                    "Document",
                    format!("URL contains placeholder: {}", url),
                )
                .with_suggestion("Replace with the real URL"),
            );
        } else if is_local_url(&url) {
            issues.push(
                ValidationIssue::major(
                    Category::Urls,
                    "Document",
                    format!("URL points to localhost: {}", url),
                )
                .with_suggestion("Use a publicly reachable URL"),
            );
        } else {
            details.probe_urls.push(url);
        }
    }

    let score = penalty_score(&issues) as f64;
    RuleOutcome::new(score, issues, details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    #[test]
    fn test_anchor_link_is_critical() {
        let outcome = check_links(&Document::new("See [X](#x)."));
        let issue = outcome
            .issues
            .iter()
            .find(|i| i.message.contains("Anchor link found"))
            .unwrap();
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.category, Category::Urls);
        assert_eq!(outcome.details.anchor_links, 1);
    }

    #[test]
    fn test_anchor_link_without_text_is_critical() {
        let outcome = check_links(&Document::new("Jump [](#setup) here."));
        assert_eq!(outcome.details.anchor_links, 1);
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.severity == Severity::Critical && i.message == "Anchor link found: [](#setup)"));
    }

    #[test]
    fn test_internal_scheme_is_critical() {
        let outcome = check_links(&Document::new(
            "Read [docs](docs-content://reference/fleet) and docs-content://reference/fleet",
        ));
        let internal: Vec<_> = outcome
            .issues
            .iter()
            .filter(|i| i.message.starts_with("Internal link found"))
            .collect();
        assert_eq!(internal.len(), 1);
        assert_eq!(internal[0].severity, Severity::Critical);
        assert_eq!(outcome.details.internal_links, 2);
    }

    #[test]
    fn test_extract_urls_dedupes_and_trims() {
        let urls = extract_urls(
            "Go to https://a.io/x. Or [a](https://a.io/x) and [b](https://b.io \"title\").",
        );
        assert_eq!(urls, vec!["https://a.io/x".to_string(), "https://b.io".to_string()]);
    }

    #[test]
    fn test_placeholder_and_local_urls() {
        let outcome = check_links(&Document::new(
            "https://example.com/a http://localhost:8080/b https://real.io/c",
        ));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.starts_with("URL contains placeholder")));
        assert!(outcome
            .issues
            .iter()
            .any(|i| i.message.starts_with("URL points to localhost")));
        assert_eq!(outcome.details.probe_urls, vec!["https://real.io/c".to_string()]);
    }

    #[test]
    fn test_is_local_url() {
        assert!(is_local_url("http://127.0.0.1/x"));
        assert!(is_local_url("http://user@localhost:9200"));
        assert!(!is_local_url("https://localhost.example.org"));
    }
}
