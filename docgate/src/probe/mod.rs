//! Bounded-parallel link probing
//!
//! ```text
//! urls ─► JoinSet::spawn(probe_i) × N   (Semaphore: max_concurrent permits)
//!            │  each probe under its own timeout
//!            ▼
//!        slots[i] = outcome_i             (index-owned, written once)
//!            │  whole fan-in under the overall timeout + cancel token
//!            ▼
//!        unfilled slots ─► Cancelled ("validation cancelled")
//! ```
//!
//! The network side sits behind [`LinkProbe`]; [`HttpLinkProbe`] is the
//! reqwest-backed implementation.

pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::{Category, ValidationIssue};

pub use http::{classify_status, detect_soft_404, HttpLinkProbe};

/// Probe tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Probe links over the network during the urls stage
    pub enabled: bool,
    /// Maximum probes in flight
    pub max_concurrent: usize,
    /// Per-probe timeout in seconds
    pub probe_timeout_secs: u64,
    /// Timeout for the whole fan-out in seconds
    pub overall_timeout_secs: u64,
    /// Bytes of a 2xx body inspected for soft-404 markers
    pub max_body_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrent: 5,
            probe_timeout_secs: 10,
            overall_timeout_secs: 120,
            max_body_bytes: 64 * 1024,
        }
    }
}

impl ProbeConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }
}

/// Classification of one probed URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    /// 2xx with a plausible body
    Valid,
    /// Reachable, but worth a warning (3xx, 403)
    ValidWithWarning,
    /// 2xx whose body looks like an error page
    Soft404 { reason: String },
    NotFound,
    HttpError { status: u16 },
    Unreachable { reason: String },
    TimedOut,
    /// Never completed before the overall timeout or cancellation
    Cancelled,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::ValidWithWarning => write!(f, "valid_with_warning"),
            Self::Soft404 { .. } => write!(f, "soft_404"),
            Self::NotFound => write!(f, "not_found"),
            Self::HttpError { status } => write!(f, "http_{}", status),
            Self::Unreachable { .. } => write!(f, "unreachable"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of probing one URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub url: String,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ProbeOutcome {
    pub fn new(url: impl Into<String>, status: ProbeStatus) -> Self {
        Self {
            url: url.into(),
            status,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn timed_out(url: impl Into<String>) -> Self {
        let url = url.into();
        let warning = format!("URL timed out: {}", url);
        Self::new(url, ProbeStatus::TimedOut).with_warning(warning)
    }

    pub fn cancelled(url: impl Into<String>) -> Self {
        let url = url.into();
        let warning = format!("validation cancelled: {}", url);
        Self::new(url, ProbeStatus::Cancelled).with_warning(warning)
    }

    /// Issue raised by this outcome, if any
    pub fn to_issue(&self) -> Option<ValidationIssue> {
        let url = &self.url;
        let issue = match &self.status {
            ProbeStatus::Valid | ProbeStatus::ValidWithWarning | ProbeStatus::Cancelled => {
                return None
            }
            ProbeStatus::Soft404 { reason } => ValidationIssue::major(
                Category::Urls,
                "Document",
                format!("URL returns 200 but appears to be a soft 404: {} ({})", url, reason),
            ),
            ProbeStatus::NotFound => ValidationIssue::critical(
                Category::Urls,
                "Document",
                format!("URL not found (HTTP 404): {}", url),
            ),
            ProbeStatus::HttpError { status } => ValidationIssue::critical(
                Category::Urls,
                "Document",
                format!("URL returned HTTP {}: {}", status, url),
            ),
            ProbeStatus::Unreachable { reason } => ValidationIssue::major(
                Category::Urls,
                "Document",
                format!("URL unreachable: {} ({})", url, reason),
            ),
            ProbeStatus::TimedOut => ValidationIssue::major(
                Category::Urls,
                "Document",
                format!("URL timed out: {}", url),
            ),
        };
        Some(issue.with_suggestion("Replace or remove the broken link"))
    }
}

/// Something that can check a single URL
#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, url: &str) -> ProbeOutcome;
}

/// Outcomes of a fan-out, one per input URL in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub outcomes: Vec<ProbeOutcome>,
    /// The fan-out stopped before every probe finished
    pub interrupted: bool,
}

impl ProbeReport {
    pub fn issues(&self) -> Vec<ValidationIssue> {
        self.outcomes.iter().filter_map(ProbeOutcome::to_issue).collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter_map(|o| o.warning.clone())
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&ProbeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Runs a [`LinkProbe`] over many URLs with bounded parallelism
#[derive(Clone)]
pub struct LinkChecker {
    probe: Arc<dyn LinkProbe>,
    config: ProbeConfig,
}

impl LinkChecker {
    pub fn new(probe: Arc<dyn LinkProbe>, config: ProbeConfig) -> Self {
        Self { probe, config }
    }

    /// Checker backed by [`HttpLinkProbe`]
    pub fn http(config: ProbeConfig) -> reqwest::Result<Self> {
        let probe = HttpLinkProbe::new(&config)?;
        Ok(Self::new(Arc::new(probe), config))
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe every URL. Returns once all probes finish, the overall timeout
    /// elapses, or `cancel` fires; unfinished probes are reported as
    /// [`ProbeStatus::Cancelled`].
    pub async fn check_all(&self, urls: &[String], cancel: &CancellationToken) -> ProbeReport {
        if urls.is_empty() {
            return ProbeReport::default();
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent.max(1)));
        let per_probe = self.config.probe_timeout();
        let mut slots: Vec<Option<ProbeOutcome>> = vec![None; urls.len()];
        let mut join_set: JoinSet<(usize, ProbeOutcome)> = JoinSet::new();

        for (idx, url) in urls.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let probe = self.probe.clone();
            join_set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (idx, ProbeOutcome::cancelled(url));
                };
                let outcome = match tokio::time::timeout(per_probe, probe.probe(&url)).await {
                    Ok(outcome) => outcome,
                    Err(_) => ProbeOutcome::timed_out(url),
                };
                (idx, outcome)
            });
        }

        let collect = async {
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((idx, outcome)) => {
                        debug!(url = %outcome.url, status = %outcome.status, "link probed");
                        slots[idx] = Some(outcome);
                    }
                    Err(e) => warn!(error = %e, "link probe task failed"),
                }
            }
        };

        let completed = tokio::select! {
            _ = cancel.cancelled() => false,
            res = tokio::time::timeout(self.config.overall_timeout(), collect) => res.is_ok(),
        };

        if !completed {
            join_set.abort_all();
            warn!(
                pending = slots.iter().filter(|s| s.is_none()).count(),
                "link probing interrupted"
            );
        }

        let outcomes = slots
            .into_iter()
            .zip(urls)
            .map(|(slot, url)| slot.unwrap_or_else(|| ProbeOutcome::cancelled(url.clone())))
            .collect();

        ProbeReport {
            outcomes,
            interrupted: !completed,
        }
    }
}
