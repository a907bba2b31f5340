//! Harness configuration
//!
//! Defaults, two presets, a TOML file loader and `DOCGATE_*` environment
//! overrides applied on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::controller::ControllerSettings;
use crate::error::ConfigError;
use crate::model::ValidationStage;
use crate::probe::ProbeConfig;
use crate::rules::{QualityRules, RuleSet, StructureRules};
use crate::snapshots::SnapshotConfig;

const DEFAULT_MAX_ITERATIONS: u32 = 2;

/// Top-level harness configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Iteration budget per stage before the convergence bonus
    pub max_iterations_per_stage: u32,
    /// Stages to run. Always executed in declared stage order.
    pub stages: Vec<ValidationStage>,
    pub enable_deterministic: bool,
    pub enable_semantic: bool,
    pub allow_convergence_bonus: bool,
    /// Whole-session timeout in seconds
    pub session_timeout: Option<u64>,
    pub structure: StructureRules,
    pub quality: QualityRules,
    pub probe: ProbeConfig,
    pub snapshots: SnapshotConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_iterations_per_stage: DEFAULT_MAX_ITERATIONS,
            stages: ValidationStage::ALL.to_vec(),
            enable_deterministic: true,
            enable_semantic: true,
            allow_convergence_bonus: true,
            session_timeout: None,
            structure: StructureRules::default(),
            quality: QualityRules::default(),
            probe: ProbeConfig::default(),
            snapshots: SnapshotConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Single pass, no link probing, no snapshots
    pub fn quick() -> Self {
        Self {
            max_iterations_per_stage: 1,
            allow_convergence_bonus: false,
            ..Default::default()
        }
    }

    /// Three iterations per stage with link probing
    pub fn thorough() -> Self {
        Self {
            max_iterations_per_stage: 3,
            probe: ProbeConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = toml::from_str(&raw)?;
        Ok(config.normalized())
    }

    /// Apply `DOCGATE_*` environment overrides
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Split out so tests need not touch
    /// the process environment.
    pub fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("DOCGATE_MAX_ITERATIONS") {
            self.max_iterations_per_stage = raw.trim().parse().map_err(|_| {
                ConfigError::invalid("DOCGATE_MAX_ITERATIONS", format!("not a number: {raw}"))
            })?;
        }
        if let Some(dir) = lookup("DOCGATE_SNAPSHOT_DIR").filter(|d| !d.trim().is_empty()) {
            self.snapshots.base_dir = PathBuf::from(dir);
            self.snapshots.enabled = true;
        }
        if let Some(raw) = lookup("DOCGATE_PROBE_LINKS") {
            self.probe.enabled = parse_bool(&raw).ok_or_else(|| {
                ConfigError::invalid("DOCGATE_PROBE_LINKS", format!("not a boolean: {raw}"))
            })?;
        }
        if let Some(raw) = lookup("DOCGATE_SESSION_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::invalid("DOCGATE_SESSION_TIMEOUT_SECS", format!("not a number: {raw}"))
            })?;
            self.session_timeout = (secs > 0).then_some(secs);
        }
        Ok(self.normalized())
    }

    /// Repair values that would make the loop meaningless
    pub fn normalized(mut self) -> Self {
        if self.max_iterations_per_stage == 0 {
            self.max_iterations_per_stage = DEFAULT_MAX_ITERATIONS;
        }
        if !self.enable_deterministic && !self.enable_semantic {
            warn!("both deterministic and semantic checks disabled, enabling deterministic");
            self.enable_deterministic = true;
        }
        self.stages.sort_by_key(|s| s.order());
        self.stages.dedup();
        self
    }

    pub fn rule_set(&self) -> RuleSet {
        RuleSet {
            structure: self.structure.clone(),
            quality: self.quality.clone(),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            max_iterations: self.max_iterations_per_stage,
            enable_deterministic: self.enable_deterministic,
            enable_semantic: self.enable_semantic,
            allow_convergence_bonus: self.allow_convergence_bonus,
        }
    }

    pub fn session_timeout(&self) -> Option<std::time::Duration> {
        self.session_timeout.map(std::time::Duration::from_secs)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_iterations_per_stage, 2);
        assert_eq!(config.stages.len(), 6);
        assert!(config.allow_convergence_bonus);
        assert!(!config.probe.enabled);
        assert!(!config.snapshots.enabled);
    }

    #[test]
    fn test_presets() {
        assert_eq!(HarnessConfig::quick().max_iterations_per_stage, 1);
        let thorough = HarnessConfig::thorough();
        assert_eq!(thorough.max_iterations_per_stage, 3);
        assert!(thorough.probe.enabled);
    }

    #[test]
    fn test_normalization() {
        let config = HarnessConfig {
            max_iterations_per_stage: 0,
            enable_deterministic: false,
            enable_semantic: false,
            stages: vec![ValidationStage::Quality, ValidationStage::Structure, ValidationStage::Quality],
            ..Default::default()
        }
        .normalized();
        assert_eq!(config.max_iterations_per_stage, 2);
        assert!(config.enable_deterministic);
        assert_eq!(
            config.stages,
            vec![ValidationStage::Structure, ValidationStage::Quality]
        );
    }

    #[test]
    fn test_toml_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docgate.toml");
        std::fs::write(
            &path,
            "max_iterations_per_stage = 4\nstages = [\"urls\", \"structure\"]\n\n[probe]\nenabled = true\nmax_concurrent = 2\nprobe_timeout_secs = 5\noverall_timeout_secs = 30\nmax_body_bytes = 1024\n",
        )
        .unwrap();
        let config = HarnessConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.max_iterations_per_stage, 4);
        assert_eq!(config.stages, vec![ValidationStage::Structure, ValidationStage::Urls]);
        assert_eq!(config.probe.max_concurrent, 2);
        assert!(config.enable_semantic);
    }

    #[test]
    fn test_env_overrides() {
        let config = HarnessConfig::default()
            .apply_overrides(env(&[
                ("DOCGATE_MAX_ITERATIONS", "3"),
                ("DOCGATE_SNAPSHOT_DIR", "/tmp/snaps"),
                ("DOCGATE_PROBE_LINKS", "yes"),
                ("DOCGATE_SESSION_TIMEOUT_SECS", "90"),
            ]))
            .unwrap();
        assert_eq!(config.max_iterations_per_stage, 3);
        assert!(config.snapshots.enabled);
        assert_eq!(config.snapshots.base_dir, PathBuf::from("/tmp/snaps"));
        assert!(config.probe.enabled);
        assert_eq!(config.session_timeout, Some(90));
    }

    #[test]
    fn test_invalid_env_value() {
        let err = HarnessConfig::default()
            .apply_overrides(env(&[("DOCGATE_PROBE_LINKS", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "DOCGATE_PROBE_LINKS"));
    }
}
