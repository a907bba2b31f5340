//! Package metadata the rule checks and judgment prompts read from

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, PersistenceResult};

/// Top-level package manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// A data stream (sub-entity) declared by the package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStreamInfo {
    pub name: String,
    /// logs, metrics, ...
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub dataset: String,
    #[serde(default)]
    pub has_example_event: bool,
}

/// Metadata about the package a document describes.
///
/// An empty context disables every check that needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageContext {
    #[serde(default)]
    pub manifest: Option<PackageManifest>,
    #[serde(default)]
    pub data_streams: Vec<DataStreamInfo>,
    /// Field names keyed by data stream name
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub input_types: Vec<String>,
}

impl PackageContext {
    pub fn new(manifest: PackageManifest) -> Self {
        Self {
            manifest: Some(manifest),
            ..Self::default()
        }
    }

    pub fn with_data_stream(mut self, stream: DataStreamInfo) -> Self {
        self.data_streams.push(stream);
        self
    }

    pub fn with_fields(mut self, stream: impl Into<String>, fields: Vec<String>) -> Self {
        self.fields.insert(stream.into(), fields);
        self
    }

    /// Load from a JSON file
    pub fn from_json_file(path: &Path) -> PersistenceResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_none() && self.data_streams.is_empty() && self.fields.is_empty()
    }

    pub fn name(&self) -> &str {
        self.manifest.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.manifest.as_ref().map(|m| m.title.as_str()).unwrap_or("")
    }

    pub fn version(&self) -> &str {
        self.manifest
            .as_ref()
            .map(|m| m.version.as_str())
            .unwrap_or("")
    }

    pub fn data_stream_names(&self) -> Vec<&str> {
        self.data_streams.iter().map(|d| d.name.as_str()).collect()
    }

    /// Every known field name across all data streams
    pub fn all_field_names(&self) -> BTreeSet<&str> {
        self.fields
            .values()
            .flat_map(|fields| fields.iter().map(String::as_str))
            .collect()
    }

    /// Context block embedded into semantic judgment prompts
    pub fn prompt_summary(&self) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut out = String::from("## Package Context\n");
        if let Some(manifest) = &self.manifest {
            out.push_str(&format!("- Name: {}\n", manifest.name));
            if !manifest.title.is_empty() {
                out.push_str(&format!("- Title: {}\n", manifest.title));
            }
            if !manifest.version.is_empty() {
                out.push_str(&format!("- Version: {}\n", manifest.version));
            }
        }
        if !self.data_streams.is_empty() {
            out.push_str("- Data streams:\n");
            for ds in &self.data_streams {
                if ds.title.is_empty() {
                    out.push_str(&format!("  - {} ({})\n", ds.name, ds.kind));
                } else {
                    out.push_str(&format!("  - {}: {} ({})\n", ds.name, ds.title, ds.kind));
                }
            }
        }
        if !self.input_types.is_empty() {
            out.push_str(&format!("- Inputs: {}\n", self.input_types.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageContext {
        PackageContext::new(PackageManifest {
            name: "nginx".into(),
            title: "Nginx".into(),
            version: "1.2.0".into(),
            description: String::new(),
        })
        .with_data_stream(DataStreamInfo {
            name: "access".into(),
            kind: "logs".into(),
            title: "Access logs".into(),
            ..DataStreamInfo::default()
        })
        .with_fields("access", vec!["nginx.access.remote_ip".into()])
    }

    #[test]
    fn test_empty_context() {
        let ctx = PackageContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.name(), "");
        assert!(ctx.prompt_summary().is_empty());
    }

    #[test]
    fn test_prompt_summary_lists_streams() {
        let summary = sample().prompt_summary();
        assert!(summary.contains("- Name: nginx"));
        assert!(summary.contains("access: Access logs (logs)"));
    }

    #[test]
    fn test_json_type_field_rename() {
        let ctx: PackageContext = serde_json::from_str(
            r#"{"manifest":{"name":"x"},"data_streams":[{"name":"a","type":"metrics"}]}"#,
        )
        .unwrap();
        assert_eq!(ctx.data_streams[0].kind, "metrics");
        assert!(ctx.all_field_names().is_empty());
        assert_eq!(sample().all_field_names().len(), 1);
    }
}
