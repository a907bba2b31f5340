//! Golden baselines for regression comparison
//!
//! A baseline is a known-good document stored as `<name>.golden.md` next to
//! an optional `<name>.golden.json` metadata file. Comparing a candidate
//! against a baseline scores both with [`crate::scoring`] and measures
//! section coverage and word overlap; see [`compare`].
//!
//! Loaded baselines are cached in memory; `save` and `delete` keep the
//! cache in step with the directory.

mod compare;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PersistenceError, PersistenceResult};
use crate::model::PackageContext;
use crate::scoring::score_document;

pub use compare::{compare, AxisDeltas, ComparisonResult, GoldenBaseline, PASS_RATIO};

const CONTENT_SUFFIX: &str = ".golden.md";
const META_SUFFIX: &str = ".golden.json";

/// Locations searched under a package directory by
/// [`GoldenStore::create_from_existing`]
const README_CANDIDATES: &[&str] = &["_dev/build/docs/README.md", "docs/README.md", "README.md"];

/// `<name>.golden.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenMetadata {
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,
    #[serde(default)]
    pub quality_score: f64,
}

impl GoldenMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            source: source.into(),
            created_at: now,
            updated_at: now,
            version: String::new(),
            notes: String::new(),
            author: String::new(),
            quality_score: 0.0,
        }
    }
}

/// A stored baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenFile {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GoldenMetadata>,
}

impl GoldenFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: GoldenMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Baseline with metrics computed against `ctx`
    pub fn baseline(&self, ctx: &PackageContext) -> GoldenBaseline {
        GoldenBaseline::new(self.content.as_str(), ctx)
    }
}

/// A named comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenComparison {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub result: ComparisonResult,
}

impl GoldenComparison {
    /// Markdown report of the comparison
    pub fn report(&self) -> String {
        let r = &self.result;
        let golden = &r.reference_metrics;
        let generated = &r.candidate_metrics;

        let mut out = format!("# Golden File Comparison: {}\n\n", self.name);
        out.push_str(&format!("**Timestamp**: {}\n\n", self.timestamp.to_rfc3339()));
        out.push_str(&format!(
            "**Status**: {}\n\n",
            if r.passed { "✅ PASSED" } else { "❌ FAILED" }
        ));

        out.push_str("## Score Comparison\n\n");
        out.push_str("| Metric | Golden | Generated | Delta |\n");
        out.push_str("|--------|--------|-----------|-------|\n");
        out.push_str(&format!(
            "| **Composite** | {:.1} | {:.1} | {:+.1} ({:.1}%) |\n",
            golden.composite_score, generated.composite_score, r.score_delta, r.percent_change
        ));
        let rows = [
            ("Structure", golden.structure_score, generated.structure_score, r.axis_deltas.structure),
            ("Accuracy", golden.accuracy_score, generated.accuracy_score, r.axis_deltas.accuracy),
            (
                "Completeness",
                golden.completeness_score,
                generated.completeness_score,
                r.axis_deltas.completeness,
            ),
            ("Quality", golden.quality_score, generated.quality_score, r.axis_deltas.quality),
        ];
        for (label, g, c, delta) in rows {
            out.push_str(&format!("| {} | {:.1} | {:.1} | {:+.1} |\n", label, g, c, delta));
        }
        out.push_str(&format!(
            "| Placeholders | {} | {} | {:+} |\n",
            golden.placeholder_count, generated.placeholder_count, r.axis_deltas.placeholders
        ));

        out.push_str("\n## Section Coverage\n\n");
        out.push_str(&format!("- **Coverage**: {:.1}%\n", r.section_coverage));
        out.push_str(&format!("- **Content Similarity**: {:.1}%\n", r.content_similarity));
        for (label, sections) in [
            ("Matching Sections", &r.matching_sections),
            ("Missing Sections", &r.missing_sections),
            ("Extra Sections", &r.extra_sections),
        ] {
            if !sections.is_empty() {
                out.push_str(&format!("- **{}**: {}\n", label, sections.join(", ")));
            }
        }
        out
    }
}

/// Directory of golden baselines
#[derive(Debug)]
pub struct GoldenStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, GoldenFile>>,
}

impl GoldenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn content_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, CONTENT_SUFFIX))
    }

    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}{}", name, META_SUFFIX))
    }

    /// Write content and metadata, replacing any existing baseline
    pub fn save(&self, golden: &GoldenFile) -> PersistenceResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;

        let content_path = self.content_path(&golden.name);
        std::fs::write(&content_path, &golden.content)
            .map_err(|e| PersistenceError::io(&content_path, e))?;

        if let Some(meta) = &golden.metadata {
            let meta_path = self.meta_path(&golden.name);
            let json = serde_json::to_string_pretty(meta)?;
            std::fs::write(&meta_path, json).map_err(|e| PersistenceError::io(&meta_path, e))?;
        }

        self.cache
            .write()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .insert(golden.name.clone(), golden.clone());
        debug!(golden = %golden.name, "saved golden baseline");
        Ok(())
    }

    /// Load a baseline. Metadata that is missing or unreadable is left out.
    pub fn load(&self, name: &str) -> PersistenceResult<GoldenFile> {
        if let Some(cached) = self
            .cache
            .read()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .get(name)
        {
            return Ok(cached.clone());
        }

        let content_path = self.content_path(name);
        let content = match std::fs::read_to_string(&content_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(format!("golden baseline '{}'", name)));
            }
            Err(e) => return Err(PersistenceError::io(&content_path, e)),
        };

        let metadata = std::fs::read_to_string(self.meta_path(name))
            .ok()
            .and_then(|raw| serde_json::from_str::<GoldenMetadata>(&raw).ok());

        let golden = GoldenFile {
            name: name.to_string(),
            content,
            metadata,
        };
        self.cache
            .write()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .insert(name.to_string(), golden.clone());
        Ok(golden)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.content_path(name).is_file()
    }

    /// Names of every stored baseline, sorted. A missing directory is empty.
    pub fn list(&self) -> PersistenceResult<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::io(&self.dir, e))?;
            if entry.path().is_dir() {
                continue;
            }
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_string_lossy().strip_suffix(CONTENT_SUFFIX) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a baseline. Removing one that does not exist is not an error.
    pub fn delete(&self, name: &str) -> PersistenceResult<()> {
        let content_path = self.content_path(name);
        if let Err(e) = std::fs::remove_file(&content_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(PersistenceError::io(&content_path, e));
            }
        }
        if let Err(e) = std::fs::remove_file(self.meta_path(name)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!(golden = %name, error = %e, "failed to remove golden metadata");
            }
        }

        self.cache
            .write()
            .map_err(|_| PersistenceError::LockPoisoned)?
            .remove(name);
        Ok(())
    }

    /// Save an existing README as a baseline. `path` is either the document
    /// itself or a package directory searched for a README.
    pub fn create_from_existing(
        &self,
        path: &Path,
        name: &str,
        notes: &str,
        ctx: &PackageContext,
    ) -> PersistenceResult<GoldenFile> {
        let source = if path.is_dir() {
            README_CANDIDATES
                .iter()
                .map(|candidate| path.join(candidate))
                .find(|candidate| candidate.is_file())
                .ok_or_else(|| PersistenceError::NotFound(format!("no README under {}", path.display())))?
        } else {
            path.to_path_buf()
        };

        let content =
            std::fs::read_to_string(&source).map_err(|e| PersistenceError::io(&source, e))?;
        let metrics = score_document(&content, ctx);

        let mut metadata = GoldenMetadata::new(source.display().to_string());
        metadata.notes = notes.to_string();
        metadata.version = ctx.version().to_string();
        metadata.quality_score = metrics.composite_score;

        let golden = GoldenFile::new(name, content).with_metadata(metadata);
        self.save(&golden)?;
        Ok(golden)
    }

    /// Compare `candidate` against the named baseline
    pub fn compare_with_golden(
        &self,
        name: &str,
        candidate: &str,
        ctx: &PackageContext,
    ) -> PersistenceResult<GoldenComparison> {
        let golden = self.load(name)?;
        let result = compare(candidate, &golden.baseline(ctx), ctx);
        debug!(
            golden = %name,
            passed = result.passed,
            delta = result.score_delta,
            "compared against golden baseline"
        );
        Ok(GoldenComparison {
            name: name.to_string(),
            timestamp: Utc::now(),
            result,
        })
    }

    /// Markdown report comparing `candidate` against the named baseline
    pub fn comparison_report(
        &self,
        name: &str,
        candidate: &str,
        ctx: &PackageContext,
    ) -> PersistenceResult<String> {
        Ok(self.compare_with_golden(name, candidate, ctx)?.report())
    }

    /// Split stored baselines into usable names and `name: reason` entries
    /// for broken ones
    pub fn validate_all(&self) -> (Vec<String>, Vec<String>) {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();

        let names = match self.list() {
            Ok(names) => names,
            Err(e) => {
                invalid.push(format!("{}: {}", self.dir.display(), e));
                return (valid, invalid);
            }
        };

        for name in names {
            match self.load(&name) {
                Err(e) => invalid.push(format!("{}: {}", name, e)),
                Ok(golden) if golden.content.trim().is_empty() => {
                    invalid.push(format!("{}: empty content", name))
                }
                Ok(golden) if golden.metadata.is_none() => {
                    invalid.push(format!("{}: missing metadata", name))
                }
                Ok(_) => valid.push(name),
            }
        }
        (valid, invalid)
    }
}
