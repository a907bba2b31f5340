mod backend;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use backend::{BackendConfig, ChatBackend};
use docgate::golden::GoldenStore;
use docgate::validators::{StageValidator, Validator};
use docgate::{
    score_document, HarnessConfig, PackageContext, SessionError, SessionOrchestrator,
    ValidationStage,
};

/// Staged validation and refinement for generated documentation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print composite quality metrics for a document
    Score {
        file: PathBuf,
        /// Package context JSON
        #[arg(long)]
        context: Option<PathBuf>,
        /// Print the full metrics as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Run the deterministic stage checks and print their feedback
    Check {
        file: PathBuf,
        #[arg(long)]
        context: Option<PathBuf>,
        /// Only run this stage
        #[arg(long)]
        stage: Option<ValidationStage>,
        /// Harness config TOML (rule tuning)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run a refinement session against the chat backend
    Refine {
        file: PathBuf,
        #[arg(long)]
        context: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the final document (default: stdout)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Write the audit report here
        #[arg(long)]
        report: Option<PathBuf>,
        /// Deterministic checks only
        #[arg(long, default_value_t = false)]
        no_semantic: bool,
    },

    /// Manage golden baselines
    Golden {
        /// Baseline directory (overrides DOCGATE_GOLDEN_DIR)
        #[arg(long)]
        dir: Option<PathBuf>,
        #[command(subcommand)]
        action: GoldenAction,
    },
}

#[derive(Subcommand, Debug)]
enum GoldenAction {
    /// Store a document (or a package directory's README) as a baseline
    Save {
        name: String,
        path: PathBuf,
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long)]
        context: Option<PathBuf>,
    },
    /// List stored baselines
    List,
    /// Remove a baseline
    Delete { name: String },
    /// Compare a document against a baseline
    Compare {
        name: String,
        file: PathBuf,
        #[arg(long)]
        context: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check every stored baseline is usable
    Validate,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docgate=info,docgate_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Score {
            file,
            context,
            json,
        } => score(&file, context.as_deref(), json),
        Command::Check {
            file,
            context,
            stage,
            config,
        } => check(&file, context.as_deref(), stage, config.as_deref()).await,
        Command::Refine {
            file,
            context,
            config,
            out,
            report,
            no_semantic,
        } => {
            refine(
                &file,
                context.as_deref(),
                config.as_deref(),
                out.as_deref(),
                report.as_deref(),
                no_semantic,
            )
            .await
        }
        Command::Golden { dir, action } => golden(dir, action),
    }
}

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn load_context(path: Option<&Path>) -> Result<PackageContext> {
    match path {
        Some(path) => PackageContext::from_json_file(path)
            .with_context(|| format!("failed to load package context {}", path.display())),
        None => Ok(PackageContext::default()),
    }
}

fn load_config(path: Option<&Path>) -> Result<HarnessConfig> {
    let config = match path {
        Some(path) => HarnessConfig::from_toml_file(path)?,
        None => HarnessConfig::default(),
    };
    Ok(config.apply_env_overrides()?)
}

fn score(file: &Path, context: Option<&Path>, json: bool) -> Result<ExitCode> {
    let content = read_document(file)?;
    let ctx = load_context(context)?;
    let metrics = score_document(&content, &ctx);

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("Composite:    {:.1}", metrics.composite_score);
        println!("Structure:    {:.1}", metrics.structure_score);
        println!("Accuracy:     {:.1}", metrics.accuracy_score);
        println!("Completeness: {:.1}", metrics.completeness_score);
        println!("Quality:      {:.1}", metrics.quality_score);
        println!(
            "Placeholders: {} ({:.1})",
            metrics.placeholder_count, metrics.placeholder_score
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn check(
    file: &Path,
    context: Option<&Path>,
    stage: Option<ValidationStage>,
    config: Option<&Path>,
) -> Result<ExitCode> {
    let doc = docgate::Document::new(read_document(file)?);
    let ctx = load_context(context)?;
    let config = load_config(config)?;
    let rules = Arc::new(config.rule_set());
    let stages = match stage {
        Some(stage) => vec![stage],
        None => config.stages.clone(),
    };

    let cancel = CancellationToken::new();
    let mut failed = 0;
    for stage in stages {
        let validator = StageValidator::new(stage, rules.clone());
        let result = validator.check_deterministic(&doc, &ctx, &cancel).await?;
        println!("{}", result.summary_line());
        if !result.valid {
            failed += 1;
            println!("{}\n", result.feedback_for_generator());
        }
        for warning in &result.warnings {
            println!("  warning: {}", warning);
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn refine(
    file: &Path,
    context: Option<&Path>,
    config: Option<&Path>,
    out: Option<&Path>,
    report: Option<&Path>,
    no_semantic: bool,
) -> Result<ExitCode> {
    let content = read_document(file)?;
    let ctx = load_context(context)?;
    let mut config = load_config(config)?;
    if no_semantic {
        config.enable_semantic = false;
    }

    let backend = Arc::new(ChatBackend::new(BackendConfig::default())?);
    info!(url = %backend.config().url, model = %backend.config().model, "using chat backend");

    let mut orchestrator = SessionOrchestrator::new(config, backend.clone());
    if !no_semantic {
        orchestrator = orchestrator.with_judge(backend);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling session");
            ctrl_c.cancel();
        }
    });

    let session = match orchestrator.run_with_cancel(content, &ctx, cancel).await {
        Ok(session) => session,
        Err(e) => {
            if let Some(partial) = e.partial() {
                write_output(out, &partial.final_document)?;
                if let Some(path) = report {
                    std::fs::write(path, partial.audit_report())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                }
            }
            return match e {
                SessionError::Cancelled { .. } | SessionError::TimedOut { .. } => {
                    eprintln!("{}", e);
                    Ok(ExitCode::FAILURE)
                }
                other => Err(other.into()),
            };
        }
    };

    write_output(out, &session.final_document)?;
    if let Some(path) = report {
        std::fs::write(path, session.audit_report())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    eprintln!(
        "{} after {} iterations (history {:?})",
        if session.approved { "approved" } else { "needs revision" },
        session.total_iterations,
        session.issue_history
    );
    Ok(if session.approved {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn golden(dir: Option<PathBuf>, action: GoldenAction) -> Result<ExitCode> {
    let dir = dir.unwrap_or_else(|| {
        std::env::var("DOCGATE_GOLDEN_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".docgate/golden"))
    });
    let store = GoldenStore::new(dir);

    match action {
        GoldenAction::Save {
            name,
            path,
            notes,
            context,
        } => {
            let ctx = load_context(context.as_deref())?;
            let golden = store.create_from_existing(&path, &name, &notes, &ctx)?;
            let score = golden.metadata.as_ref().map(|m| m.quality_score).unwrap_or(0.0);
            println!("saved '{}' (composite {:.1})", name, score);
        }
        GoldenAction::List => {
            for name in store.list()? {
                println!("{}", name);
            }
        }
        GoldenAction::Delete { name } => {
            store.delete(&name)?;
            println!("deleted '{}'", name);
        }
        GoldenAction::Compare {
            name,
            file,
            context,
            json,
        } => {
            let candidate = read_document(&file)?;
            let ctx = load_context(context.as_deref())?;
            let comparison = store.compare_with_golden(&name, &candidate, &ctx)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                println!("{}", comparison.report());
            }
            if !comparison.result.passed {
                return Ok(ExitCode::FAILURE);
            }
        }
        GoldenAction::Validate => {
            let (valid, invalid) = store.validate_all();
            for name in &valid {
                println!("ok      {}", name);
            }
            for entry in &invalid {
                println!("invalid {}", entry);
            }
            if !invalid.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
