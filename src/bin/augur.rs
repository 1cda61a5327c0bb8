//! augur: analysis CLI
//!
//! Runs the coordinator against a wizards service from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use augur::backend::HttpBackend;
use augur::{
    AnalysisContext, AnalyzeOptions, Config, LifecycleManager, LifecycleState, SourceFile,
    StaticAnalyzerRegistry, WorkspaceEnumerator,
};
use clap::{Parser, Subcommand};

/// Augur CLI
#[derive(Parser)]
#[command(name = "augur")]
#[command(version = augur::PKG_VERSION)]
#[command(about = "Analysis cache and coordination engine")]
struct Args {
    /// Config file (default: ~/.augur/config.toml, then /etc/augur/config.toml)
    #[arg(short, long, env = "AUGUR_CONFIG")]
    config: Option<PathBuf>,

    /// Wizards service URL (overrides the config file)
    #[arg(short, long, env = "AUGUR_BACKEND_URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check backend health
    Health,

    /// Show effective configuration
    Config,

    /// Analyze one file
    Analyze {
        /// File to analyze
        file: PathBuf,
        /// Analyzer to run (repeatable; omit to run every applicable analyzer)
        #[arg(short, long = "analyzer")]
        analyzers: Vec<String>,
        /// Scenario for multi-analyzer reviews
        #[arg(short, long, default_value = "code-review")]
        scenario: String,
    },

    /// Analyze every source file in the project
    Sweep {
        /// Project root (overrides the config file)
        #[arg(short, long)]
        root: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(url) = args.backend {
        config.backend.url = url;
    }
    if let Command::Sweep {
        root: Some(root), ..
    } = &args.command
    {
        config.project.root = Some(root.clone());
    }

    let backend = Arc::new(HttpBackend::from_config(&config.backend)?);
    let registry = Arc::new(StaticAnalyzerRegistry::from_config(&config.analyzers));
    let enumerator = Arc::new(WorkspaceEnumerator::from_config(&config.project)?);
    let manager = LifecycleManager::new(backend, registry, Arc::new(config))
        .with_enumerator(enumerator);

    match args.command {
        Command::Config => {
            let summary = manager.configuration_summary();
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Health => {
            manager.start().await;
            let health = manager.health_check().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            manager.dispose().await;
            if !health.overall_healthy {
                std::process::exit(1);
            }
        }
        Command::Analyze {
            file,
            analyzers,
            scenario,
        } => {
            require_ready(manager.start().await)?;
            let source = read_source(&file).await?;
            let coordinator = manager.coordinator();

            match analyzers.as_slice() {
                [] => {
                    let outcome = coordinator
                        .analyze_with_all_applicable(&source, &source.language)
                        .await;
                    for result in &outcome.results {
                        println!("{}", serde_json::to_string_pretty(result)?);
                    }
                    for failure in &outcome.failures {
                        eprintln!("{}: {}", failure.analyzer_id, failure.reason);
                    }
                    eprintln!(
                        "{} of {} analyzers succeeded",
                        outcome.succeeded(),
                        outcome.attempted()
                    );
                }
                [analyzer] => {
                    let result = coordinator
                        .analyze_with_analyzer(&source, analyzer, &AnalyzeOptions::default())
                        .await?;
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                many => {
                    let combined = coordinator
                        .multi_analyzer_review(&source, many, &scenario, &AnalysisContext::new())
                        .await?;
                    println!("{}", serde_json::to_string_pretty(&combined)?);
                }
            }
            manager.dispose().await;
        }
        Command::Sweep { .. } => {
            require_ready(manager.start().await)?;
            let job = manager.coordinator().analyze_project(|progress| {
                eprintln!(
                    "[{}/{}] {}",
                    progress.index + 1,
                    progress.total,
                    progress.file_name
                );
            });
            let report = job.wait().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            println!(
                "{}",
                serde_json::to_string_pretty(&manager.coordinator().statistics())?
            );
            manager.dispose().await;
        }
    }

    Ok(())
}

fn require_ready(state: LifecycleState) -> Result<(), Box<dyn std::error::Error>> {
    if state == LifecycleState::Ready {
        Ok(())
    } else {
        Err(format!("backend did not start (state: {state})").into())
    }
}

async fn read_source(path: &std::path::Path) -> Result<SourceFile, Box<dyn std::error::Error>> {
    let language = augur::types::language_for_path(path)
        .ok_or_else(|| format!("unrecognised file type: {}", path.display()))?;
    let content = tokio::fs::read_to_string(path).await?;
    Ok(SourceFile::new(path.to_string_lossy(), language, content))
}
