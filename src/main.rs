// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Harava - AI-Guided Reconnaissance Engine
 * Standalone CLI for orchestrated reconnaissance sessions
 *
 * (c) 2026 Bountyy Oy
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use harava::adapters;
use harava::ai::{AiAnalyzer, AiPlanner, OpenRouterProvider};
use harava::config::EngineConfig;
use harava::database::PostgresGateway;
use harava::session::{SessionManager, SessionReport};
use harava::storage::{MemoryGateway, PersistenceGateway};

/// Harava - AI-guided reconnaissance engine
#[derive(Parser)]
#[command(name = "harava")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Orchestrated reconnaissance with advisory AI planning and analysis", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconnaissance session against a target
    Scan {
        /// Target domain, IP, email, or username
        target: String,

        /// Specific adapters to run (default: AI plan or all)
        #[arg(short, long, value_delimiter = ',')]
        tools: Option<Vec<String>>,

        /// Disable AI planning and analysis
        #[arg(long)]
        no_ai: bool,

        /// Maximum concurrent adapter invocations
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-adapter timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Write the session export document to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List registered adapters
    Tools,

    /// Print a stored session as its export document
    Show {
        /// Session id
        session_id: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    print_banner();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("harava-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn print_banner() {
    println!(" _                              ");
    println!("| |__   __ _ _ __ __ ___   ____ _");
    println!("| '_ \\ / _` | '__/ _` \\ \\ / / _` |");
    println!("| | | | (_| | | | (_| |\\ V / (_| |");
    println!("|_| |_|\\__,_|_|  \\__,_| \\_/ \\__,_|");
    println!();
    println!("    AI-Guided Reconnaissance Engine");
    println!("    v{} - (c) 2026 Bountyy Oy", env!("CARGO_PKG_VERSION"));
    println!();
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = EngineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Tools => {
            let registry = adapters::default_registry()?;
            println!("Registered adapters:");
            for descriptor in registry.descriptors() {
                println!(
                    "  {:<12} [{:<4}] {}",
                    descriptor.name, descriptor.category, descriptor.description
                );
            }
            Ok(())
        }

        Commands::Show { session_id } => {
            let manager = build_manager(&config, false).await?;
            match manager.load(&session_id).await? {
                Some(report) => {
                    let export = manager.export(&report);
                    println!("{}", serde_json::to_string_pretty(&export)?);
                    Ok(())
                }
                None => anyhow::bail!("No session found with id {}", session_id),
            }
        }

        Commands::Scan {
            target,
            tools,
            no_ai,
            concurrency,
            timeout,
            output,
        } => {
            if let Some(concurrency) = concurrency {
                config.tools.max_concurrent = concurrency;
            }
            if let Some(timeout) = timeout {
                config.tools.timeout_secs = timeout;
            }

            let manager = build_manager(&config, !no_ai).await?;

            // Operator abort broadcasts one cancellation signal to every
            // in-flight invocation.
            let cancel = CancellationToken::new();
            let signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling session");
                    signal.cancel();
                }
            });

            let report = manager.run(&target, tools.as_deref(), &cancel).await?;
            print_report(&report);

            if let Some(path) = output {
                let export = manager.export(&report);
                let json = serde_json::to_string_pretty(&export)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Session export written to {}", path.display());
            }

            Ok(())
        }
    }
}

async fn build_manager(config: &EngineConfig, enable_ai: bool) -> Result<SessionManager> {
    let registry = Arc::new(adapters::default_registry()?);

    let gateway: Arc<dyn PersistenceGateway> = if config.database.enabled {
        let gateway = PostgresGateway::new(config.database.clone()).await?;
        gateway.init_schema().await?;
        Arc::new(gateway)
    } else {
        info!("Database disabled, keeping session records in memory only");
        Arc::new(MemoryGateway::new())
    };

    let mut manager = SessionManager::new(Arc::clone(&registry), gateway, &config.tools);

    if enable_ai && config.ai.enabled && config.ai.api_key.is_some() {
        let provider: Arc<dyn harava::ai::LlmProvider> =
            Arc::new(OpenRouterProvider::new(&config.ai)?);
        info!("Advisory AI enabled (model {})", provider.model());
        manager = manager
            .with_planner(AiPlanner::new(
                Arc::clone(&provider),
                config.ai.planning_timeout(),
            ))
            .with_analyzer(AiAnalyzer::new(provider, config.ai.analysis_timeout()));
    } else if enable_ai {
        warn!("Advisory AI disabled: no API key configured");
    }

    Ok(manager)
}

fn print_report(report: &SessionReport) {
    println!();
    println!("{}", "=".repeat(60));
    println!("Recon results for: {}", report.session.target.identifier);
    println!("Session ID: {}", report.session.session_id);
    println!("Status: {}", report.session.status);
    println!("{}", "=".repeat(60));

    for result in &report.results {
        println!();
        println!("[{}]", result.tool_name);
        if result.success {
            if let Some(data) = &result.data {
                print_payload(data);
            }
            println!("  execution time: {:.2}s", result.execution_time);
        } else if let Some(error) = &result.error {
            println!("  failed ({}): {}", error.kind, error.message);
        }
    }

    if let Some(analysis) = &report.analysis {
        println!();
        println!("[ai analysis]");
        println!("  risk level: {}", analysis.risk_level);
        println!("  summary: {}", analysis.summary);
        for finding in &analysis.key_findings {
            println!("  - {}", finding);
        }
        if !analysis.interesting_targets.is_empty() {
            println!("  interesting targets:");
            for target in &analysis.interesting_targets {
                println!("    - {}", target);
            }
        }
    }
    println!();
}

fn print_payload(data: &serde_json::Value) {
    match data {
        serde_json::Value::Object(map) => {
            for (key, value) in map {
                match value {
                    serde_json::Value::Array(items) => {
                        println!("  {}: {} items", key, items.len());
                        for item in items.iter().take(3) {
                            println!("    - {}", item);
                        }
                        if items.len() > 3 {
                            println!("    ... and {} more", items.len() - 3);
                        }
                    }
                    other => println!("  {}: {}", key, other),
                }
            }
        }
        other => println!("  {}", other),
    }
}
