use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use questor::config::Config;
use questor::domain::{WorkflowResult, WorkflowStatus};
use questor::evaluation::EvaluationService;
use questor::id::generate_workflow_id;
use questor::journal::Journal;
use questor::llm::{OpenAiClient, OpenAiConfig};
use questor::prompt::PromptLibrary;
use questor::runner::Orchestrator;

/// Goal-directed query orchestration
#[derive(Parser)]
#[command(name = "questor", version, about)]
struct Cli {
    /// Queries to process; several run concurrently
    queries: Vec<String>,

    /// Path to a configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the JSONL journal
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Print system info and exit
    #[arg(long)]
    show_info: bool,
}

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("questor")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("questor.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_system_info(config: &Config) {
    println!("{} {} v{}", "System:".cyan(), config.system.name, config.system.version);
    println!("{} {}", "Allowed topics:".cyan(), config.boundaries.allowed_topics.join(", "));
    println!("{} {}", "Forbidden topics:".cyan(), config.boundaries.forbidden_topics.join(", "));

    let mut roles: Vec<&String> = config.agents.keys().collect();
    roles.sort();
    println!(
        "{} {}",
        "Agents:".cyan(),
        roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(", ")
    );

    let library = PromptLibrary::new();
    println!("{} {}", "Prompts:".cyan(), library.list().join(", "));
    println!(
        "{} threshold={:.2} max_attempts={}",
        "Goal:".cyan(),
        config.quality_threshold(),
        config.workflow.max_attempts
    );
}

fn print_result(query: &str, result: &WorkflowResult) {
    println!("\n{}", "=".repeat(70));
    println!("{} {}", "Query:".bold(), query);

    let status = result.status.to_string();
    let status = match result.status {
        WorkflowStatus::Completed => status.green(),
        WorkflowStatus::Rejected | WorkflowStatus::Failed | WorkflowStatus::Error => status.red(),
        _ => status.yellow(),
    };
    println!("{} {}", "Status:".bold(), status);

    if result.status == WorkflowStatus::Rejected {
        if let Some(reason) = &result.reason {
            println!("{} {}", "Reason:".bold(), reason);
        }
        return;
    }

    if let Some(error) = &result.error {
        println!("{} {}", "Error:".bold(), error.red());
        return;
    }

    println!("{} {}", "Goal achieved:".bold(), result.goal_achieved);
    println!(
        "{} attempts={} refinements={} quality={:.2} tokens={}",
        "Metrics:".bold(),
        result.metrics.total_attempts,
        result.metrics.refinement_loops,
        result.final_quality_score,
        result.metrics.total_tokens
    );

    println!("{}", "Action sequence:".bold());
    for record in &result.action_sequence {
        let quality = match record.quality_after {
            Some(q) => format!(" (quality {:.2})", q),
            None => String::new(),
        };
        println!("  {} {}{}", format!("[{}]", record.attempt).dimmed(), record.action, quality);
        println!("     {}", record.reason.dimmed());
    }

    if result.status == WorkflowStatus::Completed {
        if let Some(output) = result.final_output() {
            let preview: String = output.chars().take(300).collect();
            println!("{}", "Final output:".bold());
            println!("  {}", preview);
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    if cli.show_info {
        print_system_info(&config);
        return Ok(());
    }

    if cli.queries.is_empty() {
        eyre::bail!("no query given (try: questor \"What are microservices?\")");
    }

    let client = OpenAiClient::new(OpenAiConfig::from(&config.llm)).context("Failed to create LLM client")?;
    let orchestrator = Orchestrator::new(Arc::new(client), config.clone());
    let evaluator = EvaluationService::new(config.requirements.non_functional.clone());
    let journal = Journal::new(&cli.log_dir)?;

    let runs: Vec<(String, String)> = cli
        .queries
        .iter()
        .map(|query| (query.clone(), generate_workflow_id()))
        .collect();

    // Workflows are independent; run them concurrently
    let results = futures::future::join_all(
        runs.iter()
            .map(|(query, workflow_id)| orchestrator.orchestrate(query, workflow_id)),
    )
    .await;

    for ((query, _), result) in runs.iter().zip(&results) {
        print_result(query, result);
        journal.log_workflow(result)?;

        if result.status == WorkflowStatus::Completed {
            let metrics = evaluator.evaluate(result);
            let check = evaluator.check_requirements(&metrics);
            journal.log_metrics(&metrics)?;

            if !check.all_requirements_met {
                println!("{}", "Non-functional requirements not met".yellow());
            }
        } else if result.status == WorkflowStatus::Error {
            journal.log_error(
                result.error.as_deref().unwrap_or("unknown error"),
                &serde_json::json!({ "workflow_id": result.workflow_id, "query": query }),
            )?;
        }
    }

    if results.len() > 1 {
        let report = evaluator.report();
        println!("\n{}", "=".repeat(70));
        println!(
            "{} workflows={} avg_quality={:.2} avg_latency={:.0}ms success_rate={:.0}%",
            "Report:".bold(),
            report.total_workflows,
            report.average_accuracy,
            report.average_latency_ms,
            report.success_rate * 100.0
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    run(cli).await.context("Application failed")?;

    Ok(())
}
