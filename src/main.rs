use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use hiddb_client::config::{Config, SettleMode};
use hiddb_client::metrics;
use hiddb_client::scenario::{Scenario, ScenarioReport};
use hiddb_client::settle::Settler;
use hiddb_client::IndexClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Off,
    Json,
}

#[derive(Parser)]
#[command(name = "hiddb-demo", about = "Run the reference scenario against a hiddb index service")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, env = "HIDDB_CONFIG")]
    config: Option<String>,

    /// Service base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Index id used by the scenario
    #[arg(long)]
    index_id: Option<u64>,

    /// How to wait between dependent calls
    #[arg(long, value_enum)]
    settle_mode: Option<SettleMode>,

    /// Settle interval in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Search the index once the inserts have settled
    #[arg(long)]
    with_search: bool,

    /// Poll /health before the first step
    #[arg(long)]
    wait_ready: bool,

    /// Print a run report on stdout
    #[arg(long, value_enum, default_value = "off")]
    report: ReportFormat,

    /// Print client metrics on stdout after the run
    #[arg(long)]
    metrics: bool,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

/// Log how the run ended and report whether every step succeeded.
fn report_succeeded(report: &ScenarioReport) -> bool {
    match &report.halted {
        Some(halt) => {
            tracing::error!(
                step = halt.step,
                name = halt.name,
                completed = report.steps.len(),
                total = report.total_steps,
                "scenario halted"
            );
            false
        }
        None => {
            tracing::info!(total = report.total_steps, "scenario complete");
            true
        }
    }
}

/// 0 when the scenario completed, 1 when it halted or could not start.
fn exit_code(outcome: &anyhow::Result<bool>) -> u8 {
    match outcome {
        Ok(true) => 0,
        Ok(false) | Err(_) => 1,
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    // Load config, then apply CLI overrides
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.client.base_url = url;
    }
    if let Some(id) = cli.index_id {
        config.scenario.index_id = id;
    }
    if let Some(mode) = cli.settle_mode {
        config.scenario.settle_mode = mode;
    }
    if let Some(ms) = cli.settle_ms {
        config.scenario.settle_interval_ms = ms;
    }

    // Initialize tracing from LoggingConfig
    init_tracing(&config);
    metrics::init();

    // Build client and settler
    let client = IndexClient::new(&config.client.base_url)?;
    let settler = Settler::from_config(&config.scenario);
    tracing::info!(
        base_url = client.base_url(),
        settle_mode = ?settler.mode(),
        settle_interval_ms = config.scenario.settle_interval_ms,
        "hiddb-demo starting"
    );

    // Wait for /health
    if cli.wait_ready {
        let readiness = Settler::poll(settler.interval(), config.scenario.poll_max_attempts);
        if !readiness.wait_ready(&client).await? {
            anyhow::bail!("service at {} did not become ready", client.base_url());
        }
    }

    // Run the scenario
    let scenario = Scenario::reference_with(
        config.scenario.index_id,
        config.scenario.k,
        config.scenario.dimension,
        cli.with_search,
    );
    let report = scenario.run(&client, &settler).await;

    // Report
    if cli.report == ReportFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if cli.metrics {
        print!("{}", metrics::gather_text());
    }

    Ok(report_succeeded(&report))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env
    let _ = dotenvy::dotenv();

    let outcome = run(Cli::parse()).await;
    if let Err(e) = &outcome {
        eprintln!("hiddb-demo: {e:#}");
    }
    ExitCode::from(exit_code(&outcome))
}
