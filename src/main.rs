use std::panic;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use snippet_runner::{Config, ExecutionRequest, HealthReport, Orchestrator};

#[derive(Debug, Parser)]
#[command(name = "snippet-runner", version, about = "Compile and run code snippets")]
struct Cli {
    /// Wall-clock limit for compile and run together, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<f64>,

    /// Directory where sources and binaries are staged
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a JSON request {"code", "stdin", "language"} and print the result
    Run {
        /// Read the request from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the languages whose toolchains are installed
    Languages,
    /// Print a health report
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let orchestrator = Orchestrator::native(build_config(&cli)?);

    match cli.command {
        Commands::Run { file } => {
            let raw = match file {
                Some(path) => tokio::fs::read_to_string(path).await?,
                None => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            let request: ExecutionRequest = serde_json::from_str(&raw)?;
            tracing::debug!("Received request for {}", request.language);

            let result = orchestrator
                .run(&request.code, &request.stdin, &request.language)
                .await;
            println!("{}", serde_json::to_string(&result)?);
        }
        Commands::Languages => {
            let languages = orchestrator.available_languages();
            println!("{}", serde_json::json!({ "languages": languages }));
        }
        Commands::Health => {
            let report = HealthReport::healthy(orchestrator.available_languages());
            println!("{}", serde_json::to_string(&report)?);
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::from_env()?;

    if let Some(secs) = cli.timeout_secs {
        let timeout = Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|timeout| !timeout.is_zero())
            .ok_or_else(|| format!("--timeout-secs must be positive, got {secs}"))?;
        config = config.with_timeout(timeout);
    }
    if let Some(work_dir) = &cli.work_dir {
        config = config.with_work_dir(work_dir);
    }

    tracing::debug!("Configuration: {:?}", config);
    Ok(config)
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
