//! CodeCritter CLI.
//!
//! ```text
//! codecritter send [--provider P] [--config F] <PROMPT_FILE|->
//! codecritter review [--config F] <PROMPT_FILE|->
//! codecritter check-config <F>
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use codecritter::ai::response::{self, should_surface, Severity};
use codecritter::ai::{AiService, Provider};
use codecritter::config::{load_config, load_or_default, CritterConfig};
use codecritter::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "codecritter", version)]
#[command(about = "Send prompts to AI providers with retries, circuit breakers and fallback", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plain text completion
    Send {
        /// Use only this provider instead of falling back
        #[arg(short, long)]
        provider: Option<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prompt file, or "-" for stdin
        prompt: String,
    },
    /// Structured code review, filtered by the configured severity threshold
    Review {
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Prompt file, or "-" for stdin
        prompt: String,
    },
    /// Validate a config file and print it with defaults filled in
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { provider, config, prompt } => {
            let config = init(config.as_deref())?;
            let service = AiService::from_config(&config)?;
            let prompt = read_prompt(&prompt)?;

            match provider {
                Some(name) => {
                    let provider: Provider = name.parse()?;
                    let text = service.generate(provider, &prompt, response::parse_plain).await?;
                    eprintln!("provider: {}", provider);
                    println!("{}", text);
                }
                None => {
                    let generated = service.complete_text(&prompt).await?;
                    eprintln!("provider: {}", generated.provider);
                    println!("{}", generated.value);
                }
            }
        }
        Commands::Review { config, prompt } => {
            let config = init(config.as_deref())?;
            let service = AiService::from_config(&config)?;
            let prompt = read_prompt(&prompt)?;
            let threshold = Severity::parse_lenient(&config.review.threshold);

            let generated = service.review(&prompt).await?;
            eprintln!("provider: {}", generated.provider);
            if should_surface(&generated.value, threshold) {
                println!("{}", serde_json::to_string_pretty(&generated.value)?);
            } else {
                tracing::info!(%threshold, severity = ?generated.value.severity(), "Review below threshold, suppressed");
            }
        }
        Commands::CheckConfig { path } => {
            let config = load_config(&path)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Load config, then bring up logging and (optionally) the metrics exporter.
fn init(path: Option<&Path>) -> Result<CritterConfig, Box<dyn std::error::Error>> {
    let config = load_or_default(path)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        providers = config.providers.len(),
        max_attempts = config.retry.max_attempts,
        failure_threshold = config.breaker.failure_threshold,
        "codecritter v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    Ok(config)
}

fn read_prompt(source: &str) -> std::io::Result<String> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(source)
    }
}
