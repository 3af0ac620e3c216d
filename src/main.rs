use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trendsmith::cli;
use trendsmith::features::FeatureKind;

#[derive(Parser)]
#[command(name = "trendsmith", version)]
#[command(about = "LLM-backed TikTok niche, trend, hashtag and caption generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Path to config file (defaults to ./trendsmith.toml or ~/.config/trendsmith/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Listen address, e.g. 127.0.0.1:8787 (default: from config)
        #[arg(long)]
        host: Option<String>,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one generation and print the JSON result
    Generate {
        /// Feature to run
        #[arg(value_enum)]
        feature: FeatureKind,

        /// Request field as key=value (repeatable), e.g. --param niche=fitness
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Override LLM model
        #[arg(long)]
        model: Option<String>,

        /// Write the result to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate configuration and API key setup
    ConfigCheck {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            dry_run,
        } => cli::serve::run(config, host, dry_run).await?,
        Commands::Generate {
            feature,
            params,
            config,
            model,
            output,
            dry_run,
        } => cli::generate::run(feature, params, config, model, output, dry_run).await?,
        Commands::ConfigCheck { config } => cli::config_check::run(config)?,
    }

    Ok(())
}
