use std::path::PathBuf;

use clap::{Parser, Subcommand};

use eventrag_cli::{answering_pipeline, load_config, open_pipeline, remediation};
use eventrag_core::error::Error;
use eventrag_core::events::load_events;
use eventrag_core::logging;

#[derive(Parser, Debug)]
#[command(name = "eventrag", about = "Ask questions about cultural events")]
struct Cli {
    /// Directory holding config.toml; relative index and model paths resolve against it.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Selects config.<env>.toml.
    #[arg(long, env = "RUST_ENV", default_value = "dev")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer a question from the indexed events.
    Ask {
        question: String,
        /// Attach the retrieved events the answer is based on.
        #[arg(long)]
        sources: bool,
    },
    /// Append events from a JSON file or directory to the existing index.
    Add { path: PathBuf },
    /// Show pipeline readiness and index size.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config_dir, &cli.env)?;
    let _guard = logging::init(&config.logging)?;

    if let Err(err) = run(&cli, &config).await {
        if let Some(hint) = remediation(&err) {
            eprintln!("💡 {hint}");
        }
        return Err(err.into());
    }
    Ok(())
}

async fn run(cli: &Cli, config: &eventrag_core::config::AppConfig) -> Result<(), Error> {
    let base = cli.config_dir.as_path();
    match &cli.command {
        Command::Ask { question, sources } => {
            let pipeline = answering_pipeline(config, base).await?;
            let result = pipeline.answer(question, *sources).await?;
            print_json(&result)?;
        }
        Command::Add { path } => {
            let events = load_events(path)?;
            let pipeline = open_pipeline(config, base).await?;
            let stats = pipeline.rebuild(&events).await?;
            println!("✅ Added {} events ({} chunks)", stats.events_processed, stats.chunks_created);
        }
        Command::Status => {
            let pipeline = match answering_pipeline(config, base).await {
                Ok(p) => p,
                Err(Error::InvalidConfig(msg)) => {
                    eprintln!("⚠️  {msg}");
                    open_pipeline(config, base).await?
                }
                Err(e) => return Err(e),
            };
            print_json(&pipeline.status().await)?;
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Error> {
    let out = serde_json::to_string_pretty(value).map_err(|e| Error::Operation(e.to_string()))?;
    println!("{out}");
    Ok(())
}
