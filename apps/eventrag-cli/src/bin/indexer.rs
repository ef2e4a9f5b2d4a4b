use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use eventrag_cli::{embedder, load_config};
use eventrag_core::config::resolve_with_base;
use eventrag_core::events::load_events;
use eventrag_core::traits::Embedder;
use eventrag_core::logging;
use eventrag_vector::IndexBuilder;

#[derive(Parser, Debug)]
#[command(name = "eventrag-indexer", about = "Build the event index from scratch")]
struct Args {
    /// JSON array of event records, or a directory of such files.
    events: PathBuf,

    /// Index directory; defaults to index.path from the configuration.
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[arg(long, env = "RUST_ENV", default_value = "dev")]
    env: String,

    /// Stop after this many events.
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long, default_value_t = false)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config_dir, &args.env)?;
    let _guard = logging::init(&config.logging)?;

    let mut events = load_events(&args.events)?;
    if let Some(limit) = args.limit {
        events.truncate(limit);
    }
    let index_path = match &args.output {
        Some(p) => resolve_with_base(&args.config_dir, p.to_string_lossy()),
        None => config.index_path(&args.config_dir),
    };
    println!("Event indexer\n=============");
    println!("Events: {} from {}", events.len(), args.events.display());
    println!("Index:  {}", index_path.display());

    let embedder = embedder(&config, &args.config_dir)?;
    info!(model = embedder.model_id(), dim = embedder.dim(), "embedding with");
    let builder = IndexBuilder::new(config.rag.chunking(), embedder, config.embedding.batch_size, config.index.table.clone())
        .with_progress(!args.no_progress);
    let stats = builder.build_from_scratch(&events, &index_path).await?;

    println!("\n✅ Indexing completed successfully!");
    println!("📊 {} events -> {} chunks", stats.events_processed, stats.chunks_created);
    println!("💡 Ask a question with: eventrag ask \"<question>\" --sources");
    Ok(())
}
