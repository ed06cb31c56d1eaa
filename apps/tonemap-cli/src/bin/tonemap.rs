use std::env;
use std::path::PathBuf;

use tracing_subscriber::{fmt, EnvFilter};

use tonemap_cli::ingest::load_items;
use tonemap_core::config::{Config, Settings};
use tonemap_core::traits::ItemStore;
use tonemap_embed::get_default_embedder;
use tonemap_score::{compute_stats, embed_anchors, embed_items, load_anchor_set, run_pipeline, score_items, summarize, PipelineOptions};
use tonemap_store::LanceStore;

const USAGE: &str = "Usage: tonemap <ingest <path>|embed|score|stats|process|status>";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;
    let (cmd, args) = parse_args();
    tokio::runtime::Runtime::new()?.block_on(run(&cmd, &args, &settings))
}

async fn run(cmd: &str, args: &[String], settings: &Settings) -> anyhow::Result<()> {
    let taxonomy = settings.taxonomy()?;
    match cmd {
        "ingest" => {
            let Some(path) = args.first().map(PathBuf::from) else { eprintln!("Usage: tonemap ingest <file.json|dir>"); std::process::exit(1) };
            println!("Ingesting from {}", path.display());
            let items = load_items(&path)?;
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            let n = store.upsert_items(&items).await?;
            println!("✅ Ingested {n} items");
        }
        "embed" => {
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            let embedder = get_default_embedder(&settings.embedding)?;
            let anchors = embed_anchors(embedder.as_ref(), &store, &taxonomy, settings.embedding.batch_size).await?;
            let items = embed_items(embedder.as_ref(), &store, settings.embedding.batch_size).await?;
            println!("✅ Embedded {anchors} anchor phrases and {items} items");
        }
        "score" => {
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            let anchors = load_anchor_set(&store, taxonomy).await?;
            let report = score_items(&store, &anchors, settings.scoring.batch_size).await?;
            println!("✅ Scored {} items ({} skipped without embedding)", report.scored, report.skipped_missing_embedding);
        }
        "stats" => {
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            let report = compute_stats(&store, &taxonomy, settings.stats.write_batch_size).await?;
            println!("✅ Normalized {} scores", report.updated);
            for (name, s) in report.stats.iter() {
                println!("  {name:<14} mean {:+.4}  sd {:.4}", s.mean, s.stddev);
            }
        }
        "process" => {
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            let embedder = get_default_embedder(&settings.embedding)?;
            let report = run_pipeline(embedder.as_ref(), &store, &taxonomy, PipelineOptions::from(settings)).await?;
            println!(
                "✅ Pipeline complete: {} anchors, {} items embedded, {} scored, {} skipped, {} normalized",
                report.anchors_embedded,
                report.items_embedded,
                report.scoring.scored,
                report.scoring.skipped_missing_embedding,
                report.stats.updated
            );
        }
        "status" => {
            let store = LanceStore::open(&settings.store, settings.embedding.dim).await?;
            print!("{}", summarize(&store, &taxonomy).await?);
        }
        _ => { eprintln!("Unknown command: {cmd}\n{USAGE}"); std::process::exit(1); }
    }
    Ok(())
}
