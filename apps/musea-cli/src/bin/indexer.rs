use indicatif::{ProgressBar, ProgressStyle};
use std::{env, path::PathBuf};

use musea_core::config::{expand_path, Config};
use musea_hybrid::HybridEngine;
use musea_ingest::{chunk_documents, Ingestor, NormalizerOptions};
use musea_text::LexicalIndex;
use musea_vector::{embedder_from_settings, VectorStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let mut data_dir = None;
    let mut batch_size = settings.index.batch_size;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--batch-size" => {
                if let Some(n) = args.get(i + 1).and_then(|s| s.parse::<usize>().ok()) {
                    batch_size = n;
                    i += 1;
                } else {
                    eprintln!("Error: --batch-size requires a number");
                    std::process::exit(1);
                }
            }
            _ if !args[i].starts_with('-') => data_dir = Some(PathBuf::from(&args[i])),
            other => {
                eprintln!("Unknown flag: {}", other);
                std::process::exit(1);
            }
        }
        i += 1;
    }
    let data_dir = match data_dir {
        Some(d) => d,
        None => {
            eprintln!("Usage: musea-indexer <data-dir> [--batch-size N]");
            std::process::exit(1);
        }
    };

    println!("Musea Indexer\n=============");
    println!("Data directory: {}", data_dir.display());

    let ingestor = Ingestor::new(NormalizerOptions {
        image_host_prefixes: settings.index.image_host_prefixes.clone(),
        ..NormalizerOptions::default()
    });
    let (documents, report) = ingestor.ingest_dir(&data_dir);
    println!(
        "📄 Normalized {} documents from {} files",
        report.documents, report.files_ok
    );
    for (path, reason) in &report.failures {
        println!("⚠️  Skipped {}: {}", path.display(), reason);
    }
    let chunks = chunk_documents(&documents);

    let text = LexicalIndex::open_or_create(expand_path(&settings.index.text_dir))?;
    let vector = VectorStore::open(
        &expand_path(&settings.index.db_dir).to_string_lossy(),
        &settings.index.collection,
        settings.embedding.dim,
    )
    .await?;
    let embedder = embedder_from_settings(&settings.embedding)?;
    let engine = HybridEngine::new(text, vector, embedder, settings.fusion.clone());

    let pb = ProgressBar::new(chunks.len() as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    let mut chunks_indexed = 0;
    let mut batches_failed = Vec::new();
    for batch in chunks.chunks(batch_size.max(1)) {
        let index_report = engine.index_chunks(batch, batch_size).await?;
        chunks_indexed += index_report.chunks_indexed;
        batches_failed.extend(index_report.batches_failed);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    println!("📊 Indexed {} chunks", chunks_indexed);
    for failure in &batches_failed {
        println!("⚠️  {}", failure);
    }
    println!(
        "📊 Index sizes: lexical={} vector={}",
        engine.lexical_count()?,
        engine.vector_count().await?
    );
    if batches_failed.is_empty() && report.failures.is_empty() {
        println!("\n✅ Indexing completed successfully!");
    } else {
        println!("\n⚠️  Indexing completed with skipped items (see above)");
    }
    Ok(())
}
