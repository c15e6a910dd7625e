use std::io::{self, BufRead, Write};

use musea_assist::{Assistant, GeneratorRegistry};
use musea_core::config::{expand_path, Config};
use musea_hybrid::HybridEngine;
use musea_text::LexicalIndex;
use musea_vector::{embedder_from_settings, VectorStore};

const SESSION_ID: &str = "cli";

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

    let text = LexicalIndex::open_or_create(expand_path(&settings.index.text_dir))?;
    let vector = VectorStore::open(
        &expand_path(&settings.index.db_dir).to_string_lossy(),
        &settings.index.collection,
        settings.embedding.dim,
    )
    .await?;
    let embedder = embedder_from_settings(&settings.embedding)?;
    let engine = HybridEngine::new(text, vector, embedder, settings.fusion.clone());
    let registry = GeneratorRegistry::new();
    let generator = registry.get(&settings.generation)?;
    let assistant = Assistant::new(
        engine,
        generator,
        settings.prompts.clone(),
        settings.session.window_size,
    );

    println!("Musea Artworks Explorer");
    println!("=======================");
    println!("Ask about the collection. Commands: :reset  :quit\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match question {
            ":quit" | ":q" => break,
            ":reset" => {
                assistant.reset(SESSION_ID).await;
                println!("Session reset.\n");
                continue;
            }
            _ => {}
        }
        match assistant.ask(SESSION_ID, question).await {
            Ok(payload) => {
                println!("\n{}\n", payload.answer);
                for url in &payload.media {
                    println!("🖼  {}", url);
                }
                for citation in &payload.citations {
                    println!("🔗 {}: {}", citation.label, citation.url);
                }
                println!();
            }
            Err(e) => {
                eprintln!("⚠️  Turn failed: {}\n", e);
            }
        }
    }
    Ok(())
}
