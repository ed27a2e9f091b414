use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::warn;

use note_extractor::{ExtractionResult, ExtractorRouter, SummarizeClient};

const BATCH_CONCURRENCY: usize = 8;

#[derive(Parser)]
#[command(name = "note_extractor", about = "Content extraction for pasted note URLs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected platform for a URL
    Detect { url: String },
    /// Extract a single URL
    Extract {
        url: String,
        /// Print the full result as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Extract every URL in a file (one per line), streaming JSONL output
    Batch {
        /// Input file with one URL per line
        file: PathBuf,
        /// Output JSONL path
        #[arg(short, long, default_value = "extracted.jsonl")]
        out: PathBuf,
        /// Max URLs to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Concurrent extractions
        #[arg(short, long, default_value_t = BATCH_CONCURRENCY)]
        concurrency: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { url } => {
            println!("{}", note_extractor::detect_platform(&url));
        }
        Commands::Extract { url, json } => {
            let result = note_extractor::extract_from_url(&url).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
        }
        Commands::Batch {
            file,
            out,
            limit,
            concurrency,
        } => {
            let urls = read_urls(&file, limit)?;
            if urls.is_empty() {
                println!("No URLs in {}", file.display());
                return Ok(());
            }
            println!(
                "Extracting {} URLs (streaming to {})...",
                urls.len(),
                out.display()
            );
            let stats = run_batch(urls, &out, concurrency).await?;
            println!(
                "Done: {} extracted ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t0.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}

struct BatchStats {
    total: usize,
    ok: usize,
    errors: usize,
}

fn read_urls(path: &PathBuf, limit: Option<usize>) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut urls: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();
    if let Some(limit) = limit {
        urls.truncate(limit);
    }
    Ok(urls)
}

/// Extract URLs concurrently, writing each result to the JSONL file as it
/// arrives.
async fn run_batch(urls: Vec<String>, out: &PathBuf, concurrency: usize) -> Result<BatchStats> {
    let router = Arc::new(ExtractorRouter::new(Arc::new(SummarizeClient::from_env())));
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = urls.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Channel: workers send results, main loop writes them out
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ExtractionResult>(concurrency.max(1) * 2);

    for url in urls {
        let router = Arc::clone(&router);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else { return };
            let result = router.extract_from_url(&url).await;
            if tx.send(result).await.is_err() {
                warn!("result channel closed early for {}", url);
            }
        });
    }

    // Drop our copy of tx so rx closes when all spawned tasks finish
    drop(tx);

    let mut file = tokio::fs::File::create(out)
        .await
        .with_context(|| format!("failed to create {}", out.display()))?;

    let mut ok = 0usize;
    let mut errors = 0usize;
    while let Some(result) = rx.recv().await {
        if result.success {
            ok += 1;
        } else {
            errors += 1;
        }
        let mut line = serde_json::to_string(&result)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        pb.inc(1);
    }
    file.flush().await?;
    pb.finish_and_clear();

    Ok(BatchStats { total, ok, errors })
}

fn print_summary(result: &ExtractionResult) {
    println!("Platform:  {}", result.platform);
    println!("Success:   {}", result.success);
    if let Some(error) = &result.error {
        println!("Error:     {}", error);
        return;
    }
    if let Some(title) = &result.title {
        println!("Title:     {}", title);
    }
    if let Some(author) = &result.author {
        match &author.handle {
            Some(handle) => println!("Author:    {} (@{})", author.name, handle),
            None => println!("Author:    {}", author.name),
        }
    }
    if let Some(excerpt) = &result.excerpt {
        println!("Excerpt:   {}", excerpt);
    }
    if !result.media.is_empty() {
        println!("Media:     {} item(s)", result.media.len());
    }
    if !result.mentioned_links.is_empty() {
        println!("Links:     {} mentioned", result.mentioned_links.len());
    }
    if let Some(content) = &result.content {
        println!("Content:   {} chars", content.len());
    }
}
