//! Command-line interface for docrawl.
//!
//! Three subcommands: `crawl` runs a crawl job to completion against a
//! WebDriver endpoint, `status` prints a job's lifecycle state and stats,
//! and `errors` lists the page-level failures recorded for a job.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docrawl::browser::WebDriverEngine;
use docrawl::config::CrawlConfig;
use docrawl::embedding::GeminiEmbedder;
use docrawl::engine::CrawlEngine;
use docrawl::store::{CrawlJob, Database, ErrorSink, JobStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docrawl", version, about = "Documentation site crawler with change tracking")]
struct Cli {
    /// Path to the local database file
    #[arg(long, global = true, default_value = "docrawl.db")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a documentation site and store its pages
    Crawl {
        /// Base URL to start crawling from
        url: String,

        /// Tenant the documents belong to
        #[arg(long, default_value = "default")]
        tenant: String,

        /// Application the documents belong to
        #[arg(long, default_value = "default")]
        app: String,

        /// Maximum crawl depth from the base URL
        #[arg(long)]
        depth: Option<u32>,

        /// Maximum number of pages to process
        #[arg(long)]
        max_pages: Option<u32>,

        /// Delay between page requests, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Per-navigation timeout, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Wall-clock budget for the whole run, in seconds
        #[arg(long)]
        max_runtime: Option<u64>,

        /// WebDriver server endpoint
        #[arg(long, default_value = "http://localhost:9515")]
        webdriver: String,
    },

    /// Show the status and stats of a crawl job
    Status {
        /// Job id
        job_id: Uuid,
    },

    /// List page-level errors recorded for a crawl job
    Errors {
        /// Job id
        job_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db = Arc::new(
        Database::new_from_path(&cli.db)
            .await
            .with_context(|| format!("Failed to open database at {}", cli.db))?,
    );

    match cli.command {
        Commands::Crawl {
            url,
            tenant,
            app,
            depth,
            max_pages,
            delay_ms,
            timeout_ms,
            max_runtime,
            webdriver,
        } => {
            let mut builder = CrawlConfig::builder();
            if let Some(depth) = depth {
                builder = builder.max_depth(depth);
            }
            if let Some(max_pages) = max_pages {
                builder = builder.max_pages(max_pages);
            }
            if let Some(delay_ms) = delay_ms {
                builder = builder.delay_ms(delay_ms);
            }
            if let Some(timeout_ms) = timeout_ms {
                builder = builder.timeout_ms(timeout_ms);
            }
            if let Some(max_runtime) = max_runtime {
                builder = builder.max_runtime_secs(max_runtime);
            }
            let config = builder.build();

            let api_key = std::env::var("GEMINI_API_KEY")
                .context("GEMINI_API_KEY environment variable must be set")?;
            let embedder = Arc::new(GeminiEmbedder::new(api_key));
            let browser = Arc::new(WebDriverEngine::new(webdriver));

            let job = CrawlJob::new(tenant, app, url, config);
            JobStore::create(db.as_ref(), &job).await?;
            println!("Created crawl job {}", job.id);

            let engine = CrawlEngine::new(
                &job,
                db.clone(),
                db.clone(),
                db.clone(),
                embedder,
                browser,
            )?;

            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}").expect("static template"),
            );
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner.set_message(format!("Crawling {}", job.base_url));

            let summary = engine.run().await;
            spinner.finish_and_clear();
            let summary = summary?;

            println!("Job {} finished: {}", job.id, summary.status);
            println!("  pages crawled: {}", summary.stats.pages_crawled);
            println!("  urls visited:  {}", summary.stats.urls_visited);
            println!("  errors:        {}", summary.stats.errors_count);
            println!("  elapsed:       {}s", summary.stats.elapsed_secs);
        }

        Commands::Status { job_id } => {
            let job = db
                .get(job_id)
                .await?
                .with_context(|| format!("No crawl job found with id {}", job_id))?;

            println!("Job {}", job.id);
            println!("  tenant:   {}", job.tenant_id);
            println!("  app:      {}", job.app_id);
            println!("  base url: {}", job.base_url);
            println!("  status:   {}", job.status);
            println!("  created:  {}", job.created_at.to_rfc3339());
            if let Some(started) = job.started_at {
                println!("  started:  {}", started.to_rfc3339());
            }
            if let Some(finished) = job.finished_at {
                println!("  finished: {}", finished.to_rfc3339());
            }
            if let Some(stats) = job.stats {
                println!("  pages crawled: {}", stats.pages_crawled);
                println!("  urls visited:  {}", stats.urls_visited);
                println!("  errors:        {}", stats.errors_count);
                println!("  elapsed:       {}s", stats.elapsed_secs);
                if stats.timeout {
                    println!("  ended by wall-clock budget");
                }
            }
        }

        Commands::Errors { job_id } => {
            let errors = ErrorSink::list(db.as_ref(), job_id).await?;
            if errors.is_empty() {
                println!("No errors recorded for job {}", job_id);
            } else {
                for error in errors {
                    println!(
                        "{}  [{}] {} - {}",
                        error.created_at.to_rfc3339(),
                        error.error_code,
                        error.url,
                        error.error_message
                    );
                }
            }
        }
    }

    Ok(())
}
