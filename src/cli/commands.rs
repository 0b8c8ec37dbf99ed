//! CLI commands implementation.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "anilink")]
#[command(about = "Episode catalog sync and download-link resolution")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Discover episode links for a series, optionally since a checkpoint
    Episodes {
        /// Series slug as it appears in the listing URL
        series: String,
        /// Title of the most-recently known episode; only newer ones are returned
        #[arg(long)]
        since: Option<String>,
        /// Ordinal the numbering continues from (last stored ordinal)
        #[arg(long, default_value = "0")]
        offset: u32,
    },

    /// Resolve the download link for a single episode page
    Resolve {
        /// Episode page URL
        episode_url: String,
    },

    /// Resolve download links for a set of episodes
    Batch {
        /// JSON file with `[{"title": ..., "url": ...}, ...]`, oldest first
        #[arg(short, long)]
        input: PathBuf,
        /// Episode range expression, e.g. `1-3,7`
        #[arg(short, long)]
        range: Option<String>,
    },

    /// Show the weekday the next episode of a series airs
    Emission {
        series: String,
    },
}

#[cfg(feature = "browser")]
pub async fn run() -> anyhow::Result<()> {
    use std::sync::Arc;

    use console::style;
    use indicatif::{ProgressBar, ProgressStyle};
    use tokio::sync::Semaphore;

    use anilink::automation::chromium::ChromiumBackend;
    use anilink::config::load_settings;
    use anilink::models::{BatchRequest, EpisodeLink};
    use anilink::scrapers::batch::BatchOrchestrator;
    use anilink::scrapers::catalog::CatalogSynchronizer;
    use anilink::scrapers::range;
    use anilink::scrapers::resolver::EpisodeResolver;

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;
    let backend = Arc::new(ChromiumBackend::new(settings.browser.clone()));

    match cli.command {
        Commands::Episodes {
            series,
            since,
            offset,
        } => {
            let sync = CatalogSynchronizer::new(backend, &settings);
            let links = sync.sync(&series, since.as_deref(), offset).await?;
            if links.is_empty() {
                eprintln!("{}", style("already up to date").dim());
            }
            println!("{}", serde_json::to_string_pretty(&links)?);
        }

        Commands::Resolve { episode_url } => {
            use anilink::scrapers::resolver::ResolveEpisode;

            let resolver = EpisodeResolver::new(backend, &settings);
            match resolver.resolve(&episode_url).await? {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => {
                    eprintln!("{}", style("no resolvable link").yellow());
                    std::process::exit(1);
                }
            }
        }

        Commands::Batch { input, range } => {
            let raw = std::fs::read_to_string(&input)?;
            let inputs: Vec<EpisodeInput> = serde_json::from_str(&raw)?;
            let episodes: Vec<EpisodeLink> = inputs
                .into_iter()
                .enumerate()
                .map(|(i, e)| EpisodeLink {
                    title: e.title,
                    url: e.url,
                    ordinal: i as u32 + 1,
                })
                .collect();

            let selected = match range {
                Some(ref expr) => range::parse(expr)?.len() as u64,
                None => episodes.len() as u64,
            };
            let bar = ProgressBar::new(selected);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .expect("static progress template")
                    .progress_chars("#>-"),
            );

            let resolver = Arc::new(ProgressResolver {
                inner: EpisodeResolver::new(backend, &settings),
                bar: bar.clone(),
            });
            let global_gate = Arc::new(Semaphore::new(settings.concurrency.global_sessions));
            let orchestrator = BatchOrchestrator::new(
                resolver,
                global_gate,
                settings.concurrency.batch_sessions,
            );

            let outcome = orchestrator
                .resolve(BatchRequest {
                    episodes,
                    range_expr: range,
                })
                .await?;
            bar.finish_and_clear();

            let resolved = outcome.items.iter().filter(|i| i.download.is_some()).count();
            eprintln!(
                "{} resolved, {} without a link, {} failed",
                style(resolved).green(),
                style(outcome.items.len() - resolved).yellow(),
                style(outcome.unresolved).red(),
            );
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }

        Commands::Emission { series } => {
            let sync = CatalogSynchronizer::new(backend, &settings);
            println!("{}", sync.emission_weekday(&series).await?);
        }
    }

    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn run() -> anyhow::Result<()> {
    let _ = Cli::parse();
    anyhow::bail!("browser support not compiled; rebuild with: cargo build --features browser")
}

#[cfg(feature = "browser")]
#[derive(serde::Deserialize)]
struct EpisodeInput {
    title: String,
    url: String,
}

/// Ticks the batch progress bar as episode resolutions complete.
#[cfg(feature = "browser")]
struct ProgressResolver<R> {
    inner: R,
    bar: indicatif::ProgressBar,
}

#[cfg(feature = "browser")]
#[async_trait::async_trait]
impl<R: anilink::scrapers::resolver::ResolveEpisode> anilink::scrapers::resolver::ResolveEpisode
    for ProgressResolver<R>
{
    async fn resolve(
        &self,
        episode_url: &str,
    ) -> Result<Option<anilink::models::DownloadInfo>, anilink::error::ScrapeError> {
        let outcome = self.inner.resolve(episode_url).await;
        self.bar.inc(1);
        outcome
    }
}
