//! Command-line access to the recipe image cache.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::ImageFormat;
use recipe_images::{
    DiskStore, FsDiskStore, ImageCache, ImageCacheConfig,
    ImageCacheStatsSnapshot, derive_key,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "recipe-imagesctl",
    about = "Inspect and manage the recipe image cache"
)]
struct Cli {
    /// Override the cache directory
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load an image through the cache and report where it came from
    Get {
        url: String,
        /// Write the decoded image as PNG
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Empty the memory and disk tiers
    Clear,
    /// Print the cache key and disk path for a URL
    Path { url: String },
}

fn load_config(cli: &Cli) -> Result<ImageCacheConfig> {
    let mut config = ImageCacheConfig::load(cli.config.as_deref())
        .context("failed to load image cache configuration")?;
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir.clone());
    }
    debug!("using image cache at {}", config.cache_dir.display());
    Ok(config)
}

fn served_from(
    before: &ImageCacheStatsSnapshot,
    after: &ImageCacheStatsSnapshot,
) -> &'static str {
    if after.memory_hits > before.memory_hits {
        "memory"
    } else if after.disk_hits > before.disk_hits {
        "disk"
    } else {
        "network"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Command::Get { url, out } => {
            let cache = ImageCache::open(&config).await?;
            let before = cache.stats();
            let record = cache
                .get_image(url)
                .await
                .with_context(|| format!("failed to load {url}"))?;
            let source = served_from(&before, &cache.stats());

            println!(
                "{}x{} ({} bytes decoded) from {source}",
                record.width(),
                record.height(),
                record.byte_size()
            );

            if let Some(out) = out {
                record
                    .image()
                    .save_with_format(out, ImageFormat::Png)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("wrote {}", out.display());
            }
        }
        Command::Clear => {
            let cache = ImageCache::open(&config).await?;
            let report = cache.clear_cache().await;
            println!("removed {} cached file(s)", report.removed);
            if !report.is_clean() {
                anyhow::bail!("{} file(s) could not be removed", report.failed);
            }
        }
        Command::Path { url } => {
            let key = derive_key(url);
            let disk = FsDiskStore::new(config.cache_dir.clone());
            println!("key:  {key}");
            println!("path: {}", disk.path_for(&key).display());
        }
    }

    Ok(())
}
