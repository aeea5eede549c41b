//! Status command implementation

use colored::Colorize;

use crate::cache::ImageStore;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::config::Config;
use crate::error::Result;

/// Display configuration and storage status
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "imgmirror Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    if config_path.exists() {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!();

    let config = match CommandContext::load_config(opts) {
        Ok(config) => config,
        Err(e) => {
            println!("{} Configuration invalid: {}", "✗".red(), e);
            println!();
            return Ok(());
        }
    };

    let store = ImageStore::new(config.storage_root());
    let root = store.root().display().to_string();
    if store.root().is_dir() {
        let stats = store.stats().await?;
        println!(
            "{} Storage root: {} ({} images)",
            "✓".green(),
            root.cyan(),
            stats.total_entries
        );
    } else {
        println!(
            "{} Storage root: {} (created on first mirror)",
            "○".dimmed(),
            root.cyan()
        );
    }

    println!("{} Public mount: {}", "✓".green(), config.mount);
    println!(
        "{} Downloads: {} at a time, {} req/s, {}s timeout",
        "✓".green(),
        config.max_concurrent_downloads,
        config.requests_per_second,
        config.timeout_secs
    );

    match config.store_credentials() {
        Ok((url, _)) => println!("{} Content store: {}", "✓".green(), url.cyan()),
        Err(_) => {
            println!("{} Content store not configured", "○".dimmed());
            println!("  → Set SUPABASE_URL and SUPABASE_ANON_KEY to enable 'imgmirror sync'");
        }
    }

    println!();
    Ok(())
}
