//! Image store inspection commands

use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::cache::{CachedEntry, ImageStore};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::output::Formattable;
use crate::output::formatters::{format_local_time, format_size};
use crate::output::json::format_json;

/// One mirrored file, for `cache list`
#[derive(Debug, Tabled, Serialize)]
pub struct CachedFileDisplay {
    #[tabled(rename = "FILE")]
    pub name: String,
    #[tabled(rename = "SIZE")]
    #[serde(skip)]
    pub size: String,
    #[tabled(skip)]
    pub size_bytes: u64,
    #[tabled(rename = "MODIFIED")]
    pub modified: String,
}

impl From<CachedEntry> for CachedFileDisplay {
    fn from(entry: CachedEntry) -> Self {
        Self {
            size: format_size(entry.size_bytes),
            size_bytes: entry.size_bytes,
            modified: entry
                .modified
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            name: entry.name,
        }
    }
}

fn open_store(opts: &GlobalOptions) -> Result<ImageStore> {
    let config = CommandContext::load_config(opts)?;
    Ok(ImageStore::new(config.storage_root()))
}

/// Show storage statistics
pub async fn status(opts: &GlobalOptions) -> Result<()> {
    let store = open_store(opts)?;
    let stats = store.stats().await?;
    let path = store.root().display().to_string();

    match opts.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": path,
                "exists": store.root().is_dir(),
                "total_entries": stats.total_entries,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_entry": stats.oldest_entry.map(|t| t.to_rfc3339()),
                "newest_entry": stats.newest_entry.map(|t| t.to_rfc3339()),
            });
            println!("{}", format_json(&json)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => {
            println!("{}", "Image Store".bold());
            println!("────────────────────────────────────────");
            println!("Location:       {}", path.cyan());
            if !store.root().is_dir() {
                println!("{} Storage root does not exist yet", "○".dimmed());
                return Ok(());
            }
            println!("Images:         {}", stats.total_entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));
            if stats.total_entries > 0 {
                println!("Oldest entry:   {}", format_local_time(stats.oldest_entry));
                println!("Newest entry:   {}", format_local_time(stats.newest_entry));
            }
        }
    }

    Ok(())
}

/// List mirrored files
pub async fn list(opts: &GlobalOptions) -> Result<()> {
    let store = open_store(opts)?;
    let rows: Vec<CachedFileDisplay> = store
        .entries()
        .await?
        .into_iter()
        .map(CachedFileDisplay::from)
        .collect();

    rows.print(opts.format)
}

/// Print the storage root
pub fn path(opts: &GlobalOptions) -> Result<()> {
    let store = open_store(opts)?;
    println!("{}", store.root().display());
    Ok(())
}
