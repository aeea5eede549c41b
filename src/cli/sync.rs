//! Content store sync command

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};
use serde::Serialize;

use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::client::{Author, ContentStore, ImageSource, Post, SupabaseStore};
use crate::error::Result;
use crate::mirror::ImageMirror;

/// Processed records, ready for the site build
#[derive(Debug, Serialize)]
pub struct SyncedContent {
    pub posts: Vec<Post>,
    pub authors: Vec<Author>,
}

/// Mirror images for every published post and author.
///
/// Writes the processed records as JSON to `output` or stdout.
pub async fn run(opts: &GlobalOptions, output: Option<&Path>) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;
    let (url, anon_key) = ctx.config.store_credentials()?;
    let store = SupabaseStore::new(url, anon_key, ctx.config.timeout())?;

    if let Err(e) = ctx.mirror.ensure_storage_root().await {
        warn!("{}", e);
    }

    let progress = spinner();
    let synced = sync_records(&ctx.mirror, &store, &progress).await;
    progress.finish_and_clear();
    let synced = synced?;

    let json = serde_json::to_string_pretty(&synced)?;
    match output {
        Some(path) => tokio::fs::write(path, json).await?,
        None => println!("{}", json),
    }

    eprintln!(
        "Synced {} posts and {} authors into {}",
        synced.posts.len(),
        synced.authors.len(),
        ctx.mirror.store().root().display()
    );

    Ok(())
}

/// Fetch published records and run each through the mirror
pub async fn sync_records<S: ImageSource, C: ContentStore>(
    mirror: &ImageMirror<S>,
    store: &C,
    progress: &ProgressBar,
) -> Result<SyncedContent> {
    progress.set_message("Fetching published posts");
    let posts = store.published_posts().await?;
    progress.set_message("Fetching published authors");
    let authors = store.published_authors().await?;
    debug!("Fetched {} posts and {} authors", posts.len(), authors.len());

    let mut processed_posts = Vec::with_capacity(posts.len());
    for post in posts {
        progress.set_message(format!("Post: {}", post.slug));
        processed_posts.push(mirror.process_post(post).await);
    }

    let mut processed_authors = Vec::with_capacity(authors.len());
    for author in authors {
        progress.set_message(format!("Author: {}", author.slug));
        processed_authors.push(mirror.process_author(author).await);
    }

    Ok(SyncedContent {
        posts: processed_posts,
        authors: processed_authors,
    })
}

fn spinner() -> ProgressBar {
    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}
