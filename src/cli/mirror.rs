//! Single-image mirror command

use log::warn;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::mirror::{MirroredReference, UrlClass, classify};
use crate::output::json::format_json;

/// Mirror `url` and print the path callers should use.
///
/// Mirroring never fails: on any problem the original URL is printed.
pub async fn run(opts: &GlobalOptions, url: &str) -> Result<()> {
    let ctx = CommandContext::new(opts).await?;

    // Only a remote URL can produce a file; leave the tree alone otherwise
    if matches!(classify(url), UrlClass::Remote(_)) {
        if let Err(e) = ctx.mirror.ensure_storage_root().await {
            warn!("{}", e);
        }
    }

    let outcome = ctx.mirror.mirror_outcome(url).await;

    match ctx.format {
        OutputFormat::Json => {
            let reference = MirroredReference {
                url: url.to_string(),
                outcome,
            };
            println!("{}", format_json(&reference)?);
        }
        OutputFormat::Pretty | OutputFormat::Table => println!("{}", outcome.resolve(url)),
    }

    Ok(())
}
