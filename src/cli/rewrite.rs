//! Document rewrite command

use std::path::{Path, PathBuf};

use colored::Colorize;
use tokio::io::AsyncReadExt;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::cli::context::CommandContext;
use crate::error::Result;
use crate::mirror::RewriteReport;
use crate::output::json::format_json;

/// Rewrite a document read from `file` (or stdin).
///
/// The result goes back to `file` with `in_place`, to `output` if given,
/// otherwise to stdout.
pub async fn run(
    opts: &GlobalOptions,
    file: Option<&Path>,
    in_place: bool,
    output: Option<&Path>,
) -> Result<()> {
    let document = read_input(file).await?;
    let ctx = CommandContext::new(opts).await?;

    let report = ctx.mirror.rewrite_report(&document).await;

    let target: Option<PathBuf> = if in_place {
        file.map(Path::to_path_buf)
    } else {
        output.map(Path::to_path_buf)
    };

    match &target {
        Some(path) => {
            // Leave an unchanged file's mtime alone
            if !(in_place && report.document == document) {
                tokio::fs::write(path, &report.document).await?;
            }
        }
        None if ctx.format != OutputFormat::Json => print!("{}", report.document),
        None => {}
    }

    match ctx.format {
        OutputFormat::Json => println!("{}", format_json(&report)?),
        OutputFormat::Pretty | OutputFormat::Table => print_summary(&report),
    }

    Ok(())
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

/// One-line summary on stderr so stdout stays the document
fn print_summary(report: &RewriteReport) {
    if report.references.is_empty() {
        return;
    }

    let failed = report.failed();
    let line = format!(
        "Rewrote {} of {} image references",
        report.rewritten(),
        report.references.len()
    );
    if failed > 0 {
        eprintln!("{} ({} failed, kept original URLs)", line, failed.to_string().yellow());
    } else {
        eprintln!("{}", line);
    }
}
