//! imgmirror - mirror remote content images into a site's public assets

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod mirror;
mod output;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Mirror { url } => cli::mirror::run(&opts, &url).await,
        Commands::Rewrite {
            file,
            in_place,
            output,
        } => cli::rewrite::run(&opts, file.as_deref(), in_place, output.as_deref()).await,
        Commands::Sync { output } => cli::sync::run(&opts, output.as_deref()).await,
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(&opts).await,
            CacheCommands::List => cli::cache::list(&opts).await,
            CacheCommands::Path => cli::cache::path(&opts),
        },
        Commands::Status => cli::status::run(&opts).await,
        Commands::Completion { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
        Commands::Version => {
            println!("imgmirror version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// `--debug` turns on debug output for this crate; otherwise `RUST_LOG`, defaulting to warn
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_module("imgmirror", log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}
