//! CLI command definitions and handlers

use std::path::PathBuf;

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod completions;
pub mod context;
pub mod mirror;
pub mod rewrite;
pub mod status;
pub mod sync;

pub use args::OutputFormat;
pub use context::CommandContext;

/// imgmirror - mirror remote content images into a site's public assets
#[derive(Parser, Debug)]
#[command(name = "imgmirror")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "IMGMIRROR_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "IMGMIRROR_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Override the site's public root directory
    #[arg(long, global = true, env = "IMGMIRROR_PUBLIC_ROOT", hide_env = true)]
    pub public_root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true, env = "IMGMIRROR_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mirror a single image URL and print the path to use
    Mirror {
        /// Image URL (local paths and non-http values are echoed back)
        url: String,
    },

    /// Mirror every image in a markdown/HTML document and rewrite it
    Rewrite {
        /// Document to read (stdin when absent)
        file: Option<PathBuf>,

        /// Write the result back to FILE
        #[arg(long, short = 'i', requires = "file", conflicts_with = "output")]
        in_place: bool,

        /// Write the result to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Mirror images for all published posts and authors in the content store
    Sync {
        /// Write processed records to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Inspect the local image store
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Show configuration and storage status
    Status,

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   imgmirror completion bash > /etc/bash_completion.d/imgmirror
  zsh:    imgmirror completion zsh > \"${fpath[1]}/_imgmirror\"
  fish:   imgmirror completion fish > ~/.config/fish/completions/imgmirror.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Display version information
    Version,
}

/// Image store subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show storage statistics
    Status,
    /// List mirrored files
    List,
    /// Print the storage root directory
    Path,
}
