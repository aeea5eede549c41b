//! Command execution context
//!
//! Loads and validates configuration once and builds the mirror every
//! mirroring command shares.

use log::debug;

use crate::cache::ImageStore;
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::HttpImageSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mirror::ImageMirror;

/// Context for mirroring commands: config, mirror and output format
pub struct CommandContext {
    pub config: Config,
    pub mirror: ImageMirror<HttpImageSource>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// This handles:
    /// - Loading config from path (or default location) plus env overrides
    /// - Applying the `--public-root` override
    /// - Validating the result
    /// - Creating the rate-limited HTTP image source
    /// - Seeding the store index from the storage root
    ///
    /// # Errors
    /// Returns error if config cannot be loaded or is invalid.
    pub async fn new(opts: &GlobalOptions) -> Result<Self> {
        let config = Self::load_config(opts)?;

        let source = HttpImageSource::new(config.timeout(), config.requests_per_second)
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        let store = ImageStore::new(config.storage_root());
        let mirror = ImageMirror::with_scanner(
            source,
            store,
            config.scanner()?,
            config.mirror_options(),
        );

        let indexed = mirror.store().load_index().await?;
        debug!(
            "Indexed {} cached images in {}",
            indexed,
            mirror.store().root().display()
        );

        Ok(Self {
            config,
            mirror,
            format: opts.format,
        })
    }

    /// Load config with environment and CLI overrides applied, then validate.
    ///
    /// Used directly by commands that never touch the network.
    pub fn load_config(opts: &GlobalOptions) -> Result<Config> {
        let mut config = Config::load_at(opts.config_ref())?.with_env_overrides();

        if let Some(root) = opts.public_root_ref() {
            config.public_root = root.to_path_buf();
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn opts(config: Option<String>, public_root: Option<PathBuf>) -> GlobalOptions {
        GlobalOptions {
            format: OutputFormat::Pretty,
            config,
            public_root,
            debug: false,
        }
    }

    #[test]
    fn test_public_root_override_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "public_root: from-file\nmount: /media\n").unwrap();

        let config = CommandContext::load_config(&opts(
            Some(path.display().to_string()),
            Some(dir.path().join("site")),
        ))
        .unwrap();

        assert_eq!(config.storage_root(), dir.path().join("site").join("media"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "mount: images\n").unwrap();

        assert!(CommandContext::load_config(&opts(Some(path.display().to_string()), None)).is_err());
    }

    #[tokio::test]
    async fn test_new_indexes_existing_files() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        std::fs::write(&config_path, "").unwrap();
        let root = dir.path().join("images").join("content");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("3a192566.png"), b"png").unwrap();

        let ctx = CommandContext::new(&opts(
            Some(config_path.display().to_string()),
            Some(dir.path().to_path_buf()),
        ))
        .await
        .unwrap();

        assert_eq!(ctx.mirror.store().root(), root.as_path());
        assert_eq!(
            ctx.mirror
                .mirror("https://cdn.example.com/a.png")
                .await,
            "/images/content/3a192566.png"
        );
    }
}
