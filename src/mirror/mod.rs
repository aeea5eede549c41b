//! Image mirroring
//!
//! Downloads remote images referenced in site content once, stores them in
//! the public asset tree and rewrites references to the local copies.
//! Mirroring is strictly best-effort: every failure degrades to keeping the
//! original URL, so a broken remote never blocks a render.

pub mod classify;
pub mod extension;
pub mod records;
pub mod rewrite;

use std::future::Future;
use std::pin::Pin;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use reqwest::Url;
use serde::Serialize;

use crate::cache::{ImageStore, KeyScheme, cache_key};
use crate::client::ImageSource;
use crate::error::{CacheError, FetchError};

pub use classify::{UrlClass, classify};
pub use extension::{ExtensionPrecedence, resolve_extension};
pub use rewrite::{ReferenceScanner, replace_references};

/// Public URL prefix the storage root is served under
pub const DEFAULT_MOUNT: &str = "/images/content";

/// Default number of downloads in flight per document
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Tunables for an [`ImageMirror`]
#[derive(Debug, Clone)]
pub struct MirrorOptions {
    /// Public URL prefix for mirrored files
    pub mount: String,
    pub key_scheme: KeyScheme,
    pub extension_precedence: ExtensionPrecedence,
    /// Downloads in flight per document
    pub max_concurrent: usize,
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            mount: DEFAULT_MOUNT.to_string(),
            key_scheme: KeyScheme::default(),
            extension_precedence: ExtensionPrecedence::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

/// Why a reference was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Already a site-relative path
    Local,
    /// Not an absolute http(s) URL
    Malformed,
    /// Points at localhost
    Loopback,
    /// Remote answered with a non-image content-type
    NotAnImage,
}

/// Result of mirroring one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MirrorOutcome {
    /// Available locally at `path`; `fresh` if downloaded by this call
    Cached { path: String, fresh: bool },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl MirrorOutcome {
    /// The string callers should use in place of `original`
    pub fn resolve(&self, original: &str) -> String {
        match self {
            MirrorOutcome::Cached { path, .. } => path.clone(),
            _ => original.to_string(),
        }
    }
}

/// One entry of a [`RewriteReport`]
#[derive(Debug, Clone, Serialize)]
pub struct MirroredReference {
    pub url: String,
    #[serde(flatten)]
    pub outcome: MirrorOutcome,
}

/// A rewritten document together with what happened to each reference
#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub document: String,
    pub references: Vec<MirroredReference>,
}

impl RewriteReport {
    /// References that were rewritten to a local path
    pub fn rewritten(&self) -> usize {
        self.references
            .iter()
            .filter(|r| matches!(r.outcome, MirrorOutcome::Cached { .. }))
            .count()
    }

    /// References kept because mirroring failed
    pub fn failed(&self) -> usize {
        self.references
            .iter()
            .filter(|r| matches!(r.outcome, MirrorOutcome::Failed { .. }))
            .count()
    }
}

/// Failures inside a single mirror attempt
#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Fetch(FetchError),
    #[error(transparent)]
    Cache(CacheError),
}

type ReferenceFuture<'a> = Pin<Box<dyn Future<Output = (usize, MirroredReference)> + Send + 'a>>;

/// Mirrors remote images into an [`ImageStore`]
pub struct ImageMirror<S: ImageSource> {
    source: S,
    store: ImageStore,
    scanner: ReferenceScanner,
    options: MirrorOptions,
}

impl<S: ImageSource> ImageMirror<S> {
    /// Create a mirror with the default reference scanner
    pub fn new(source: S, store: ImageStore, options: MirrorOptions) -> Self {
        Self::with_scanner(source, store, ReferenceScanner::default(), options)
    }

    pub fn with_scanner(
        source: S,
        store: ImageStore,
        scanner: ReferenceScanner,
        options: MirrorOptions,
    ) -> Self {
        Self {
            source,
            store,
            scanner,
            options,
        }
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Create the storage root if needed. Idempotent.
    pub async fn ensure_storage_root(&self) -> Result<(), CacheError> {
        self.store.ensure_root().await
    }

    /// Mirror a single image reference.
    ///
    /// Returns the local public path, or `url` unchanged if it is local, not
    /// mirrorable, or anything goes wrong. Never fails.
    pub async fn mirror(&self, url: &str) -> String {
        self.mirror_outcome(url).await.resolve(url)
    }

    /// Mirror a single reference and report what happened
    pub async fn mirror_outcome(&self, url: &str) -> MirrorOutcome {
        let parsed = match classify(url) {
            UrlClass::Local => return MirrorOutcome::Skipped { reason: SkipReason::Local },
            UrlClass::Opaque => {
                return MirrorOutcome::Skipped {
                    reason: SkipReason::Malformed,
                };
            }
            UrlClass::Loopback => {
                return MirrorOutcome::Skipped {
                    reason: SkipReason::Loopback,
                };
            }
            UrlClass::Remote(parsed) => parsed,
        };

        match self.attempt(url, &parsed).await {
            Ok(outcome) => outcome,
            Err(AttemptError::Fetch(FetchError::NotAnImage(content_type))) => {
                info!("Not an image: {} ({})", url, content_type);
                MirrorOutcome::Skipped {
                    reason: SkipReason::NotAnImage,
                }
            }
            Err(e) => {
                warn!("Failed to mirror image {}: {}", url, e);
                MirrorOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Cache check, then fetch and write. Keyed on the original string.
    async fn attempt(&self, url: &str, parsed: &Url) -> Result<MirrorOutcome, AttemptError> {
        let key = cache_key(url, self.options.key_scheme);

        if let Some(file_name) = self.store.lookup(&key).await.map_err(AttemptError::Cache)? {
            debug!("Cache hit: {} -> {}", url, file_name);
            return Ok(MirrorOutcome::Cached {
                path: self.public_path(&file_name),
                fresh: false,
            });
        }

        info!("Downloading image: {}", url);
        let image = self
            .source
            .fetch_image(parsed)
            .await
            .map_err(AttemptError::Fetch)?;

        let extension = resolve_extension(
            url,
            Some(&image.content_type),
            self.options.extension_precedence,
        );
        let file_name = self
            .store
            .write(&key, &extension, &image.bytes)
            .await
            .map_err(AttemptError::Cache)?;

        let path = self.public_path(&file_name);
        info!("Downloaded image: {} -> {}", url, path);

        Ok(MirrorOutcome::Cached { path, fresh: true })
    }

    /// Mirror every image in a markdown/HTML document and rewrite it.
    ///
    /// Text other than the replaced URLs is preserved byte-for-byte. Running
    /// this on its own output is a no-op.
    pub async fn rewrite(&self, document: &str) -> String {
        self.rewrite_report(document).await.document
    }

    /// Like [`rewrite`](Self::rewrite), also reporting per-reference outcomes
    pub async fn rewrite_report(&self, document: &str) -> RewriteReport {
        let candidates = self.scanner.candidates(document);
        if candidates.is_empty() {
            return RewriteReport {
                document: document.to_string(),
                references: Vec::new(),
            };
        }

        debug!("Found {} image references in content", candidates.len());

        if let Err(e) = self.ensure_storage_root().await {
            warn!("{}", e);
        }

        let references = self.mirror_all(candidates).await;

        let replacements: Vec<(String, String)> = references
            .iter()
            .filter_map(|r| match &r.outcome {
                MirrorOutcome::Cached { path, .. } if *path != r.url => {
                    Some((r.url.clone(), path.clone()))
                }
                _ => None,
            })
            .collect();

        RewriteReport {
            document: replace_references(document, &replacements),
            references,
        }
    }

    /// Mirror distinct URLs, up to `max_concurrent` at a time.
    ///
    /// Results come back in the order of `urls`.
    async fn mirror_all(&self, urls: Vec<String>) -> Vec<MirroredReference> {
        let max_concurrent = self.options.max_concurrent.max(1);
        let mut results: Vec<Option<MirroredReference>> = vec![None; urls.len()];
        let mut in_flight: FuturesUnordered<ReferenceFuture<'_>> = FuturesUnordered::new();
        let mut pending = urls.into_iter().enumerate();

        for (index, url) in pending.by_ref().take(max_concurrent) {
            in_flight.push(self.reference_future(index, url));
        }

        while let Some((index, done)) = in_flight.next().await {
            results[index] = Some(done);
            if let Some((index, url)) = pending.next() {
                in_flight.push(self.reference_future(index, url));
            }
        }

        results.into_iter().flatten().collect()
    }

    fn reference_future(&self, index: usize, url: String) -> ReferenceFuture<'_> {
        Box::pin(async move {
            let outcome = self.mirror_outcome(&url).await;
            (index, MirroredReference { url, outcome })
        })
    }

    fn public_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.options.mount.trim_end_matches('/'), file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockImageSource;
    use tempfile::TempDir;

    const COVER: &str = "https://cdn.example.com/a.png";

    fn mirror_with(source: MockImageSource) -> (ImageMirror<MockImageSource>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ImageStore::new(dir.path().join("public/images/content"));
        (ImageMirror::new(source, store, MirrorOptions::default()), dir)
    }

    fn stored_files(mirror: &ImageMirror<MockImageSource>) -> Vec<String> {
        match std::fs::read_dir(mirror.store().root()) {
            Ok(dir) => {
                let mut names: Vec<_> = dir
                    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_local_paths_are_returned_without_io() {
        let source = MockImageSource::new();
        let (mirror, _dir) = mirror_with(source.clone());

        for url in ["/images/content/3a192566.png", "./pic.jpg"] {
            assert_eq!(mirror.mirror(url).await, url);
        }

        assert_eq!(source.call_count().await, 0);
        assert!(!mirror.store().root().exists());
    }

    #[tokio::test]
    async fn test_malformed_and_loopback_pass_through() {
        let source = MockImageSource::new();
        let (mirror, _dir) = mirror_with(source.clone());

        for url in ["not a url", "cover.jpg", "http://localhost:3000/a.png", "http://127.0.0.1/a.png"] {
            assert_eq!(mirror.mirror(url).await, url);
        }

        assert_eq!(source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_first_mirror_fetches_and_writes_once() {
        let source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let (mirror, _dir) = mirror_with(source.clone());
        mirror.ensure_storage_root().await.unwrap();

        let first = mirror.mirror_outcome(COVER).await;
        assert_eq!(
            first,
            MirrorOutcome::Cached {
                path: "/images/content/3a192566.png".to_string(),
                fresh: true,
            }
        );
        assert_eq!(source.call_count().await, 1);
        assert_eq!(stored_files(&mirror), vec!["3a192566.png"]);

        let second = mirror.mirror_outcome(COVER).await;
        assert_eq!(
            second,
            MirrorOutcome::Cached {
                path: "/images/content/3a192566.png".to_string(),
                fresh: false,
            }
        );
        assert_eq!(source.call_count().await, 1);
        assert_eq!(stored_files(&mirror), vec!["3a192566.png"]);
    }

    #[tokio::test]
    async fn test_cache_survives_a_new_mirror_instance() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("images/content");

        let first_source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let first = ImageMirror::new(first_source, ImageStore::new(&root), MirrorOptions::default());
        first.ensure_storage_root().await.unwrap();
        let path = first.mirror(COVER).await;

        let second_source = MockImageSource::new();
        let second = ImageMirror::new(
            second_source.clone(),
            ImageStore::new(&root),
            MirrorOptions::default(),
        );

        assert_eq!(second.mirror(COVER).await, path);
        assert_eq!(second_source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_non_image_is_not_cached() {
        let url = "https://cdn.example.com/gallery";
        let source = MockImageSource::new()
            .with_error(url, FetchError::NotAnImage("text/html".to_string()));
        let (mirror, _dir) = mirror_with(source);
        mirror.ensure_storage_root().await.unwrap();

        assert_eq!(
            mirror.mirror_outcome(url).await,
            MirrorOutcome::Skipped {
                reason: SkipReason::NotAnImage
            }
        );
        assert_eq!(mirror.mirror(url).await, url);
        assert!(stored_files(&mirror).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failures_degrade_to_original() {
        let down = "https://down.example.com/a.png";
        let gone = "https://cdn.example.com/gone.png";
        let slow = "https://slow.example.com/a.png";
        let source = MockImageSource::new()
            .with_error(down, FetchError::Network("connection refused".to_string()))
            .with_error(gone, FetchError::Status(404))
            .with_error(slow, FetchError::Timeout);
        let (mirror, _dir) = mirror_with(source);
        mirror.ensure_storage_root().await.unwrap();

        for url in [down, gone, slow] {
            assert_eq!(mirror.mirror(url).await, url);
            assert!(matches!(
                mirror.mirror_outcome(url).await,
                MirrorOutcome::Failed { .. }
            ));
        }
        assert!(stored_files(&mirror).is_empty());
    }

    #[tokio::test]
    async fn test_missing_storage_root_degrades_to_original() {
        let source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let (mirror, _dir) = mirror_with(source);

        // No bootstrap: the write has nowhere to go
        assert_eq!(mirror.mirror(COVER).await, COVER);
    }

    #[tokio::test]
    async fn test_content_type_decides_extension() {
        let url = "https://cdn.example.com/a.png?x=1";
        let source = MockImageSource::new().with_image(url, "image/webp", b"webp");
        let (mirror, _dir) = mirror_with(source);
        mirror.ensure_storage_root().await.unwrap();

        let path = mirror.mirror(url).await;
        assert!(path.starts_with("/images/content/"));
        assert!(path.ends_with(".webp"), "{path}");
    }

    #[tokio::test]
    async fn test_url_suffix_precedence_option() {
        let url = "https://cdn.example.com/a.png?x=1";
        let source = MockImageSource::new().with_image(url, "image/webp", b"webp");
        let dir = TempDir::new().unwrap();
        let options = MirrorOptions {
            extension_precedence: ExtensionPrecedence::UrlSuffix,
            ..MirrorOptions::default()
        };
        let mirror = ImageMirror::new(source, ImageStore::new(dir.path()), options);

        assert!(mirror.mirror(url).await.ends_with(".png"));
    }

    #[tokio::test]
    async fn test_custom_mount_and_sha256_keys() {
        let source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let dir = TempDir::new().unwrap();
        let options = MirrorOptions {
            mount: "/media/mirrored/".to_string(),
            key_scheme: KeyScheme::Sha256,
            ..MirrorOptions::default()
        };
        let mirror = ImageMirror::new(source, ImageStore::new(dir.path()), options);

        let path = mirror.mirror(COVER).await;
        let expected = format!("/media/mirrored/{}.png", cache_key(COVER, KeyScheme::Sha256));
        assert_eq!(path, expected);
    }

    #[tokio::test]
    async fn test_rewrite_replaces_markdown_and_html_with_one_fetch() {
        let source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let (mirror, _dir) = mirror_with(source.clone());

        let doc = "![cover](https://cdn.example.com/a.png) and <img src=\"https://cdn.example.com/a.png\">";
        let out = mirror.rewrite(doc).await;

        assert_eq!(
            out,
            "![cover](/images/content/3a192566.png) and <img src=\"/images/content/3a192566.png\">"
        );
        assert_eq!(source.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let source = MockImageSource::new()
            .with_image(COVER, "image/png", b"png")
            .with_image(
                "https://abc.supabase.co/storage/v1/object/public/media/b.jpg",
                "image/jpeg",
                b"jpg",
            );
        let (mirror, _dir) = mirror_with(source.clone());

        let doc = "# Essay\n\n![a](https://cdn.example.com/a.png)\n\nSee https://abc.supabase.co/storage/v1/object/public/media/b.jpg.\n\n![broken](https://cdn.example.com/missing.png)";
        let once = mirror.rewrite(doc).await;
        let calls_after_first = source.call_count().await;
        let twice = mirror.rewrite(&once).await;

        assert_eq!(once, twice);
        assert!(once.contains("/images/content/"));
        assert!(once.contains("https://cdn.example.com/missing.png"));
        // Only the failed reference is retried
        assert_eq!(source.call_count().await, calls_after_first + 1);
    }

    #[tokio::test]
    async fn test_rewrite_without_candidates_does_no_io() {
        let source = MockImageSource::new();
        let (mirror, _dir) = mirror_with(source.clone());

        let doc = "Plain text with a [link](https://example.org) and ![local](/images/x.png)";
        assert_eq!(mirror.rewrite(doc).await, doc);
        assert_eq!(source.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_rewrite_bootstraps_storage_root() {
        let source = MockImageSource::new().with_image(COVER, "image/png", b"png");
        let (mirror, _dir) = mirror_with(source);
        assert!(!mirror.store().root().exists());

        mirror.rewrite("![a](https://cdn.example.com/a.png)").await;

        assert!(mirror.store().root().is_dir());
    }

    #[tokio::test]
    async fn test_rewrite_report_counts() {
        let source = MockImageSource::new()
            .with_image(COVER, "image/png", b"png")
            .with_error("https://cdn.example.com/b.png", FetchError::Status(500));
        let (mirror, _dir) = mirror_with(source);

        let report = mirror
            .rewrite_report("![a](https://cdn.example.com/a.png) ![b](https://cdn.example.com/b.png) ![c](/local.png)")
            .await;

        assert_eq!(report.references.len(), 3);
        assert_eq!(report.rewritten(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_rewrite_mirrors_many_urls_with_bounded_concurrency() {
        let mut source = MockImageSource::new();
        let mut doc = String::new();
        for i in 0..10 {
            let url = format!("https://cdn.example.com/{}.gif", i);
            source = source.with_image(&url, "image/gif", b"gif");
            doc.push_str(&format!("![{i}]({url})\n"));
        }
        let dir = TempDir::new().unwrap();
        let options = MirrorOptions {
            max_concurrent: 3,
            ..MirrorOptions::default()
        };
        let mirror = ImageMirror::new(source.clone(), ImageStore::new(dir.path().join("c")), options);

        let out = mirror.rewrite(&doc).await;

        assert!(!out.contains("https://"));
        assert_eq!(source.call_count().await, 10);
        assert_eq!(stored_files(&mirror).len(), 10);
    }
}
