//! Mock collaborators for testing
//!
//! Lets mirror tests count network calls without a real server. Real HTTP
//! behavior is covered by the mockito tests in `http.rs` and `supabase.rs`.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{Author, ContentStore, FetchedImage, ImageSource, Post};
use crate::error::{FetchError, Result};

/// Mock image source.
///
/// Configure responses per URL; unknown URLs fail with a network error.
///
/// # Example
/// ```ignore
/// let source = MockImageSource::new()
///     .with_image("https://cdn.example.com/a.png", "image/png", b"png");
///
/// let mirror = ImageMirror::new(source.clone(), store, MirrorOptions::default());
/// mirror.mirror("https://cdn.example.com/a.png").await;
/// assert_eq!(source.call_count().await, 1);
/// ```
#[derive(Clone, Default)]
pub struct MockImageSource {
    responses: Arc<Mutex<HashMap<String, std::result::Result<FetchedImage, FetchError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` with `content_type` for `url`
    pub fn with_image(self, url: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.respond(
            url,
            Ok(FetchedImage {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            }),
        )
    }

    /// Fail `url` with the given error
    pub fn with_error(self, url: &str, error: FetchError) -> Self {
        self.respond(url, Err(error))
    }

    fn respond(self, url: &str, response: std::result::Result<FetchedImage, FetchError>) -> Self {
        self.responses
            .try_lock()
            .expect("mock not shared yet")
            .insert(url.to_string(), response);
        self
    }

    /// Total fetches made
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    /// Fetches made for one URL
    pub async fn calls_for(&self, url: &str) -> usize {
        self.calls.lock().await.iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl ImageSource for MockImageSource {
    async fn fetch_image(&self, url: &Url) -> std::result::Result<FetchedImage, FetchError> {
        // Mirror hands over the parsed URL; record the caller's spelling
        let raw = url.as_str().to_string();
        self.calls.lock().await.push(raw.clone());

        let responses = self.responses.lock().await;
        responses
            .get(&raw)
            .or_else(|| responses.get(raw.trim_end_matches('/')))
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Network(format!("no mock for {}", raw))))
    }
}

/// Mock content store returning fixed records
#[derive(Clone, Default)]
pub struct MockContentStore {
    pub posts: Vec<Post>,
    pub authors: Vec<Author>,
}

#[async_trait]
impl ContentStore for MockContentStore {
    async fn published_posts(&self) -> Result<Vec<Post>> {
        Ok(self.posts.clone())
    }

    async fn published_authors(&self) -> Result<Vec<Author>> {
        Ok(self.authors.clone())
    }
}
