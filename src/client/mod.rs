//! Network collaborators: the image source and the content store

use async_trait::async_trait;
use reqwest::Url;

use crate::error::{FetchError, Result};

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod supabase;

pub use http::HttpImageSource;
#[cfg(test)]
pub use mock::{MockContentStore, MockImageSource};
pub use models::{Author, Post};
pub use supabase::SupabaseStore;

/// Fetches remote images for the mirror
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// GET `url` and return the body if it is an image.
    ///
    /// Non-success statuses and non-`image/*` responses are errors; the body
    /// of a rejected response is never read.
    async fn fetch_image(&self, url: &Url) -> std::result::Result<FetchedImage, FetchError>;
}

/// A successfully downloaded image
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Raw `Content-Type` header value
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Read access to published site content
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// All published posts, newest first
    async fn published_posts(&self) -> Result<Vec<Post>>;

    /// All published authors, by name
    async fn published_authors(&self) -> Result<Vec<Author>>;
}
