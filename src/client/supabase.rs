//! PostgREST content store client (Supabase `rest/v1`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

use super::{Author, ContentStore, Post};
use crate::error::{Result, StoreError};

/// Query for published posts, newest first
const POSTS_QUERY: &str = "/rest/v1/posts?select=*&published=eq.true&order=created_at.desc";

/// Query for published authors, alphabetical
const AUTHORS_QUERY: &str = "/rest/v1/authors?select=*&published=eq.true&order=name.asc";

/// Read-only client for the site's content tables
pub struct SupabaseStore {
    http: HttpClient,
    base_url: String,
    anon_key: String,
}

impl SupabaseStore {
    /// Create a client for the project at `base_url`
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(StoreError::from)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    async fn get_rows<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(StoreError::from)?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Vec<T>>().await.map_err(|e| {
                StoreError::InvalidResponse(format!("Failed to parse rows: {}", e))
            })?),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::Unauthorized.into()),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(StoreError::Status {
                    status: status.as_u16(),
                    body,
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl ContentStore for SupabaseStore {
    async fn published_posts(&self) -> Result<Vec<Post>> {
        self.get_rows(POSTS_QUERY).await
    }

    async fn published_authors(&self) -> Result<Vec<Author>> {
        self.get_rows(AUTHORS_QUERY).await
    }
}
