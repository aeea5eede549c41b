//! Directory-backed image store
//!
//! The storage root is the only index: a URL is cached iff a file whose stem
//! is its key exists in the directory. The in-process map only memoizes
//! directory scans and is always confirmed against the filesystem.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::RwLock;

use super::key::file_matches_key;
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// Suffix for in-flight writes; the leading dot keeps them out of key scans
const PARTIAL_SUFFIX: &str = ".partial";

/// Image store rooted at a directory under the public asset tree
pub struct ImageStore {
    root: PathBuf,
    /// key -> file name, filled from scans and writes
    memo: RwLock<HashMap<String, String>>,
    write_seq: AtomicU64,
}

impl ImageStore {
    /// Create a store for `root`. Nothing is touched on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            memo: RwLock::new(HashMap::new()),
            write_seq: AtomicU64::new(0),
        }
    }

    /// Storage root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if it does not exist yet.
    ///
    /// Safe to call before every render.
    pub async fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            CacheError::Io(format!(
                "Failed to create storage root {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    /// Seed the memo from the current directory contents.
    ///
    /// Returns the number of cached files found. A missing root is empty.
    pub async fn load_index(&self) -> Result<usize> {
        let names = self.file_names().await?;
        let mut memo = self.memo.write().await;
        memo.clear();
        for name in names {
            if let Some(stem) = stem_of(&name) {
                memo.entry(stem.to_string()).or_insert(name);
            }
        }
        log::debug!(
            "Indexed {} cached images in {}",
            memo.len(),
            self.root.display()
        );
        Ok(memo.len())
    }

    /// Find the cached file name for `key`, if any.
    pub async fn lookup(&self, key: &str) -> Result<Option<String>> {
        let memoized = self.memo.read().await.get(key).cloned();

        if let Some(name) = memoized {
            if fs::try_exists(self.root.join(&name)).await.unwrap_or(false) {
                return Ok(Some(name));
            }
            log::debug!("Cached file {} disappeared, rescanning", name);
            self.memo.write().await.remove(key);
        }

        let found = self.scan_for(key).await?;
        if let Some(ref name) = found {
            self.memo
                .write()
                .await
                .insert(key.to_string(), name.clone());
        }
        Ok(found)
    }

    /// Scan the directory for a file whose stem is `key`.
    pub async fn scan_for(&self, key: &str) -> Result<Option<String>> {
        let names = self.file_names().await?;
        Ok(names
            .into_iter()
            .find(|name| file_matches_key(name, key)))
    }

    /// Write `<key><extension>` and return the file name.
    ///
    /// Bytes go to a hidden temporary file first and are renamed into place,
    /// so a half-written image is never visible to `lookup`.
    pub async fn write(&self, key: &str, extension: &str, data: &[u8]) -> Result<String> {
        let file_name = format!("{}{}", key, extension);
        let final_path = self.root.join(&file_name);

        let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.root.join(format!(
            ".{}.{}.{}{}",
            file_name,
            std::process::id(),
            seq,
            PARTIAL_SUFFIX
        ));

        let written = match fs::write(&temp_path, data).await {
            Ok(()) => fs::rename(&temp_path, &final_path).await.map_err(|e| {
                CacheError::Io(format!(
                    "Failed to move image into place at {}: {}",
                    final_path.display(),
                    e
                ))
            }),
            Err(e) => Err(CacheError::Io(format!(
                "Failed to write {}: {}",
                temp_path.display(),
                e
            ))),
        };

        if let Err(e) = written {
            // A short write can leave a partial file behind
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        self.memo
            .write()
            .await
            .insert(key.to_string(), file_name.clone());

        Ok(file_name)
    }

    /// List every cached file with its size and modification time
    pub async fn entries(&self) -> Result<Vec<CachedEntry>> {
        let mut entries = Vec::new();
        for name in self.file_names().await? {
            let meta = match fs::metadata(self.root.join(&name)).await {
                Ok(meta) => meta,
                Err(e) => {
                    log::warn!("Failed to stat cached file {}: {}", name, e);
                    continue;
                }
            };
            entries.push(CachedEntry {
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                size_bytes: meta.len(),
                name,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Get store statistics
    pub async fn stats(&self) -> Result<StoreStats> {
        let entries = self.entries().await?;
        Ok(StoreStats {
            total_entries: entries.len(),
            total_size_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest_entry: entries.iter().filter_map(|e| e.modified).min(),
            newest_entry: entries.iter().filter_map(|e| e.modified).max(),
        })
    }

    /// Visible regular file names in the root. A missing root yields nothing.
    async fn file_names(&self) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CacheError::Io(format!(
                    "Failed to read storage root {}: {}",
                    self.root.display(),
                    e
                )));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| CacheError::Io(format!("Failed to read entry: {}", e)))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

/// Everything before the first `.`; hidden files have no stem
fn stem_of(file_name: &str) -> Option<&str> {
    let stem = file_name.split('.').next()?;
    (!stem.is_empty()).then_some(stem)
}

/// A file in the storage root
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Statistics about the storage root
#[derive(Debug)]
pub struct StoreStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}
